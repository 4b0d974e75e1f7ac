#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nodeport_proxy_controller::Args::parse_and_run().await
}
