#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

use anyhow::{bail, Result};
use clap::Parser;
use ipnet::IpNet;
use kube::runtime::watcher;
use nodeport_proxy_controller_core::NodeIpCache;
use nodeport_proxy_controller_k8s_api as k8s;
use nodeport_proxy_controller_k8s_proxy::{
    Controller, CrdIndex, EndpointSliceIndex, Metrics, NodeIndex, Proxy, ProxyConfig,
    WebhookIndex,
};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "nodeport-proxy",
    about = "Shadows webhook ClusterIP services with NodePort proxies so a pod-CIDR-blind control plane can reach them"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "nodeport_proxy=info,warn",
        env = "NODEPORT_PROXY_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Restricts ingress to proxied webhook pods to the allowed source
    /// networks. Individual services can opt out with the
    /// `service.infra.io/proxy-ignore-restriction: "true"` label.
    #[clap(long, env = "NODEPORT_PROXY_RESTRICTED")]
    restricted: bool,

    /// Source networks allowed to reach proxied webhook pods when
    /// restricted, e.g. the control plane's network.
    #[clap(long, env = "NODEPORT_PROXY_ALLOWED_CIDRS")]
    allowed_source_cidrs: Option<IpNets>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            restricted,
            allowed_source_cidrs,
        } = self;

        let mut prom = <Registry>::default();
        let proxy_metrics = Metrics::register(prom.sub_registry_with_prefix("proxy"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let config = ProxyConfig {
            restricted,
            allowed_source_cidrs: allowed_source_cidrs
                .map(|IpNets(nets)| nets)
                .unwrap_or_default(),
        };

        let nodes = Arc::new(NodeIpCache::new());
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();

        // Spawn resource watches. Each index is statically typed to one
        // resource kind; all of them funnel into the same request channel.

        let node_events = runtime.watch_all::<k8s::Node>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(NodeIndex::shared(nodes.clone()), node_events)
                .instrument(info_span!("nodes")),
        );

        let crds = runtime.watch_all::<k8s::CustomResourceDefinition>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(CrdIndex::shared(requests_tx.clone()), crds)
                .instrument(info_span!("customresourcedefinitions")),
        );

        let webhooks = WebhookIndex::shared(requests_tx.clone());
        let mutating =
            runtime.watch_all::<k8s::MutatingWebhookConfiguration>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(webhooks.clone(), mutating)
                .instrument(info_span!("mutatingwebhookconfigurations")),
        );
        let validating =
            runtime.watch_all::<k8s::ValidatingWebhookConfiguration>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(webhooks, validating)
                .instrument(info_span!("validatingwebhookconfigurations")),
        );

        let slices = runtime.watch_all::<k8s::EndpointSlice>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(EndpointSliceIndex::shared(requests_tx), slices)
                .instrument(info_span!("endpointslices")),
        );

        // The write side: one task draining requests through the engine.
        let client = runtime.client();
        let proxy = Proxy::new(client.clone(), config, nodes);
        let controller = Controller::new(client, proxy, requests_rx, proxy_metrics);
        tokio::spawn(controller.run().instrument(info_span!("controller")));

        info!("starting runtime");
        if runtime.run().await.is_err() {
            bail!("aborted");
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct IpNets(Vec<IpNet>);

impl std::str::FromStr for IpNets {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|n| n.trim().parse().map_err(Into::into))
            .collect::<Result<Vec<IpNet>>>()
            .map(Self)
    }
}
