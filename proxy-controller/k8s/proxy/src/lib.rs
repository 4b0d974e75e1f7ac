#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod controller;
mod endpoint_slice;
mod index;
mod metrics;
mod network_policy;
mod node;
mod service;
mod unbind;

#[cfg(test)]
mod tests;

pub use self::{
    controller::Controller,
    index::{CrdIndex, EndpointSliceIndex, Request, WebhookIndex},
    metrics::Metrics,
    node::NodeIndex,
};

use nodeport_proxy_controller_core::{NodeIpCache, ResourceId};
use nodeport_proxy_controller_k8s_api::{self as k8s, labels};
use std::sync::Arc;

/// Hex characters of the content hash carried by every derived name.
pub(crate) const NAME_HASH_LEN: usize = 8;

/// Shadows webhook-backing ClusterIP services with NodePort services whose
/// endpoints are node addresses, so that a control plane without pod-CIDR
/// routes can still reach admission and conversion webhooks.
pub struct Proxy {
    client: k8s::Client,
    config: ProxyConfig,
    nodes: Arc<NodeIpCache>,
}

#[derive(Clone, Debug, Default)]
pub struct ProxyConfig {
    /// Restrict ingress to proxied pods to the allowed source networks.
    ///
    /// Individual services can opt out via the ignore-restriction label.
    pub restricted: bool,

    /// Source networks allowed to reach proxied pods when restricted.
    pub allowed_source_cidrs: Vec<ipnet::IpNet>,
}

impl Proxy {
    pub fn new(client: k8s::Client, config: ProxyConfig, nodes: Arc<NodeIpCache>) -> Self {
        Self {
            client,
            config,
            nodes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The referenced service does not exist. This is an expected outcome
    /// for dangling webhook references and must not be retried.
    #[error("service {0} not found")]
    ServiceNotFound(ResourceId),

    /// The service handed to the endpoint-slice sync is not one of ours.
    #[error("proxy service {0} does not carry the service.infra.io/proxy-of label")]
    MissingProxyOfLabel(ResourceId),

    #[error(transparent)]
    Api(#[from] kube::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// Every write is an idempotent apply under the controller's field manager;
/// concurrent reconciles of the same derived object converge through the API
/// server's field management instead of conflicting.
pub(crate) fn apply_params() -> k8s::PatchParams {
    k8s::PatchParams::apply(labels::CONTROLLER_NAME).force()
}
