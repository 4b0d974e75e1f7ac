//! The shadow EndpointSlice: node addresses standing in for pod addresses.

use crate::{apply_params, Error, Proxy, Result, NAME_HASH_LEN};
use nodeport_proxy_controller_core::{proxy_name, NodeIpCache, ResourceId};
use nodeport_proxy_controller_k8s_api::{self as k8s, labels, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl Proxy {
    /// Rebuilds the shadow EndpointSlice of a proxy service from the
    /// origin's current pod endpoints and the node address cache.
    ///
    /// Pod endpoints whose node is not in the cache contribute no address;
    /// they are picked up on a later pass once the node watch has filled the
    /// cache in.
    pub async fn ensure_proxy_endpoint_slices(&self, proxy_service: &k8s::Service) -> Result<()> {
        let namespace = proxy_service.namespace().unwrap_or_default();
        let proxy_svc_name = proxy_service.name_unchecked();

        let origin_name = proxy_service
            .labels()
            .get(labels::PROXY_OF)
            .cloned()
            .ok_or_else(|| {
                Error::MissingProxyOfLabel(ResourceId::new(
                    namespace.clone(),
                    proxy_svc_name.clone(),
                ))
            })?;

        let sources = self.source_endpoint_slices(&namespace, &origin_name).await?;
        let endpoints = sources
            .into_iter()
            .flat_map(|slice| slice.endpoints)
            .collect::<Vec<_>>();

        let desired = shadow_endpoint_slice(proxy_service, &origin_name, endpoints, &self.nodes);
        let name = desired.name_unchecked();

        let api = k8s::Api::<k8s::EndpointSlice>::namespaced(self.client.clone(), &namespace);
        api.patch(&name, &apply_params(), &k8s::Patch::Apply(&desired))
            .await?;
        info!(proxy = %proxy_svc_name, origin = %origin_name, slice = %name, "ensured proxy endpoint slice");
        Ok(())
    }

    /// The slices the platform's endpoint-slice controller maintains for the
    /// origin's pods.
    pub(crate) async fn source_endpoint_slices(
        &self,
        namespace: &str,
        origin: &str,
    ) -> Result<Vec<k8s::EndpointSlice>> {
        let api = k8s::Api::<k8s::EndpointSlice>::namespaced(self.client.clone(), namespace);
        let selector = format!(
            "{}={origin},{}={}",
            labels::ENDPOINT_SLICE_SERVICE_NAME,
            labels::ENDPOINT_SLICE_MANAGED_BY,
            labels::ENDPOINT_SLICE_CONTROLLER,
        );
        let slices = api.list(&k8s::ListParams::default().labels(&selector)).await?;
        Ok(slices.items)
    }
}

/// Builds the shadow slice: one entry per source pod endpoint whose node has
/// a cached address, carrying the source conditions through; ports are the
/// proxy service's allocated node ports.
///
/// Two pods on the same node yield two entries with the same address. The
/// duplication is deliberate: each entry keeps its own readiness conditions.
pub(crate) fn shadow_endpoint_slice(
    proxy_service: &k8s::Service,
    origin_name: &str,
    source_endpoints: Vec<k8s::Endpoint>,
    nodes: &NodeIpCache,
) -> k8s::EndpointSlice {
    let proxy_svc_name = proxy_service.name_unchecked();

    let ports = proxy_service
        .spec
        .iter()
        .flat_map(|spec| spec.ports.iter().flatten())
        .map(|port| k8s::EndpointPort {
            name: port.name.clone(),
            port: port.node_port,
            protocol: port.protocol.clone(),
            app_protocol: None,
        })
        .collect::<Vec<_>>();

    let endpoints = source_endpoints
        .into_iter()
        .filter_map(|endpoint| {
            let Some(node) = endpoint.node_name.as_deref() else {
                debug!("skipping endpoint without a node name");
                return None;
            };
            let Some(address) = nodes.get(node) else {
                debug!(%node, "node address unknown, dropping endpoint");
                return None;
            };
            Some(k8s::Endpoint {
                addresses: vec![address.to_string()],
                conditions: endpoint.conditions,
                ..Default::default()
            })
        })
        .collect();

    k8s::EndpointSlice {
        metadata: k8s::ObjectMeta {
            name: Some(proxy_name(&proxy_svc_name, NAME_HASH_LEN)),
            namespace: proxy_service.namespace(),
            labels: Some(BTreeMap::from([
                (
                    labels::ENDPOINT_SLICE_SERVICE_NAME.to_string(),
                    origin_name.to_string(),
                ),
                (
                    labels::ENDPOINT_SLICE_MANAGED_BY.to_string(),
                    labels::CONTROLLER_NAME.to_string(),
                ),
            ])),
            owner_references: proxy_service
                .controller_owner_ref(&())
                .map(|proxy| vec![proxy]),
            ..Default::default()
        },
        address_type: "IPv4".to_string(),
        endpoints,
        ports: Some(ports),
    }
}
