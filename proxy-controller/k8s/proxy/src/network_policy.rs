//! Ingress restriction for proxied pods.

use crate::{apply_params, service::shadow_labels, Proxy, Result, NAME_HASH_LEN};
use nodeport_proxy_controller_core::proxy_name;
use nodeport_proxy_controller_k8s_api::{self as k8s, Resource, ResourceExt};
use tracing::debug;

impl Proxy {
    /// Restricts ingress to the origin's pods to the configured source
    /// networks.
    ///
    /// Additive only: disabling restriction later leaves an existing policy
    /// in place.
    pub(crate) async fn ensure_network_policy(&self, origin: &k8s::Service) -> Result<()> {
        let namespace = origin.namespace().unwrap_or_default();
        let desired = restriction_policy(origin, &self.config.allowed_source_cidrs);
        let name = desired.name_unchecked();

        let api = k8s::Api::<k8s::NetworkPolicy>::namespaced(self.client.clone(), &namespace);
        api.patch(&name, &apply_params(), &k8s::Patch::Apply(&desired))
            .await?;
        debug!(service = %origin.name_unchecked(), policy = %name, "ensured network policy");
        Ok(())
    }
}

/// Builds the allow-list policy: one peer per configured CIDR, one port per
/// origin service port.
pub(crate) fn restriction_policy(
    origin: &k8s::Service,
    cidrs: &[ipnet::IpNet],
) -> k8s::NetworkPolicy {
    let origin_name = origin.name_unchecked();
    let spec = origin.spec.clone().unwrap_or_default();

    let from = cidrs
        .iter()
        .map(|cidr| k8s::NetworkPolicyPeer {
            ip_block: Some(k8s::IPBlock {
                cidr: cidr.to_string(),
                except: None,
            }),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let ports = spec
        .ports
        .iter()
        .flatten()
        .map(|port| k8s::NetworkPolicyPort {
            protocol: port.protocol.clone(),
            port: Some(ingress_port(port)),
            end_port: None,
        })
        .collect::<Vec<_>>();

    k8s::NetworkPolicy {
        metadata: k8s::ObjectMeta {
            name: Some(proxy_name(&origin_name, NAME_HASH_LEN)),
            namespace: origin.namespace(),
            labels: Some(shadow_labels(origin)),
            owner_references: origin.controller_owner_ref(&()).map(|origin| vec![origin]),
            ..Default::default()
        },
        spec: Some(k8s::NetworkPolicySpec {
            pod_selector: k8s::LabelSelector {
                match_labels: spec.selector,
                match_expressions: None,
            },
            ingress: Some(vec![k8s::NetworkPolicyIngressRule {
                from: Some(from),
                ports: Some(ports),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// An unset (or zero) target port means "same as the service port" by
/// platform convention.
fn ingress_port(port: &k8s::ServicePort) -> k8s::IntOrString {
    match &port.target_port {
        None | Some(k8s::IntOrString::Int(0)) => k8s::IntOrString::Int(port.port),
        Some(target) => target.clone(),
    }
}
