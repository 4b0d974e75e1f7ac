//! The shadow NodePort service.

use crate::{apply_params, is_not_found, Error, Proxy, Result, NAME_HASH_LEN};
use nodeport_proxy_controller_core::{proxy_name, ResourceId, ServiceRef};
use nodeport_proxy_controller_k8s_api::{self as k8s, labels, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

impl Proxy {
    /// Ensures a NodePort shadow of the referenced ClusterIP service.
    ///
    /// Returns `Ok(None)` when the origin is not ClusterIP-typed: anything
    /// else is assumed to already be routable from the control plane. The
    /// returned service is the applied object, carrying the node ports the
    /// API server allocated.
    pub async fn ensure_service_proxy(
        &self,
        reference: &ServiceRef,
    ) -> Result<Option<k8s::Service>> {
        let api = k8s::Api::<k8s::Service>::namespaced(self.client.clone(), &reference.namespace);
        let origin = match api.get(&reference.name).await {
            Ok(service) => service,
            Err(error) if is_not_found(&error) => {
                return Err(Error::ServiceNotFound(ResourceId::new(
                    reference.namespace.clone(),
                    reference.name.clone(),
                )));
            }
            Err(error) => return Err(error.into()),
        };

        if !is_cluster_ip(&origin) {
            debug!(service = %reference, "not a ClusterIP service, skipping");
            return Ok(None);
        }

        let mut restricted = self.config.restricted;
        if let Some(value) = origin.labels().get(labels::IGNORE_RESTRICTION) {
            if value == "true" {
                restricted = false;
            }
        }

        let desired = shadow_service(&origin, restricted);
        let name = desired.name_unchecked();
        let applied = api
            .patch(&name, &apply_params(), &k8s::Patch::Apply(&desired))
            .await?;
        debug!(service = %reference, proxy = %name, restricted, "ensured proxy service");

        if restricted {
            self.ensure_network_policy(&origin).await?;
        }

        Ok(Some(applied))
    }
}

/// An unset type means ClusterIP.
fn is_cluster_ip(service: &k8s::Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        .map_or(true, |type_| type_ == "ClusterIP")
}

/// Builds the desired shadow service for `origin`.
///
/// Ports and selector mirror the origin; node ports are left for the API
/// server to allocate. When restricted, `externalTrafficPolicy: Local` keeps
/// the node ports open only on nodes actually hosting a ready pod.
pub(crate) fn shadow_service(origin: &k8s::Service, restricted: bool) -> k8s::Service {
    let origin_name = origin.name_unchecked();
    let spec = origin.spec.clone().unwrap_or_default();

    let ports = spec.ports.map(|ports| {
        ports
            .into_iter()
            .map(|mut port| {
                port.node_port = None;
                port
            })
            .collect()
    });

    k8s::Service {
        metadata: k8s::ObjectMeta {
            name: Some(proxy_name(&origin_name, NAME_HASH_LEN)),
            namespace: origin.namespace(),
            labels: Some(shadow_labels(origin)),
            owner_references: origin.controller_owner_ref(&()).map(|origin| vec![origin]),
            ..Default::default()
        },
        spec: Some(k8s::ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports,
            selector: spec.selector,
            external_traffic_policy: Some(
                if restricted { "Local" } else { "Cluster" }.to_string(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

/// Discovery labels for shadow objects, propagating the origin's instance
/// into `part-of` so grouping tools keep the shadow with its application.
pub(crate) fn shadow_labels(origin: &k8s::Service) -> BTreeMap<String, String> {
    let mut shadow = BTreeMap::from([
        (
            labels::MANAGED_BY.to_string(),
            labels::CONTROLLER_NAME.to_string(),
        ),
        (labels::PROXY_OF.to_string(), origin.name_unchecked()),
    ]);
    if let Some(instance) = origin.labels().get(labels::APP_INSTANCE) {
        shadow.insert(labels::PART_OF.to_string(), instance.clone());
    }
    shadow
}
