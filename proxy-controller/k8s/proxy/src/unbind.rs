//! Cutting the origin service over to the shadow path.

use crate::{is_not_found, Proxy, Result};
use nodeport_proxy_controller_core::ServiceRef;
use nodeport_proxy_controller_k8s_api::{self as k8s, ResourceExt};
use tracing::debug;

impl Proxy {
    /// Removes the pod-direct routing path for the origin service: clears
    /// its selector and deletes its native endpoint objects.
    ///
    /// Only called after the shadow service and slice have been ensured in
    /// the same pass, so the service is never left unroutable. Every step
    /// treats already-absent state as success.
    pub async fn unbind_pod_endpoints(&self, reference: &ServiceRef) -> Result<()> {
        let services =
            k8s::Api::<k8s::Service>::namespaced(self.client.clone(), &reference.namespace);
        let origin = match services.get(&reference.name).await {
            Ok(service) => service,
            Err(error) if is_not_found(&error) => return Ok(()),
            Err(error) => return Err(error.into()),
        };

        // An empty selector stops the platform from repopulating the native
        // endpoints we are about to delete.
        if needs_selector_clear(&origin) {
            let patch = serde_json::json!({"spec": {"selector": null}});
            services
                .patch(
                    &reference.name,
                    &k8s::PatchParams::default(),
                    &k8s::Patch::Merge(&patch),
                )
                .await?;
            debug!(service = %reference, "cleared pod selector");
        }

        self.delete_pod_endpoints(reference).await?;
        self.delete_source_endpoint_slices(reference).await?;
        Ok(())
    }

    async fn delete_pod_endpoints(&self, reference: &ServiceRef) -> Result<()> {
        let api = k8s::Api::<k8s::Endpoints>::namespaced(self.client.clone(), &reference.namespace);
        match api
            .delete(&reference.name, &k8s::DeleteParams::default())
            .await
        {
            Ok(_) => debug!(service = %reference, "deleted pod endpoints"),
            Err(error) if is_not_found(&error) => {}
            Err(error) => return Err(error.into()),
        }
        Ok(())
    }

    async fn delete_source_endpoint_slices(&self, reference: &ServiceRef) -> Result<()> {
        let api =
            k8s::Api::<k8s::EndpointSlice>::namespaced(self.client.clone(), &reference.namespace);
        for slice in self
            .source_endpoint_slices(&reference.namespace, &reference.name)
            .await?
        {
            let name = slice.name_unchecked();
            match api.delete(&name, &k8s::DeleteParams::default()).await {
                Ok(_) => debug!(service = %reference, %name, "deleted pod endpoint slice"),
                Err(error) if is_not_found(&error) => {}
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }
}

/// Whether the origin still routes to pods directly. A service whose selector
/// is already absent (or empty) needs no patch; unbinding it again must make
/// no writes.
pub(crate) fn needs_selector_clear(origin: &k8s::Service) -> bool {
    origin
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
        .is_some_and(|selector| !selector.is_empty())
}
