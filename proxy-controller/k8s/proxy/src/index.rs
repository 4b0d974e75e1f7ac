//! Watch indices: thin, statically-typed adapters that turn cluster change
//! events into reconcile requests for the write-side controller.

use nodeport_proxy_controller_core::{ResourceId, ServiceRef};
use nodeport_proxy_controller_k8s_api::{self as k8s, labels, ResourceExt};
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;

/// Work dispatched from the watch indices to the write-side controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Run the full proxy sequence for a webhook's backing service:
    /// ensure the shadow service, ensure its endpoints, unbind the pod path.
    Proxy(ServiceRef),

    /// Refresh the shadow endpoints of any proxies of this origin service;
    /// the shadow service and restriction policy are left untouched.
    SyncEndpoints(ResourceId),
}

fn dispatch(requests: &UnboundedSender<Request>, request: Request) {
    // The receiver only goes away at shutdown.
    if let Err(error) = requests.send(request) {
        tracing::error!(%error, "failed to dispatch reconcile request");
    }
}

/// Watches CustomResourceDefinitions for conversion webhooks backed by a
/// service.
pub struct CrdIndex {
    requests: UnboundedSender<Request>,
}

impl CrdIndex {
    pub fn shared(requests: UnboundedSender<Request>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self { requests }))
    }
}

impl kubert::index::IndexClusterResource<k8s::CustomResourceDefinition> for CrdIndex {
    fn apply(&mut self, crd: k8s::CustomResourceDefinition) {
        let Some(reference) = conversion_service(&crd) else {
            return;
        };
        tracing::debug!(crd = %crd.name_unchecked(), service = %reference, "conversion webhook");
        dispatch(&self.requests, Request::Proxy(reference));
    }

    fn delete(&mut self, _name: String) {
        // Shadow objects are garbage-collected with their origin service.
    }
}

fn conversion_service(crd: &k8s::CustomResourceDefinition) -> Option<ServiceRef> {
    let service = crd
        .spec
        .conversion
        .as_ref()?
        .webhook
        .as_ref()?
        .client_config
        .as_ref()?
        .service
        .as_ref()?;
    Some(ServiceRef::new(
        &service.namespace,
        &service.name,
        service.port,
    ))
}

/// Watches mutating and validating webhook configurations.
///
/// A configuration may list many webhook entries sharing one backend;
/// references are deduplicated by value before dispatch so each distinct
/// backend gets exactly one pass.
pub struct WebhookIndex {
    requests: UnboundedSender<Request>,
}

impl WebhookIndex {
    pub fn shared(requests: UnboundedSender<Request>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self { requests }))
    }

    fn dispatch_distinct(&self, references: BTreeSet<ServiceRef>) {
        for reference in references {
            dispatch(&self.requests, Request::Proxy(reference));
        }
    }
}

impl kubert::index::IndexClusterResource<k8s::MutatingWebhookConfiguration> for WebhookIndex {
    fn apply(&mut self, config: k8s::MutatingWebhookConfiguration) {
        let references = distinct_service_refs(
            config
                .webhooks
                .iter()
                .flatten()
                .map(|webhook| &webhook.client_config),
        );
        self.dispatch_distinct(references);
    }

    fn delete(&mut self, _name: String) {}
}

impl kubert::index::IndexClusterResource<k8s::ValidatingWebhookConfiguration> for WebhookIndex {
    fn apply(&mut self, config: k8s::ValidatingWebhookConfiguration) {
        let references = distinct_service_refs(
            config
                .webhooks
                .iter()
                .flatten()
                .map(|webhook| &webhook.client_config),
        );
        self.dispatch_distinct(references);
    }

    fn delete(&mut self, _name: String) {}
}

fn distinct_service_refs<'c>(
    client_configs: impl Iterator<Item = &'c k8s::admission::WebhookClientConfig>,
) -> BTreeSet<ServiceRef> {
    client_configs
        // URL-configured webhooks are already routable; only service-typed
        // client configs need a proxy.
        .filter_map(|config| config.service.as_ref())
        .map(|service| ServiceRef::new(&service.namespace, &service.name, service.port))
        .collect()
}

/// Watches pod-backed EndpointSlices so shadow endpoints track pod churn.
pub struct EndpointSliceIndex {
    requests: UnboundedSender<Request>,
}

impl EndpointSliceIndex {
    pub fn shared(requests: UnboundedSender<Request>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self { requests }))
    }
}

impl kubert::index::IndexNamespacedResource<k8s::EndpointSlice> for EndpointSliceIndex {
    fn apply(&mut self, slice: k8s::EndpointSlice) {
        // Our own slices must not feed back into endpoint synchronization.
        if slice
            .labels()
            .get(labels::ENDPOINT_SLICE_MANAGED_BY)
            .is_some_and(|managed_by| managed_by == labels::CONTROLLER_NAME)
        {
            return;
        }

        let Some(namespace) = slice.namespace() else {
            return;
        };
        let Some(origin) = slice.labels().get(labels::ENDPOINT_SLICE_SERVICE_NAME) else {
            return;
        };
        dispatch(
            &self.requests,
            Request::SyncEndpoints(ResourceId::new(namespace, origin.clone())),
        );
    }

    fn delete(&mut self, _namespace: String, _name: String) {
        // A deleted slice alone does not identify its origin service; the
        // slices that remain for the service re-fire and converge the shadow.
    }
}
