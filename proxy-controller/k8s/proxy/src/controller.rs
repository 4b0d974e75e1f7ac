//! The write side: drains reconcile requests and applies them through the
//! proxy engine.

use crate::{Error, Metrics, Proxy, Request, Result};
use nodeport_proxy_controller_core::{ResourceId, ServiceRef};
use nodeport_proxy_controller_k8s_api::{self as k8s, labels};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error};

pub struct Controller {
    client: k8s::Client,
    proxy: Proxy,
    requests: UnboundedReceiver<Request>,
    metrics: Metrics,
}

impl Controller {
    pub fn new(
        client: k8s::Client,
        proxy: Proxy,
        requests: UnboundedReceiver<Request>,
        metrics: Metrics,
    ) -> Self {
        Self {
            client,
            proxy,
            requests,
            metrics,
        }
    }

    /// Runs until the request channel closes at shutdown.
    ///
    /// A failed request is logged with its key and dropped; the next watch
    /// delivery for the object retriggers it. One service's failure never
    /// blocks the others.
    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request {
                Request::Proxy(reference) => match self.proxy_pass(&reference).await {
                    Ok(()) => {
                        self.metrics.proxy_passes.inc();
                    }
                    Err(Error::ServiceNotFound(id)) => {
                        // A dangling webhook reference; nothing to do until
                        // the service appears and refires the watch.
                        debug!(service = %id, "webhook service not found, skipping");
                        self.metrics.skipped_references.inc();
                    }
                    Err(err) => {
                        error!(service = %reference, error = %err, "failed to proxy webhook service");
                        self.metrics.failures.inc();
                    }
                },
                Request::SyncEndpoints(origin) => match self.sync_endpoints(&origin).await {
                    Ok(()) => {
                        self.metrics.endpoint_syncs.inc();
                    }
                    Err(err) => {
                        error!(service = %origin, error = %err, "failed to sync proxy endpoints");
                        self.metrics.failures.inc();
                    }
                },
            }
        }
        debug!("request channel closed, stopping");
    }

    /// The ordered cutover: the shadow path must be live before the pod path
    /// is torn down.
    async fn proxy_pass(&self, reference: &ServiceRef) -> Result<()> {
        let Some(proxy_service) = self.proxy.ensure_service_proxy(reference).await? else {
            // Not ClusterIP-typed; already routable without us.
            return Ok(());
        };
        self.proxy.ensure_proxy_endpoint_slices(&proxy_service).await?;
        self.proxy.unbind_pod_endpoints(reference).await?;
        Ok(())
    }

    /// Refreshes the shadow slices of every proxy of `origin`, found by the
    /// discovery labels. No proxies means the origin was never shadowed.
    async fn sync_endpoints(&self, origin: &ResourceId) -> Result<()> {
        let api = k8s::Api::<k8s::Service>::namespaced(self.client.clone(), &origin.namespace);
        let selector = format!(
            "{}={},{}={}",
            labels::MANAGED_BY,
            labels::CONTROLLER_NAME,
            labels::PROXY_OF,
            origin.name,
        );
        let proxies = api.list(&k8s::ListParams::default().labels(&selector)).await?;
        for proxy_service in proxies.items {
            self.proxy.ensure_proxy_endpoint_slices(&proxy_service).await?;
        }
        Ok(())
    }
}
