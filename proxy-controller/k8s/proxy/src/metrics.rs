use prometheus_client::{metrics::counter::Counter, registry::Registry};

/// Write-side reconcile outcome counters, registered on the admin registry.
#[derive(Clone, Debug)]
pub struct Metrics {
    pub(crate) proxy_passes: Counter,
    pub(crate) endpoint_syncs: Counter,
    pub(crate) skipped_references: Counter,
    pub(crate) failures: Counter,
}

impl Metrics {
    pub fn register(prom: &mut Registry) -> Self {
        let proxy_passes = Counter::default();
        prom.register(
            "proxy_passes",
            "Completed proxy passes (service, endpoints, unbind)",
            proxy_passes.clone(),
        );

        let endpoint_syncs = Counter::default();
        prom.register(
            "endpoint_syncs",
            "Completed shadow endpoint refreshes",
            endpoint_syncs.clone(),
        );

        let skipped_references = Counter::default();
        prom.register(
            "skipped_references",
            "Webhook references whose service does not exist",
            skipped_references.clone(),
        );

        let failures = Counter::default();
        prom.register("failures", "Reconcile requests that failed", failures.clone());

        Self {
            proxy_passes,
            endpoint_syncs,
            skipped_references,
            failures,
        }
    }
}
