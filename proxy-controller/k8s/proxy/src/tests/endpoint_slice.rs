use crate::{
    endpoint_slice::shadow_endpoint_slice,
    tests::{pod_endpoint, proxy_service},
    NAME_HASH_LEN,
};
use nodeport_proxy_controller_core::{proxy_name, NodeIpCache};
use nodeport_proxy_controller_k8s_api::{labels, ResourceExt};

#[test]
fn one_ready_endpoint_on_a_cached_node() {
    let nodes = NodeIpCache::new();
    nodes.set("n1", "10.0.1.9".parse().unwrap());

    let proxy = proxy_service("ns-1", "webhook-svc-nodeport-proxy-abcd1234", "webhook-svc", 30443);
    let slice = shadow_endpoint_slice(&proxy, "webhook-svc", vec![pod_endpoint(Some("n1"), true)], &nodes);

    assert_eq!(slice.address_type, "IPv4");
    assert_eq!(slice.endpoints.len(), 1);
    assert_eq!(slice.endpoints[0].addresses, vec!["10.0.1.9".to_string()]);

    // Ports carry the allocated node port, not the origin port.
    let ports = slice.ports.as_ref().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, Some(30443));
    assert_eq!(ports[0].name.as_deref(), Some("https"));
    assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
}

#[test]
fn uncached_node_contributes_no_address() {
    let nodes = NodeIpCache::new();

    let proxy = proxy_service("ns-1", "webhook-svc-nodeport-proxy-abcd1234", "webhook-svc", 30443);
    let slice = shadow_endpoint_slice(&proxy, "webhook-svc", vec![pod_endpoint(Some("n1"), true)], &nodes);

    assert!(slice.endpoints.is_empty());
    // The port list still reflects the proxy service; only addresses lag
    // until the node watch fills the cache in.
    assert_eq!(slice.ports.as_ref().unwrap().len(), 1);
}

#[test]
fn endpoint_without_node_name_is_dropped() {
    let nodes = NodeIpCache::new();
    nodes.set("n1", "10.0.1.9".parse().unwrap());

    let proxy = proxy_service("ns-1", "webhook-svc-nodeport-proxy-abcd1234", "webhook-svc", 30443);
    let slice = shadow_endpoint_slice(
        &proxy,
        "webhook-svc",
        vec![pod_endpoint(None, true), pod_endpoint(Some("n1"), true)],
        &nodes,
    );

    assert_eq!(slice.endpoints.len(), 1);
}

#[test]
fn conditions_are_carried_through_per_source_pod() {
    let nodes = NodeIpCache::new();
    nodes.set("n1", "10.0.1.9".parse().unwrap());

    let proxy = proxy_service("ns-1", "webhook-svc-nodeport-proxy-abcd1234", "webhook-svc", 30443);
    let slice = shadow_endpoint_slice(
        &proxy,
        "webhook-svc",
        vec![pod_endpoint(Some("n1"), true), pod_endpoint(Some("n1"), false)],
        &nodes,
    );

    // Two pods on one node: the address repeats, each entry keeping its own
    // readiness. Consumers needing unique addresses must de-duplicate.
    assert_eq!(slice.endpoints.len(), 2);
    assert_eq!(slice.endpoints[0].addresses, slice.endpoints[1].addresses);
    assert_eq!(
        slice.endpoints[0].conditions.as_ref().unwrap().ready,
        Some(true)
    );
    assert_eq!(
        slice.endpoints[1].conditions.as_ref().unwrap().ready,
        Some(false)
    );
}

#[test]
fn named_after_the_proxy_service_and_owned_by_it() {
    let nodes = NodeIpCache::new();

    let proxy = proxy_service("ns-1", "webhook-svc-nodeport-proxy-abcd1234", "webhook-svc", 30443);
    let slice = shadow_endpoint_slice(&proxy, "webhook-svc", Vec::new(), &nodes);

    assert_eq!(
        slice.name_unchecked(),
        proxy_name("webhook-svc-nodeport-proxy-abcd1234", NAME_HASH_LEN)
    );

    let slice_labels = slice.labels();
    assert_eq!(
        slice_labels
            .get(labels::ENDPOINT_SLICE_SERVICE_NAME)
            .map(String::as_str),
        Some("webhook-svc")
    );
    assert_eq!(
        slice_labels
            .get(labels::ENDPOINT_SLICE_MANAGED_BY)
            .map(String::as_str),
        Some(labels::CONTROLLER_NAME)
    );

    let owners = slice.metadata.owner_references.as_ref().unwrap();
    assert_eq!(owners[0].name, "webhook-svc-nodeport-proxy-abcd1234");
    assert_eq!(owners[0].controller, Some(true));
}
