use crate::{
    network_policy::restriction_policy,
    tests::{origin_service, tcp_port},
    NAME_HASH_LEN,
};
use nodeport_proxy_controller_core::proxy_name;
use nodeport_proxy_controller_k8s_api::{self as k8s, ResourceExt};

fn cidrs(list: &[&str]) -> Vec<ipnet::IpNet> {
    list.iter().map(|cidr| cidr.parse().unwrap()).collect()
}

#[test]
fn one_peer_per_cidr_and_one_port_per_service_port() {
    let origin = origin_service(
        "ns-1",
        "webhook-svc",
        vec![tcp_port("https", 8443), tcp_port("metrics", 9443)],
    );
    let policy = restriction_policy(&origin, &cidrs(&["10.0.0.0/8"]));

    let spec = policy.spec.as_ref().unwrap();
    let ingress = spec.ingress.as_ref().unwrap();
    assert_eq!(ingress.len(), 1);

    let from = ingress[0].from.as_ref().unwrap();
    assert_eq!(from.len(), 1);
    assert_eq!(from[0].ip_block.as_ref().unwrap().cidr, "10.0.0.0/8");

    let ports = ingress[0].ports.as_ref().unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].port, Some(k8s::IntOrString::Int(8443)));
    assert_eq!(ports[1].port, Some(k8s::IntOrString::Int(9443)));
    assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
}

#[test]
fn symbolic_target_port_is_used_when_set() {
    let mut port = tcp_port("https", 443);
    port.target_port = Some(k8s::IntOrString::String("webhook-tls".to_string()));
    let origin = origin_service("ns-1", "webhook-svc", vec![port]);

    let policy = restriction_policy(&origin, &cidrs(&["10.0.0.0/8"]));
    let spec = policy.spec.unwrap();
    let ports = spec.ingress.unwrap()[0].ports.clone().unwrap();
    assert_eq!(
        ports[0].port,
        Some(k8s::IntOrString::String("webhook-tls".to_string()))
    );
}

#[test]
fn zero_target_port_falls_back_to_the_service_port() {
    // An unset target port round-trips as Int(0) through some builders; the
    // platform treats both as "same as the service port".
    let mut port = tcp_port("https", 443);
    port.target_port = Some(k8s::IntOrString::Int(0));
    let origin = origin_service("ns-1", "webhook-svc", vec![port]);

    let policy = restriction_policy(&origin, &cidrs(&["10.0.0.0/8"]));
    let spec = policy.spec.unwrap();
    let ports = spec.ingress.unwrap()[0].ports.clone().unwrap();
    assert_eq!(ports[0].port, Some(k8s::IntOrString::Int(443)));
}

#[test]
fn selects_the_origin_pods() {
    let origin = origin_service("ns-1", "webhook-svc", vec![tcp_port("https", 443)]);
    let policy = restriction_policy(&origin, &cidrs(&["10.0.0.0/8", "100.64.0.0/10"]));

    assert_eq!(
        policy.name_unchecked(),
        proxy_name("webhook-svc", NAME_HASH_LEN)
    );
    let spec = policy.spec.as_ref().unwrap();
    assert_eq!(
        spec.pod_selector.match_labels,
        origin.spec.as_ref().unwrap().selector
    );
    assert_eq!(
        spec.ingress.as_ref().unwrap()[0].from.as_ref().unwrap().len(),
        2
    );
}
