use crate::{
    tests::{origin_service, tcp_port},
    unbind::needs_selector_clear,
};

#[test]
fn selector_present_requires_a_patch() {
    let origin = origin_service("ns-1", "webhook-svc", vec![tcp_port("https", 443)]);
    assert!(needs_selector_clear(&origin));
}

#[test]
fn already_unbound_origin_requires_no_writes() {
    let mut origin = origin_service("ns-1", "webhook-svc", vec![tcp_port("https", 443)]);
    origin.spec.as_mut().unwrap().selector = None;
    assert!(!needs_selector_clear(&origin));
}

#[test]
fn empty_selector_counts_as_already_unbound() {
    let mut origin = origin_service("ns-1", "webhook-svc", vec![tcp_port("https", 443)]);
    origin.spec.as_mut().unwrap().selector = Some(Default::default());
    assert!(!needs_selector_clear(&origin));
}

#[test]
fn specless_service_requires_no_writes() {
    let mut origin = origin_service("ns-1", "webhook-svc", vec![tcp_port("https", 443)]);
    origin.spec = None;
    assert!(!needs_selector_clear(&origin));
}
