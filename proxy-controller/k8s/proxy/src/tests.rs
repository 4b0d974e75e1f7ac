mod endpoint_slice;
mod network_policy;
mod unbind;

use nodeport_proxy_controller_k8s_api::{self as k8s, labels};
use std::collections::BTreeMap;

pub(crate) fn origin_service(namespace: &str, name: &str, ports: Vec<k8s::ServicePort>) -> k8s::Service {
    k8s::Service {
        metadata: k8s::ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            uid: Some(format!("uid-{name}")),
            ..Default::default()
        },
        spec: Some(k8s::ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(BTreeMap::from([("app".to_string(), name.to_string())])),
            ports: Some(ports),
            ..Default::default()
        }),
        status: None,
    }
}

pub(crate) fn tcp_port(name: &str, port: i32) -> k8s::ServicePort {
    k8s::ServicePort {
        name: Some(name.to_string()),
        port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// A shadow service as the engine would see it after apply: carrying the
/// proxy-of label and a node port allocated by the API server.
pub(crate) fn proxy_service(
    namespace: &str,
    name: &str,
    origin: &str,
    node_port: i32,
) -> k8s::Service {
    let mut port = tcp_port("https", 443);
    port.node_port = Some(node_port);
    k8s::Service {
        metadata: k8s::ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            uid: Some(format!("uid-{name}")),
            labels: Some(BTreeMap::from([
                (
                    labels::MANAGED_BY.to_string(),
                    labels::CONTROLLER_NAME.to_string(),
                ),
                (labels::PROXY_OF.to_string(), origin.to_string()),
            ])),
            ..Default::default()
        },
        spec: Some(k8s::ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(vec![port]),
            ..Default::default()
        }),
        status: None,
    }
}

pub(crate) fn pod_endpoint(node: Option<&str>, ready: bool) -> k8s::Endpoint {
    k8s::Endpoint {
        addresses: vec!["10.244.0.12".to_string()],
        node_name: node.map(ToString::to_string),
        conditions: Some(k8s::EndpointConditions {
            ready: Some(ready),
            serving: Some(ready),
            terminating: Some(false),
        }),
        ..Default::default()
    }
}
