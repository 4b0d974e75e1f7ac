//! Keeps the node address cache aligned with cluster node state.

use nodeport_proxy_controller_core::NodeIpCache;
use nodeport_proxy_controller_k8s_api::{self as k8s, ResourceExt};
use parking_lot::RwLock;
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
};
use tracing::debug;

pub struct NodeIndex {
    cache: Arc<NodeIpCache>,
}

impl NodeIndex {
    pub fn shared(cache: Arc<NodeIpCache>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self { cache }))
    }
}

impl kubert::index::IndexClusterResource<k8s::Node> for NodeIndex {
    fn apply(&mut self, node: k8s::Node) {
        let name = node.name_unchecked();
        // An update that no longer carries a parsable IPv4 internal address
        // leaves the previous entry in place; only an overwrite or an
        // explicit delete clears it.
        if let Some(ip) = internal_ipv4(&node) {
            debug!(node = %name, %ip, "caching node address");
            self.cache.set(name, ip);
        }
    }

    fn delete(&mut self, name: String) {
        debug!(node = %name, "dropping node address");
        self.cache.delete(&name);
    }
}

/// The node's first parsable IPv4 internal address.
pub(crate) fn internal_ipv4(node: &k8s::Node) -> Option<Ipv4Addr> {
    node.status
        .as_ref()?
        .addresses
        .iter()
        .flatten()
        .filter(|address| address.type_ == "InternalIP")
        .find_map(|address| match address.address.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => Some(ip),
            _ => None,
        })
}
