//! Node name -> internal IPv4 address.

use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::net::Ipv4Addr;

/// Internal IPv4 addresses of the cluster's nodes.
///
/// The node watch writes; concurrent proxy reconciles read. Reads take the
/// shared side of the lock and never contend with each other. Entries track
/// node existence, not time: nothing expires, and a node update that no
/// longer carries an address leaves the previous entry intact (the watch only
/// overwrites or deletes explicitly).
#[derive(Debug, Default)]
pub struct NodeIpCache {
    addrs: RwLock<HashMap<String, Ipv4Addr>>,
}

impl NodeIpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node: impl ToString, ip: Ipv4Addr) {
        self.addrs.write().insert(node.to_string(), ip);
    }

    pub fn delete(&self, node: &str) {
        self.addrs.write().remove(node);
    }

    pub fn get(&self, node: &str) -> Option<Ipv4Addr> {
        self.addrs.read().get(node).copied()
    }
}
