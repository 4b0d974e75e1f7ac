#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod name;
mod node;

pub use self::{name::proxy_name, node::NodeIpCache};

/// Port a webhook backend listens on when its client config leaves the port
/// unset.
pub const DEFAULT_WEBHOOK_PORT: i32 = 443;

/// A webhook's declared backing service.
///
/// References are compared by value so that webhook entries naming the same
/// backend collapse to a single reconcile pass, regardless of which object
/// they were extracted from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
    pub port: i32,
}

impl ServiceRef {
    pub fn new(namespace: impl ToString, name: impl ToString, port: Option<i32>) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            port: port.unwrap_or(DEFAULT_WEBHOOK_PORT),
        }
    }
}

impl std::fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.name, self.port)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: String, name: String) -> Self {
        Self { namespace, name }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
