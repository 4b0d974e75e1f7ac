//! The label protocol shared by every object the controller touches.
//!
//! These strings are a stable contract: shadow objects are discovered by
//! them, the endpoint-slice watch uses them to tell its own writes apart
//! from pod-backed slices, and operators use them to opt services out of
//! ingress restriction.

/// Marks services and policies created by this controller.
pub const MANAGED_BY: &str = "proxy.kubernetes.io/managed-by";

/// Names the origin service a shadow object stands in for.
pub const PROXY_OF: &str = "service.infra.io/proxy-of";

/// Set to `"true"` on an origin service to disable ingress restriction for
/// it regardless of the controller-wide default.
pub const IGNORE_RESTRICTION: &str = "service.infra.io/proxy-ignore-restriction";

pub const PART_OF: &str = "app.kubernetes.io/part-of";
pub const APP_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard endpoint-slice convention: the service a slice belongs to.
pub const ENDPOINT_SLICE_SERVICE_NAME: &str = "kubernetes.io/service-name";

/// Standard endpoint-slice convention: the controller that maintains a slice.
pub const ENDPOINT_SLICE_MANAGED_BY: &str = "endpointslice.kubernetes.io/managed-by";

/// Managed-by value on the platform's own pod-backed slices.
pub const ENDPOINT_SLICE_CONTROLLER: &str = "endpointslice-controller.k8s.io";

/// This controller's identity, used as the managed-by value and the
/// server-side-apply field manager.
pub const CONTROLLER_NAME: &str = "nodeport-proxy-controller";
