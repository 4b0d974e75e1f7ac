#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;

pub use k8s_openapi::{
    api::{
        admissionregistration::v1 as admission,
        core::v1::{
            Endpoints, Node, NodeAddress, NodeStatus, Service, ServicePort, ServiceSpec,
        },
        discovery::v1::{Endpoint, EndpointConditions, EndpointPort, EndpointSlice},
        networking::v1::{
            IPBlock, NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer,
            NetworkPolicyPort, NetworkPolicySpec,
        },
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1 as apiextensions,
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference},
        util::intstr::IntOrString,
    },
};

pub use self::{
    admission::{MutatingWebhookConfiguration, ValidatingWebhookConfiguration},
    apiextensions::CustomResourceDefinition,
};

pub use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams},
    Client, Resource, ResourceExt,
};
