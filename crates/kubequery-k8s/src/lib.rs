//! Kubernetes client for kubequery
//!
//! This crate provides the cluster connector and the read-only query
//! functions over core resource collections (namespaces, pods, nodes,
//! deployments, services, events) plus raw manifest retrieval.

mod client;
mod error;
mod resource;

pub use client::{KubeClient, validate_namespace};
pub use error::{QueryError, Result};
pub use resource::ResourceKind;

// Re-export types that are used in our public API
pub use kubequery_types::{
    DeploymentInfo, EventInfo, NamespaceInfo, NodeInfo, PodInfo, ServiceInfo,
};
