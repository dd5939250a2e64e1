//! Resource kinds supported by raw-manifest retrieval.

use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Closed set of resource kinds that `get_resource_yaml` can fetch.
///
/// Anything outside this set fails with `UnsupportedResourceType` rather
/// than being dispatched dynamically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
    ConfigMap,
    Secret,
    Job,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Pod,
        Self::Deployment,
        Self::Service,
        Self::ConfigMap,
        Self::Secret,
        Self::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pod" => Ok(Self::Pod),
            "deployment" => Ok(Self::Deployment),
            "service" => Ok(Self::Service),
            "configmap" => Ok(Self::ConfigMap),
            "secret" => Ok(Self::Secret),
            "job" => Ok(Self::Job),
            other => Err(QueryError::UnsupportedResourceType(other.to_string())),
        }
    }
}
