//! Error types for kubequery

use thiserror::Error;

/// Structured failure surfaced to the caller of every query operation.
///
/// Nothing here is retried or suppressed; a failed call never takes the
/// process down with it.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No usable credentials at startup, or the initial client could not be
    /// built from them.
    #[error("failed to connect to cluster: {0}")]
    Connection(String),

    /// The API server could not be reached during a call.
    #[error("cluster unavailable: {0}")]
    ClusterUnavailable(String),

    /// RBAC denied the call.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A specifically named namespace or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed caller input (namespace name, restart threshold, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// YAML retrieval was asked for a resource kind we do not map.
    #[error("unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// Stable machine-readable kind, used in tool error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "ConnectionError",
            Self::ClusterUnavailable(_) => "ClusterUnavailableError",
            Self::Forbidden(_) => "ForbiddenError",
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidArgument(_) => "InvalidArgumentError",
            Self::UnsupportedResourceType(_) => "UnsupportedResourceTypeError",
            Self::Serialization(_) => "SerializationError",
        }
    }
}

impl From<kube::Error> for QueryError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 403 => Self::Forbidden(resp.message),
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(resp.message),
            other => Self::ClusterUnavailable(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for QueryError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for kubequery
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn test_forbidden_mapping() {
        let err = QueryError::from(api_error(403, "pods is forbidden"));
        assert!(matches!(err, QueryError::Forbidden(_)));
        assert_eq!(err.kind(), "ForbiddenError");
    }

    #[test]
    fn test_not_found_mapping() {
        let err = QueryError::from(api_error(404, "pods \"x\" not found"));
        assert!(matches!(err, QueryError::NotFound(_)));
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[test]
    fn test_other_api_errors_map_to_unavailable() {
        let err = QueryError::from(api_error(500, "etcd timeout"));
        assert!(matches!(err, QueryError::ClusterUnavailable(_)));
        assert_eq!(err.kind(), "ClusterUnavailableError");
    }
}
