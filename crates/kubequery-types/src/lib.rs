//! Shared types for kubequery
//!
//! This crate contains the reduced, serializable records returned by the
//! query and diagnostic operations. Every record is a read-only projection
//! of live cluster state; nothing here is cached or written back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Timestamp format used across all records.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a cluster timestamp for output, if present.
pub fn format_time(ts: Option<&DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.format(TIME_FORMAT).to_string())
}

// ============================================================================
// Resource Query Records
// ============================================================================

/// Namespace information
#[derive(Clone, Debug, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub status: String,
    pub creation_time: Option<String>,
}

/// A container within a pod listing
#[derive(Clone, Debug, Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: Option<String>,
    pub ready: bool,
}

/// Pod information
#[derive(Clone, Debug, Serialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub ip: Option<String>,
    pub node: Option<String>,
    pub containers: Vec<ContainerInfo>,
    pub creation_time: Option<String>,
}

/// Coarse pod lifecycle phase.
///
/// `Error` is not a phase the API server reports in `status.phase`, but some
/// runtimes surface it through `status.reason`; the failed-pod filter treats
/// both as failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl PodPhase {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// Per-resource quantities reported on a node (cpu / memory / pods).
#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeResources {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub pods: Option<String>,
}

/// Node information
#[derive(Clone, Debug, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub conditions: BTreeMap<String, String>,
    pub addresses: BTreeMap<String, String>,
    pub capacity: NodeResources,
    pub allocatable: NodeResources,
    pub kubelet_version: Option<String>,
}

/// Deployment information
#[derive(Clone, Debug, Serialize)]
pub struct DeploymentInfo {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub available_replicas: i32,
    pub ready_replicas: i32,
    pub strategy: Option<String>,
    pub creation_time: Option<String>,
}

impl DeploymentInfo {
    /// Format replica status as "ready/total"
    pub fn replica_status(&self) -> String {
        format!("{}/{}", self.ready_replicas, self.replicas)
    }
}

/// A single service port
#[derive(Clone, Debug, Serialize)]
pub struct ServicePortInfo {
    pub name: Option<String>,
    pub port: i32,
    pub target_port: Option<String>,
    pub protocol: Option<String>,
    pub node_port: Option<i32>,
}

/// Service information
#[derive(Clone, Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub external_ips: Vec<String>,
    pub ports: Vec<ServicePortInfo>,
    pub selector: BTreeMap<String, String>,
    pub creation_time: Option<String>,
}

/// Event information
#[derive(Clone, Debug, Serialize)]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
    /// Involved object formatted as "Kind/name"
    pub object: String,
    pub namespace: Option<String>,
    pub count: Option<i32>,
    pub first_time: Option<String>,
    pub last_time: Option<String>,
}

// ============================================================================
// Diagnostic Records
// ============================================================================

/// Container state detail for failed-pod reports
#[derive(Clone, Debug, Default, Serialize)]
pub struct ContainerStateInfo {
    pub status: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub exit_code: Option<i32>,
}

/// Per-container status in a failed-pod report
#[derive(Clone, Debug, Serialize)]
pub struct FailedContainerInfo {
    pub name: String,
    pub state: ContainerStateInfo,
    pub restart_count: i32,
}

/// A pod in Failed or Error state
#[derive(Clone, Debug, Serialize)]
pub struct FailedPodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub container_statuses: Vec<FailedContainerInfo>,
    pub node: Option<String>,
    pub message: Option<String>,
    pub reason: Option<String>,
}

/// A pod stuck in Pending, with the scheduling reason when one is reported
#[derive(Clone, Debug, Serialize)]
pub struct PendingPodInfo {
    pub name: String,
    pub namespace: String,
    pub node: Option<String>,
    pub reason: String,
    pub message: Option<String>,
    pub creation_time: Option<String>,
}

/// A container that crossed the restart threshold
#[derive(Clone, Debug, Serialize)]
pub struct RestartingContainerInfo {
    pub name: String,
    pub restart_count: i32,
    pub ready: bool,
    pub image: Option<String>,
}

/// A pod with at least one container above the restart threshold
#[derive(Clone, Debug, Serialize)]
pub struct HighRestartPodInfo {
    pub name: String,
    pub namespace: String,
    pub node: Option<String>,
    pub containers: Vec<RestartingContainerInfo>,
}

/// A resource with no owner references
#[derive(Clone, Debug, Serialize)]
pub struct OrphanInfo {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub creation_time: Option<String>,
}

/// Orphan scan results grouped by resource kind
#[derive(Clone, Debug, Default, Serialize)]
pub struct OrphanedResources {
    pub pods: Vec<OrphanInfo>,
    pub services: Vec<OrphanInfo>,
    pub persistent_volume_claims: Vec<OrphanInfo>,
    pub config_maps: Vec<OrphanInfo>,
    pub secrets: Vec<OrphanInfo>,
}

/// Pod slots used vs available on a node
#[derive(Clone, Debug, Serialize)]
pub struct PodSlotUsage {
    pub used: usize,
    pub capacity: u64,
    pub percent_used: f64,
}

/// CPU requests vs allocatable cores on a node
#[derive(Clone, Debug, Serialize)]
pub struct CpuUsage {
    pub requested: f64,
    pub allocatable: f64,
    pub percent_used: f64,
}

/// Memory requests vs allocatable bytes on a node
#[derive(Clone, Debug, Serialize)]
pub struct MemoryUsage {
    pub requested: u64,
    pub requested_human: String,
    pub allocatable: u64,
    pub allocatable_human: String,
    pub percent_used: f64,
}

/// Capacity report for one node
#[derive(Clone, Debug, Serialize)]
pub struct NodeCapacityInfo {
    pub name: String,
    pub pods: PodSlotUsage,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub conditions: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_time() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            format_time(Some(&ts)).as_deref(),
            Some("2024-03-01 12:30:05")
        );
        assert_eq!(format_time(None), None);
    }

    #[test]
    fn test_pod_phase_from_str() {
        assert_eq!(PodPhase::from("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from("Failed"), PodPhase::Failed);
        assert_eq!(PodPhase::from("Error"), PodPhase::Error);
        assert_eq!(PodPhase::from("Evicted"), PodPhase::Unknown);
    }

    #[test]
    fn test_pod_phase_is_failed() {
        assert!(PodPhase::Failed.is_failed());
        assert!(PodPhase::Error.is_failed());
        assert!(!PodPhase::Pending.is_failed());
        assert!(!PodPhase::Running.is_failed());
        assert!(!PodPhase::Unknown.is_failed());
    }

    #[test]
    fn test_replica_status() {
        let d = DeploymentInfo {
            name: "api".to_string(),
            namespace: "default".to_string(),
            replicas: 3,
            available_replicas: 2,
            ready_replicas: 2,
            strategy: None,
            creation_time: None,
        };
        assert_eq!(d.replica_status(), "2/3");
    }

    #[test]
    fn test_service_type_serializes_as_type() {
        let svc = ServiceInfo {
            name: "web".to_string(),
            namespace: "default".to_string(),
            service_type: Some("ClusterIP".to_string()),
            cluster_ip: None,
            external_ips: Vec::new(),
            ports: Vec::new(),
            selector: BTreeMap::new(),
            creation_time: None,
        };
        let json = serde_json::to_value(&svc).unwrap();
        assert_eq!(json["type"], "ClusterIP");
    }
}
