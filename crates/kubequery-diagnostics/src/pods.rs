//! Pod health filters: failed, pending, and high-restart pods.

use k8s_openapi::api::core::v1::{ContainerState, Pod};
use tracing::debug;

use kubequery_k8s::{KubeClient, QueryError, Result};
use kubequery_types::{
    ContainerStateInfo, FailedContainerInfo, FailedPodInfo, HighRestartPodInfo, PendingPodInfo,
    PodPhase, RestartingContainerInfo, format_time,
};

/// Threshold used by `high_restart_pods` when the caller does not supply one.
pub const DEFAULT_RESTART_THRESHOLD: i64 = 5;

fn phase(pod: &Pod) -> PodPhase {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::from)
        .unwrap_or(PodPhase::Unknown)
}

/// A pod is failed iff its phase is Failed or Error.
pub fn is_failed(pod: &Pod) -> bool {
    phase(pod).is_failed()
}

/// Highest restart count across the pod's containers.
pub fn max_restart_count(pod: &Pod) -> i32 {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| statuses.iter().map(|cs| cs.restart_count).max().unwrap_or(0))
        .unwrap_or(0)
}

/// Reject negative restart thresholds.
pub fn validate_threshold(threshold: i64) -> Result<()> {
    if threshold < 0 {
        return Err(QueryError::InvalidArgument(format!(
            "restart threshold must be a non-negative integer, got {threshold}"
        )));
    }
    Ok(())
}

/// List all pods in Failed or Error state across all namespaces, with
/// per-container state detail for troubleshooting.
pub async fn failed_pods(kube: &KubeClient) -> Result<Vec<FailedPodInfo>> {
    let pods: Vec<Pod> = kube.list_all().await?;
    debug!(total = pods.len(), "scanning pods for failures");

    Ok(pods
        .into_iter()
        .filter(is_failed)
        .map(failed_pod_info)
        .collect())
}

fn failed_pod_info(pod: Pod) -> FailedPodInfo {
    let status = pod.status.unwrap_or_default();
    let container_statuses = status
        .container_statuses
        .unwrap_or_default()
        .into_iter()
        .map(|cs| FailedContainerInfo {
            name: cs.name,
            state: container_state_info(cs.state.as_ref()),
            restart_count: cs.restart_count,
        })
        .collect();

    FailedPodInfo {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
        phase: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        container_statuses,
        node: pod.spec.and_then(|s| s.node_name),
        message: status.message,
        reason: status.reason,
    }
}

fn container_state_info(state: Option<&ContainerState>) -> ContainerStateInfo {
    let Some(state) = state else {
        return ContainerStateInfo::default();
    };
    if let Some(waiting) = &state.waiting {
        ContainerStateInfo {
            status: Some("waiting".to_string()),
            reason: waiting.reason.clone(),
            message: waiting.message.clone(),
            exit_code: None,
        }
    } else if let Some(terminated) = &state.terminated {
        ContainerStateInfo {
            status: Some("terminated".to_string()),
            reason: terminated.reason.clone(),
            message: terminated.message.clone(),
            exit_code: Some(terminated.exit_code),
        }
    } else if state.running.is_some() {
        ContainerStateInfo {
            status: Some("running".to_string()),
            ..Default::default()
        }
    } else {
        ContainerStateInfo::default()
    }
}

/// List all pods stuck in Pending, with the scheduling condition reason when
/// the API server reports one.
pub async fn pending_pods(kube: &KubeClient) -> Result<Vec<PendingPodInfo>> {
    let pods: Vec<Pod> = kube.list_all().await?;

    Ok(pods
        .into_iter()
        .filter(|pod| phase(pod) == PodPhase::Pending)
        .map(pending_pod_info)
        .collect())
}

fn pending_pod_info(pod: Pod) -> PendingPodInfo {
    let creation_time = format_time(pod.metadata.creation_timestamp.as_ref().map(|t| &t.0));
    let (reason, message) = pending_reason(&pod);

    PendingPodInfo {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
        node: pod.spec.and_then(|s| s.node_name),
        reason,
        message,
        creation_time,
    }
}

/// Why a pod is pending, taken from the first false condition (the scheduler
/// reports unschedulable pods via a false PodScheduled condition).
fn pending_reason(pod: &Pod) -> (String, Option<String>) {
    let conditions = pod
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();

    conditions
        .iter()
        .find(|c| c.status == "False" && c.reason.is_some())
        .map(|c| {
            (
                c.reason.clone().unwrap_or_else(|| "Unknown".to_string()),
                c.message.clone(),
            )
        })
        .unwrap_or_else(|| ("Unknown".to_string(), None))
}

/// Find pods where any container's restart count exceeds the threshold.
pub async fn high_restart_pods(
    kube: &KubeClient,
    threshold: Option<i64>,
) -> Result<Vec<HighRestartPodInfo>> {
    let threshold = threshold.unwrap_or(DEFAULT_RESTART_THRESHOLD);
    validate_threshold(threshold)?;

    let pods: Vec<Pod> = kube.list_all().await?;

    Ok(pods
        .into_iter()
        .filter_map(|pod| high_restart_pod_info(pod, threshold))
        .collect())
}

fn high_restart_pod_info(pod: Pod, threshold: i64) -> Option<HighRestartPodInfo> {
    let status = pod.status.as_ref()?;
    let containers: Vec<RestartingContainerInfo> = status
        .container_statuses
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|cs| i64::from(cs.restart_count) > threshold)
        .map(|cs| RestartingContainerInfo {
            name: cs.name.clone(),
            restart_count: cs.restart_count,
            ready: cs.ready,
            image: Some(cs.image.clone()),
        })
        .collect();

    if containers.is_empty() {
        return None;
    }

    Some(HighRestartPodInfo {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        node: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        containers,
    })
}
