//! Node capacity report: allocatable resources vs summed pod requests.

use std::collections::HashMap;

use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use kubequery_k8s::{KubeClient, Result};
use kubequery_types::{CpuUsage, MemoryUsage, NodeCapacityInfo, PodSlotUsage};

/// Parse a CPU quantity into cores ("100m" -> 0.1, "2" -> 2.0).
pub fn parse_cpu(value: &str) -> f64 {
    if let Some(milli) = value.strip_suffix('m') {
        milli.parse::<f64>().map(|v| v / 1000.0).unwrap_or(0.0)
    } else {
        value.parse().unwrap_or(0.0)
    }
}

/// Parse a memory quantity into bytes ("512Mi" -> 536870912).
pub fn parse_memory(value: &str) -> u64 {
    if let Some(kib) = value.strip_suffix("Ki") {
        kib.parse::<u64>().unwrap_or(0) * 1024
    } else if let Some(mib) = value.strip_suffix("Mi") {
        mib.parse::<u64>().unwrap_or(0) * 1024 * 1024
    } else if let Some(gib) = value.strip_suffix("Gi") {
        gib.parse::<u64>().unwrap_or(0) * 1024 * 1024 * 1024
    } else {
        value.parse().unwrap_or(0)
    }
}

/// Format bytes as a human-readable string ("2.5 MiB").
pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", round2(value), UNITS[unit])
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent_used(used: f64, total: f64) -> f64 {
    if total > 0.0 {
        round2(used / total * 100.0)
    } else {
        0.0
    }
}

/// Report allocatable capacity vs currently requested resources for every
/// node. Pure aggregation, no predicate: one node listing, one pod listing,
/// requests summed client-side.
pub async fn node_capacity(kube: &KubeClient) -> Result<Vec<NodeCapacityInfo>> {
    let nodes: Vec<Node> = kube.list_all().await?;
    let pods: Vec<Pod> = kube.list_all().await?;

    let mut pods_by_node: HashMap<&str, Vec<&Pod>> = HashMap::new();
    for pod in &pods {
        if let Some(node_name) = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) {
            pods_by_node.entry(node_name).or_default().push(pod);
        }
    }

    Ok(nodes
        .iter()
        .map(|node| {
            let name = node.metadata.name.as_deref().unwrap_or_default();
            let node_pods = pods_by_node.get(name).map(Vec::as_slice).unwrap_or(&[]);
            capacity_for_node(node, node_pods)
        })
        .collect())
}

fn capacity_for_node(node: &Node, pods: &[&Pod]) -> NodeCapacityInfo {
    let status = node.status.clone().unwrap_or_default();
    let allocatable = status.allocatable.unwrap_or_default();

    let quantity = |key: &str| allocatable.get(key).map(|q| q.0.as_str()).unwrap_or("0");
    let max_pods = quantity("pods").parse::<u64>().unwrap_or(0);
    let cpu_allocatable = parse_cpu(quantity("cpu"));
    let memory_allocatable = parse_memory(quantity("memory"));

    let (cpu_requested, memory_requested) = sum_requests(pods);

    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| (c.type_, c.status))
        .collect();

    NodeCapacityInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        pods: PodSlotUsage {
            used: pods.len(),
            capacity: max_pods,
            percent_used: percent_used(pods.len() as f64, max_pods as f64),
        },
        cpu: CpuUsage {
            requested: round2(cpu_requested),
            allocatable: round2(cpu_allocatable),
            percent_used: percent_used(cpu_requested, cpu_allocatable),
        },
        memory: MemoryUsage {
            requested: memory_requested,
            requested_human: format_bytes(memory_requested),
            allocatable: memory_allocatable,
            allocatable_human: format_bytes(memory_allocatable),
            percent_used: percent_used(memory_requested as f64, memory_allocatable as f64),
        },
        conditions,
    }
}

/// Sum container CPU and memory requests across the given pods.
fn sum_requests(pods: &[&Pod]) -> (f64, u64) {
    let mut cpu = 0.0;
    let mut memory = 0u64;

    for pod in pods {
        let Some(spec) = &pod.spec else { continue };
        for container in &spec.containers {
            let Some(requests) = container
                .resources
                .as_ref()
                .and_then(|r| r.requests.as_ref())
            else {
                continue;
            };
            if let Some(Quantity(q)) = requests.get("cpu") {
                cpu += parse_cpu(q);
            }
            if let Some(Quantity(q)) = requests.get("memory") {
                memory += parse_memory(q);
            }
        }
    }

    (cpu, memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, NodeStatus, PodSpec, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn node_with_allocatable(name: &str, cpu: &str, memory: &str, pods: &str) -> Node {
        let mut allocatable = BTreeMap::new();
        allocatable.insert("cpu".to_string(), Quantity(cpu.to_string()));
        allocatable.insert("memory".to_string(), Quantity(memory.to_string()));
        allocatable.insert("pods".to_string(), Quantity(pods.to_string()));
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                allocatable: Some(allocatable),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod_requesting(cpu: &str, memory: &str) -> Pod {
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), Quantity(cpu.to_string()));
        requests.insert("memory".to_string(), Quantity(memory.to_string()));
        Pod {
            metadata: ObjectMeta::default(),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(requests),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: None,
        }
    }

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu("100m"), 0.1);
        assert_eq!(parse_cpu("1500m"), 1.5);
        assert_eq!(parse_cpu("2"), 2.0);
        assert_eq!(parse_cpu("0.5"), 0.5);
        assert_eq!(parse_cpu("garbage"), 0.0);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory("1024"), 1024);
        assert_eq!(parse_memory("4Ki"), 4096);
        assert_eq!(parse_memory("512Mi"), 512 * 1024 * 1024);
        assert_eq!(parse_memory("2Gi"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory("garbage"), 0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 / 2), "2.5 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GiB");
    }

    #[test]
    fn test_percent_used_guards_zero_total() {
        assert_eq!(percent_used(1.0, 0.0), 0.0);
        assert_eq!(percent_used(1.0, 4.0), 25.0);
    }

    #[test]
    fn test_capacity_for_node() {
        let node = node_with_allocatable("node-a", "4", "8Gi", "110");
        let p1 = pod_requesting("500m", "1Gi");
        let p2 = pod_requesting("1", "512Mi");
        let pods = [&p1, &p2];

        let report = capacity_for_node(&node, &pods);
        assert_eq!(report.name, "node-a");
        assert_eq!(report.pods.used, 2);
        assert_eq!(report.pods.capacity, 110);
        assert_eq!(report.cpu.requested, 1.5);
        assert_eq!(report.cpu.allocatable, 4.0);
        assert_eq!(report.cpu.percent_used, 37.5);
        assert_eq!(report.memory.requested, 3 * 512 * 1024 * 1024);
        assert_eq!(report.memory.allocatable_human, "8 GiB");
    }

    #[test]
    fn test_requested_never_exceeds_allocatable_for_schedulable_load() {
        // a pod set the scheduler would actually place on this node
        let node = node_with_allocatable("node-a", "2", "4Gi", "10");
        let p1 = pod_requesting("500m", "1Gi");
        let p2 = pod_requesting("1", "2Gi");
        let report = capacity_for_node(&node, &[&p1, &p2]);

        assert!(report.cpu.requested <= report.cpu.allocatable);
        assert!(report.memory.requested <= report.memory.allocatable);
        assert!(report.pods.used as u64 <= report.pods.capacity);
    }

    #[test]
    fn test_capacity_with_no_pods() {
        let node = node_with_allocatable("empty", "4", "8Gi", "110");
        let report = capacity_for_node(&node, &[]);
        assert_eq!(report.pods.used, 0);
        assert_eq!(report.cpu.requested, 0.0);
        assert_eq!(report.memory.percent_used, 0.0);
    }
}
