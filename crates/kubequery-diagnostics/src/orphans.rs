//! Owner-reference scan: resources nobody controls.

use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;

use kubequery_k8s::{KubeClient, Result};
use kubequery_types::{OrphanInfo, OrphanedResources, format_time};

/// A resource is orphaned iff its owner-reference list is empty.
pub fn is_orphaned(meta: &ObjectMeta) -> bool {
    meta.owner_references
        .as_ref()
        .is_none_or(|refs| refs.is_empty())
}

/// Control-plane objects are expected to have no owner and are not reported.
fn is_system_object(meta: &ObjectMeta) -> bool {
    let name = meta.name.as_deref().unwrap_or_default();
    let namespace = meta.namespace.as_deref().unwrap_or_default();
    name.starts_with("kube-") || namespace == "kube-system"
}

fn orphan_info(meta: &ObjectMeta, resource_type: Option<String>) -> OrphanInfo {
    OrphanInfo {
        name: meta.name.clone().unwrap_or_default(),
        namespace: meta.namespace.clone().unwrap_or_default(),
        resource_type,
        creation_time: format_time(meta.creation_timestamp.as_ref().map(|t| &t.0)),
    }
}

/// Scan pods, services, PVCs, config maps and secrets for objects with no
/// owner references, grouped by kind. Scans run sequentially; nothing is
/// cached between calls.
pub async fn orphaned_resources(kube: &KubeClient) -> Result<OrphanedResources> {
    let mut results = OrphanedResources::default();

    let pods: Vec<Pod> = kube.list_all().await?;
    for pod in &pods {
        if is_orphaned(&pod.metadata) && !is_system_object(&pod.metadata) {
            results.pods.push(orphan_info(&pod.metadata, None));
        }
    }

    let services: Vec<Service> = kube.list_all().await?;
    for service in &services {
        // the default "kubernetes" service never has an owner
        let is_api_service = service.metadata.name.as_deref() == Some("kubernetes");
        if is_orphaned(&service.metadata) && !is_system_object(&service.metadata) && !is_api_service
        {
            results.services.push(orphan_info(&service.metadata, None));
        }
    }

    let pvcs: Vec<PersistentVolumeClaim> = kube.list_all().await?;
    for pvc in &pvcs {
        if is_orphaned(&pvc.metadata) {
            results
                .persistent_volume_claims
                .push(orphan_info(&pvc.metadata, None));
        }
    }

    let config_maps: Vec<ConfigMap> = kube.list_all().await?;
    for cm in &config_maps {
        if is_orphaned(&cm.metadata) && !is_system_object(&cm.metadata) {
            results.config_maps.push(orphan_info(&cm.metadata, None));
        }
    }

    let secrets: Vec<Secret> = kube.list_all().await?;
    for secret in &secrets {
        let managed_type = secret
            .type_
            .as_deref()
            .is_some_and(|t| t.starts_with("kubernetes.io/"));
        if is_orphaned(&secret.metadata) && !is_system_object(&secret.metadata) && !managed_type {
            results
                .secrets
                .push(orphan_info(&secret.metadata, secret.type_.clone()));
        }
    }

    debug!(
        pods = results.pods.len(),
        services = results.services.len(),
        pvcs = results.persistent_volume_claims.len(),
        config_maps = results.config_maps.len(),
        secrets = results.secrets.len(),
        "orphan scan complete"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn meta(name: &str, namespace: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    fn owned_meta(name: &str, namespace: &str) -> ObjectMeta {
        ObjectMeta {
            owner_references: Some(vec![OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "ReplicaSet".to_string(),
                name: "web-abc123".to_string(),
                uid: "uid".to_string(),
                ..Default::default()
            }]),
            ..meta(name, namespace)
        }
    }

    #[test]
    fn test_is_orphaned_iff_no_owner_references() {
        assert!(is_orphaned(&meta("standalone", "default")));
        assert!(!is_orphaned(&owned_meta("web-abc123-x", "default")));

        // an explicit empty list also counts as orphaned
        let mut empty = meta("empty", "default");
        empty.owner_references = Some(Vec::new());
        assert!(is_orphaned(&empty));
    }

    #[test]
    fn test_system_objects_are_excluded() {
        assert!(is_system_object(&meta("kube-proxy-x", "default")));
        assert!(is_system_object(&meta("coredns", "kube-system")));
        assert!(!is_system_object(&meta("app", "default")));
    }

    #[test]
    fn test_orphan_info_projection() {
        let info = orphan_info(&meta("cfg", "staging"), Some("Opaque".to_string()));
        assert_eq!(info.name, "cfg");
        assert_eq!(info.namespace, "staging");
        assert_eq!(info.resource_type.as_deref(), Some("Opaque"));
    }
}
