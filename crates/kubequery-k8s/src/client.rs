//! Kubernetes client for kubequery

use std::fmt::Debug;

use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, Pod, Secret, Service, ServicePort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use kube::{Api, Config};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{QueryError, Result};
use crate::resource::ResourceKind;
use kubequery_types::{
    ContainerInfo, DeploymentInfo, EventInfo, NamespaceInfo, NodeInfo, NodeResources, PodInfo,
    ServiceInfo, ServicePortInfo, format_time,
};

/// Kubernetes client wrapper
///
/// Owns the configured `kube::Client` for the process lifetime. Every query
/// borrows it read-only; nothing is cached between calls.
pub struct KubeClient {
    client: kube::Client,
}

impl KubeClient {
    /// Connect to the cluster.
    ///
    /// Tries the local kubeconfig first, then falls back to the in-cluster
    /// service-account credentials. One attempt per source, no retries.
    pub async fn connect() -> Result<Self> {
        let config = match Config::from_kubeconfig(&KubeConfigOptions::default()).await {
            Ok(config) => {
                debug!("loaded credentials from kubeconfig");
                config
            }
            Err(kubeconfig_err) => match Config::incluster() {
                Ok(config) => {
                    debug!("loaded in-cluster service-account credentials");
                    config
                }
                Err(incluster_err) => {
                    return Err(QueryError::Connection(format!(
                        "kubeconfig: {kubeconfig_err}; in-cluster: {incluster_err}"
                    )));
                }
            },
        };

        let client = kube::Client::try_from(config)
            .map_err(|e| QueryError::Connection(e.to_string()))?;
        info!("kubernetes client configured");
        Ok(Self { client })
    }

    /// Wrap an already-configured client (used by callers that build their
    /// own `kube::Client`).
    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }

    /// List every object of a cluster-wide or all-namespaces collection.
    ///
    /// Returns the full API objects; the diagnostic filters run their
    /// predicates over these client-side.
    pub async fn list_all<K>(&self) -> Result<Vec<K>>
    where
        K: kube::Resource + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    /// Build an API handle scoped to the given namespace, or across all
    /// namespaces when none is given. A named namespace is validated and
    /// checked for existence first.
    async fn scoped<K>(&self, namespace: Option<&str>) -> Result<Api<K>>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(ns) => {
                validate_namespace(ns)?;
                self.ensure_namespace(ns).await?;
                Ok(Api::namespaced(self.client.clone(), ns))
            }
            None => Ok(Api::all(self.client.clone())),
        }
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(namespace).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(QueryError::NotFound(
                format!("namespace '{namespace}' not found"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// List all namespaces in the cluster.
    pub async fn get_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let namespaces: Vec<Namespace> = self.list_all().await?;
        Ok(namespaces.into_iter().map(namespace_to_info).collect())
    }

    /// List pods, optionally restricted to one namespace.
    pub async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = self.scoped(namespace).await?;
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(pod_to_info).collect())
    }

    /// List all nodes and their status.
    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes: Vec<Node> = self.list_all().await?;
        Ok(nodes.into_iter().map(node_to_info).collect())
    }

    /// List deployments, optionally restricted to one namespace.
    pub async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<DeploymentInfo>> {
        let api: Api<Deployment> = self.scoped(namespace).await?;
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(deployment_to_info).collect())
    }

    /// List services, optionally restricted to one namespace.
    pub async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<ServiceInfo>> {
        let api: Api<Service> = self.scoped(namespace).await?;
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(service_to_info).collect())
    }

    /// List events newest-first, optionally restricted to one namespace.
    pub async fn list_events(&self, namespace: Option<&str>) -> Result<Vec<EventInfo>> {
        let api: Api<Event> = self.scoped(namespace).await?;
        let mut events = api.list(&ListParams::default()).await?.items;
        events.sort_by(|a, b| {
            let a_time = a.last_timestamp.as_ref().map(|t| t.0);
            let b_time = b.last_timestamp.as_ref().map(|t| t.0);
            b_time.cmp(&a_time)
        });
        Ok(events.into_iter().map(event_to_info).collect())
    }

    /// Fetch the complete manifest of a single resource as YAML.
    ///
    /// This is the one operation returning the unmodified object rather than
    /// a reduced projection.
    pub async fn get_resource_yaml(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<String> {
        validate_namespace(namespace)?;
        match kind {
            ResourceKind::Pod => self.fetch_yaml::<Pod>(namespace, name).await,
            ResourceKind::Deployment => self.fetch_yaml::<Deployment>(namespace, name).await,
            ResourceKind::Service => self.fetch_yaml::<Service>(namespace, name).await,
            ResourceKind::ConfigMap => self.fetch_yaml::<ConfigMap>(namespace, name).await,
            ResourceKind::Secret => self.fetch_yaml::<Secret>(namespace, name).await,
            ResourceKind::Job => self.fetch_yaml::<Job>(namespace, name).await,
        }
    }

    async fn fetch_yaml<K>(&self, namespace: &str, name: &str) -> Result<String>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let object = api.get(name).await?;
        Ok(serde_yaml::to_string(&object)?)
    }
}

/// Check that a namespace argument is a syntactically valid RFC 1123 label.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let valid = !namespace.is_empty()
        && namespace.len() <= 63
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !namespace.starts_with('-')
        && !namespace.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidArgument(format!(
            "'{namespace}' is not a valid namespace name"
        )))
    }
}

fn namespace_to_info(ns: Namespace) -> NamespaceInfo {
    let creation_time = format_time(ns.metadata.creation_timestamp.as_ref().map(|t| &t.0));
    NamespaceInfo {
        name: ns.metadata.name.unwrap_or_default(),
        status: ns
            .status
            .and_then(|s| s.phase)
            .unwrap_or_else(|| "Unknown".to_string()),
        creation_time,
    }
}

fn pod_to_info(pod: Pod) -> PodInfo {
    let name = pod.metadata.name.unwrap_or_default();
    let namespace = pod.metadata.namespace.unwrap_or_default();
    let creation_time = format_time(pod.metadata.creation_timestamp.as_ref().map(|t| &t.0));

    let status = pod.status.unwrap_or_default();
    let ready_names: Vec<&str> = status
        .container_statuses
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|cs| cs.ready)
        .map(|cs| cs.name.as_str())
        .collect();

    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| ContainerInfo {
                    name: c.name.clone(),
                    image: c.image.clone(),
                    ready: ready_names.contains(&c.name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default();

    PodInfo {
        name,
        namespace,
        phase: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        ip: status.pod_ip,
        node: pod.spec.and_then(|s| s.node_name),
        containers,
        creation_time,
    }
}

fn node_to_info(node: Node) -> NodeInfo {
    let name = node.metadata.name.unwrap_or_default();
    let status = node.status.unwrap_or_default();

    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| (c.type_, c.status))
        .collect();

    let addresses = status
        .addresses
        .unwrap_or_default()
        .into_iter()
        .map(|a| (a.type_, a.address))
        .collect();

    let capacity = node_resources(status.capacity.as_ref());
    let allocatable = node_resources(status.allocatable.as_ref());

    NodeInfo {
        name,
        conditions,
        addresses,
        capacity,
        allocatable,
        kubelet_version: status.node_info.map(|i| i.kubelet_version),
    }
}

fn node_resources(
    quantities: Option<
        &std::collections::BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity>,
    >,
) -> NodeResources {
    let get = |key: &str| quantities.and_then(|m| m.get(key)).map(|q| q.0.clone());
    NodeResources {
        cpu: get("cpu"),
        memory: get("memory"),
        pods: get("pods"),
    }
}

fn deployment_to_info(deploy: Deployment) -> DeploymentInfo {
    let name = deploy.metadata.name.unwrap_or_default();
    let namespace = deploy.metadata.namespace.unwrap_or_default();
    let creation_time = format_time(deploy.metadata.creation_timestamp.as_ref().map(|t| &t.0));

    let (replicas, strategy) = deploy
        .spec
        .map(|spec| {
            (
                spec.replicas.unwrap_or(0),
                spec.strategy.and_then(|s| s.type_),
            )
        })
        .unwrap_or((0, None));

    let (available_replicas, ready_replicas) = deploy
        .status
        .map(|status| {
            (
                status.available_replicas.unwrap_or(0),
                status.ready_replicas.unwrap_or(0),
            )
        })
        .unwrap_or((0, 0));

    DeploymentInfo {
        name,
        namespace,
        replicas,
        available_replicas,
        ready_replicas,
        strategy,
        creation_time,
    }
}

fn service_to_info(service: Service) -> ServiceInfo {
    let name = service.metadata.name.unwrap_or_default();
    let namespace = service.metadata.namespace.unwrap_or_default();
    let creation_time = format_time(service.metadata.creation_timestamp.as_ref().map(|t| &t.0));

    let spec = service.spec.unwrap_or_default();
    let ports = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(service_port_to_info)
        .collect();

    ServiceInfo {
        name,
        namespace,
        service_type: spec.type_,
        cluster_ip: spec.cluster_ip,
        external_ips: spec.external_ips.unwrap_or_default(),
        ports,
        selector: spec.selector.unwrap_or_default().into_iter().collect(),
        creation_time,
    }
}

fn service_port_to_info(port: ServicePort) -> ServicePortInfo {
    let target_port = port.target_port.map(|t| match t {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s,
    });
    ServicePortInfo {
        name: port.name,
        port: port.port,
        target_port,
        protocol: port.protocol,
        node_port: port.node_port,
    }
}

fn event_to_info(event: Event) -> EventInfo {
    let involved = &event.involved_object;
    let object = format!(
        "{}/{}",
        involved.kind.as_deref().unwrap_or("Unknown"),
        involved.name.as_deref().unwrap_or("unknown")
    );

    EventInfo {
        event_type: event.type_,
        reason: event.reason,
        message: event.message,
        object,
        namespace: event.metadata.namespace,
        count: event.count,
        first_time: format_time(event.first_timestamp.as_ref().map(|t| &t.0)),
        last_time: format_time(event.last_timestamp.as_ref().map(|t| &t.0)),
    }
}
