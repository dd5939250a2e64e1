//! Tool registry: names, parameter schemas, and dispatch.

use serde_json::{Map, Value, json};

use kubequery_diagnostics as diagnostics;
use kubequery_k8s::{KubeClient, QueryError, ResourceKind};

/// A named operation exposed to the agent.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn namespace_param() -> Value {
    json!({
        "type": "object",
        "properties": {
            "namespace": {
                "type": "string",
                "description": "Namespace to filter by; omit for all namespaces"
            }
        }
    })
}

/// Every registered tool, in the order reported by `tools/list`.
pub fn tool_definitions() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "get_namespaces",
            description: "List all namespaces in the cluster",
            input_schema: no_params(),
        },
        ToolDef {
            name: "list_pods",
            description: "List pods with their phase, containers and hosting node",
            input_schema: namespace_param(),
        },
        ToolDef {
            name: "list_nodes",
            description: "List all nodes with conditions, addresses and capacity",
            input_schema: no_params(),
        },
        ToolDef {
            name: "list_deployments",
            description: "List deployments with desired and available replica counts",
            input_schema: namespace_param(),
        },
        ToolDef {
            name: "list_services",
            description: "List services with type, cluster IP and ports",
            input_schema: namespace_param(),
        },
        ToolDef {
            name: "list_events",
            description: "List cluster events, newest first",
            input_schema: namespace_param(),
        },
        ToolDef {
            name: "failed_pods",
            description: "List pods in Failed or Error state with container detail",
            input_schema: no_params(),
        },
        ToolDef {
            name: "pending_pods",
            description: "List pods stuck in Pending and why they are pending",
            input_schema: no_params(),
        },
        ToolDef {
            name: "high_restart_pods",
            description: "Find pods with container restart counts above a threshold",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "restart_threshold": {
                        "type": "integer",
                        "description": "Minimum restarts to report (default 5)"
                    }
                }
            }),
        },
        ToolDef {
            name: "node_capacity",
            description: "Report allocatable vs requested capacity per node",
            input_schema: no_params(),
        },
        ToolDef {
            name: "orphaned_resources",
            description: "List resources with no owner references, grouped by kind",
            input_schema: no_params(),
        },
        ToolDef {
            name: "get_resource_yaml",
            description: "Fetch the complete YAML manifest of one resource \
                          (pod, deployment, service, configmap, secret, job)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "namespace": { "type": "string" },
                    "resource_type": {
                        "type": "string",
                        "enum": ["pod", "deployment", "service", "configmap", "secret", "job"]
                    },
                    "resource_name": { "type": "string" }
                },
                "required": ["namespace", "resource_type", "resource_name"]
            }),
        },
    ]
}

pub fn is_known(name: &str) -> bool {
    tool_definitions().iter().any(|tool| tool.name == name)
}

fn optional_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, QueryError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(QueryError::InvalidArgument(format!(
            "'{key}' must be a string"
        ))),
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, QueryError> {
    optional_str(args, key)?
        .ok_or_else(|| QueryError::InvalidArgument(format!("missing required argument '{key}'")))
}

fn optional_int(args: &Map<String, Value>, key: &str) -> Result<Option<i64>, QueryError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            QueryError::InvalidArgument(format!("'{key}' must be an integer"))
        }),
    }
}

/// Run one tool against the cluster and return its serializable result.
pub async fn dispatch(
    kube: &KubeClient,
    name: &str,
    args: &Map<String, Value>,
) -> Result<Value, QueryError> {
    match name {
        "get_namespaces" => Ok(serde_json::to_value(kube.get_namespaces().await?)?),
        "list_pods" => {
            let namespace = optional_str(args, "namespace")?;
            Ok(serde_json::to_value(kube.list_pods(namespace).await?)?)
        }
        "list_nodes" => Ok(serde_json::to_value(kube.list_nodes().await?)?),
        "list_deployments" => {
            let namespace = optional_str(args, "namespace")?;
            Ok(serde_json::to_value(kube.list_deployments(namespace).await?)?)
        }
        "list_services" => {
            let namespace = optional_str(args, "namespace")?;
            Ok(serde_json::to_value(kube.list_services(namespace).await?)?)
        }
        "list_events" => {
            let namespace = optional_str(args, "namespace")?;
            Ok(serde_json::to_value(kube.list_events(namespace).await?)?)
        }
        "failed_pods" => Ok(serde_json::to_value(diagnostics::failed_pods(kube).await?)?),
        "pending_pods" => Ok(serde_json::to_value(
            diagnostics::pending_pods(kube).await?,
        )?),
        "high_restart_pods" => {
            let threshold = optional_int(args, "restart_threshold")?;
            Ok(serde_json::to_value(
                diagnostics::high_restart_pods(kube, threshold).await?,
            )?)
        }
        "node_capacity" => Ok(serde_json::to_value(
            diagnostics::node_capacity(kube).await?,
        )?),
        "orphaned_resources" => Ok(serde_json::to_value(
            diagnostics::orphaned_resources(kube).await?,
        )?),
        "get_resource_yaml" => {
            let namespace = required_str(args, "namespace")?;
            let kind: ResourceKind = required_str(args, "resource_type")?.parse()?;
            let resource_name = required_str(args, "resource_name")?;
            let yaml = kube.get_resource_yaml(namespace, kind, resource_name).await?;
            Ok(Value::String(yaml))
        }
        other => Err(QueryError::InvalidArgument(format!(
            "unknown tool '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tool_has_a_schema() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 12);
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object");
            assert!(tool.input_schema.get("properties").is_some());
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("list_pods"));
        assert!(is_known("get_resource_yaml"));
        assert!(!is_known("delete_pod"));
    }

    #[test]
    fn test_get_resource_yaml_requires_all_params() {
        let schema = tool_definitions()
            .into_iter()
            .find(|t| t.name == "get_resource_yaml")
            .unwrap()
            .input_schema;
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, ["namespace", "resource_type", "resource_name"]);
    }

    #[test]
    fn test_optional_str_rejects_non_strings() {
        let mut args = Map::new();
        args.insert("namespace".to_string(), json!(42));
        assert!(optional_str(&args, "namespace").is_err());

        args.insert("namespace".to_string(), json!("default"));
        assert_eq!(optional_str(&args, "namespace").unwrap(), Some("default"));
        assert_eq!(optional_str(&args, "missing").unwrap(), None);
    }

    #[test]
    fn test_required_str() {
        let args = Map::new();
        let err = required_str(&args, "resource_name").unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_optional_int() {
        let mut args = Map::new();
        args.insert("restart_threshold".to_string(), json!(3));
        assert_eq!(optional_int(&args, "restart_threshold").unwrap(), Some(3));

        args.insert("restart_threshold".to_string(), json!("3"));
        assert!(optional_int(&args, "restart_threshold").is_err());

        args.insert("restart_threshold".to_string(), json!(2.5));
        assert!(optional_int(&args, "restart_threshold").is_err());

        assert_eq!(optional_int(&args, "missing").unwrap(), None);
    }
}
