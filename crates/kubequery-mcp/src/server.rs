//! JSON-RPC 2.0 server over stdio.
//!
//! Messages are newline-delimited JSON. Tool failures come back as
//! `isError` result envelopes carrying the error kind and message, so a
//! failed call never terminates the session; protocol-level problems
//! (bad JSON, unknown method, malformed params) use JSON-RPC error codes.

use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use kubequery_k8s::{KubeClient, QueryError};

use crate::tools;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "kubequery";

/// Serves the registered tools to a single agent over stdin/stdout.
pub struct McpServer {
    kube: KubeClient,
}

impl McpServer {
    pub fn new(kube: KubeClient) -> Self {
        Self { kube }
    }

    /// Read requests from stdin and write responses to stdout until EOF.
    pub async fn serve_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = io::stdout();
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                break;
            }
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }

            let responses = match serde_json::from_str::<Value>(raw) {
                Ok(incoming) => self.handle_incoming_message(incoming).await,
                Err(e) => vec![error_response(
                    Value::Null,
                    RpcError::parse_error(format!("invalid JSON: {e}")),
                )],
            };

            for response in responses {
                let body = serde_json::to_string(&response)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                stdout.write_all(body.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                return vec![error_response(
                    Value::Null,
                    RpcError::invalid_request("batch request must not be empty"),
                )];
            }
            let mut responses = Vec::new();
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        match self.handle_single_message(incoming).await {
            Some(response) => vec![response],
            None => Vec::new(),
        }
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // likely a client response; this server issues no outbound requests
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            debug!(method, "handling request");
            Some(match self.handle_request(method, params).await {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            // notifications (initialized, cancelled, ...) need no reply
            None
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        if !tools::is_known(name) {
            return Err(RpcError::invalid_params(format!("unknown tool '{name}'")));
        }

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        match tools::dispatch(&self.kube, name, &args).await {
            Ok(result) => Ok(tool_success(&result)),
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                Ok(tool_failure(&err))
            }
        }
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "prompts": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": "Read-only Kubernetes query and diagnostic tools. \
                         Nothing here mutates the cluster."
    })
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tools::tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn tool_success(result: &Value) -> Value {
    let text = match result {
        // YAML retrieval already produces a string; avoid double-encoding
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| "null".to_string()),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false
    })
}

fn tool_failure(err: &QueryError) -> Value {
    let payload = json!({ "error": err.kind(), "message": err.to_string() });
    json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
        }],
        "isError": true
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_payload() {
        let payload = initialize_payload();
        assert_eq!(payload["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(payload["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(payload["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn test_tools_list_payload() {
        let payload = tools_list_payload();
        let listed = payload["tools"].as_array().unwrap();
        assert_eq!(listed.len(), 12);
        for tool in listed {
            assert!(tool["name"].is_string());
            assert!(tool["inputSchema"].is_object());
        }
    }

    #[test]
    fn test_tool_success_wraps_json_results() {
        let envelope = tool_success(&json!([{"name": "default"}]));
        assert_eq!(envelope["isError"], false);
        let text = envelope["content"][0]["text"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed[0]["name"], "default");
    }

    #[test]
    fn test_tool_success_passes_strings_through() {
        let envelope = tool_success(&Value::String("kind: Pod\n".to_string()));
        assert_eq!(envelope["content"][0]["text"], "kind: Pod\n");
    }

    #[test]
    fn test_tool_failure_envelope() {
        let err = QueryError::NotFound("pod 'x' not found".to_string());
        let envelope = tool_failure(&err);
        assert_eq!(envelope["isError"], true);
        let text = envelope["content"][0]["text"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["error"], "NotFoundError");
        assert!(parsed["message"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(RpcError::parse_error("x").code, -32700);
        assert_eq!(RpcError::invalid_request("x").code, -32600);
        assert_eq!(RpcError::method_not_found("x").code, -32601);
        assert_eq!(RpcError::invalid_params("x").code, -32602);
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(json!(7), RpcError::method_not_found("resources/list"));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], -32601);
    }
}
