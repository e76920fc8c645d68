//! JSON-RPC 2.0 framing and MCP method routing

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use log::{debug, trace, warn};
use crate::dispatcher::{tool_definitions, Dispatcher};
use crate::providers::Invoker;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revisions this server speaks, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
  &["2025-06-18", "2025-03-26", "2024-11-05"];

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Incoming request or notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest
{   pub jsonrpc: String
  , /// Absent for notifications; `handle_line` keeps an explicit null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>
  , pub method: String
  , #[serde(default)]
    pub params: Value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError
{   pub code: i32
  , pub message: String
}

/// Outgoing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse
{   pub jsonrpc: String
  , pub id: Value
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>
}

impl JsonRpcResponse
{   pub fn success(id: Value, result: Value) -> Self
    {   JsonRpcResponse
        {   jsonrpc: JSONRPC_VERSION.to_string()
          , id
          , result: Some(result)
          , error: None
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self
    {   JsonRpcResponse
        {   jsonrpc: JSONRPC_VERSION.to_string()
          , id
          , result: None
          , error: Some(JsonRpcError
            {   code
              , message: message.into()
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CallToolParams
{   name: Option<String>
  , #[serde(default)]
    arguments: Option<Value>
}

/// Identity reported during `initialize`
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo
{   pub name: &'static str
  , pub version: &'static str
}

pub const SERVER_INFO: ServerInfo = ServerInfo
{   name: crate::SERVER_NAME
  , version: crate::SERVER_VERSION
};

/// Pick the protocol revision to answer `initialize` with
pub fn negotiate_version(requested: Option<&str>) -> &'static str
{   requested
      .and_then(|r| {
        SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|v| *v == r)
      })
      .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

/// Handle one framed line; `None` when no reply is due
pub async fn handle_line<I: Invoker>(
  dispatcher: &Dispatcher<I>
, line: &str
) -> Option<JsonRpcResponse>
{   trace!("<- {}", line);
    let value: Value = match serde_json::from_str(line)
    {   Ok(v) => v
      , Err(e) => {
          warn!("Unparseable message: {}", e);
          return Some(JsonRpcResponse::error(
            Value::Null,
            PARSE_ERROR,
            format!("Parse error: {}", e)
          ));
        }
    };

    let is_reply = value.get("method").is_none()
      && (value.get("result").is_some() || value.get("error").is_some());
    if is_reply
    {   debug!("Ignoring client response message");
        return None;
    }

    // serde folds `"id": null` into `None`; only an absent id is a notification
    let raw_id = value.get("id").cloned();
    let id = raw_id.clone().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value)
    {   Ok(mut request) if request.jsonrpc == JSONRPC_VERSION => {
          request.id = raw_id;
          handle_request(dispatcher, request).await
        }
      , Ok(request) => Some(JsonRpcResponse::error(
          id,
          INVALID_REQUEST,
          format!("Unsupported jsonrpc version: {}", request.jsonrpc)
        ))
      , Err(e) => Some(JsonRpcResponse::error(
          id,
          INVALID_REQUEST,
          format!("Invalid request: {}", e)
        ))
    }
}

/// Route a decoded request to its MCP method
pub async fn handle_request<I: Invoker>(
  dispatcher: &Dispatcher<I>
, request: JsonRpcRequest
) -> Option<JsonRpcResponse>
{   let id = match request.id
    {   Some(id) => id
      , None => {
          debug!("Notification: {}", request.method);
          return None;
        }
    };
    debug!("Request {}: {}", id, request.method);

    let response = match request.method.as_str()
    {   "initialize" => {
          let requested = request.params
            .get("protocolVersion")
            .and_then(Value::as_str);
          JsonRpcResponse::success(id, json!({
            "protocolVersion": negotiate_version(requested),
            "capabilities": { "tools": {} },
            "serverInfo": SERVER_INFO
          }))
        }
      , "ping" => JsonRpcResponse::success(id, json!({}))
      , "tools/list" => {
          JsonRpcResponse::success(id, json!({
            "tools": tool_definitions()
          }))
        }
      , "tools/call" => call_tool(dispatcher, id, request.params).await
      , other => JsonRpcResponse::error(
          id,
          METHOD_NOT_FOUND,
          format!("Method not found: {}", other)
        )
    };
    Some(response)
}

async fn call_tool<I: Invoker>(
  dispatcher: &Dispatcher<I>
, id: Value
, params: Value
) -> JsonRpcResponse
{   let params: CallToolParams = match serde_json::from_value(params)
    {   Ok(p) => p
      , Err(e) => {
          return JsonRpcResponse::error(
            id,
            INVALID_PARAMS,
            format!("Invalid tools/call params: {}", e)
          );
        }
    };
    let name = match params.name
    {   Some(name) => name
      , None => {
          return JsonRpcResponse::error(
            id, INVALID_PARAMS, "Missing tool name"
          );
        }
    };
    let arguments = params.arguments.unwrap_or_else(|| json!({}));

    match dispatcher.call(&name, &arguments).await
    {   Some(envelope) => match serde_json::to_value(&envelope)
        {   Ok(result) => JsonRpcResponse::success(id, result)
          , Err(e) => JsonRpcResponse::error(
              id,
              INTERNAL_ERROR,
              format!("Failed to encode result: {}", e)
            )
        }
      , None => JsonRpcResponse::error(
          id,
          INVALID_PARAMS,
          format!("Unknown tool: {}", name)
        )
    }
}
