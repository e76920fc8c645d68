use serde::Serialize;
use serde_json::{json, Value};
use log::{debug, info, warn};
use crate::config::{ApiKey, ServerConfig};
use crate::error::Error;
use crate::providers::{Invoker, OpenAiClient, ResponsesRequest};
use crate::request::{ConversationRequest, PromptRequest};
use crate::response::{format, GenerationResult, ResultEnvelope};

pub const GENERATE_TOOL: &str = "gpt5_generate";
pub const MESSAGES_TOOL: &str = "gpt5_messages";

/// Tool metadata published through `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition
{   pub name: &'static str
  , pub title: &'static str
  , pub description: &'static str
  , #[serde(rename = "inputSchema")]
    pub input_schema: Value
}

/// Binds tool names to validate -> map -> invoke -> format
pub struct Dispatcher<I: Invoker>
{   invoker: I
  , credential: ApiKey
  , default_model: String
}

impl Dispatcher<OpenAiClient>
{   /// Dispatcher talking to the configured OpenAI endpoint
    pub fn from_config(config: &ServerConfig) -> Self
    {   Dispatcher::new(
          OpenAiClient::new(config.base_url.clone()),
          config.api_key.clone(),
          config.default_model.clone()
        )
    }
}

impl<I: Invoker> Dispatcher<I>
{   pub fn new(
      invoker: I
    , credential: ApiKey
    , default_model: impl Into<String>
    ) -> Self
    {   Dispatcher
        {   invoker
          , credential
          , default_model: default_model.into()
        }
    }

    pub fn invoker(&self) -> &I
    {   &self.invoker
    }

    /// Single-prompt generation
    pub async fn generate(&self, args: &Value) -> ResultEnvelope
    {   let request = match PromptRequest::parse(args, &self.default_model)
        {   Ok(r) => r
          , Err(e) => return rejected(GENERATE_TOOL, e)
        };
        info!(
          "GPT-5 Generate: \"{}...\"",
          request.input.chars().take(100).collect::<String>()
        );
        let payload = ResponsesRequest::from_prompt(&request);
        self.run(GENERATE_TOOL, &payload).await
    }

    /// Multi-turn generation
    pub async fn converse(&self, args: &Value) -> ResultEnvelope
    {   let request =
          match ConversationRequest::parse(args, &self.default_model)
        {   Ok(r) => r
          , Err(e) => return rejected(MESSAGES_TOOL, e)
        };
        info!("GPT-5 Messages: {} messages", request.messages.len());
        let payload = ResponsesRequest::from_conversation(&request);
        self.run(MESSAGES_TOOL, &payload).await
    }

    /// Route a `tools/call`; `None` when the tool is unknown
    pub async fn call(&self, name: &str, args: &Value)
      -> Option<ResultEnvelope>
    {   match name
        {   GENERATE_TOOL => Some(self.generate(args).await)
          , MESSAGES_TOOL => Some(self.converse(args).await)
          , _ => {
              warn!("Unknown tool requested: {}", name);
              None
            }
        }
    }

    async fn run(&self, tool: &str, payload: &ResponsesRequest)
      -> ResultEnvelope
    {   let result = self.invoker
          .invoke(&self.credential, payload)
          .await;
        if let GenerationResult::Failure { message, .. } = &result
        {   warn!("ERROR during {} call: {}", tool, message);
        } else
        {   debug!("{} call succeeded", tool);
        }
        format(result)
    }
}

fn rejected(tool: &str, e: Error) -> ResultEnvelope
{   warn!("{} rejected arguments: {}", tool, e);
    format(GenerationResult::from(e))
}

/// JSON schema fragment for the shared tuning fields
fn parameter_properties() -> serde_json::Map<String, Value>
{   let props = json!({
      "model": {
        "type": "string",
        "default": crate::config::DEFAULT_MODEL,
        "description": "GPT-5 model variant to use"
      },
      "instructions": {
        "type": "string",
        "description": "System instructions for the model"
      },
      "reasoning_effort": {
        "type": "string",
        "enum": ["low", "medium", "high"],
        "description": "Reasoning effort level"
      },
      "max_tokens": {
        "type": "integer",
        "minimum": 1,
        "description": "Maximum tokens to generate"
      },
      "temperature": {
        "type": "number",
        "minimum": 0,
        "maximum": 2,
        "description": "Temperature for randomness (0-2)"
      },
      "top_p": {
        "type": "number",
        "minimum": 0,
        "maximum": 1,
        "description": "Top-p sampling parameter"
      }
    });
    match props
    {   Value::Object(map) => map
      , _ => serde_json::Map::new()
    }
}

fn object_schema(
  required: &str
, required_schema: Value
) -> Value
{   let mut properties = serde_json::Map::new();
    properties.insert(required.to_string(), required_schema);
    properties.extend(parameter_properties());
    json!({
      "type": "object",
      "properties": properties,
      "required": [required]
    })
}

/// Definitions of both tools
pub fn tool_definitions() -> Vec<ToolDefinition>
{   vec![
      ToolDefinition
      {   name: GENERATE_TOOL
        , title: "GPT-5 Generate"
        , description: "Generate text using OpenAI GPT-5 API with a simple input prompt"
        , input_schema: object_schema("input", json!({
            "type": "string",
            "minLength": 1,
            "description": "The input text or prompt for GPT-5"
          }))
      }
    , ToolDefinition
      {   name: MESSAGES_TOOL
        , title: "GPT-5 Messages"
        , description: "Generate text using GPT-5 with structured conversation messages"
        , input_schema: object_schema("messages", json!({
            "type": "array",
            "minItems": 1,
            "description": "Array of conversation messages",
            "items": {
              "type": "object",
              "properties": {
                "role": {
                  "type": "string",
                  "enum": ["user", "developer", "assistant"],
                  "description": "Message role"
                },
                "content": {
                  "type": "string",
                  "description": "Message content"
                }
              },
              "required": ["role", "content"]
            }
          }))
      }
    ]
}
