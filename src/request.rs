//! Tool argument types and validation

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use log::trace;
use crate::error::Error;

const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);

/// Reasoning depth hint forwarded to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort
{   Low
  , Medium
  , High
}

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   User
  , Developer
  , Assistant
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

/// Normalized generation settings shared by both tools
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters
{   /// Model identifier
    pub model: String
  , /// System-level guidance
    pub instructions: Option<String>
  , /// Reasoning effort hint
    pub reasoning_effort: Option<ReasoningEffort>
  , /// Upper bound on generated tokens, always > 0
    pub max_tokens: Option<u64>
  , /// Sampling temperature in [0, 2]
    pub temperature: Option<f64>
  , /// Nucleus sampling mass in [0, 1]
    pub top_p: Option<f64>
}

impl GenerationParameters
{   /// Parameters with every optional field absent
    pub fn with_model(model: impl Into<String>) -> Self
    {   GenerationParameters
        {   model: model.into()
          , instructions: None
          , reasoning_effort: None
          , max_tokens: None
          , temperature: None
          , top_p: None
        }
    }

    /// Extract and validate the shared fields of `args`
    pub fn from_args(
      args: &Map<String, Value>
    , default_model: &str
    ) -> Result<Self, Error>
    {   let model = optional_field::<String>(args, "model")?
          .unwrap_or_else(|| default_model.to_string());
        if model.is_empty()
        {   return Err(Error::validation("model", "must not be empty"));
        }

        let max_tokens = optional_field::<u64>(args, "max_tokens")?;
        if max_tokens == Some(0)
        {   return Err(Error::validation(
              "max_tokens",
              "must be a positive integer"
            ));
        }

        let temperature = optional_field::<f64>(args, "temperature")?;
        check_range("temperature", temperature, TEMPERATURE_RANGE)?;

        let top_p = optional_field::<f64>(args, "top_p")?;
        check_range("top_p", top_p, TOP_P_RANGE)?;

        Ok(GenerationParameters
        {   model
          , instructions: optional_field(args, "instructions")?
          , reasoning_effort: optional_field(args, "reasoning_effort")?
          , max_tokens
          , temperature
          , top_p
        })
    }
}

/// Arguments of the single-prompt tool
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest
{   pub input: String
  , pub params: GenerationParameters
}

impl PromptRequest
{   pub fn parse(args: &Value, default_model: &str)
      -> Result<Self, Error>
    {   let args = as_object(args)?;
        let input = required_field::<String>(args, "input")?;
        if input.is_empty()
        {   return Err(Error::validation("input", "must not be empty"));
        }
        let params = GenerationParameters::from_args(args, default_model)?;
        trace!("Parsed prompt request: {} chars", input.len());
        Ok(PromptRequest { input, params })
    }
}

/// Arguments of the multi-turn tool
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRequest
{   pub messages: Vec<Message>
  , pub params: GenerationParameters
}

impl ConversationRequest
{   pub fn parse(args: &Value, default_model: &str)
      -> Result<Self, Error>
    {   let args = as_object(args)?;
        let raw = match args.get("messages")
        {   Some(Value::Array(items)) => items
          , Some(Value::Null) | None => {
              return Err(Error::validation("messages", "is required"));
            }
          , Some(other) => {
              return Err(Error::validation(
                "messages",
                format!("expected an array, got {}", type_name(other))
              ));
            }
        };
        if raw.is_empty()
        {   return Err(Error::validation(
              "messages",
              "must contain at least one message"
            ));
        }

        let messages = raw.iter()
          .enumerate()
          .map(|(i, item)| {
            serde_json::from_value::<Message>(item.clone())
              .map_err(|e| Error::validation(
                format!("messages[{}]", i),
                e.to_string()
              ))
          })
          .collect::<Result<Vec<_>, _>>()?;

        let params = GenerationParameters::from_args(args, default_model)?;
        trace!("Parsed conversation request: {} messages", messages.len());
        Ok(ConversationRequest { messages, params })
    }
}

fn as_object(args: &Value) -> Result<&Map<String, Value>, Error>
{   args.as_object().ok_or_else(|| {
      Error::validation(
        "arguments",
        format!("expected an object, got {}", type_name(args))
      )
    })
}

/// Deserialize one field; `null` and absence both yield `None`
fn optional_field<T: DeserializeOwned>(
  args: &Map<String, Value>
, name: &str
) -> Result<Option<T>, Error>
{   match args.get(name)
    {   None | Some(Value::Null) => Ok(None)
      , Some(value) => serde_json::from_value(value.clone())
          .map(Some)
          .map_err(|e| Error::validation(name, e.to_string()))
    }
}

fn required_field<T: DeserializeOwned>(
  args: &Map<String, Value>
, name: &str
) -> Result<T, Error>
{   optional_field(args, name)?
      .ok_or_else(|| Error::validation(name, "is required"))
}

fn check_range(
  name: &str
, value: Option<f64>
, (min, max): (f64, f64)
) -> Result<(), Error>
{   match value
    {   Some(v) if !(min..=max).contains(&v) => {
          Err(Error::validation(
            name,
            format!("must be between {} and {}, got {}", min, max, v)
          ))
        }
      , _ => Ok(())
    }
}

fn type_name(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "boolean"
      , Value::Number(_) => "number"
      , Value::String(_) => "string"
      , Value::Array(_) => "array"
      , Value::Object(_) => "object"
    }
}
