//! Generation outcomes and the envelope returned to callers

use serde::{Deserialize, Serialize};
use crate::error::{Error, ErrorKind};

pub const UPSTREAM_ERROR_PREFIX: &str = "GPT-5 API error: ";
pub const VALIDATION_ERROR_PREFIX: &str = "Invalid arguments: ";

/// Token accounting reported by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   pub prompt_tokens: u64
  , pub completion_tokens: u64
  , pub total_tokens: u64
}

impl Usage
{   pub fn summary(&self) -> String
    {   format!(
          "{} prompt tokens, {} completion tokens, {} total tokens",
          self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}

/// Outcome of one call
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult
{   Success
    {   content: String
      , usage: Option<Usage>
    }
  , Failure
    {   kind: ErrorKind
      , message: String
    }
}

impl From<Error> for GenerationResult
{   fn from(e: Error) -> Self
    {   GenerationResult::Failure
        {   kind: e.kind()
          , message: e.to_string()
        }
    }
}

/// A block of tool output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock
{   Text { text: String }
}

impl ContentBlock
{   pub fn text(&self) -> &str
    {   match self
        {   ContentBlock::Text { text } => text
        }
    }
}

/// Uniform result returned for every tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope
{   pub content: Vec<ContentBlock>
  , #[serde(rename = "isError")]
    pub is_error: bool
}

impl ResultEnvelope
{   pub fn text(text: String) -> Self
    {   ResultEnvelope
        {   content: vec![ContentBlock::Text { text }]
          , is_error: false
        }
    }

    pub fn error(text: String) -> Self
    {   ResultEnvelope
        {   content: vec![ContentBlock::Text { text }]
          , is_error: true
        }
    }

    /// Concatenated text of all blocks
    pub fn joined_text(&self) -> String
    {   self.content.iter()
          .map(ContentBlock::text)
          .collect::<Vec<_>>()
          .join("\n")
    }
}

/// Shape a generation outcome into the caller-facing envelope
pub fn format(result: GenerationResult) -> ResultEnvelope
{   match result
    {   GenerationResult::Success { content, usage: Some(usage) } => {
          ResultEnvelope::text(format!(
            "{}\n\n**Usage:** {}",
            content,
            usage.summary()
          ))
        }
      , GenerationResult::Success { content, usage: None } => {
          ResultEnvelope::text(content)
        }
      , GenerationResult::Failure { kind, message } => {
          let prefix = match kind
          {   ErrorKind::ValidationError => VALIDATION_ERROR_PREFIX
            , _ => UPSTREAM_ERROR_PREFIX
          };
          ResultEnvelope::error(format!("{}{}", prefix, message))
        }
    }
}
