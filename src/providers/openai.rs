use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error};
use crate::config::ApiKey;
use crate::error::Error;
use crate::request::{ConversationRequest, GenerationParameters, Message, PromptRequest, ReasoningEffort};
use crate::response::{GenerationResult, Usage};

// ===== Request Types =====

/// Prompt payload: plain text or an ordered conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponsesInput
{   Text(String)
  , Messages(Vec<Message>)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reasoning
{   pub effort: ReasoningEffort
}

/// Body of `POST /responses`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsesRequest
{   pub model: String
  , pub input: ResponsesInput
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>
}

impl ResponsesRequest
{   fn with_params(
      input: ResponsesInput
    , params: &GenerationParameters
    ) -> Self
    {   ResponsesRequest
        {   model: params.model.clone()
          , input
          , instructions: params.instructions.clone()
          , reasoning: params.reasoning_effort
              .map(|effort| Reasoning { effort })
          , max_output_tokens: params.max_tokens
          , temperature: params.temperature
          , top_p: params.top_p
        }
    }

    /// Single-turn request
    pub fn from_prompt(request: &PromptRequest) -> Self
    {   Self::with_params(
          ResponsesInput::Text(request.input.clone()),
          &request.params
        )
    }

    /// Multi-turn request; message order and roles are kept as given
    pub fn from_conversation(request: &ConversationRequest) -> Self
    {   Self::with_params(
          ResponsesInput::Messages(request.messages.clone()),
          &request.params
        )
    }
}

// ===== Reply Types =====

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesReply
{   #[serde(default)]
    pub output_text: Option<String>
  , #[serde(default)]
    pub output: Vec<OutputItem>
  , #[serde(default)]
    pub usage: Option<ReplyUsage>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum OutputItem
{   #[serde(rename = "message")]
    Message
    {   #[serde(default)]
        content: Vec<OutputContent>
    }
  , #[serde(other)]
    Other
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum OutputContent
{   #[serde(rename = "output_text")]
    OutputText { text: String }
  , #[serde(other)]
    Other
}

/// Usage counters; accepts both Responses and Chat Completions names
///
/// Every counter is optional so a sparse usage object never costs the
/// generated text.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReplyUsage
{   #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: Option<u64>
  , #[serde(default, alias = "completion_tokens")]
    pub output_tokens: Option<u64>
  , #[serde(default)]
    pub total_tokens: Option<u64>
}

impl ReplyUsage
{   /// Complete counters; a missing total is derived from the parts
    pub fn counters(&self) -> Option<Usage>
    {   let (prompt, completion) = match (self.input_tokens, self.output_tokens)
        {   (Some(p), Some(c)) => (p, c)
          , _ => {
              debug!("Ignoring incomplete usage: {:?}", self);
              return None;
            }
        };
        Some(Usage
        {   prompt_tokens: prompt
          , completion_tokens: completion
          , total_tokens: self.total_tokens
              .unwrap_or_else(|| prompt.saturating_add(completion))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorReply
{   error: ErrorBody
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody
{   message: String
}

impl ResponsesReply
{   /// Generated text, if the reply carries any
    pub fn text(&self) -> Option<String>
    {   if let Some(text) = self.output_text.as_ref()
          .filter(|t| !t.is_empty())
        {   return Some(text.clone());
        }

        let mut parts = Vec::new();
        for item in &self.output
        {   if let OutputItem::Message { content } = item
            {   for c in content
                {   if let OutputContent::OutputText { text } = c
                    {   parts.push(text.as_str());
                    }
                }
            }
        }

        if parts.is_empty()
        {   None
        } else
        {   Some(parts.concat())
        }
    }
}

/// Interpret an upstream status and body
pub fn decode_reply(
  status: reqwest::StatusCode
, body: &str
) -> Result<(String, Option<Usage>), Error>
{   if !status.is_success()
    {   let detail = serde_json::from_str::<ErrorReply>(body)
          .map(|r| r.error.message)
          .unwrap_or_else(|_| {
            if body.trim().is_empty()
            {   "no response body".to_string()
            } else
            {   body.trim().to_string()
            }
          });
        error!("OpenAI API error: {} {}", status, detail);
        return Err(Error::ApiError(format!("{}: {}", status, detail)));
    }

    let reply: ResponsesReply = serde_json::from_str(body)
      .map_err(|e| {
        error!("Parse error: {}", e);
        Error::ParseError(e.to_string())
      })?;

    let text = reply.text().ok_or_else(|| {
      error!("No text output in response");
      Error::ParseError("response contained no text output".to_string())
    })?;

    Ok((text, reply.usage.and_then(|u| u.counters())))
}

// ===== OpenAI Client =====

/// Client for the OpenAI Responses API
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   http_client: reqwest::Client
  , base_url: String
}

impl OpenAiClient
{   pub fn new(base_url: impl Into<String>) -> Self
    {   let base_url = base_url.into();
        debug!("Creating OpenAiClient for {}", base_url);
        OpenAiClient
        {   http_client: reqwest::Client::new()
          , base_url: base_url.trim_end_matches('/').to_string()
        }
    }

    pub fn endpoint(&self) -> String
    {   format!("{}/responses", self.base_url)
    }

    async fn send(
      &self
    , credential: &ApiKey
    , payload: &ResponsesRequest
    ) -> Result<(String, Option<Usage>), Error>
    {   trace!("OpenAI request: {:?}", payload);

        let response = self.http_client
          .post(self.endpoint())
          .bearer_auth(credential.expose())
          .json(payload)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        let body = response.text().await.map_err(|e| {
          error!("Failed to read response body: {}", e);
          Error::HttpError(e.to_string())
        })?;

        decode_reply(status, &body)
    }
}

#[async_trait]
impl crate::providers::Invoker for OpenAiClient
{   async fn invoke(
      &self
    , credential: &ApiKey
    , payload: &ResponsesRequest
    ) -> GenerationResult
    {   debug!("Invoking model: {}", payload.model);
        match self.send(credential, payload).await
        {   Ok((content, usage)) => {
              debug!(
                "Generation finished: {} chars, usage={:?}",
                content.len(), usage
              );
              GenerationResult::Success { content, usage }
            }
          , Err(e) => e.into()
        }
    }
}
