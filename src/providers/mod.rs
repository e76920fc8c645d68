//! Upstream text-generation providers

use async_trait::async_trait;
use crate::config::ApiKey;
use crate::response::GenerationResult;

pub mod openai;

// Re-export for convenience
pub use openai::{OpenAiClient, ResponsesRequest};

/// Performs one upstream generation call
///
/// Implementations never fail outright: every transport or protocol
/// problem is folded into `GenerationResult::Failure`.
#[async_trait]
pub trait Invoker: Send + Sync
{   async fn invoke(
      &self
    , credential: &ApiKey
    , payload: &ResponsesRequest
    ) -> GenerationResult;
}
