pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod response;
pub mod dispatcher;
pub mod rpc;
pub mod server;

/*

gpt5-server is an MCP (Model Context Protocol) server speaking
JSON-RPC over stdio. It exposes two tools, gpt5_generate and
gpt5_messages, and forwards each call to the OpenAI Responses API.

gpt5-server/
├── Cargo.toml
├── src/
│   ├── main.rs         # Bootstrap: .env, logger, config, serve
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error type and error kinds
│   ├── config.rs       # Credential and defaults from the environment
│   ├── request.rs      # Tool argument validation
│   ├── providers/      # Upstream invokers
│   │   ├── mod.rs      # Invoker trait
│   │   └── openai.rs   # Responses API payloads and client
│   ├── response.rs     # GenerationResult -> ResultEnvelope
│   ├── dispatcher.rs   # Tool name -> validate/map/invoke/format
│   ├── rpc.rs          # JSON-RPC types and MCP methods
│   └── server.rs       # stdio transport loop
└── tests/

*/

pub const SERVER_NAME: &str = "gpt5-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{ApiKey, ServerConfig};
pub use dispatcher::Dispatcher;
pub use error::{Error, ErrorKind};
pub use providers::{Invoker, OpenAiClient};
pub use request::{ConversationRequest, GenerationParameters, Message, PromptRequest, ReasoningEffort, Role};
pub use response::{ContentBlock, GenerationResult, ResultEnvelope, Usage};
