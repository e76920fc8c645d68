use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use gpt5_server::config::{ApiKey, ServerConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use gpt5_server::providers::openai::{decode_reply, ResponsesInput};
use gpt5_server::providers::{Invoker, OpenAiClient, ResponsesRequest};
use gpt5_server::request::{ConversationRequest, PromptRequest, ReasoningEffort, Role};
use gpt5_server::response::{format, GenerationResult, Usage};
use gpt5_server::{Dispatcher, Error, ErrorKind};

/// Invoker stub that counts calls and replays a fixed result
struct StubInvoker
{   result: GenerationResult
  , calls: AtomicUsize
  , payloads: Mutex<Vec<ResponsesRequest>>
}

impl StubInvoker
{   fn new(result: GenerationResult) -> Self
    {   StubInvoker
        {   result
          , calls: AtomicUsize::new(0)
          , payloads: Mutex::new(vec![])
        }
    }

    fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    fn last_payload(&self) -> ResponsesRequest
    {   self.payloads.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Invoker for StubInvoker
{   async fn invoke(
      &self
    , credential: &ApiKey
    , payload: &ResponsesRequest
    ) -> GenerationResult
    {   assert_eq!(credential.expose(), "test-key");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        self.result.clone()
    }
}

/// Invoker that echoes its request back after a model-dependent delay
struct EchoInvoker;

#[async_trait]
impl Invoker for EchoInvoker
{   async fn invoke(
      &self
    , _credential: &ApiKey
    , payload: &ResponsesRequest
    ) -> GenerationResult
    {   let delay = if payload.model == "slow" { 50 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let input = match &payload.input
        {   ResponsesInput::Text(text) => text.clone()
          , ResponsesInput::Messages(m) => format!("{} messages", m.len())
        };
        GenerationResult::Success
        {   content: format!(
              "{}|{}|{:?}",
              payload.model, input, payload.temperature
            )
          , usage: None
        }
    }
}

fn ok_stub() -> StubInvoker
{   StubInvoker::new(GenerationResult::Success
    {   content: "hi".to_string()
      , usage: Some(Usage
        {   prompt_tokens: 5
          , completion_tokens: 3
          , total_tokens: 8
        })
    })
}

fn dispatcher<I: Invoker>(invoker: I) -> Dispatcher<I>
{   Dispatcher::new(invoker, ApiKey::new("test-key"), DEFAULT_MODEL)
}

// ===== Parameter Schema =====

#[test]
fn test_prompt_optional_fields_pass_through()
{   let request = assert_ok!(PromptRequest::parse(
      &json!({
        "input": "Explain borrowing",
        "model": "gpt-5-mini",
        "instructions": "Be brief",
        "reasoning_effort": "high",
        "max_tokens": 256,
        "temperature": 0.2,
        "top_p": 1
      }),
      DEFAULT_MODEL
    ));
    assert_eq!(request.input, "Explain borrowing");
    assert_eq!(request.params.model, "gpt-5-mini");
    assert_eq!(request.params.instructions.as_deref(), Some("Be brief"));
    assert_eq!(request.params.reasoning_effort, Some(ReasoningEffort::High));
    assert_eq!(request.params.max_tokens, Some(256));
    assert_eq!(request.params.temperature, Some(0.2));
    assert_eq!(request.params.top_p, Some(1.0));
}

#[test]
fn test_prompt_defaults_when_absent()
{   let request = assert_ok!(PromptRequest::parse(
      &json!({ "input": "hello", "instructions": null }),
      DEFAULT_MODEL
    ));
    assert_eq!(request.params.model, "gpt-5");
    assert!(request.params.instructions.is_none());
    assert!(request.params.reasoning_effort.is_none());
    assert!(request.params.max_tokens.is_none());
    assert!(request.params.temperature.is_none());
    assert!(request.params.top_p.is_none());
}

#[test]
fn test_boundary_values_accepted()
{   for (temperature, top_p) in [(0.0, 0.0), (2.0, 1.0)]
    {   assert_ok!(PromptRequest::parse(
          &json!({
            "input": "x",
            "temperature": temperature,
            "top_p": top_p
          }),
          DEFAULT_MODEL
        ));
    }
}

#[test]
fn test_invalid_fields_rejected()
{   let cases = vec![
      (json!({ "input": "" }), "input")
    , (json!({}), "input")
    , (json!({ "input": 42 }), "input")
    , (json!({ "input": "x", "temperature": 2.01 }), "temperature")
    , (json!({ "input": "x", "temperature": -0.1 }), "temperature")
    , (json!({ "input": "x", "temperature": "0.5" }), "temperature")
    , (json!({ "input": "x", "top_p": 1.5 }), "top_p")
    , (json!({ "input": "x", "max_tokens": 0 }), "max_tokens")
    , (json!({ "input": "x", "max_tokens": -5 }), "max_tokens")
    , (json!({ "input": "x", "max_tokens": 10.5 }), "max_tokens")
    , (json!({ "input": "x", "reasoning_effort": "extreme" }), "reasoning_effort")
    , (json!({ "input": "x", "model": "" }), "model")
    , (json!("just a string"), "arguments")
    ];

    for (args, expected_field) in cases
    {   let err = assert_err!(PromptRequest::parse(&args, DEFAULT_MODEL));
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        match err
        {   Error::Validation { field, .. } => {
              assert_eq!(field, expected_field, "args: {}", args)
            }
          , other => panic!("unexpected error: {:?}", other)
        }
    }
}

#[test]
fn test_conversation_validation()
{   let err = assert_err!(ConversationRequest::parse(
      &json!({ "messages": [] }),
      DEFAULT_MODEL
    ));
    assert_eq!(
      err,
      Error::validation("messages", "must contain at least one message")
    );

    let err = assert_err!(ConversationRequest::parse(
      &json!({ "messages": [
        { "role": "user", "content": "hi" },
        { "role": "system", "content": "nope" }
      ] }),
      DEFAULT_MODEL
    ));
    match err
    {   Error::Validation { field, .. } => assert_eq!(field, "messages[1]")
      , other => panic!("unexpected error: {:?}", other)
    }

    assert_err!(ConversationRequest::parse(
      &json!({ "messages": "hi" }),
      DEFAULT_MODEL
    ));

    // empty content is allowed
    let request = assert_ok!(ConversationRequest::parse(
      &json!({ "messages": [{ "role": "assistant", "content": "" }] }),
      DEFAULT_MODEL
    ));
    assert_eq!(request.messages[0].role, Role::Assistant);
    assert_eq!(request.messages[0].content, "");
}

// ===== Request Mapper =====

#[test]
fn test_conversation_mapping_preserves_order_and_role()
{   let roles = ["user", "assistant", "developer", "user", "assistant"];
    let messages: Vec<Value> = roles.iter()
      .enumerate()
      .map(|(i, role)| json!({ "role": role, "content": format!("turn {}", i) }))
      .collect();
    let request = assert_ok!(ConversationRequest::parse(
      &json!({ "messages": messages }),
      DEFAULT_MODEL
    ));
    let payload = ResponsesRequest::from_conversation(&request);

    let body = serde_json::to_value(&payload).unwrap();
    let input = body["input"].as_array().unwrap();
    assert_eq!(input.len(), roles.len());
    for (i, role) in roles.iter().enumerate()
    {   assert_eq!(input[i]["role"], *role);
        assert_eq!(input[i]["content"], format!("turn {}", i));
    }
}

#[test]
fn test_absent_fields_omitted_from_payload()
{   let request = assert_ok!(PromptRequest::parse(
      &json!({ "input": "hello" }),
      DEFAULT_MODEL
    ));
    let body = serde_json::to_value(
      ResponsesRequest::from_prompt(&request)
    ).unwrap();
    let mut keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["input", "model"]);
    assert_eq!(body["input"], "hello");
}

#[test]
fn test_present_fields_mapped()
{   let request = assert_ok!(PromptRequest::parse(
      &json!({
        "input": "hello",
        "instructions": "Answer in French",
        "reasoning_effort": "low",
        "max_tokens": 100,
        "temperature": 1.5,
        "top_p": 0.9
      }),
      DEFAULT_MODEL
    ));
    let body = serde_json::to_value(
      ResponsesRequest::from_prompt(&request)
    ).unwrap();
    assert_eq!(body, json!({
      "model": "gpt-5",
      "input": "hello",
      "instructions": "Answer in French",
      "reasoning": { "effort": "low" },
      "max_output_tokens": 100,
      "temperature": 1.5,
      "top_p": 0.9
    }));
}

// ===== Response Formatter =====

#[test]
fn test_format_success_with_usage()
{   let envelope = format(ok_stub().result);
    assert!(!envelope.is_error);
    assert_eq!(envelope.content.len(), 1);
    let text = envelope.joined_text();
    assert!(text.starts_with("hi"));
    assert!(text.ends_with("5 prompt tokens, 3 completion tokens, 8 total tokens"));
}

#[test]
fn test_format_success_without_usage()
{   let envelope = format(GenerationResult::Success
    {   content: "hi".to_string()
      , usage: None
    });
    assert!(!envelope.is_error);
    assert_eq!(envelope.joined_text(), "hi");
}

#[test]
fn test_format_failure()
{   let envelope = format(GenerationResult::Failure
    {   kind: ErrorKind::UpstreamError
      , message: "rate limited".to_string()
    });
    assert!(envelope.is_error);
    assert_eq!(envelope.joined_text(), "GPT-5 API error: rate limited");

    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json, json!({
      "content": [{ "type": "text", "text": "GPT-5 API error: rate limited" }],
      "isError": true
    }));
}

// ===== Operation Dispatcher =====

#[tokio::test]
async fn test_generate_success()
{   let dispatcher = dispatcher(ok_stub());
    let envelope = dispatcher.generate(&json!({ "input": "say hi" })).await;
    assert!(!envelope.is_error);
    assert_eq!(
      envelope.joined_text(),
      "hi\n\n**Usage:** 5 prompt tokens, 3 completion tokens, 8 total tokens"
    );
    assert_eq!(dispatcher.invoker().calls(), 1);
    assert_eq!(
      dispatcher.invoker().last_payload().input,
      ResponsesInput::Text("say hi".to_string())
    );
}

#[tokio::test]
async fn test_out_of_range_never_reaches_invoker()
{   let dispatcher = dispatcher(ok_stub());
    let bad = [
      json!({ "input": "x", "temperature": 3 })
    , json!({ "input": "x", "top_p": -0.5 })
    , json!({ "input": "" })
    ];
    for args in bad.iter()
    {   let envelope = dispatcher.generate(args).await;
        assert!(envelope.is_error);
        assert!(envelope.joined_text().starts_with("Invalid arguments: "));
    }

    let envelope = dispatcher.converse(&json!({ "messages": [] })).await;
    assert!(envelope.is_error);
    let envelope = dispatcher.converse(&json!({
      "messages": [{ "role": "user", "content": "x" }],
      "temperature": 2.5
    })).await;
    assert!(envelope.is_error);
    assert!(envelope.joined_text().contains("temperature"));

    assert_eq!(dispatcher.invoker().calls(), 0);
}

#[tokio::test]
async fn test_upstream_failure_surfaces_message()
{   let dispatcher = dispatcher(StubInvoker::new(GenerationResult::Failure
    {   kind: ErrorKind::UpstreamError
      , message: "rate limited".to_string()
    }));
    let envelope = dispatcher.converse(&json!({
      "messages": [{ "role": "user", "content": "hello" }]
    })).await;
    assert!(envelope.is_error);
    assert!(envelope.joined_text().contains("rate limited"));
    assert_eq!(dispatcher.invoker().calls(), 1);
}

#[tokio::test]
async fn test_configured_default_model()
{   let dispatcher = Dispatcher::new(
      ok_stub(),
      ApiKey::new("test-key"),
      "gpt-5-mini"
    );
    dispatcher.generate(&json!({ "input": "x" })).await;
    assert_eq!(dispatcher.invoker().last_payload().model, "gpt-5-mini");
    dispatcher.generate(&json!({ "input": "x", "model": "gpt-5-nano" })).await;
    assert_eq!(dispatcher.invoker().last_payload().model, "gpt-5-nano");
}

#[tokio::test]
async fn test_unknown_tool()
{   let dispatcher = dispatcher(ok_stub());
    assert!(dispatcher.call("gpt4_generate", &json!({})).await.is_none());
    assert!(dispatcher.call("gpt5_generate", &json!({ "input": "x" })).await.is_some());
}

#[tokio::test]
async fn test_concurrent_calls_are_independent()
{   let dispatcher = dispatcher(EchoInvoker);
    let slow_args = json!({ "input": "first", "model": "slow", "temperature": 0.1 });
    let fast_args = json!({ "input": "second", "model": "fast", "temperature": 1.9 });
    let (slow, fast) = tokio::join!(
      dispatcher.generate(&slow_args),
      dispatcher.generate(&fast_args)
    );
    assert_eq!(slow.joined_text(), "slow|first|Some(0.1)");
    assert_eq!(fast.joined_text(), "fast|second|Some(1.9)");
}

// ===== Upstream Invoker =====

#[test]
fn test_decode_output_text()
{   let body = r#"{
      "id": "resp_1",
      "output_text": "Hello there",
      "usage": { "input_tokens": 5, "output_tokens": 3, "total_tokens": 8 }
    }"#;
    let (text, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert_eq!(text, "Hello there");
    assert_eq!(usage, Some(Usage
    {   prompt_tokens: 5
      , completion_tokens: 3
      , total_tokens: 8
    }));
}

#[test]
fn test_decode_output_array()
{   let body = r#"{
      "output": [
        { "type": "reasoning", "id": "rs_1", "summary": [] },
        { "type": "message", "role": "assistant", "content": [
          { "type": "output_text", "text": "Hello", "annotations": [] },
          { "type": "output_text", "text": ", world" }
        ]}
      ],
      "usage": { "prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3 }
    }"#;
    let (text, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert_eq!(text, "Hello, world");
    assert_eq!(usage.map(|u| u.total_tokens), Some(3));
}

#[test]
fn test_decode_without_usage()
{   let body = r#"{ "output_text": "ok" }"#;
    let (_, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert!(usage.is_none());
}

#[test]
fn test_decode_partial_usage_keeps_text()
{   let body = r#"{
      "output_text": "hello",
      "usage": { "input_tokens": 5, "output_tokens": 3 }
    }"#;
    let (text, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert_eq!(text, "hello");
    assert_eq!(usage, Some(Usage
    {   prompt_tokens: 5
      , completion_tokens: 3
      , total_tokens: 8
    }));

    let body = r#"{
      "output_text": "hello",
      "usage": { "total_tokens": 12 }
    }"#;
    let (text, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert_eq!(text, "hello");
    assert!(usage.is_none());

    let body = r#"{ "output_text": "hello", "usage": null }"#;
    let (_, usage) = assert_ok!(decode_reply(reqwest::StatusCode::OK, body));
    assert!(usage.is_none());
}

#[test]
fn test_decode_failures()
{   let err = assert_err!(decode_reply(
      reqwest::StatusCode::TOO_MANY_REQUESTS,
      r#"{ "error": { "message": "rate limited", "type": "requests" } }"#
    ));
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
    assert_eq!(err.to_string(), "429 Too Many Requests: rate limited");

    let err = assert_err!(decode_reply(
      reqwest::StatusCode::BAD_GATEWAY,
      "upstream unavailable"
    ));
    assert!(err.to_string().contains("upstream unavailable"));

    let err = assert_err!(decode_reply(reqwest::StatusCode::OK, "not json"));
    assert!(matches!(err, Error::ParseError(_)));

    let err = assert_err!(decode_reply(
      reqwest::StatusCode::OK,
      r#"{ "output": [] }"#
    ));
    assert_eq!(err.kind(), ErrorKind::UpstreamError);
}

#[tokio::test]
async fn test_network_failure_is_upstream_error()
{   let client = OpenAiClient::new("http://127.0.0.1:9/v1/");
    assert_eq!(client.endpoint(), "http://127.0.0.1:9/v1/responses");
    let dispatcher = Dispatcher::new(client, ApiKey::new("test-key"), DEFAULT_MODEL);
    let envelope = dispatcher.generate(&json!({ "input": "hello" })).await;
    assert!(envelope.is_error);
    assert!(envelope.joined_text().starts_with("GPT-5 API error: HTTP error:"));
}

// ===== Configuration =====

fn lookup(vars: &'static [(&'static str, &'static str)])
  -> impl Fn(&str) -> Option<String>
{   move |name| {
      vars.iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_config_requires_api_key()
{   let err = assert_err!(ServerConfig::from_lookup(lookup(&[])));
    assert_eq!(err.kind(), ErrorKind::ConfigurationError);

    let err = assert_err!(ServerConfig::from_lookup(
      lookup(&[("OPENAI_API_KEY", "  ")])
    ));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn test_config_defaults_and_overrides()
{   let config = assert_ok!(ServerConfig::from_lookup(
      lookup(&[("OPENAI_API_KEY", "sk-test")])
    ));
    assert_eq!(config.api_key.expose(), "sk-test");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.default_model, "gpt-5");
    assert!(!format!("{:?}", config).contains("sk-test"));

    let config = assert_ok!(ServerConfig::from_lookup(lookup(&[
      ("OPENAI_API_KEY", "sk-test")
    , ("OPENAI_BASE_URL", "http://localhost:8080/v1/")
    , ("GPT5_DEFAULT_MODEL", "gpt-5-mini")
    ])));
    assert_eq!(config.base_url, "http://localhost:8080/v1");
    assert_eq!(config.default_model, "gpt-5-mini");

    assert_err!(ServerConfig::from_lookup(lookup(&[
      ("OPENAI_API_KEY", "sk-test")
    , ("OPENAI_BASE_URL", "localhost:8080")
    ])));
}
