//! The provider adapter — one normalized turn shape from two response modes.
//!
//! A model can return a structured action two ways: native tool-call
//! entries, or (for backends without tool calling) raw text constrained by
//! a JSON schema covering the whole response. The adapter hides the split:
//! the agent loop always receives a [`ModelTurn`] and never branches on
//! provider capability flags.

use std::sync::Arc;

use cadscribe_config::AppConfig;
use cadscribe_core::error::{AgentError, ProviderError};
use cadscribe_core::message::{Message, MessageToolCall, Role};
use cadscribe_core::provider::{Provider, ProviderRequest, ProviderResponse};
use cadscribe_core::tool::{catalogue, fallback_response_schema, ToolCall};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::with_retries;

/// How structured actions are requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Native function calling: the catalogue rides along as `tools`.
    ToolCalling,
    /// The whole response is constrained to `{ name, arguments }` JSON.
    ConstrainedJson,
}

/// One tool call as parsed from the wire.
///
/// Argument strings are parsed per call; a malformed one is carried as
/// `Malformed` so its siblings still dispatch and the error can be fed back
/// to the model as that call's result.
#[derive(Debug, Clone)]
pub enum CallParse {
    Parsed(ToolCall),
    Malformed { id: String, name: String, error: String },
}

/// A provider response normalized into one of three shapes.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    /// Native-mode tool calls, in the order received.
    ToolCalls {
        message: Message,
        calls: Vec<CallParse>,
    },
    /// Constrained-JSON text that parsed into a single call.
    StructuredCall { message: Message, call: ToolCall },
    /// Plain prose (or text that failed the constrained parse).
    PlainText { message: Message },
}

/// The shape constrained-JSON responses must parse into.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructuredReply {
    name: String,
    arguments: serde_json::Value,
}

/// Normalizes requests and responses across chat modes, applies the retry
/// policy, and honors cancellation at the request boundary.
pub struct ProviderAdapter {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    mode: ChatMode,
    max_attempts: u32,
    system_prompt: String,
}

impl ProviderAdapter {
    /// Create an adapter with default settings (tool-calling mode,
    /// 3 request attempts).
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            mode: ChatMode::ToolCalling,
            max_attempts: 3,
            system_prompt: system_prompt.into(),
        }
    }

    /// Build an adapter over an OpenAI-compatible backend from config.
    ///
    /// Fails with `AgentError::MissingApiKey` when no key is configured;
    /// this is the fatal-at-turn-start case, never fed to the model.
    pub fn from_config(
        config: &AppConfig,
        system_prompt: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let api_key = config.api_key.clone().ok_or(AgentError::MissingApiKey)?;
        let provider = OpenAiCompatProvider::new("openai", config.base_url.clone(), api_key)?;

        Ok(Self {
            provider: Arc::new(provider),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            mode: if config.use_tool_calling {
                ChatMode::ToolCalling
            } else {
                ChatMode::ConstrainedJson
            },
            max_attempts: config.limits.request_retries,
            system_prompt: system_prompt.into(),
        })
    }

    /// Set the chat mode.
    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Send the accumulated history and normalize the response.
    ///
    /// Exactly one system message (the adapter's own) heads every request;
    /// system messages in the supplied history are dropped. A triggered
    /// cancellation token abandons the in-flight request and surfaces as
    /// `AgentError::Cancelled`, distinct from any provider failure.
    pub async fn request(
        &self,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> Result<ModelTurn, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let request = self.build_request(history);

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            res = with_retries(self.max_attempts, || {
                self.provider.complete(request.clone())
            }) => res,
        };

        match result {
            Ok(response) => Ok(self.classify(response)),
            // An abort-triggered failure is a cancellation, not an error
            Err(_) if cancel.is_cancelled() => Err(AgentError::Cancelled),
            Err(e) => Err(AgentError::Provider(e)),
        }
    }

    fn build_request(&self, history: &[Message]) -> ProviderRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );

        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        match self.mode {
            ChatMode::ToolCalling => {
                request.tools = catalogue();
            }
            ChatMode::ConstrainedJson => {
                request.response_format = Some(serde_json::json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": "tool_invocation",
                        "strict": true,
                        "schema": fallback_response_schema(),
                    }
                }));
            }
        }

        request
    }

    /// Normalize a raw provider response into a [`ModelTurn`].
    fn classify(&self, response: ProviderResponse) -> ModelTurn {
        let message = response.message;

        if !message.tool_calls.is_empty() {
            let calls = message.tool_calls.iter().map(parse_wire_call).collect();
            return ModelTurn::ToolCalls { message, calls };
        }

        if self.mode == ChatMode::ConstrainedJson {
            match serde_json::from_str::<StructuredReply>(&message.content) {
                Ok(reply) => {
                    debug!(tool = %reply.name, "Constrained response parsed as tool call");
                    let call = ToolCall {
                        id: Uuid::new_v4().to_string(),
                        name: reply.name,
                        arguments: reply.arguments,
                    };
                    return ModelTurn::StructuredCall { message, call };
                }
                Err(e) => {
                    debug!(error = %e, "Constrained response did not parse, treating as text");
                }
            }
        }

        ModelTurn::PlainText { message }
    }
}

/// Parse one native-mode tool call's argument string.
fn parse_wire_call(tc: &MessageToolCall) -> CallParse {
    match serde_json::from_str::<serde_json::Value>(&tc.arguments) {
        Ok(arguments) => CallParse::Parsed(ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        }),
        Err(e) => {
            warn!(call_id = %tc.id, tool = %tc.name, error = %e, "Malformed tool call arguments");
            CallParse::Malformed {
                id: tc.id.clone(),
                name: tc.name.clone(),
                error: format!("invalid JSON arguments: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// A provider that returns canned responses and records requests.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
        calls: AtomicU32,
        seen_requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
                seen_requests: Mutex::new(Vec::new()),
            }
        }

        fn text_response(content: &str) -> ProviderResponse {
            ProviderResponse {
                message: Message::assistant(content),
                usage: None,
                model: "mock-model".into(),
            }
        }

        fn tool_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
            let mut message = Message::assistant("");
            message.tool_calls = calls;
            ProviderResponse {
                message,
                usage: None,
                model: "mock-model".into(),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError::Network("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn adapter_over(provider: Arc<ScriptedProvider>) -> ProviderAdapter {
        ProviderAdapter::new(provider, "mock-model", "You are a CAD copilot")
    }

    #[tokio::test]
    async fn native_tool_calls_are_parsed_per_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            ScriptedProvider::tool_response(vec![
                MessageToolCall {
                    id: "call_1".into(),
                    name: "notify_user".into(),
                    arguments: r#"{"message":"working"}"#.into(),
                },
                MessageToolCall {
                    id: "call_2".into(),
                    name: "write_code".into(),
                    arguments: "{not valid json".into(),
                },
            ]),
        )]));

        let adapter = adapter_over(provider);
        let turn = adapter
            .request(&[Message::user("go")], &CancellationToken::new())
            .await
            .unwrap();

        match turn {
            ModelTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 2);
                assert!(matches!(&calls[0], CallParse::Parsed(c) if c.name == "notify_user"));
                assert!(
                    matches!(&calls[1], CallParse::Malformed { id, .. } if id == "call_2"),
                    "bad JSON must isolate to its own call"
                );
            }
            other => panic!("expected ToolCalls, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn constrained_json_parses_to_structured_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            ScriptedProvider::text_response(
                r#"{"name":"write_code","arguments":{"code":"cube(10);"}}"#,
            ),
        )]));

        let adapter = adapter_over(provider).with_mode(ChatMode::ConstrainedJson);
        let turn = adapter
            .request(&[Message::user("go")], &CancellationToken::new())
            .await
            .unwrap();

        match turn {
            ModelTurn::StructuredCall { call, .. } => {
                assert_eq!(call.name, "write_code");
                assert_eq!(call.arguments["code"], "cube(10);");
            }
            other => panic!("expected StructuredCall, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_constrained_text_falls_through_to_plain() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            ScriptedProvider::text_response("I'll start by sketching the base plate."),
        )]));

        let adapter = adapter_over(provider).with_mode(ChatMode::ConstrainedJson);
        let turn = adapter
            .request(&[Message::user("go")], &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(turn, ModelTurn::PlainText { .. }));
    }

    #[tokio::test]
    async fn exactly_one_system_message_heads_the_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            ScriptedProvider::text_response("ok"),
        )]));

        let adapter = adapter_over(provider.clone());
        let history = vec![
            Message::system("stale system prompt from history"),
            Message::user("hello"),
        ];
        adapter
            .request(&history, &CancellationToken::new())
            .await
            .unwrap();

        let seen = provider.seen_requests.lock().unwrap();
        let system_count = seen[0]
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(system_count, 1);
        assert_eq!(seen[0].messages[0].content, "You are a CAD copilot");
    }

    #[tokio::test]
    async fn request_modes_shape_the_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(ScriptedProvider::text_response("a")),
            Ok(ScriptedProvider::text_response("b")),
        ]));

        let adapter = adapter_over(provider.clone());
        adapter
            .request(&[Message::user("x")], &CancellationToken::new())
            .await
            .unwrap();

        let adapter = ProviderAdapter::new(provider.clone(), "mock-model", "prompt")
            .with_mode(ChatMode::ConstrainedJson);
        adapter
            .request(&[Message::user("x")], &CancellationToken::new())
            .await
            .unwrap();

        let seen = provider.seen_requests.lock().unwrap();
        assert_eq!(seen[0].tools.len(), 4);
        assert!(seen[0].response_format.is_none());
        assert!(seen[1].tools.is_empty());
        let format = seen[1].response_format.as_ref().unwrap();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(
            format["json_schema"]["schema"]["additionalProperties"],
            serde_json::json!(false)
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("connection reset".into())),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "internal".into(),
            }),
            Ok(ScriptedProvider::text_response("recovered")),
        ]));

        let adapter = adapter_over(provider.clone());
        let turn = adapter
            .request(&[Message::user("x")], &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(turn, ModelTurn::PlainText { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("one".into())),
            Err(ProviderError::Network("two".into())),
            Err(ProviderError::Network("three".into())),
        ]));

        let adapter = adapter_over(provider.clone());
        let err = adapter
            .request(&[Message::user("x")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        assert!(err.to_string().contains("three"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn triggered_token_cancels_without_calling_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            ScriptedProvider::text_response("never seen"),
        )]));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let adapter = adapter_over(provider.clone());
        let err = adapter
            .request(&[Message::user("x")], &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
