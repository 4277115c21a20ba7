//! The multi-turn agent loop.
//!
//! Drives the model until it declares the task done (`idle`), the iteration
//! cap trips, the turn is cancelled, or the provider fails for good. Tool
//! effects run through the [`ToolHost`] one call at a time, in the order the
//! model emitted them; each call's outcome is appended to the history as a
//! paired tool-result message so the model sees exactly what happened.

use std::sync::Arc;

use cadscribe_config::AppConfig;
use cadscribe_core::error::AgentError;
use cadscribe_core::message::{Message, MessageStatus, ToolInvocationRecord};
use cadscribe_core::screenshot::MAX_REQUEST_IMAGES;
use cadscribe_core::tool::{NotifyKind, ToolAction, ToolCall, ToolHost};
use cadscribe_providers::{CallParse, ModelTurn, ProviderAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::AgentContext;
use crate::prompts::SYSTEM_PROMPT;

/// Hard cap on provider round-trips within one turn.
const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// Warning surfaced to the user when the cap trips mid-task.
const ITERATION_LIMIT_MESSAGE: &str =
    "I stopped after reaching the step limit for this request. The script may be \
     unfinished; ask me to continue if you want me to keep going.";

/// How a turn ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model called `idle`.
    Completed { summary: String, message: String },
    /// The iteration cap tripped before the model finished.
    IterationLimit,
}

/// Drives one conversation turn to completion.
pub struct AgentLoop {
    adapter: ProviderAdapter,
    max_iterations: u32,
    max_request_images: usize,
}

impl AgentLoop {
    pub fn new(adapter: ProviderAdapter) -> Self {
        Self {
            adapter,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_request_images: MAX_REQUEST_IMAGES,
        }
    }

    /// Build the loop from config, with the standard system prompt.
    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let adapter = ProviderAdapter::from_config(config, SYSTEM_PROMPT)?;
        Ok(Self {
            adapter,
            max_iterations: config.limits.max_iterations,
            max_request_images: config.limits.max_request_images,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run one turn: render the user message, then alternate model requests
    /// and tool dispatches until the turn ends.
    ///
    /// The context's history accumulates every message of the turn, so the
    /// caller can hand the same context back for the next user request.
    pub async fn process_user_message(
        &self,
        ctx: &mut AgentContext,
        host: Arc<dyn ToolHost>,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        ctx.begin_turn(self.max_request_images);

        let mut iteration = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            if iteration >= self.max_iterations {
                warn!(
                    iterations = iteration,
                    "Iteration cap reached, ending turn"
                );
                let warning = ToolAction::NotifyUser {
                    message: ITERATION_LIMIT_MESSAGE.to_string(),
                    kind: NotifyKind::Warning,
                };
                if let Err(e) = host.handle(&warning).await {
                    warn!(error = %e, "Could not deliver iteration-limit warning");
                }
                return Ok(TurnOutcome::IterationLimit);
            }
            iteration += 1;
            debug!(iteration, "Requesting model turn");

            match self.adapter.request(&ctx.history, &cancel).await? {
                ModelTurn::ToolCalls { message, calls } => {
                    ctx.history.push(message);
                    if let Some(outcome) = self.dispatch_batch(ctx, host.as_ref(), calls).await {
                        return Ok(outcome);
                    }
                }

                ModelTurn::StructuredCall { message, call } => {
                    ctx.history.push(message);
                    let batch = vec![CallParse::Parsed(call)];
                    if let Some(outcome) = self.dispatch_batch(ctx, host.as_ref(), batch).await {
                        return Ok(outcome);
                    }
                }

                ModelTurn::PlainText { message } => {
                    let text = message.content.trim().to_string();
                    ctx.history.push(message);

                    // Leaked structured output (anything that opens like a
                    // JSON object) is not shown to the user.
                    if text.is_empty() || text.starts_with('{') {
                        debug!("Suppressing empty or JSON-like plain response");
                        continue;
                    }
                    let note = ToolAction::NotifyUser {
                        message: text,
                        kind: NotifyKind::Info,
                    };
                    if let Err(e) = host.handle(&note).await {
                        warn!(error = %e, "Could not forward plain response");
                    }
                }
            }
        }
    }

    /// Dispatch one batch of tool calls in order.
    ///
    /// Every call gets its own tool-result message, success or failure, so
    /// the model can recover per call. `idle` ends the turn immediately and
    /// any calls after it in the batch are dropped.
    async fn dispatch_batch(
        &self,
        ctx: &mut AgentContext,
        host: &dyn ToolHost,
        calls: Vec<CallParse>,
    ) -> Option<TurnOutcome> {
        for parse in calls {
            let call = match parse {
                CallParse::Parsed(call) => call,
                CallParse::Malformed { id, name, error } => {
                    ctx.history.push(error_result(&id, &name, &error));
                    continue;
                }
            };

            let action = match ToolAction::parse(&call) {
                Ok(action) => action,
                Err(e) => {
                    ctx.history
                        .push(error_result(&call.id, &call.name, &e.to_string()));
                    continue;
                }
            };

            debug!(tool = call.name, call_id = call.id, "Dispatching tool call");
            match host.handle(&action).await {
                Ok(value) => {
                    ctx.history.push(success_result(&call, value));
                    if let ToolAction::Idle { summary, message } = action {
                        info!(summary = %summary, "Model declared the task complete");
                        return Some(TurnOutcome::Completed { summary, message });
                    }
                }
                Err(e) => {
                    warn!(tool = call.name, error = %e, "Tool call failed");
                    ctx.history
                        .push(error_result(&call.id, &call.name, &e.to_string()));
                }
            }
        }
        None
    }
}

fn arguments_map(call: &ToolCall) -> serde_json::Map<String, serde_json::Value> {
    call.arguments.as_object().cloned().unwrap_or_default()
}

fn success_result(call: &ToolCall, value: serde_json::Value) -> Message {
    let mut record = ToolInvocationRecord::new(&call.name, arguments_map(call));
    record.complete(value.clone());

    let mut msg = Message::tool_result(&call.id, value.to_string());
    msg.attach_invocation(record);
    msg
}

fn error_result(call_id: &str, name: &str, error: &str) -> Message {
    let mut record = ToolInvocationRecord::new(name, serde_json::Map::new());
    record.fail(error);

    let mut msg = Message::tool_result(call_id, format!("Error: {error}"));
    msg.status = MessageStatus::Error;
    msg.attach_invocation(record);
    msg
}
