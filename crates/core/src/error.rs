//! Error types for the cadscribe domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type, and the propagation rules
//! differ per context: tool and patch errors are recovered inline (fed back
//! to the model as that call's result), while agent errors end the turn.

use thiserror::Error;

/// Errors from the LLM provider boundary.
///
/// Any of these may be transient; the adapter retries the request before
/// surfacing the last one to the caller.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors from tool effect execution (the host callback).
///
/// These never abort a turn: the agent loop converts them into an
/// `Error: ...` tool-result message so the model can self-correct.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Errors from the patch engine.
///
/// A failed patch must never produce a partial result; the original source
/// is left untouched and the error is surfaced as a recoverable tool error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("fragment not found in source: {fragment:?}")]
    FragmentNotFound { fragment: String },

    #[error("old fragment must not be empty")]
    EmptyFragment,
}

/// Fatal errors for a single `process_user_message` turn.
///
/// `Cancelled` is deliberately a distinct variant so callers can tell a
/// user-initiated cancellation apart from a provider failure.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("turn cancelled")]
    Cancelled,

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("no API key configured")]
    MissingApiKey,
}

impl AgentError {
    /// Whether this error represents a user-initiated cancellation rather
    /// than a genuine failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn patch_error_names_the_fragment() {
        let err = PatchError::FragmentNotFound {
            fragment: "cube(10)".into(),
        };
        assert!(err.to_string().contains("cube(10)"));
    }

    #[test]
    fn cancellation_is_distinguishable() {
        let cancelled = AgentError::Cancelled;
        let failed = AgentError::Provider(ProviderError::Network("reset".into()));
        assert!(cancelled.is_cancelled());
        assert!(!failed.is_cancelled());
    }
}
