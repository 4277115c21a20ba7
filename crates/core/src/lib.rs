//! # Cadscribe Core
//!
//! Domain types, traits, and error definitions for the cadscribe CAD
//! copilot. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM provider, tool host, CAD kernel,
//! screenshot capture) is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod screenshot;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, PatchError, ProviderError, ToolError};
pub use message::{
    Conversation, ConversationId, Message, MessageStatus, MessageToolCall, Role,
    ToolInvocationRecord,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use screenshot::{CaptureOutcome, Screenshot, ScreenshotSource, ViewAngle, MAX_REQUEST_IMAGES};
pub use tool::{catalogue, fallback_response_schema, NotifyKind, ToolAction, ToolCall, ToolHost, ToolKind};
