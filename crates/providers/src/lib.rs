//! LLM provider implementations and the mode-normalizing adapter.
//!
//! The [`OpenAiCompatProvider`] speaks the `/v1/chat/completions` wire
//! protocol; the [`ProviderAdapter`] sits above any [`cadscribe_core::Provider`]
//! and normalizes its response into a single [`ModelTurn`] shape regardless
//! of whether the backend supports native tool calling.

pub mod adapter;
pub mod openai_compat;
pub mod retry;

pub use adapter::{CallParse, ChatMode, ModelTurn, ProviderAdapter};
pub use openai_compat::OpenAiCompatProvider;
pub use retry::with_retries;
