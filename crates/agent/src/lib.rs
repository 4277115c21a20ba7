//! The agent loop — multi-turn orchestration of model and tool effects.
//!
//! One call to [`AgentLoop::process_user_message`] is a *turn*: it may span
//! many provider round-trips and tool dispatches, and ends when the model
//! invokes `idle`, the iteration cap is reached, the turn is cancelled, or
//! a fatal provider error exhausts its retries.

pub mod context;
pub mod loop_runner;
pub mod prompts;

pub use context::AgentContext;
pub use loop_runner::{AgentLoop, TurnOutcome};
pub use prompts::SYSTEM_PROMPT;
