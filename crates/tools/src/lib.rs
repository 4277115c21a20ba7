//! Patch engine and the script-workspace tool host.
//!
//! [`apply_patch`] is the pure fragment-replacement primitive behind the
//! `edit_code` tool; [`ScriptSession`] is a [`cadscribe_core::ToolHost`]
//! that owns the live CAD script and runs it through an opaque executor.

pub mod patch;
pub mod script_host;

pub use patch::apply_patch;
pub use script_host::{
    ExecutionError, IdleRecord, MeshSummary, Notification, ScriptExecutor, ScriptSession,
};
