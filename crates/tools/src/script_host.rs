//! Script-workspace tool host.
//!
//! Owns the live CAD script and performs tool effects against it: full
//! rewrites (`write_code`), fragment patches (`edit_code`), user
//! notifications, and the completion record. Script execution itself is an
//! opaque collaborator behind [`ScriptExecutor`]; this crate never looks
//! inside the CAD kernel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadscribe_core::error::ToolError;
use cadscribe_core::tool::{NotifyKind, ToolAction, ToolHost};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::patch::apply_patch;

/// Mesh statistics returned by a successful script run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshSummary {
    pub vertices: usize,
    pub triangles: usize,
}

/// A script run that produced no mesh.
#[derive(Debug, Clone, thiserror::Error)]
#[error("script execution failed: {0}")]
pub struct ExecutionError(pub String);

/// The opaque "execute script → mesh or error" boundary to the CAD kernel.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, source: &str) -> Result<MeshSummary, ExecutionError>;
}

/// A notification surfaced to the user while the agent works.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub kind: NotifyKind,
}

/// The idle record — what the agent said it accomplished.
#[derive(Debug, Clone)]
pub struct IdleRecord {
    pub summary: String,
    pub message: String,
}

/// A [`ToolHost`] over a single live script.
///
/// Tool effects are dispatched one at a time by the agent loop, so the
/// locks here never contend in practice; they exist so the session can be
/// shared with a UI thread reading the current script.
pub struct ScriptSession {
    code: RwLock<String>,
    executor: Arc<dyn ScriptExecutor>,
    notifications: Mutex<Vec<Notification>>,
    idle: Mutex<Option<IdleRecord>>,
}

impl ScriptSession {
    pub fn new(initial_code: impl Into<String>, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            code: RwLock::new(initial_code.into()),
            executor,
            notifications: Mutex::new(Vec::new()),
            idle: Mutex::new(None),
        }
    }

    /// The current script source.
    pub async fn code(&self) -> String {
        self.code.read().await.clone()
    }

    /// Notifications recorded so far, in order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The completion record, once `idle` has been invoked.
    pub fn idle_record(&self) -> Option<IdleRecord> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run the given source and report the outcome the model will see.
    async fn run(&self, tool_name: &str, source: String) -> Result<serde_json::Value, ToolError> {
        match self.executor.execute(&source).await {
            Ok(mesh) => {
                debug!(
                    tool = tool_name,
                    vertices = mesh.vertices,
                    triangles = mesh.triangles,
                    "Script executed"
                );
                *self.code.write().await = source;
                Ok(serde_json::json!({
                    "status": "ok",
                    "vertices": mesh.vertices,
                    "triangles": mesh.triangles,
                }))
            }
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Script execution failed");
                // Keep the failing source as the live script so the model
                // can edit its own mistake instead of a stale version.
                *self.code.write().await = source;
                Err(ToolError::ExecutionFailed {
                    tool_name: tool_name.into(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ToolHost for ScriptSession {
    async fn handle(&self, action: &ToolAction) -> Result<serde_json::Value, ToolError> {
        match action {
            ToolAction::NotifyUser { message, kind } => {
                self.notifications
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(Notification {
                        message: message.clone(),
                        kind: *kind,
                    });
                Ok(serde_json::json!({ "displayed": true }))
            }

            ToolAction::WriteCode { code, .. } => self.run("write_code", code.clone()).await,

            ToolAction::EditCode { old_code, new_code } => {
                let current = self.code.read().await.clone();
                let patched =
                    apply_patch(&current, old_code, new_code).map_err(|e| {
                        ToolError::ExecutionFailed {
                            tool_name: "edit_code".into(),
                            reason: e.to_string(),
                        }
                    })?;
                self.run("edit_code", patched).await
            }

            ToolAction::Idle { summary, message } => {
                *self.idle.lock().unwrap_or_else(|e| e.into_inner()) = Some(IdleRecord {
                    summary: summary.clone(),
                    message: message.clone(),
                });
                Ok(serde_json::json!({ "status": "completed" }))
            }
        }
    }
}
