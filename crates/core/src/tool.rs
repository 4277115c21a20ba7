//! The tool catalogue — the fixed set of actions the model may request.
//!
//! Unlike an open plugin registry, the catalogue is a closed enum: adding a
//! tool is a compile-time-checked change in one place. The definitions sent
//! to the model in tool-calling mode and the `enum` of allowed names in the
//! constrained-JSON fallback schema are both derived from [`ToolKind::ALL`],
//! so the two representations cannot drift apart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The closed set of tools the model can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    NotifyUser,
    WriteCode,
    EditCode,
    Idle,
}

impl ToolKind {
    /// Every tool, in the order advertised to the model.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::NotifyUser,
        ToolKind::WriteCode,
        ToolKind::EditCode,
        ToolKind::Idle,
    ];

    /// The wire name of this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::NotifyUser => "notify_user",
            ToolKind::WriteCode => "write_code",
            ToolKind::EditCode => "edit_code",
            ToolKind::Idle => "idle",
        }
    }

    /// Look up a tool by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The definition advertised to the model for this tool.
    pub fn definition(&self) -> ToolDefinition {
        let (description, parameters) = match self {
            ToolKind::NotifyUser => (
                "Show a short status message to the user while you work.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to display"
                        },
                        "type": {
                            "type": "string",
                            "enum": ["info", "warning", "error"],
                            "description": "Severity of the message (default info)"
                        }
                    },
                    "required": ["message"]
                }),
            ),
            ToolKind::WriteCode => (
                "Replace the entire CAD script with new code. The script is \
                 executed immediately and the resulting mesh (or error) is \
                 returned.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "The complete new script"
                        },
                        "explanation": {
                            "type": "string",
                            "description": "One-line summary of what the code does"
                        }
                    },
                    "required": ["code"]
                }),
            ),
            ToolKind::EditCode => (
                "Edit the current CAD script by replacing an exact existing \
                 fragment with new code. old_code must match the script \
                 byte-for-byte, including whitespace.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "old_code": {
                            "type": "string",
                            "description": "Exact fragment currently in the script"
                        },
                        "new_code": {
                            "type": "string",
                            "description": "Replacement fragment"
                        }
                    },
                    "required": ["old_code", "new_code"]
                }),
            ),
            ToolKind::Idle => (
                "Signal that the task is complete and you are done working.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "summary": {
                            "type": "string",
                            "description": "Short summary of what was accomplished"
                        },
                        "message": {
                            "type": "string",
                            "description": "Closing message to show the user"
                        }
                    },
                    "required": ["summary", "message"]
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// All tool definitions, for the tool-calling request.
pub fn catalogue() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(|k| k.definition()).collect()
}

/// JSON Schema for the whole response in constrained-JSON mode.
///
/// Providers without native tool calling are asked to emit text matching
/// `{ name, arguments }`; the `name` enum comes from the same source list
/// as [`catalogue`].
pub fn fallback_response_schema() -> serde_json::Value {
    let names: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
    serde_json::json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "enum": names
            },
            "arguments": {
                "type": "object"
            }
        },
        "required": ["name", "arguments"],
        "additionalProperties": false
    })
}

/// A wire-level tool call: name plus parsed argument object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the provider's tool_call id; synthesized in
    /// constrained-JSON mode)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    Info,
    Warning,
    Error,
}

/// A tool call parsed into its typed form.
///
/// Hosts match exhaustively on this, so a new [`ToolKind`] variant forces
/// every dispatch site to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    NotifyUser {
        message: String,
        kind: NotifyKind,
    },
    WriteCode {
        code: String,
        explanation: Option<String>,
    },
    EditCode {
        old_code: String,
        new_code: String,
    },
    Idle {
        summary: String,
        message: String,
    },
}

impl ToolAction {
    /// Parse a wire call into a typed action.
    ///
    /// Fails with `ToolError::UnknownTool` for names outside the catalogue
    /// and `ToolError::InvalidArguments` for missing/mistyped fields; both
    /// are recoverable (fed back to the model as that call's result).
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let args = &call.arguments;
        let required_str = |field: &str| -> Result<String, ToolError> {
            args.get(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "{} requires a string '{field}' argument",
                        call.name
                    ))
                })
        };
        let optional_str =
            |field: &str| args.get(field).and_then(|v| v.as_str()).map(str::to_string);

        match kind {
            ToolKind::NotifyUser => Ok(ToolAction::NotifyUser {
                message: required_str("message")?,
                kind: match args.get("type").and_then(|v| v.as_str()) {
                    Some("warning") => NotifyKind::Warning,
                    Some("error") => NotifyKind::Error,
                    _ => NotifyKind::Info,
                },
            }),
            ToolKind::WriteCode => Ok(ToolAction::WriteCode {
                code: required_str("code")?,
                explanation: optional_str("explanation"),
            }),
            ToolKind::EditCode => Ok(ToolAction::EditCode {
                old_code: required_str("old_code")?,
                new_code: required_str("new_code")?,
            }),
            ToolKind::Idle => Ok(ToolAction::Idle {
                summary: required_str("summary")?,
                message: required_str("message")?,
            }),
        }
    }

    /// Which tool kind this action belongs to.
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolAction::NotifyUser { .. } => ToolKind::NotifyUser,
            ToolAction::WriteCode { .. } => ToolKind::WriteCode,
            ToolAction::EditCode { .. } => ToolKind::EditCode,
            ToolAction::Idle { .. } => ToolKind::Idle,
        }
    }
}

/// The host callback — performs a tool's side effect.
///
/// Implemented by the embedding layer (script workspace, UI). Returns a
/// JSON-serializable result or a `ToolError` with a human-readable message;
/// the agent loop never inspects *why* an effect failed beyond the message.
#[async_trait]
pub trait ToolHost: Send + Sync {
    async fn handle(&self, action: &ToolAction) -> Result<serde_json::Value, ToolError>;
}
