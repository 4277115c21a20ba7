//! Message and Conversation domain types.
//!
//! These are the core value objects that flow through the system:
//! the user asks for a change → the agent loop drives the model → tool
//! effects rewrite the script → results land back in the conversation.
//!
//! Conversations are append-only. Once a message is pushed it is never
//! mutated in place, with one exception: late-arriving metadata (a status
//! change, or the outcome of a tool invocation) may be attached afterwards.

use crate::screenshot::Screenshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
///
/// `Tool` carries a tool-response paired to an assistant tool call via
/// `tool_call_id`; keeping the pairing in the history is what lets a full
/// provider-compatible transcript be rebuilt without lossy filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (domain prompt)
    System,
    /// Tool execution result
    Tool,
}

/// Lifecycle status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Completed,
    Error,
}

/// One tool call and its outcome, attached to at most one message.
///
/// Created open when the model emits the call, finalized exactly once with
/// either a result or an error, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    /// Name of the invoked tool
    pub name: String,

    /// The arguments the model supplied
    pub arguments: serde_json::Map<String, serde_json::Value>,

    /// The result, once the effect succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// The error message, once the effect failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocationRecord {
    pub fn new(
        name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            result: None,
            error: None,
        }
    }

    /// Whether the record has been finalized with a result or an error.
    pub fn is_settled(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    /// Attach the successful result. No-op if already settled.
    pub fn complete(&mut self, result: serde_json::Value) {
        if !self.is_settled() {
            self.result = Some(result);
        }
    }

    /// Attach the failure message. No-op if already settled.
    pub fn fail(&mut self, error: impl Into<String>) {
        if !self.is_settled() {
            self.error = Some(error.into());
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Viewer screenshots attached to this message (user messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Screenshot>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Lifecycle status
    #[serde(default = "default_status")]
    pub status: MessageStatus,

    /// At most one associated tool invocation and its outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<ToolInvocationRecord>,
}

fn default_status() -> MessageStatus {
    MessageStatus::Completed
}

impl Message {
    fn base(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            images: Vec::new(),
            timestamp: Utc::now(),
            status: MessageStatus::Completed,
            invocation: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::base(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::base(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::base(Role::System, content)
    }

    /// Create a tool result message, paired to its originating call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::base(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Attach screenshots to this message.
    pub fn with_images(mut self, images: Vec<Screenshot>) -> Self {
        self.images = images;
        self
    }

    /// Attach a tool invocation record. Only the first attach sticks;
    /// messages carry at most one record.
    pub fn attach_invocation(&mut self, record: ToolInvocationRecord) {
        if self.invocation.is_none() {
            self.invocation = Some(record);
        }
    }
}

/// A tool call embedded in an assistant message.
///
/// `arguments` is the raw JSON string exactly as the provider sent it;
/// parsing happens per-call at the adapter so one malformed call cannot
/// poison its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string
    pub arguments: String,
}

/// A conversation is an ordered, append-only sequence of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Count images attached across all messages. Used by the request
    /// assembler to compute the remaining screenshot budget.
    pub fn image_count(&self) -> usize {
        self.messages.iter().map(|m| m.images.len()).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screenshot::ViewAngle;

    #[test]
    fn create_user_message() {
        let msg = Message::user("make the bracket 2mm thicker");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "make the bracket 2mm thicker");
        assert!(msg.tool_calls.is_empty());
        assert_eq!(msg.status, MessageStatus::Completed);
    }

    #[test]
    fn tool_result_pairs_to_call() {
        let msg = Message::tool_result("call_1", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn invocation_record_settles_once() {
        let mut rec = ToolInvocationRecord::new("write_code", serde_json::Map::new());
        assert!(!rec.is_settled());

        rec.complete(serde_json::json!({"ok": true}));
        assert!(rec.is_settled());

        // Second finalization is ignored
        rec.fail("late error");
        assert!(rec.error.is_none());
        assert!(rec.result.is_some());
    }

    #[test]
    fn invocation_attaches_at_most_once() {
        let mut msg = Message::assistant("");
        msg.attach_invocation(ToolInvocationRecord::new("write_code", serde_json::Map::new()));
        msg.attach_invocation(ToolInvocationRecord::new("edit_code", serde_json::Map::new()));
        assert_eq!(msg.invocation.as_ref().unwrap().name, "write_code");
    }

    #[test]
    fn conversation_counts_images() {
        let mut conv = Conversation::new();
        conv.push(Message::user("first").with_images(vec![
            Screenshot::new(ViewAngle::Front, "d1"),
            Screenshot::new(ViewAngle::Back, "d2"),
        ]));
        conv.push(Message::user("second").with_images(vec![Screenshot::new(
            ViewAngle::Left,
            "d3",
        )]));
        assert_eq!(conv.image_count(), 3);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
    }
}
