//! Per-turn request context.
//!
//! Bundles what the model needs to see at the start of a turn: the user's
//! prompt, the current script, fresh viewer screenshots, and the running
//! conversation history. Rendering folds the script into the user message
//! so the model always edits against the source it was shown.

use cadscribe_core::message::Message;
use cadscribe_core::screenshot::Screenshot;

/// Everything the agent loop needs to open a turn.
#[derive(Debug, Default)]
pub struct AgentContext {
    /// The user's request for this turn.
    pub user_prompt: String,

    /// The live CAD script at the moment the turn starts.
    pub current_code: String,

    /// Fresh viewer screenshots captured for this turn, earliest first.
    pub screenshots: Vec<Screenshot>,

    /// Conversation so far. The loop appends to this as the turn runs.
    pub history: Vec<Message>,
}

impl AgentContext {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.current_code = code.into();
        self
    }

    pub fn with_screenshots(mut self, screenshots: Vec<Screenshot>) -> Self {
        self.screenshots = screenshots;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Images already attached across the history.
    pub fn image_count(&self) -> usize {
        self.history.iter().map(|m| m.images.len()).sum()
    }

    /// Render this turn's user message, attaching screenshots up to the
    /// per-request budget.
    ///
    /// The budget counts images across the whole request, so messages
    /// already carrying images eat into it. When it runs out, the earliest
    /// screenshots win: the front/back/left/right capture order means the
    /// canonical views survive trimming.
    pub fn render_user_message(&self, max_images: usize) -> Message {
        let budget = max_images.saturating_sub(self.image_count());
        let attached: Vec<Screenshot> = self.screenshots.iter().take(budget).cloned().collect();

        let content = if self.current_code.trim().is_empty() {
            self.user_prompt.clone()
        } else {
            format!(
                "{}\n\nCurrent script:\n```\n{}\n```",
                self.user_prompt, self.current_code
            )
        };

        Message::user(content).with_images(attached)
    }

    /// Append this turn's rendered user message to the history.
    pub fn begin_turn(&mut self, max_images: usize) {
        let message = self.render_user_message(max_images);
        self.history.push(message);
    }
}
