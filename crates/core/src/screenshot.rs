//! Screenshot types — labeled viewer captures attached to requests.
//!
//! Screenshots are produced by an external capture capability (the 3D
//! viewer) and are read-only to the agent loop. Providers cap the number of
//! images a request may carry, so the request assembler enforces a hard
//! budget counting images already present in history.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Hard cap on images per assembled request, counting images already
/// present in the conversation history.
pub const MAX_REQUEST_IMAGES: usize = 10;

/// The camera angle a screenshot was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewAngle {
    Front,
    Back,
    Left,
    Right,
}

impl ViewAngle {
    pub fn label(&self) -> &'static str {
        match self {
            ViewAngle::Front => "front",
            ViewAngle::Back => "back",
            ViewAngle::Left => "left",
            ViewAngle::Right => "right",
        }
    }
}

/// A single captured viewer image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    /// Which view this was captured from
    pub view: ViewAngle,

    /// The image as a data URL (`data:image/png;base64,...`)
    pub image_data: String,
}

impl Screenshot {
    pub fn new(view: ViewAngle, image_data: impl Into<String>) -> Self {
        Self {
            view,
            image_data: image_data.into(),
        }
    }
}

/// The outcome of a capture attempt.
///
/// `Unsupported` (no capture capability at all) and `Failed` (capability
/// present but errored) are distinct on purpose: callers degrade to zero
/// images either way, but should be able to tell the two apart.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(Vec<Screenshot>),
    Unsupported,
    Failed(String),
}

impl CaptureOutcome {
    /// The captured screenshots, or an empty list for both degraded cases.
    pub fn into_screenshots(self) -> Vec<Screenshot> {
        match self {
            CaptureOutcome::Captured(shots) => shots,
            CaptureOutcome::Unsupported | CaptureOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// An external capture capability (the viewer).
///
/// Implemented by the UI layer; the agent loop only consumes the outcome.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture(&self) -> CaptureOutcome;
}
