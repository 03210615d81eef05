use serde::{Deserialize, Serialize};

use super::content::{ClipHandle, ContentId};

/// One configured branch choice, as authored. The target is resolved
/// against a content library when the branching controller is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub text: String,
    pub key: String,
    #[serde(default)]
    pub target: Option<ContentId>,
}

/// Maps a line index to the clip played while that line is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceClipSpec {
    pub line_index: usize,
    pub clip: ClipHandle,
}

/// Which controller drives a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ModeConfig {
    #[default]
    Linear,
    Branching {
        options: Vec<OptionSpec>,
        /// Offer the options automatically once the session ends.
        #[serde(default)]
        after_dialogue: bool,
    },
    Voice {
        clips: Vec<VoiceClipSpec>,
    },
}

impl ModeConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Branching { .. } => "branching",
            Self::Voice { .. } => "voice",
        }
    }
}
