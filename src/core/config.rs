/// Session timing and scene configuration, loadable from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::schema::content::ContentId;
use crate::schema::mode::ModeConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Timing for one session. Values are seconds so authored files stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds between revealed characters. Zero reveals lines at once.
    #[serde(default = "default_typing_speed")]
    pub typing_speed: f32,
    /// Seconds a fully revealed line stays up before auto-advancing.
    /// Zero waits for the player.
    #[serde(default = "default_next_line_delay")]
    pub next_line_delay: f32,
}

fn default_typing_speed() -> f32 {
    0.1
}

fn default_next_line_delay() -> f32 {
    2.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_speed: default_typing_speed(),
            next_line_delay: default_next_line_delay(),
        }
    }
}

impl SessionConfig {
    /// Reveal instantly and never auto-advance.
    pub fn instant() -> Self {
        Self {
            typing_speed: 0.0,
            next_line_delay: 0.0,
        }
    }

    pub fn per_char_delay(&self) -> Duration {
        seconds(self.typing_speed)
    }

    pub fn auto_advance_delay(&self) -> Duration {
        seconds(self.next_line_delay)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }
}

// Negative, NaN and infinite values all collapse to zero.
fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::ZERO)
}

/// A playable scene: which content to open with, how fast to type and
/// which controller drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Scene")]
pub struct SceneConfig {
    #[serde(default)]
    pub session: SessionConfig,
    pub start: ContentId,
    #[serde(default)]
    pub mode: ModeConfig,
}

impl SceneConfig {
    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }
}
