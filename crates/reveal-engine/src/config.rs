//! Configuration types for the reveal engine.
//!
//! This module defines the configuration schema: the per-character reveal
//! speed and the chat scripts a host can play.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default delay between revealed characters, in milliseconds.
pub const DEFAULT_SPEED_MS: u64 = 30;

/// Smallest delay the engine will schedule, in milliseconds.
pub const MIN_SPEED_MS: u64 = 1;

/// Main configuration for reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Milliseconds per revealed character.
    #[serde(default = "default_speed_ms")]
    pub speed_ms: u64,

    /// Chat scripts available to hosts.
    #[serde(default = "default_scripts")]
    pub scripts: Vec<Script>,
}

fn default_speed_ms() -> u64 {
    DEFAULT_SPEED_MS
}

fn default_scripts() -> Vec<Script> {
    Script::demo_scripts()
}

/// A canned chat exchange: one user prompt answered by several replies.
///
/// The replies are what the engine reveals, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Short identifier (e.g., "sales").
    pub name: String,

    /// The message the user "sent".
    #[serde(default)]
    pub prompt: String,

    /// Assistant messages, revealed one after another.
    pub replies: Vec<String>,
}

impl Script {
    /// Create a script from borrowed parts.
    pub fn new(name: &str, prompt: &str, replies: &[&str]) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            replies: replies.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    /// The built-in demo conversations.
    pub fn demo_scripts() -> Vec<Self> {
        vec![
            Self::new(
                "sales",
                "Do you have Nike Air Max 90 in stock?",
                &[
                    "Yes! Nike Air Max 90 is available in sizes 7–11.",
                    "Would you like to see the color options or add it to your cart?",
                ],
            ),
            Self::new(
                "support",
                "Where's my recent order?",
                &[
                    "I can help with that.",
                    "Please share your order ID, or check your order status here.",
                ],
            ),
            Self::new(
                "lead",
                "I'm interested in adding this chatbot to my website.",
                &["That's great! Could you share your email or contact number so our team can help you set up Chroney?"],
            ),
            Self::new(
                "faq",
                "What can Chroney do for my business?",
                &[
                    "Chroney automates product inquiries, customer support, and lead capture — all through chat.",
                    "Want to see a quick demo of how it works?",
                ],
            ),
            Self::new(
                "upsell",
                "Tell me more about the React Infinity shoes.",
                &[
                    "The Nike React Infinity features lightweight foam for extra comfort.",
                    "Customers who bought this also liked the Air Max 90. Want me to show it?",
                ],
            ),
        ]
    }
}

/// Per-character reveal delay, clamped to at least [`MIN_SPEED_MS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Speed(u64);

impl Speed {
    /// Create a speed from milliseconds per character.
    ///
    /// Zero would starve the scheduler, so it is clamped to 1 ms.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms.max(MIN_SPEED_MS))
    }

    /// Milliseconds per character.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Delay between two reveals.
    pub fn delay(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Halve the delay (never below the minimum).
    #[must_use]
    pub fn faster(self) -> Self {
        Self::from_millis(self.0 / 2)
    }

    /// Double the delay.
    #[must_use]
    pub fn slower(self) -> Self {
        Self::from_millis(self.0.saturating_mul(2))
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(DEFAULT_SPEED_MS)
    }
}

impl From<u64> for Speed {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms/char", self.0)
    }
}

impl RevealConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration from a file, falling back to defaults if it is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// The configured speed, clamped.
    pub fn speed(&self) -> Speed {
        Speed::from_millis(self.speed_ms)
    }

    /// Get a script by name.
    pub fn get_script(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name == name)
    }

    /// Names of all configured scripts, in order.
    pub fn script_names(&self) -> Vec<&str> {
        self.scripts.iter().map(|s| s.name.as_str()).collect()
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            speed_ms: default_speed_ms(),
            scripts: default_scripts(),
        }
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}
