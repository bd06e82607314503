//! Outbound flood control configuration.

use serde::Deserialize;

/// Outbound line rate.
///
/// Servers disconnect clients that send too fast ("Excess Flood"); every
/// line the bot writes passes through a token bucket with these settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Sustained lines per second (default: 2).
    #[serde(default = "default_lines_per_second")]
    pub lines_per_second: u32,
    /// Lines that may be sent back-to-back before throttling (default: 5).
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            lines_per_second: default_lines_per_second(),
            burst: default_burst(),
        }
    }
}

fn default_lines_per_second() -> u32 {
    2
}

fn default_burst() -> u32 {
    5
}
