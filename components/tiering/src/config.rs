//! Tiering configuration

use tracing::warn;

/// Number of calls after which a unit is handed to the native compiler.
pub const DEFAULT_COMPILATION_THRESHOLD: u32 = 32;

/// Environment variable overriding the threshold.
pub const THRESHOLD_ENV_VAR: &str = "LIGHT_COMPILATION_THRESHOLD";

/// Configuration of the promotion controller
///
/// A threshold of zero promotes synchronously on the first call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieringConfig {
    /// Calls before promotion is requested
    pub compilation_threshold: u32,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            compilation_threshold: DEFAULT_COMPILATION_THRESHOLD,
        }
    }
}

impl TieringConfig {
    /// Replace the threshold
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.compilation_threshold = threshold;
        self
    }

    /// Whether promotion happens on the calling thread
    pub fn is_synchronous(&self) -> bool {
        self.compilation_threshold == 0
    }

    /// Read the threshold from [`THRESHOLD_ENV_VAR`], falling back to the
    /// default when unset or unparseable.
    pub fn from_env() -> Self {
        match std::env::var(THRESHOLD_ENV_VAR) {
            Ok(raw) => Self::parse_threshold(&raw),
            Err(_) => Self::default(),
        }
    }

    fn parse_threshold(raw: &str) -> Self {
        match raw.trim().parse::<u32>() {
            Ok(threshold) => Self::default().with_threshold(threshold),
            Err(err) => {
                warn!(value = raw, error = %err, "ignoring invalid compilation threshold");
                Self::default()
            }
        }
    }
}
