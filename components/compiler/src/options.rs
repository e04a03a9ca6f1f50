//! Compiler configuration

use std::fmt;
use std::sync::Arc;
use tiering::{Promoter, TieringConfig};

/// Options applied to every unit a [`Compiler`](crate::Compiler) produces.
///
/// # Examples
///
/// ```
/// use compiler::CompilerOptions;
///
/// let options = CompilerOptions::default().with_threshold(4).with_debug_info(false);
/// assert_eq!(options.tiering.compilation_threshold, 4);
/// assert!(options.promoter.is_none());
/// ```
#[derive(Clone)]
pub struct CompilerOptions {
    /// Promotion threshold shared by the units
    pub tiering: TieringConfig,
    /// Worker receiving compile requests; units never promote without one
    pub promoter: Option<Arc<Promoter>>,
    /// Whether `DebugInfo` nodes record source spans
    pub emit_debug_info: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            tiering: TieringConfig::default(),
            promoter: None,
            emit_debug_info: true,
        }
    }
}

impl CompilerOptions {
    /// Replace the tiering configuration
    pub fn with_tiering(mut self, tiering: TieringConfig) -> Self {
        self.tiering = tiering;
        self
    }

    /// Replace the promotion threshold
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.tiering = self.tiering.with_threshold(threshold);
        self
    }

    /// Enable promotion through `promoter`
    pub fn with_promoter(mut self, promoter: Arc<Promoter>) -> Self {
        self.promoter = Some(promoter);
        self
    }

    /// Toggle source span recording
    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.emit_debug_info = enabled;
        self
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("tiering", &self.tiering)
            .field("promoter", &self.promoter.is_some())
            .field("emit_debug_info", &self.emit_debug_info)
            .finish()
    }
}
