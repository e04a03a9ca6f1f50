//! Adaptive promotion for interpreted closures
//!
//! This crate provides:
//! - [`PromotionState`]: per-unit invocation counting, a single-writer claim
//!   flag and the list of live activations waiting for an upgrade
//! - [`Promoter`]: a background worker that hands hot lambda trees to a
//!   [`NativeCompiler`] and publishes the result
//! - [`TieringConfig`]: the compilation threshold
//!
//! # Example
//!
//! ```
//! use tiering::{PromotionState, TieringConfig};
//!
//! let config = TieringConfig::default().with_threshold(2);
//! let state = PromotionState::new(config.compilation_threshold);
//!
//! assert!(!state.record_invocation());
//! assert!(state.record_invocation()); // second call crosses the threshold
//! assert!(!state.record_invocation()); // the claim is only won once
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod promoter;
pub mod service;
pub mod state;

pub use config::{TieringConfig, DEFAULT_COMPILATION_THRESHOLD, THRESHOLD_ENV_VAR};
pub use promoter::{CompileRequest, Promoter, PromoterStats};
pub use service::{NativeCode, NativeCompiler};
pub use state::{Promotable, PromotionState};
