// src/external/mod.rs

//! Decides, per import, whether a module is bundled or left external.

pub mod builtins;
pub mod classifier;
pub mod patterns;

pub use classifier::{ExternalClassifier, ExternalDecision};
pub use patterns::{Pattern, PatternSet};
