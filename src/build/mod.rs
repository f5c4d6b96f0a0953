// src/build/mod.rs

//! Single-config build driver.
//!
//! A cycle runs `build:prepare`, cleans once, compiles every format
//! concurrently, then runs post-steps, `build:done` and the success action.

pub mod clean;
pub mod context;
pub mod driver;
pub mod post_steps;

pub use clean::{CleanCell, FsCleaner, OutputCleaner};
pub use context::{BuildContext, CycleState};
pub use driver::{BuildDriver, BuildServices, CycleOutcome, RebuildHandle, build};
