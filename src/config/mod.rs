// src/config/mod.rs

//! Option resolution.
//!
//! - `model.rs`: user-facing option layers and their merge rules.
//! - `loader.rs`: config file discovery and parsing.
//! - `manifest.rs`: the `package.json` fields that drive defaults.
//! - `entry.rs` / `workspace.rs`: entry and package expansion.
//! - `resolve.rs`: turns layers into independent [`ResolvedConfig`]s.

pub mod entry;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod resolve;
pub mod validate;
pub mod workspace;

pub use entry::EntryMap;
pub use loader::{load_config, load_from_path};
pub use manifest::PackageManifest;
pub use model::{EntrySpec, PluginSpec, SuccessCallback, UserOptions};
pub use resolve::{OnSuccess, ResolvedConfig, ResolvedOptions, resolve_options};
