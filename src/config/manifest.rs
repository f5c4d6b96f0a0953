// src/config/manifest.rs

//! `package.json` model.
//!
//! Only the fields the orchestrator consults are modelled: dependency name
//! sets for external classification, the module-type hint for file
//! extensions, and `engines` / `browser` / `bin` / `types` for defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::types::Platform;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,

    /// `"module"` or `"commonjs"`.
    #[serde(default, rename = "type")]
    pub module_type: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub engines: BTreeMap<String, String>,

    #[serde(default)]
    pub main: Option<String>,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub types: Option<String>,

    #[serde(default)]
    pub typings: Option<String>,

    #[serde(default)]
    pub exports: Option<serde_json::Value>,

    #[serde(default)]
    pub browser: Option<serde_json::Value>,

    #[serde(default)]
    pub bin: Option<serde_json::Value>,

    /// Embedded tool configuration (lowest-priority config source).
    #[serde(default)]
    pub tsforge: Option<serde_json::Value>,

    /// Where this manifest was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl PackageManifest {
    pub fn parse(contents: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: PackageManifest = serde_json::from_str(contents)?;
        manifest.path = path.into();
        Ok(manifest)
    }

    /// Read `<dir>/package.json` if it exists.
    pub fn find_in(fs: &dyn FileSystem, dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !fs.is_file(&path) {
            return Ok(None);
        }
        let contents = fs
            .read_to_string(&path)
            .map_err(|e| BuildError::ConfigResolution(format!("{e:#}")))?;
        Self::parse(&contents, path).map(Some)
    }

    /// True when `"type": "module"`.
    pub fn is_module(&self) -> bool {
        self.module_type.as_deref() == Some("module")
    }

    /// Runtime + peer dependency names; these are left external.
    pub fn external_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
    }

    pub fn declares_types(&self) -> bool {
        self.types.is_some() || self.typings.is_some()
    }

    /// Platform implied by the manifest, if any.
    pub fn platform_hint(&self) -> Option<Platform> {
        if self.browser.is_some() {
            Some(Platform::Browser)
        } else if self.engines.contains_key("node") || self.bin.is_some() {
            Some(Platform::Node)
        } else {
            None
        }
    }

    /// `engines.node = ">=18.12.0"` -> `node18.12.0`.
    pub fn node_target(&self) -> Option<String> {
        let range = self.engines.get("node")?;
        let version: String = range
            .trim()
            .trim_start_matches(|c: char| matches!(c, '>' | '=' | '^' | '~' | 'v' | ' '))
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let version = version.trim_end_matches('.');
        if version.is_empty() {
            None
        } else {
            Some(format!("node{version}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::parse(json, "/p/package.json").unwrap()
    }

    #[test]
    fn node_target_is_read_from_engine_range() {
        let m = manifest(r#"{ "engines": { "node": ">=18.12.0" } }"#);
        assert_eq!(m.node_target().as_deref(), Some("node18.12.0"));
        assert_eq!(m.platform_hint(), Some(Platform::Node));

        let m = manifest(r#"{ "engines": { "node": "*" } }"#);
        assert_eq!(m.node_target(), None);
    }

    #[test]
    fn external_names_include_peers_but_not_dev() {
        let m = manifest(
            r#"{
                "dependencies": { "a": "1" },
                "peerDependencies": { "b": "1" },
                "devDependencies": { "c": "1" }
            }"#,
        );
        let names: Vec<&str> = m.external_dependency_names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn browser_field_wins_over_engines() {
        let m = manifest(r#"{ "browser": "./b.js", "engines": { "node": ">=20" } }"#);
        assert_eq!(m.platform_hint(), Some(Platform::Browser));
    }
}
