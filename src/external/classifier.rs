// src/external/classifier.rs

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::trace;

use crate::config::ResolvedConfig;
use crate::errors::Result;
use crate::external::builtins::{has_builtin_prefix, is_node_builtin};
use crate::external::patterns::{PatternSet, matches_package};
use crate::fs::FileSystem;
use crate::types::Platform;

/// Outcome of classifying one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalDecision {
    /// Inline into the output.
    Bundle,
    /// Leave as a runtime import.
    External,
    /// Runtime built-in; always left as an import.
    Builtin,
}

impl ExternalDecision {
    pub fn is_external(self) -> bool {
        !matches!(self, ExternalDecision::Bundle)
    }
}

type CacheKey = (String, Option<PathBuf>);

/// Per-config predicate deciding which imports stay external.
///
/// Built once per config and shared by every format task of that config.
/// Decisions are memoized per (specifier, importer directory).
#[derive(Debug)]
pub struct ExternalClassifier {
    platform: Platform,
    cwd: PathBuf,
    external: PatternSet,
    no_external: PatternSet,
    skip_node_modules_bundle: bool,
    dependencies: Vec<String>,
    fs: Arc<dyn FileSystem>,
    cache: Mutex<HashMap<CacheKey, ExternalDecision>>,
}

impl ExternalClassifier {
    pub fn new(config: &ResolvedConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let dependencies = config
            .manifest
            .as_ref()
            .map(|m| m.external_dependency_names().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            platform: config.platform,
            cwd: config.cwd.clone(),
            external: PatternSet::parse(&config.external)?,
            no_external: PatternSet::parse(&config.no_external)?,
            skip_node_modules_bundle: config.skip_node_modules_bundle,
            dependencies,
            fs,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Working directory of the owning config.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_external(&self, specifier: &str, importer: Option<&Path>) -> bool {
        self.classify(specifier, importer).is_external()
    }

    pub fn classify(&self, specifier: &str, importer: Option<&Path>) -> ExternalDecision {
        let importer_dir = importer.and_then(|p| p.parent()).map(Path::to_path_buf);
        let key = (specifier.to_string(), importer_dir);

        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return *hit;
            }
        }

        let decision = self.decide(specifier, key.1.as_deref());
        trace!(specifier, ?decision, "classified import");

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, decision);
        }
        decision
    }

    fn decide(&self, specifier: &str, importer_dir: Option<&Path>) -> ExternalDecision {
        if has_builtin_prefix(specifier)
            || (self.platform == Platform::Node && is_node_builtin(specifier))
        {
            return ExternalDecision::Builtin;
        }

        if self.no_external.matches(specifier) {
            return ExternalDecision::Bundle;
        }

        if self.external.matches(specifier) {
            return ExternalDecision::External;
        }

        if self.skip_node_modules_bundle && self.resolves_into_node_modules(specifier, importer_dir) {
            return ExternalDecision::External;
        }

        if is_bare(specifier)
            && self
                .dependencies
                .iter()
                .any(|dep| matches_package(dep, specifier))
        {
            return ExternalDecision::External;
        }

        ExternalDecision::Bundle
    }

    fn resolves_into_node_modules(&self, specifier: &str, importer_dir: Option<&Path>) -> bool {
        let start = importer_dir.unwrap_or(&self.cwd);

        if !is_bare(specifier) {
            return normalize(&start.join(specifier))
                .components()
                .any(|c| matches!(c, Component::Normal(n) if n == "node_modules"));
        }

        let package = package_name(specifier);
        start
            .ancestors()
            .any(|dir| self.fs.is_dir(&dir.join("node_modules").join(package)))
    }
}

/// Engines running out of process receive the rules rather than the
/// predicate and apply the same precedence themselves.
impl Serialize for ExternalClassifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ExternalRules", 5)?;
        s.serialize_field("platform", &self.platform)?;
        s.serialize_field("noExternal", self.no_external.sources())?;
        s.serialize_field("external", self.external.sources())?;
        s.serialize_field("skipNodeModulesBundle", &self.skip_node_modules_bundle)?;
        s.serialize_field("dependencies", &self.dependencies)?;
        s.end()
    }
}

/// Not relative, not absolute.
fn is_bare(specifier: &str) -> bool {
    !(specifier.starts_with('.') || specifier.starts_with('/') || Path::new(specifier).is_absolute())
}

/// Lexically fold `.` and `..` so `../` out of a package leaves it.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`.
fn package_name(specifier: &str) -> &str {
    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let cut = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some(idx) => &specifier[..idx],
        None => specifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::manifest::PackageManifest;
    use crate::fs::mock::MockFileSystem;

    fn config(platform: Platform) -> ResolvedConfig {
        let manifest = PackageManifest::parse(
            r#"{ "dependencies": { "react": "18" }, "peerDependencies": { "vue": "3" },
                 "devDependencies": { "vitest": "1" } }"#,
            "/p/package.json",
        )
        .unwrap();
        let mut cfg = ResolvedConfig::new("p", "/p");
        cfg.platform = platform;
        cfg.manifest = Some(Arc::new(manifest));
        cfg
    }

    fn classifier(cfg: &ResolvedConfig, fs: MockFileSystem) -> ExternalClassifier {
        ExternalClassifier::new(cfg, Arc::new(fs)).unwrap()
    }

    #[test]
    fn builtins_are_recognised_per_platform() {
        let node = classifier(&config(Platform::Node), MockFileSystem::new());
        assert_eq!(node.classify("fs", None), ExternalDecision::Builtin);
        assert_eq!(node.classify("node:fs", None), ExternalDecision::Builtin);

        let browser = classifier(&config(Platform::Browser), MockFileSystem::new());
        assert_eq!(browser.classify("fs", None), ExternalDecision::Bundle);
        assert_eq!(browser.classify("node:fs", None), ExternalDecision::Builtin);
    }

    #[test]
    fn dependencies_and_peers_are_external_dev_deps_are_not() {
        let c = classifier(&config(Platform::Neutral), MockFileSystem::new());
        assert!(c.is_external("react", None));
        assert!(c.is_external("react/jsx-runtime", None));
        assert!(c.is_external("vue", None));
        assert!(!c.is_external("vitest", None));
        assert!(!c.is_external("./react", None));
    }

    #[test]
    fn no_external_beats_external_and_dependencies() {
        let mut cfg = config(Platform::Node);
        cfg.external = vec!["lodash".into()];
        cfg.no_external = vec!["react".into(), "lodash".into(), "fs".into()];
        let c = classifier(&cfg, MockFileSystem::new());
        assert_eq!(c.classify("react", None), ExternalDecision::Bundle);
        assert_eq!(c.classify("lodash", None), ExternalDecision::Bundle);
        assert_eq!(c.classify("fs", None), ExternalDecision::Builtin);
    }

    #[test]
    fn skip_node_modules_bundle_walks_up_from_importer() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p/node_modules/@scope/util");
        fs.add_file("/p/src/deep/a.ts", "");

        let mut cfg = config(Platform::Neutral);
        cfg.skip_node_modules_bundle = true;
        let c = classifier(&cfg, fs);

        let importer = Path::new("/p/src/deep/a.ts");
        assert!(c.is_external("@scope/util/helpers", Some(importer)));
        assert!(!c.is_external("@scope/other", Some(importer)));
        assert!(c.is_external("../../node_modules/x/index.js", Some(importer)));
    }

    #[test]
    fn relative_imports_resolve_against_the_importer() {
        let mut cfg = config(Platform::Neutral);
        cfg.skip_node_modules_bundle = true;
        let c = classifier(&cfg, MockFileSystem::new());

        let inside = Path::new("/p/node_modules/x/index.js");
        assert_eq!(c.classify("./util.js", Some(inside)), ExternalDecision::External);
        assert_eq!(c.classify("../../src/a.js", Some(inside)), ExternalDecision::Bundle);

        let outside = Path::new("/p/src/index.ts");
        assert_eq!(c.classify("./util.js", Some(outside)), ExternalDecision::Bundle);
        assert_eq!(c.classify("/p/node_modules/y/z.js", Some(outside)), ExternalDecision::External);
        // Without an importer, relative specifiers resolve from cwd.
        assert_eq!(c.classify("./node_modules/y/z.js", None), ExternalDecision::External);
    }

    #[test]
    fn package_name_handles_scopes() {
        assert_eq!(package_name("@a/b/c"), "@a/b");
        assert_eq!(package_name("a/b"), "a");
        assert_eq!(package_name("a"), "a");
        assert_eq!(package_name("@a"), "@a");
    }

    #[test]
    fn decisions_are_cached_per_importer_dir() {
        let cfg = config(Platform::Neutral);
        let c = classifier(&cfg, MockFileSystem::new());
        c.classify("react", Some(Path::new("/p/src/a.ts")));
        c.classify("react", Some(Path::new("/p/src/b.ts")));
        c.classify("react", Some(Path::new("/p/lib/a.ts")));
        assert_eq!(c.cache.lock().unwrap().len(), 2);
    }
}
