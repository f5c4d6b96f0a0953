// src/build/post_steps.rs

//! Steps run after every format compiled: manifest lint, then asset copy.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::config::model::CopySpec;
use crate::errors::{BuildError, Result};
use crate::fs::{FileSystem, walk_files};
use crate::types::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintMessage {
    pub level: LintLevel,
    pub message: String,
}

/// Check that the paths `package.json` publishes point at files that exist
/// after the build.
pub fn lint_manifest(fs: &dyn FileSystem, config: &ResolvedConfig) -> Vec<LintMessage> {
    let Some(manifest) = config.manifest.as_deref() else {
        return Vec::new();
    };
    let mut messages = Vec::new();

    let mut check = |field: &str, rel: &str| {
        let path = config.cwd.join(rel.trim_start_matches("./"));
        if !fs.is_file(&path) {
            messages.push(LintMessage {
                level: LintLevel::Error,
                message: format!("`{field}` points to {rel}, which does not exist"),
            });
        }
    };

    for (field, value) in [
        ("main", &manifest.main),
        ("module", &manifest.module),
        ("types", &manifest.types),
        ("typings", &manifest.typings),
    ] {
        if let Some(rel) = value {
            check(field, rel);
        }
    }

    if let Some(exports) = &manifest.exports {
        let mut targets = Vec::new();
        collect_export_targets(exports, &mut targets);
        for rel in targets.iter().filter(|t| !t.contains('*')) {
            check("exports", rel);
        }
    }

    if manifest.is_module() {
        if let Some(main) = &manifest.main {
            if main.ends_with(".js") && config.formats == [OutputFormat::Cjs] {
                messages.push(LintMessage {
                    level: LintLevel::Warning,
                    message: format!("`main` is {main} in a \"type\": \"module\" package but only CommonJS is built"),
                });
            }
        }
    }

    messages
}

fn collect_export_targets(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if s.starts_with("./") => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_export_targets(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_export_targets(v, out)),
        _ => {}
    }
}

/// Run the manifest lint and turn errors into a failed post-step.
pub fn run_publint(fs: &dyn FileSystem, config: &ResolvedConfig) -> Result<()> {
    let messages = lint_manifest(fs, config);
    let mut errors = Vec::new();
    for m in messages {
        match m.level {
            LintLevel::Warning => warn!(config = %config.name, "publint: {}", m.message),
            LintLevel::Error => errors.push(m.message),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BuildError::PostStep(format!("publint: {}", errors.join("; "))))
    }
}

/// Copy configured files and directories into the output directory.
pub fn copy_assets(fs: &dyn FileSystem, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();

    for spec in &config.copy {
        let (from, to) = match spec {
            CopySpec::Path(p) => (p.as_str(), None),
            CopySpec::Entry { from, to } => (from.as_str(), to.as_deref()),
        };
        let src = config.cwd.join(from);
        let dest_base = match to {
            Some(to) => config.out_dir.join(to),
            None => config.out_dir.join(
                Path::new(from)
                    .file_name()
                    .ok_or_else(|| BuildError::PostStep(format!("cannot copy {from}: no file name")))?,
            ),
        };

        if fs.is_dir(&src) {
            let files = walk_files(fs, &src, |_| false)
                .map_err(|e| BuildError::PostStep(format!("copy {from}: {e:#}")))?;
            for file in files {
                let rel = file.strip_prefix(&src).unwrap_or(&file);
                let dest = dest_base.join(rel);
                fs.copy(&file, &dest)
                    .map_err(|e| BuildError::PostStep(format!("copy {from}: {e:#}")))?;
                copied.push(dest);
            }
        } else if fs.is_file(&src) {
            fs.copy(&src, &dest_base)
                .map_err(|e| BuildError::PostStep(format!("copy {from}: {e:#}")))?;
            copied.push(dest_base);
        } else {
            return Err(BuildError::PostStep(format!(
                "copy source does not exist: {}",
                src.display()
            )));
        }
    }

    if !copied.is_empty() {
        info!(config = %config.name, files = copied.len(), "copied assets");
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageManifest;
    use crate::fs::mock::MockFileSystem;
    use std::sync::Arc;

    fn config_with_manifest(json: &str) -> ResolvedConfig {
        let mut cfg = ResolvedConfig::new("p", "/p");
        cfg.manifest = Some(Arc::new(PackageManifest::parse(json, "/p/package.json").unwrap()));
        cfg
    }

    #[test]
    fn missing_published_files_are_errors() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/index.mjs", "");
        let cfg = config_with_manifest(
            r#"{ "main": "./dist/index.mjs",
                 "exports": { ".": { "import": "./dist/index.mjs", "require": "./dist/index.js" } } }"#,
        );

        let messages = lint_manifest(&fs, &cfg);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.contains("./dist/index.js"));
        assert!(matches!(run_publint(&fs, &cfg), Err(BuildError::PostStep(_))));
    }

    #[test]
    fn copies_files_and_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/README.md", "hi");
        fs.add_file("/p/assets/img/logo.svg", "<svg/>");
        let mut cfg = ResolvedConfig::new("p", "/p");
        cfg.copy = vec![
            CopySpec::Path("README.md".into()),
            CopySpec::Entry {
                from: "assets".into(),
                to: Some("static".into()),
            },
        ];

        let copied = copy_assets(&fs, &cfg).unwrap();
        assert_eq!(
            copied,
            vec![
                PathBuf::from("/p/dist/README.md"),
                PathBuf::from("/p/dist/static/img/logo.svg")
            ]
        );
        assert_eq!(fs.read_to_string(Path::new("/p/dist/static/img/logo.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn missing_copy_source_fails() {
        let fs = MockFileSystem::new();
        let mut cfg = ResolvedConfig::new("p", "/p");
        cfg.copy = vec![CopySpec::Path("nope".into())];
        assert!(copy_assets(&fs, &cfg).is_err());
    }
}
