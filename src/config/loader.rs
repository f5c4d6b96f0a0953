// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::manifest::{MANIFEST_FILE, PackageManifest};
use crate::config::model::RawConfigFile;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;

/// Conventional config file names, lowest priority first.
///
/// A `"tsforge"` key in `package.json` ranks below all of these.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["tsforge.config.json", "tsforge.config.toml", "tsforge.toml"];

/// A config file that was found and parsed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub raw: RawConfigFile,
    /// `None` when no config file was found.
    pub path: Option<PathBuf>,
}

/// Locate the highest-priority config file in `dir`.
pub fn find_config_file(fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
    for name in CONFIG_FILE_NAMES.iter().rev() {
        let candidate = dir.join(name);
        if fs.is_file(&candidate) {
            return Some(candidate);
        }
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    if fs.is_file(&manifest_path) {
        let has_key = fs
            .read_to_string(&manifest_path)
            .ok()
            .and_then(|s| PackageManifest::parse(&s, &manifest_path).ok())
            .is_some_and(|m| m.tsforge.is_some());
        if has_key {
            return Some(manifest_path);
        }
    }

    None
}

/// Parse one config file. The format follows the file extension; for
/// `package.json` only the `"tsforge"` key is read.
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path).map_err(|e| {
        BuildError::ConfigResolution(format!("cannot read config file {}: {e:#}", path.display()))
    })?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    let raw = if file_name == MANIFEST_FILE {
        let manifest = PackageManifest::parse(&contents, path)?;
        match manifest.tsforge {
            Some(value) => serde_json::from_value(value)?,
            None => RawConfigFile::default(),
        }
    } else if file_name.ends_with(".json") {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    Ok(raw)
}

/// Load the config for `cwd`.
///
/// - `explicit`: a path given by the caller; it must exist.
/// - `disabled`: skip discovery and return empty options.
pub fn load_config(
    fs: &dyn FileSystem,
    cwd: &Path,
    explicit: Option<&Path>,
    disabled: bool,
) -> Result<LoadedConfig> {
    if disabled {
        return Ok(LoadedConfig {
            raw: RawConfigFile::default(),
            path: None,
        });
    }

    let path = match explicit {
        Some(p) => {
            let p = if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };
            if !fs.is_file(&p) {
                return Err(BuildError::ConfigResolution(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            Some(p)
        }
        None => find_config_file(fs, cwd),
    };

    let Some(path) = path else {
        debug!(cwd = %cwd.display(), "no config file found; using defaults");
        return Ok(LoadedConfig {
            raw: RawConfigFile::default(),
            path: None,
        });
    };

    debug!(path = %path.display(), "loading config file");
    let raw = load_from_path(fs, &path)?;
    Ok(LoadedConfig { raw, path: Some(path) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::OutputFormat;

    #[test]
    fn toml_beats_json_and_package_json() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/package.json", r#"{ "tsforge": { "minify": true } }"#);
        fs.add_file("/p/tsforge.config.json", r#"{ "format": "cjs" }"#);
        fs.add_file("/p/tsforge.toml", "format = \"iife\"");

        let found = find_config_file(&fs, Path::new("/p")).unwrap();
        assert_eq!(found, PathBuf::from("/p/tsforge.toml"));

        let loaded = load_config(&fs, Path::new("/p"), None, false).unwrap();
        assert_eq!(loaded.raw.base.format, Some(vec![OutputFormat::Iife]));
    }

    #[test]
    fn package_json_key_is_used_as_last_resort() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/package.json", r#"{ "tsforge": { "minify": true } }"#);

        let loaded = load_config(&fs, Path::new("/p"), None, false).unwrap();
        assert_eq!(loaded.path, Some(PathBuf::from("/p/package.json")));
        assert_eq!(loaded.raw.base.minify, Some(true));
    }

    #[test]
    fn missing_explicit_config_is_a_resolution_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p");

        let err = load_config(&fs, Path::new("/p"), Some(Path::new("custom.toml")), false)
            .unwrap_err();
        assert!(matches!(err, BuildError::ConfigResolution(msg) if msg.contains("custom.toml")));
    }

    #[test]
    fn disabled_discovery_ignores_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/tsforge.toml", "minify = true");

        let loaded = load_config(&fs, Path::new("/p"), None, true).unwrap();
        assert!(loaded.path.is_none());
        assert_eq!(loaded.raw.base.minify, None);
    }
}
