// src/config/entry.rs

//! Entry point resolution: plain paths, globs and named maps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::EntrySpec;
use crate::errors::{BuildError, Result};
use crate::fs::{FileSystem, walk_files};
use crate::watch::path_utils::relative_str;

/// Logical entry name -> source file path.
pub type EntryMap = BTreeMap<String, PathBuf>;

/// Files tried, in order, when no entry is configured.
pub const DEFAULT_ENTRIES: [&str; 4] = ["src/index.ts", "src/index.tsx", "src/index.mts", "src/index.js"];

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Resolve the configured entries against `cwd`.
pub fn resolve_entries(fs: &dyn FileSystem, cwd: &Path, spec: Option<&EntrySpec>) -> Result<EntryMap> {
    let spec = match spec {
        Some(spec) => spec,
        None => return default_entry(fs, cwd),
    };

    match spec {
        EntrySpec::Map(map) => {
            let mut entries = EntryMap::new();
            for (name, path) in map {
                entries.insert(name.clone(), require_file(fs, cwd, path)?);
            }
            Ok(entries)
        }
        EntrySpec::Single(item) => resolve_list(fs, cwd, std::slice::from_ref(item)),
        EntrySpec::List(items) => resolve_list(fs, cwd, items),
    }
}

fn default_entry(fs: &dyn FileSystem, cwd: &Path) -> Result<EntryMap> {
    for candidate in DEFAULT_ENTRIES {
        let path = cwd.join(candidate);
        if fs.is_file(&path) {
            debug!(entry = %path.display(), "using default entry");
            return Ok(EntryMap::from([("index".to_string(), path)]));
        }
    }
    Err(BuildError::InvalidOption(format!(
        "no entry configured and none of {} exists in {}",
        DEFAULT_ENTRIES.join(", "),
        cwd.display()
    )))
}

fn require_file(fs: &dyn FileSystem, cwd: &Path, rel: &str) -> Result<PathBuf> {
    let path = cwd.join(rel);
    if fs.is_file(&path) {
        Ok(path)
    } else {
        Err(BuildError::InvalidOption(format!(
            "entry file does not exist: {}",
            path.display()
        )))
    }
}

fn resolve_list(fs: &dyn FileSystem, cwd: &Path, items: &[String]) -> Result<EntryMap> {
    let mut entries = EntryMap::new();
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for item in items {
        if let Some(neg) = item.strip_prefix('!') {
            negative.push(neg.to_string());
        } else if is_glob(item) {
            positive.push(item.clone());
        } else {
            let path = require_file(fs, cwd, item)?;
            let name = file_stem(&path);
            insert_unique(&mut entries, name, path)?;
        }
    }

    if !positive.is_empty() {
        let matches = glob_files(fs, cwd, &positive, &negative)?;
        if matches.is_empty() {
            return Err(BuildError::InvalidOption(format!(
                "entry patterns {:?} matched no files in {}",
                positive,
                cwd.display()
            )));
        }

        let base = common_dir(&matches);
        for path in matches {
            let rel = path.strip_prefix(&base).unwrap_or(&path);
            let name = strip_extension(&rel.to_string_lossy().replace('\\', "/"));
            insert_unique(&mut entries, name, path)?;
        }
    }

    if entries.is_empty() {
        return Err(BuildError::InvalidOption("entry list is empty".to_string()));
    }

    Ok(entries)
}

fn insert_unique(entries: &mut EntryMap, name: String, path: PathBuf) -> Result<()> {
    if let Some(existing) = entries.get(&name) {
        if *existing != path {
            return Err(BuildError::InvalidOption(format!(
                "entries {} and {} both map to output name '{}'; use an entry map to name them",
                existing.display(),
                path.display(),
                name
            )));
        }
    }
    entries.insert(name, path);
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| BuildError::InvalidOption(format!("invalid entry pattern {pat}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::InvalidOption(format!("invalid entry patterns: {e}")))
}

fn glob_files(fs: &dyn FileSystem, cwd: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let include = build_globset(include)?;
    let exclude = build_globset(exclude)?;

    let files = walk_files(fs, cwd, |dir| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == "node_modules" || n.starts_with('.'))
    })?;

    Ok(files
        .into_iter()
        .filter(|path| {
            relative_str(cwd, path)
                .is_some_and(|rel| include.is_match(&rel) && !exclude.is_match(&rel))
        })
        .collect())
}

fn file_stem(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("index");
    strip_extension(name)
}

/// `utils/a.test.ts` -> `utils/a.test`; declaration files lose both parts.
fn strip_extension(name: &str) -> String {
    for ext in [".d.ts", ".d.mts", ".d.cts"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    match name.rfind('.') {
        Some(idx) if idx > name.rfind('/').map_or(0, |s| s + 1) => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

/// Deepest directory containing every path.
fn common_dir(paths: &[PathBuf]) -> PathBuf {
    let mut base = match paths.first().and_then(|p| p.parent()) {
        Some(p) => p.to_path_buf(),
        None => return PathBuf::new(),
    };
    for path in &paths[1..] {
        while !path.starts_with(&base) {
            if !base.pop() {
                return PathBuf::new();
            }
        }
    }
    base
}
