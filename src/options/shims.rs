// src/options/shims.rs

use serde::Serialize;

use crate::types::{OutputFormat, Platform};

/// A global injected so code written for one module system runs in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shim {
    #[serde(rename = "__dirname")]
    Dirname,
    #[serde(rename = "__filename")]
    Filename,
    #[serde(rename = "import.meta.url")]
    ImportMetaUrl,
    #[serde(rename = "import.meta.dirname")]
    ImportMetaDirname,
    #[serde(rename = "import.meta.filename")]
    ImportMetaFilename,
}

/// Shims for a primary pass. Combinations not listed inject nothing.
///
/// - ESM on node with `shims = true`: `__dirname`, `__filename`
/// - CJS on node: the `import.meta` trio, regardless of `shims`
pub fn shims_for(format: OutputFormat, platform: Platform, shims: bool) -> Vec<Shim> {
    match (format, platform) {
        (OutputFormat::Esm, Platform::Node) if shims => vec![Shim::Dirname, Shim::Filename],
        (OutputFormat::Cjs, Platform::Node) => vec![
            Shim::ImportMetaUrl,
            Shim::ImportMetaDirname,
            Shim::ImportMetaFilename,
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix() {
        assert_eq!(
            shims_for(OutputFormat::Esm, Platform::Node, true),
            vec![Shim::Dirname, Shim::Filename]
        );
        assert!(shims_for(OutputFormat::Esm, Platform::Node, false).is_empty());
        assert_eq!(shims_for(OutputFormat::Cjs, Platform::Node, false).len(), 3);
        assert!(shims_for(OutputFormat::Cjs, Platform::Browser, true).is_empty());
        assert!(shims_for(OutputFormat::Iife, Platform::Node, true).is_empty());
    }
}
