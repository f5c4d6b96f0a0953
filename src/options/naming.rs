// src/options/naming.rs

//! Output file naming.

use crate::config::ResolvedConfig;
use crate::types::OutputFormat;

/// JavaScript extension for `format`, including the leading dot.
///
/// | fixed_extension | package `type` | esm     | cjs     |
/// |-----------------|----------------|---------|---------|
/// | true            | any            | `.mjs`  | `.cjs`  |
/// | false           | `module`       | `.js`   | `.cjs`  |
/// | false           | other          | `.mjs`  | `.js`   |
///
/// IIFE and UMD always use `.iife.js` / `.umd.js`.
pub fn js_extension(format: OutputFormat, fixed_extension: bool, module_package: bool) -> &'static str {
    match format {
        OutputFormat::Iife => ".iife.js",
        OutputFormat::Umd => ".umd.js",
        OutputFormat::Esm if fixed_extension => ".mjs",
        OutputFormat::Cjs if fixed_extension => ".cjs",
        OutputFormat::Esm if module_package => ".js",
        OutputFormat::Cjs if module_package => ".cjs",
        OutputFormat::Esm => ".mjs",
        OutputFormat::Cjs => ".js",
    }
}

/// Declaration extension paired with a JavaScript extension.
pub fn dts_extension(js_ext: &str) -> &'static str {
    match js_ext {
        ".mjs" => ".d.mts",
        ".cjs" => ".d.cts",
        _ => ".d.ts",
    }
}

/// Entry and chunk file name templates handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNames {
    pub entry: String,
    pub chunk: String,
}

pub fn file_names(config: &ResolvedConfig, format: OutputFormat) -> FileNames {
    let ext = js_extension(format, config.fixed_extension, config.is_module_package());
    FileNames {
        entry: format!("[name]{ext}"),
        chunk: format!("[name]-[hash]{ext}"),
    }
}
