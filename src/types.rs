use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output module convention for one compiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "es", alias = "module")]
    Esm,
    #[serde(alias = "commonjs")]
    Cjs,
    Iife,
    Umd,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
            OutputFormat::Iife => "iife",
            OutputFormat::Umd => "umd",
        }
    }

    /// Formats that expose a global variable and therefore take a `name`.
    pub fn uses_global_name(self) -> bool {
        matches!(self, OutputFormat::Iife | OutputFormat::Umd)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "esm" | "es" | "module" => Ok(OutputFormat::Esm),
            "cjs" | "commonjs" => Ok(OutputFormat::Cjs),
            "iife" => Ok(OutputFormat::Iife),
            "umd" => Ok(OutputFormat::Umd),
            other => Err(format!(
                "invalid format: {other} (expected \"esm\", \"cjs\", \"iife\" or \"umd\")"
            )),
        }
    }
}

/// Runtime the output is meant to execute in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Node,
    Browser,
    Neutral,
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Neutral
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "node" => Ok(Platform::Node),
            "browser" => Ok(Platform::Browser),
            "neutral" => Ok(Platform::Neutral),
            other => Err(format!(
                "invalid platform: {other} (expected \"node\", \"browser\" or \"neutral\")"
            )),
        }
    }
}

/// Source map emission mode handed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    Off,
    On,
    Inline,
    Hidden,
}

impl Default for SourceMapMode {
    fn default() -> Self {
        SourceMapMode::Off
    }
}

impl FromStr for SourceMapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "false" | "off" => Ok(SourceMapMode::Off),
            "true" | "on" => Ok(SourceMapMode::On),
            "inline" => Ok(SourceMapMode::Inline),
            "hidden" => Ok(SourceMapMode::Hidden),
            other => Err(format!(
                "invalid sourcemap mode: {other} (expected true, false, \"inline\" or \"hidden\")"
            )),
        }
    }
}

/// Which formats get a declaration emission pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DtsMode {
    #[default]
    Off,
    /// Declarations for every built format that supports them.
    On,
    /// Declarations only for the listed formats.
    Formats(Vec<OutputFormat>),
}

impl DtsMode {
    pub fn applies_to(&self, format: OutputFormat) -> bool {
        let supported = matches!(format, OutputFormat::Esm | OutputFormat::Cjs);
        match self {
            DtsMode::Off => false,
            DtsMode::On => supported,
            DtsMode::Formats(list) => supported && list.contains(&format),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, DtsMode::Off)
    }
}

/// How the reserved `node:` prefix is normalised on built-in imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeProtocolMode {
    /// `fs` -> `node:fs`
    Add,
    /// `node:fs` -> `fs`
    Strip,
}

impl FromStr for NodeProtocolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "add" => Ok(NodeProtocolMode::Add),
            "strip" => Ok(NodeProtocolMode::Strip),
            other => Err(format!(
                "invalid node_protocol: {other} (expected true or \"strip\")"
            )),
        }
    }
}

/// Which files are removed from the output directory before a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanMode {
    Off,
    /// Remove everything inside the output directory.
    All,
    /// Remove only paths under the output directory matching these globs.
    Patterns(Vec<String>),
}

impl Default for CleanMode {
    fn default() -> Self {
        CleanMode::All
    }
}

/// Watch configuration after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchMode {
    #[default]
    Off,
    /// Watch the config's working directory.
    Cwd,
    /// Watch these paths (relative to cwd) instead of the working directory.
    Paths(Vec<String>),
}

impl WatchMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WatchMode::Off)
    }
}
