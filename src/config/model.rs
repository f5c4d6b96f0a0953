// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::resolve::ResolvedConfig;
use crate::types::{
    CleanMode, DtsMode, NodeProtocolMode, OutputFormat, Platform, SourceMapMode, WatchMode,
};

/// Top-level configuration as read from a config file.
///
/// ```toml
/// entry = ["src/index.ts"]
/// format = ["esm", "cjs"]
/// dts = true
///
/// [[configs]]
/// name = "cli"
/// entry = { cli = "src/cli.ts" }
/// platform = "node"
/// ```
///
/// Top-level keys are shared by every `[[configs]]` entry; without
/// `[[configs]]` the top-level keys form the single config.
///
/// A config may instead name its entry groups, one plan per group:
///
/// ```toml
/// [entry_groups]
/// lib = ["src/index.ts"]
/// cli = { cli = "src/cli.ts" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(flatten)]
    pub base: UserOptions,

    #[serde(default)]
    pub configs: Vec<UserOptions>,
}

/// User-facing options, as written in a config file or passed
/// programmatically. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserOptions {
    /// Explicit config file path. Programmatic only.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Skip config file discovery entirely. Programmatic only.
    #[serde(skip)]
    pub no_config: bool,

    /// Working directory. Programmatic only; workspace expansion sets it per package.
    #[serde(skip)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub entry: Option<EntrySpec>,

    /// Named entry groups; each becomes its own config building into
    /// `<out_dir>/<group>`. Mutually exclusive with `entry`.
    #[serde(default, alias = "entryGroups")]
    pub entry_groups: BTreeMap<String, EntrySpec>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub format: Option<Vec<OutputFormat>>,

    #[serde(default, alias = "outDir")]
    pub out_dir: Option<PathBuf>,

    #[serde(default)]
    pub platform: Option<Platform>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub target: Option<Vec<String>>,

    #[serde(default)]
    pub sourcemap: Option<FlagOr<String>>,

    #[serde(default)]
    pub minify: Option<bool>,

    #[serde(default)]
    pub dts: Option<FlagOr<Vec<OutputFormat>>>,

    #[serde(default)]
    pub treeshake: Option<bool>,

    #[serde(default)]
    pub external: Vec<String>,

    #[serde(default, alias = "noExternal")]
    pub no_external: Vec<String>,

    /// Leave everything resolved under `node_modules` external.
    #[serde(default, alias = "skipNodeModulesBundle")]
    pub skip_node_modules_bundle: Option<bool>,

    #[serde(default)]
    pub plugins: Vec<PluginSpec>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub define: BTreeMap<String, String>,

    #[serde(default)]
    pub alias: BTreeMap<String, String>,

    /// Shell command run after every successful cycle.
    #[serde(default, alias = "onSuccess")]
    pub on_success: Option<String>,

    /// In-process success callback. Programmatic only; wins over `on_success`.
    #[serde(skip)]
    pub on_success_callback: Option<SuccessCallback>,

    #[serde(default)]
    pub watch: Option<FlagOr<Vec<String>>>,

    #[serde(default, alias = "ignoreWatch")]
    pub ignore_watch: Vec<String>,

    #[serde(default)]
    pub clean: Option<FlagOr<Vec<String>>>,

    #[serde(default, alias = "fixedExtension")]
    pub fixed_extension: Option<bool>,

    #[serde(default, alias = "globalName")]
    pub global_name: Option<String>,

    #[serde(default)]
    pub shims: Option<bool>,

    #[serde(default, alias = "nodeProtocol")]
    pub node_protocol: Option<FlagOr<String>>,

    /// Report exports that no entry consumes.
    #[serde(default)]
    pub unused: Option<bool>,

    #[serde(default)]
    pub publint: Option<bool>,

    #[serde(default)]
    pub report: Option<bool>,

    #[serde(default)]
    pub silent: Option<bool>,

    #[serde(default)]
    pub copy: Vec<CopySpec>,

    /// Skip rebuilds when a changed file's content hash is unchanged.
    #[serde(default)]
    pub hash: Option<bool>,

    #[serde(default, alias = "inputOptions")]
    pub input_options: BTreeMap<OutputFormat, InputOverride>,

    #[serde(default, alias = "outputOptions")]
    pub output_options: BTreeMap<OutputFormat, OutputOverride>,

    /// Command used to invoke the compilation engine.
    #[serde(default)]
    pub engine: Option<String>,

    /// Glob patterns selecting package directories (each needs a package.json).
    #[serde(default)]
    pub workspace: Option<Vec<String>>,
}

/// Entry points: a single path, a list of paths/globs, or a name -> path map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    Single(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// A value that is either a boolean switch or a richer setting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlagOr<T> {
    Flag(bool),
    Value(T),
}

/// A user plugin reference handed to the engine after the built-in stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Name(String),
    WithOptions {
        name: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl PluginSpec {
    pub fn name(&self) -> &str {
        match self {
            PluginSpec::Name(name) => name,
            PluginSpec::WithOptions { name, .. } => name,
        }
    }
}

/// A file or directory copied into the output directory after a build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CopySpec {
    Path(String),
    Entry { from: String, to: Option<String> },
}

/// Per-format input overrides, applied after assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InputOverride {
    #[serde(default)]
    pub treeshake: Option<bool>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub define: BTreeMap<String, String>,
    #[serde(default)]
    pub alias: BTreeMap<String, String>,
}

/// Per-format output overrides, applied after assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputOverride {
    #[serde(default)]
    pub minify: Option<bool>,
    #[serde(default)]
    pub sourcemap: Option<FlagOr<String>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub target: Option<Vec<String>>,
    #[serde(default, alias = "globalName")]
    pub name: Option<String>,
    #[serde(default, alias = "entryFileNames")]
    pub entry_file_names: Option<String>,
    #[serde(default, alias = "chunkFileNames")]
    pub chunk_file_names: Option<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

type SuccessFn = dyn Fn(&ResolvedConfig) -> anyhow::Result<()> + Send + Sync;

/// Programmatic success callback.
#[derive(Clone)]
pub struct SuccessCallback(pub Arc<SuccessFn>);

impl SuccessCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ResolvedConfig) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, config: &ResolvedConfig) -> anyhow::Result<()> {
        (self.0)(config)
    }
}

impl fmt::Debug for SuccessCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SuccessCallback(..)")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    }))
}

impl UserOptions {
    /// Layer `over` on top of `self`.
    ///
    /// - scalars: `over` wins when set
    /// - lists: `self` then `over`
    /// - maps: union, `over` wins per key
    pub fn merge(self, over: UserOptions) -> UserOptions {
        UserOptions {
            config: over.config.or(self.config),
            no_config: over.no_config || self.no_config,
            cwd: over.cwd.or(self.cwd),
            name: over.name.or(self.name),
            entry: merge_entries(self.entry, over.entry),
            entry_groups: union(self.entry_groups, over.entry_groups),
            format: merge_formats(self.format, over.format),
            out_dir: over.out_dir.or(self.out_dir),
            platform: over.platform.or(self.platform),
            target: merge_opt_lists(self.target, over.target),
            sourcemap: over.sourcemap.or(self.sourcemap),
            minify: over.minify.or(self.minify),
            dts: over.dts.or(self.dts),
            treeshake: over.treeshake.or(self.treeshake),
            external: concat(self.external, over.external),
            no_external: concat(self.no_external, over.no_external),
            skip_node_modules_bundle: over
                .skip_node_modules_bundle
                .or(self.skip_node_modules_bundle),
            plugins: concat(self.plugins, over.plugins),
            env: union(self.env, over.env),
            define: union(self.define, over.define),
            alias: union(self.alias, over.alias),
            on_success: over.on_success.or(self.on_success),
            on_success_callback: over.on_success_callback.or(self.on_success_callback),
            watch: over.watch.or(self.watch),
            ignore_watch: concat(self.ignore_watch, over.ignore_watch),
            clean: over.clean.or(self.clean),
            fixed_extension: over.fixed_extension.or(self.fixed_extension),
            global_name: over.global_name.or(self.global_name),
            shims: over.shims.or(self.shims),
            node_protocol: over.node_protocol.or(self.node_protocol),
            unused: over.unused.or(self.unused),
            publint: over.publint.or(self.publint),
            report: over.report.or(self.report),
            silent: over.silent.or(self.silent),
            copy: concat(self.copy, over.copy),
            hash: over.hash.or(self.hash),
            input_options: union(self.input_options, over.input_options),
            output_options: union(self.output_options, over.output_options),
            engine: over.engine.or(self.engine),
            workspace: over.workspace.or(self.workspace),
        }
    }

    pub fn sourcemap_mode(&self) -> Result<SourceMapMode, String> {
        sourcemap_from(self.sourcemap.as_ref())
    }

    pub fn dts_mode(&self) -> DtsMode {
        match &self.dts {
            None | Some(FlagOr::Flag(false)) => DtsMode::Off,
            Some(FlagOr::Flag(true)) => DtsMode::On,
            Some(FlagOr::Value(formats)) => DtsMode::Formats(formats.clone()),
        }
    }

    pub fn node_protocol_mode(&self) -> Result<Option<NodeProtocolMode>, String> {
        match &self.node_protocol {
            None | Some(FlagOr::Flag(false)) => Ok(None),
            Some(FlagOr::Flag(true)) => Ok(Some(NodeProtocolMode::Add)),
            Some(FlagOr::Value(s)) => s.parse().map(Some),
        }
    }

    pub fn clean_mode(&self) -> CleanMode {
        match &self.clean {
            None | Some(FlagOr::Flag(true)) => CleanMode::All,
            Some(FlagOr::Flag(false)) => CleanMode::Off,
            Some(FlagOr::Value(patterns)) if patterns.is_empty() => CleanMode::Off,
            Some(FlagOr::Value(patterns)) => CleanMode::Patterns(patterns.clone()),
        }
    }

    pub fn watch_mode(&self) -> WatchMode {
        match &self.watch {
            None | Some(FlagOr::Flag(false)) => WatchMode::Off,
            Some(FlagOr::Flag(true)) => WatchMode::Cwd,
            Some(FlagOr::Value(paths)) if paths.is_empty() => WatchMode::Cwd,
            Some(FlagOr::Value(paths)) => WatchMode::Paths(paths.clone()),
        }
    }
}

pub(crate) fn sourcemap_from(value: Option<&FlagOr<String>>) -> Result<SourceMapMode, String> {
    match value {
        None | Some(FlagOr::Flag(false)) => Ok(SourceMapMode::Off),
        Some(FlagOr::Flag(true)) => Ok(SourceMapMode::On),
        Some(FlagOr::Value(s)) => s.parse(),
    }
}

fn concat<T>(mut base: Vec<T>, over: Vec<T>) -> Vec<T> {
    base.extend(over);
    base
}

fn union<K: Ord, V>(mut base: BTreeMap<K, V>, over: BTreeMap<K, V>) -> BTreeMap<K, V> {
    base.extend(over);
    base
}

fn merge_opt_lists<T>(base: Option<Vec<T>>, over: Option<Vec<T>>) -> Option<Vec<T>> {
    match (base, over) {
        (Some(base), Some(over)) => Some(concat(base, over)),
        (base, over) => over.or(base),
    }
}

fn merge_formats(
    base: Option<Vec<OutputFormat>>,
    over: Option<Vec<OutputFormat>>,
) -> Option<Vec<OutputFormat>> {
    merge_opt_lists(base, over).map(|formats| {
        let mut seen = Vec::with_capacity(formats.len());
        for f in formats {
            if !seen.contains(&f) {
                seen.push(f);
            }
        }
        seen
    })
}

fn merge_entries(base: Option<EntrySpec>, over: Option<EntrySpec>) -> Option<EntrySpec> {
    use EntrySpec::*;
    match (base, over) {
        (Some(base), Some(over)) => Some(match (base, over) {
            (Map(base), Map(over)) => Map(union(base, over)),
            (Map(_), over) | (_, over @ Map(_)) => over,
            (base, over) => List(concat(base.into_list(), over.into_list())),
        }),
        (base, over) => over.or(base),
    }
}

impl EntrySpec {
    fn into_list(self) -> Vec<String> {
        match self {
            EntrySpec::Single(s) => vec![s],
            EntrySpec::List(list) => list,
            EntrySpec::Map(map) => map.into_values().collect(),
        }
    }
}
