// src/config/resolve.rs

//! Turns user options (file + programmatic) into independent build plans.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::entry::{EntryMap, resolve_entries};
use crate::config::loader::load_config;
use crate::config::manifest::PackageManifest;
use crate::config::model::{
    CopySpec, InputOverride, OutputOverride, PluginSpec, SuccessCallback, UserOptions,
};
use crate::config::validate::{validate_dts_formats, validate_expansion, validate_layer};
use crate::config::workspace::find_packages;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::types::{
    CleanMode, DtsMode, NodeProtocolMode, OutputFormat, Platform, SourceMapMode, WatchMode,
};

/// What to do after a successful cycle.
#[derive(Debug, Clone)]
pub enum OnSuccess {
    /// Shell command; its exit code becomes the process exit status.
    Command(String),
    Callback(SuccessCallback),
}

/// One independent build plan.
///
/// Shared between tasks as `Arc<ResolvedConfig>` and never mutated after
/// resolution.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub name: String,
    pub cwd: PathBuf,
    pub entries: EntryMap,
    pub formats: Vec<OutputFormat>,
    pub out_dir: PathBuf,
    pub platform: Platform,
    pub target: Vec<String>,
    pub sourcemap: SourceMapMode,
    pub minify: bool,
    pub dts: DtsMode,
    pub treeshake: bool,
    pub external: Vec<String>,
    pub no_external: Vec<String>,
    pub skip_node_modules_bundle: bool,
    pub plugins: Vec<PluginSpec>,
    pub env: BTreeMap<String, String>,
    pub define: BTreeMap<String, String>,
    pub alias: BTreeMap<String, String>,
    pub on_success: Option<OnSuccess>,
    pub watch: WatchMode,
    pub ignore_watch: Vec<String>,
    pub clean: CleanMode,
    pub fixed_extension: bool,
    pub global_name: Option<String>,
    pub shims: bool,
    pub node_protocol: Option<NodeProtocolMode>,
    pub unused: bool,
    pub publint: bool,
    pub report: bool,
    pub silent: bool,
    pub copy: Vec<CopySpec>,
    pub hash: bool,
    pub input_overrides: BTreeMap<OutputFormat, InputOverride>,
    pub output_overrides: BTreeMap<OutputFormat, OutputOverride>,
    pub engine: Option<String>,
    pub manifest: Option<Arc<PackageManifest>>,
    /// Config files and manifests this plan was derived from.
    pub config_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// A plan with every option at its default and no entries.
    pub fn new(name: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            name: name.into(),
            out_dir: cwd.join("dist"),
            cwd,
            entries: EntryMap::new(),
            formats: vec![OutputFormat::Esm],
            platform: Platform::default(),
            target: Vec::new(),
            sourcemap: SourceMapMode::Off,
            minify: false,
            dts: DtsMode::Off,
            treeshake: true,
            external: Vec::new(),
            no_external: Vec::new(),
            skip_node_modules_bundle: false,
            plugins: Vec::new(),
            env: BTreeMap::new(),
            define: BTreeMap::new(),
            alias: BTreeMap::new(),
            on_success: None,
            watch: WatchMode::Off,
            ignore_watch: Vec::new(),
            clean: CleanMode::All,
            fixed_extension: false,
            global_name: None,
            shims: false,
            node_protocol: None,
            unused: false,
            publint: false,
            report: true,
            silent: false,
            copy: Vec::new(),
            hash: false,
            input_overrides: BTreeMap::new(),
            output_overrides: BTreeMap::new(),
            engine: None,
            manifest: None,
            config_files: Vec::new(),
        }
    }

    pub fn is_multi_format(&self) -> bool {
        self.formats.len() > 1
    }

    pub fn is_module_package(&self) -> bool {
        self.manifest.as_ref().is_some_and(|m| m.is_module())
    }
}

/// Result of option resolution.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub configs: Vec<ResolvedConfig>,
    /// Files whose change invalidates this resolution (config files and
    /// manifests); the watcher restarts instead of rebuilding on these.
    pub files: Vec<PathBuf>,
}

/// Load, merge, expand and default user options.
pub fn resolve_options(user: UserOptions, fs: &dyn FileSystem) -> Result<ResolvedOptions> {
    let cwd = match &user.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };
    // Relative or symlinked working directories resolve once, here.
    let cwd = fs.canonicalize(&cwd).unwrap_or(cwd);

    let loaded = load_config(fs, &cwd, user.config.as_deref(), user.no_config)?;
    validate_expansion(&loaded.raw, &user)?;

    let mut files: Vec<PathBuf> = loaded.path.iter().cloned().collect();
    let root_files = files.clone();

    let base = loaded.raw.base;
    let layers: Vec<UserOptions> = if loaded.raw.configs.is_empty() {
        vec![base.merge(user.clone())]
    } else {
        loaded
            .raw
            .configs
            .into_iter()
            .map(|c| base.clone().merge(c).merge(user.clone()))
            .collect()
    };

    let mut configs = Vec::new();
    for layer in layers {
        validate_layer(&layer)?;

        match layer.workspace.clone() {
            Some(patterns) => {
                for pkg in find_packages(fs, &cwd, &patterns)? {
                    let pkg_loaded = load_config(fs, &pkg, None, layer.no_config)?;
                    let mut config_files = root_files.clone();
                    config_files.extend(pkg_loaded.path.iter().cloned());

                    let mut opts = pkg_loaded.raw.base.merge(layer.clone());
                    opts.workspace = None;
                    validate_layer(&opts)?;

                    for group in expand_entry_groups(opts) {
                        configs.push(resolve_single(fs, group, &pkg, config_files.clone())?);
                    }
                }
            }
            None => {
                for group in expand_entry_groups(layer) {
                    configs.push(resolve_single(fs, group, &cwd, root_files.clone())?);
                }
            }
        }
    }

    for config in &configs {
        for f in &config.config_files {
            if !files.contains(f) {
                files.push(f.clone());
            }
        }
    }

    info!(
        configs = configs.len(),
        files = files.len(),
        "resolved build configs"
    );

    Ok(ResolvedOptions { configs, files })
}

/// One layer per named entry group, each named after its group and
/// building into its own subdirectory of the output dir.
fn expand_entry_groups(opts: UserOptions) -> Vec<UserOptions> {
    if opts.entry_groups.is_empty() {
        return vec![opts];
    }

    let out_dir = opts.out_dir.clone().unwrap_or_else(|| PathBuf::from("dist"));
    opts.entry_groups
        .iter()
        .map(|(name, entry)| UserOptions {
            name: Some(name.clone()),
            entry: Some(entry.clone()),
            entry_groups: BTreeMap::new(),
            out_dir: Some(out_dir.join(name)),
            ..opts.clone()
        })
        .collect()
}

fn resolve_single(
    fs: &dyn FileSystem,
    opts: UserOptions,
    cwd: &Path,
    mut config_files: Vec<PathBuf>,
) -> Result<ResolvedConfig> {
    let manifest = PackageManifest::find_in(fs, cwd)?;
    if let Some(m) = &manifest {
        config_files.push(m.path.clone());
    }

    let formats = opts.format.clone().unwrap_or_else(|| vec![OutputFormat::Esm]);

    let dts = match (&opts.dts, &manifest) {
        (None, Some(m)) if m.declares_types() => DtsMode::On,
        _ => opts.dts_mode(),
    };
    validate_dts_formats(&dts, &formats)?;

    let entries = resolve_entries(fs, cwd, opts.entry.as_ref())?;

    let platform = opts
        .platform
        .or_else(|| manifest.as_ref().and_then(|m| m.platform_hint()))
        .unwrap_or_default();

    let target = match &opts.target {
        Some(target) => target.clone(),
        None => manifest
            .as_ref()
            .and_then(|m| m.node_target())
            .into_iter()
            .collect(),
    };

    let out_dir = match &opts.out_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => cwd.join(dir),
        None => cwd.join("dist"),
    };

    let name = opts
        .name
        .clone()
        .or_else(|| manifest.as_ref().and_then(|m| m.name.clone()))
        .or_else(|| {
            cwd.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "default".to_string());

    let on_success = match (&opts.on_success_callback, &opts.on_success) {
        (Some(cb), _) => Some(OnSuccess::Callback(cb.clone())),
        (None, Some(cmd)) => Some(OnSuccess::Command(cmd.clone())),
        (None, None) => None,
    };

    let sourcemap = opts.sourcemap_mode().map_err(BuildError::InvalidOption)?;
    let node_protocol = opts.node_protocol_mode().map_err(BuildError::InvalidOption)?;

    debug!(
        config = %name,
        entries = entries.len(),
        ?formats,
        ?platform,
        "resolved config"
    );

    Ok(ResolvedConfig {
        name,
        cwd: cwd.to_path_buf(),
        entries,
        formats,
        out_dir,
        platform,
        target,
        sourcemap,
        minify: opts.minify.unwrap_or(false),
        dts,
        treeshake: opts.treeshake.unwrap_or(true),
        skip_node_modules_bundle: opts.skip_node_modules_bundle.unwrap_or(false),
        on_success,
        watch: opts.watch_mode(),
        clean: opts.clean_mode(),
        fixed_extension: opts.fixed_extension.unwrap_or(false),
        shims: opts.shims.unwrap_or(false),
        node_protocol,
        unused: opts.unused.unwrap_or(false),
        publint: opts.publint.unwrap_or(false),
        report: opts.report.unwrap_or(true),
        silent: opts.silent.unwrap_or(false),
        hash: opts.hash.unwrap_or(false),
        external: opts.external,
        no_external: opts.no_external,
        plugins: opts.plugins,
        env: opts.env,
        define: opts.define,
        alias: opts.alias,
        ignore_watch: opts.ignore_watch,
        global_name: opts.global_name,
        copy: opts.copy,
        input_overrides: opts.input_options,
        output_overrides: opts.output_options,
        engine: opts.engine,
        manifest: manifest.map(Arc::new),
        config_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn user(cwd: &str) -> UserOptions {
        UserOptions {
            cwd: Some(PathBuf::from(cwd)),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "console.log(1)");

        let resolved = resolve_options(user("/p"), &fs).unwrap();
        assert_eq!(resolved.configs.len(), 1);
        assert!(resolved.files.is_empty());

        let cfg = &resolved.configs[0];
        assert_eq!(cfg.formats, vec![OutputFormat::Esm]);
        assert_eq!(cfg.out_dir, PathBuf::from("/p/dist"));
        assert_eq!(cfg.platform, Platform::Neutral);
        assert_eq!(cfg.dts, DtsMode::Off);
        assert_eq!(cfg.clean, CleanMode::All);
        assert!(cfg.treeshake);
    }

    #[test]
    fn manifest_drives_platform_target_and_dts() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "");
        fs.add_file(
            "/p/package.json",
            r#"{ "name": "lib", "types": "dist/index.d.mts", "engines": { "node": ">=20" } }"#,
        );

        let resolved = resolve_options(user("/p"), &fs).unwrap();
        let cfg = &resolved.configs[0];
        assert_eq!(cfg.name, "lib");
        assert_eq!(cfg.platform, Platform::Node);
        assert_eq!(cfg.target, vec!["node20".to_string()]);
        assert_eq!(cfg.dts, DtsMode::On);
        assert_eq!(resolved.files, vec![PathBuf::from("/p/package.json")]);
    }

    #[test]
    fn config_list_expands_to_independent_plans() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "");
        fs.add_file("/p/src/cli.ts", "");
        fs.add_file(
            "/p/tsforge.toml",
            r#"
minify = true

[[configs]]
entry = "src/index.ts"
format = ["esm", "cjs"]

[[configs]]
entry = { cli = "src/cli.ts" }
platform = "node"
minify = false
"#,
        );

        let resolved = resolve_options(user("/p"), &fs).unwrap();
        assert_eq!(resolved.configs.len(), 2);
        assert_eq!(resolved.files, vec![PathBuf::from("/p/tsforge.toml")]);

        let lib = &resolved.configs[0];
        assert!(lib.minify);
        assert_eq!(lib.formats, vec![OutputFormat::Esm, OutputFormat::Cjs]);

        let cli = &resolved.configs[1];
        assert!(!cli.minify);
        assert_eq!(cli.platform, Platform::Node);
        assert!(cli.entries.contains_key("cli"));
    }

    #[test]
    fn programmatic_options_override_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "");
        fs.add_file("/p/tsforge.toml", "minify = true\nexternal = [\"a\"]\n");

        let mut opts = user("/p");
        opts.minify = Some(false);
        opts.external = vec!["b".into()];

        let cfg = resolve_options(opts, &fs).unwrap().configs.remove(0);
        assert!(!cfg.minify);
        assert_eq!(cfg.external, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn workspace_yields_one_plan_per_package() {
        let fs = MockFileSystem::new();
        fs.add_file("/repo/tsforge.toml", "workspace = [\"packages/*\"]\nformat = \"cjs\"\n");
        fs.add_file("/repo/packages/a/package.json", r#"{ "name": "a" }"#);
        fs.add_file("/repo/packages/a/src/index.ts", "");
        fs.add_file("/repo/packages/b/package.json", r#"{ "name": "b" }"#);
        fs.add_file("/repo/packages/b/src/index.ts", "");
        fs.add_file("/repo/packages/b/tsforge.toml", "minify = true\n");

        let resolved = resolve_options(user("/repo"), &fs).unwrap();
        let names: Vec<&str> = resolved.configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let b = &resolved.configs[1];
        assert_eq!(b.out_dir, PathBuf::from("/repo/packages/b/dist"));
        assert_eq!(b.formats, vec![OutputFormat::Cjs]);
        assert!(b.minify);
        assert!(resolved.files.contains(&PathBuf::from("/repo/packages/b/tsforge.toml")));
        assert!(resolved.files.contains(&PathBuf::from("/repo/packages/a/package.json")));
    }

    #[test]
    fn entry_groups_expand_to_one_plan_each() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "");
        fs.add_file("/p/src/cli.ts", "");
        fs.add_file(
            "/p/tsforge.toml",
            r#"
format = ["esm", "cjs"]

[entry_groups]
lib = "src/index.ts"
cli = { cli = "src/cli.ts" }
"#,
        );

        let resolved = resolve_options(user("/p"), &fs).unwrap();
        let names: Vec<&str> = resolved.configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cli", "lib"]);

        let cli = &resolved.configs[0];
        assert_eq!(cli.out_dir, PathBuf::from("/p/dist/cli"));
        assert!(cli.entries.contains_key("cli"));
        assert_eq!(cli.formats, vec![OutputFormat::Esm, OutputFormat::Cjs]);

        let lib = &resolved.configs[1];
        assert_eq!(lib.out_dir, PathBuf::from("/p/dist/lib"));
        assert!(lib.entries.contains_key("index"));
        assert_eq!(resolved.files, vec![PathBuf::from("/p/tsforge.toml")]);
    }

    #[test]
    fn entry_and_entry_groups_are_exclusive() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.ts", "");
        fs.add_file("/p/tsforge.toml", "entry = \"src/index.ts\"\n[entry_groups]\nlib = \"src/index.ts\"\n");

        let err = resolve_options(user("/p"), &fs).unwrap_err();
        assert!(matches!(err, BuildError::InvalidOption(_)));
    }

    #[test]
    fn missing_entry_fails_before_build() {
        let fs = MockFileSystem::new();
        fs.add_dir("/p");
        let err = resolve_options(user("/p"), &fs).unwrap_err();
        assert!(err.is_resolution_error());
    }
}
