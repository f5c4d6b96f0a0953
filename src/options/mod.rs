// src/options/mod.rs

//! Build-options assembly for one (config, format, pass).

pub mod define;
pub mod naming;
pub mod shims;
pub mod stages;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::model::sourcemap_from;
use crate::config::{EntryMap, ResolvedConfig};
use crate::errors::{BuildError, Result};
use crate::external::ExternalClassifier;
use crate::types::{OutputFormat, Platform, SourceMapMode};

pub use naming::{FileNames, dts_extension, file_names, js_extension};
pub use shims::Shim;
pub use stages::Stage;

/// Which compile pass an option bundle is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompilePass {
    Primary,
    /// Emits only type declarations; synthesized after a CJS primary pass.
    DeclarationsOnly,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOptions {
    pub entries: EntryMap,
    pub external: Arc<ExternalClassifier>,
    pub alias: BTreeMap<String, String>,
    pub treeshake: bool,
    pub platform: Platform,
    pub define: BTreeMap<String, String>,
    pub inject: Vec<Shim>,
    pub cwd: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub name: Option<String>,
    pub sourcemap: SourceMapMode,
    pub dir: PathBuf,
    pub target: Vec<String>,
    pub minify: bool,
    pub entry_file_names: String,
    pub chunk_file_names: String,
    pub declarations_only: bool,
}

/// Everything the engine needs for one compile invocation.
///
/// Moved into the backend; hooks may edit it in `build:before` only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub config: String,
    /// Format the plan asked for; `output.format` differs on a
    /// declarations-only pass.
    pub requested_format: OutputFormat,
    pub pass: CompilePass,
    pub input: InputOptions,
    pub output: OutputOptions,
    pub stages: Vec<Stage>,
}

impl BuildOptions {
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }
}

/// Assemble the options for one compile invocation.
pub fn get_build_options(
    config: &ResolvedConfig,
    classifier: Arc<ExternalClassifier>,
    format: OutputFormat,
    pass: CompilePass,
    is_multi_format: bool,
) -> Result<BuildOptions> {
    let declarations_only = pass == CompilePass::DeclarationsOnly;
    let names = file_names(config, format);

    let inject = if declarations_only {
        Vec::new()
    } else {
        shims::shims_for(format, config.platform, config.shims)
    };

    let mut input = InputOptions {
        entries: config.entries.clone(),
        external: classifier,
        alias: config.alias.clone(),
        treeshake: config.treeshake,
        platform: config.platform,
        define: define::build_define(&config.define, &config.env)?,
        inject,
        cwd: config.cwd.clone(),
    };

    let mut output = OutputOptions {
        format: if declarations_only { OutputFormat::Esm } else { format },
        name: if format.uses_global_name() {
            config.global_name.clone()
        } else {
            None
        },
        sourcemap: config.sourcemap,
        dir: config.out_dir.clone(),
        target: config.target.clone(),
        minify: config.minify,
        entry_file_names: names.entry,
        chunk_file_names: names.chunk,
        declarations_only,
    };

    apply_overrides(config, format, &mut input, &mut output)?;

    let stages = stages::build_stages(config, format, pass, is_multi_format);

    debug!(
        config = %config.name,
        %format,
        ?pass,
        stages = stages.len(),
        "assembled build options"
    );

    Ok(BuildOptions {
        config: config.name.clone(),
        requested_format: format,
        pass,
        input,
        output,
        stages,
    })
}

fn apply_overrides(
    config: &ResolvedConfig,
    format: OutputFormat,
    input: &mut InputOptions,
    output: &mut OutputOptions,
) -> Result<()> {
    if let Some(o) = config.input_overrides.get(&format) {
        if let Some(treeshake) = o.treeshake {
            input.treeshake = treeshake;
        }
        if let Some(platform) = o.platform {
            input.platform = platform;
        }
        input.define.extend(o.define.clone());
        input.alias.extend(o.alias.clone());
    }

    if let Some(o) = config.output_overrides.get(&format) {
        if let Some(minify) = o.minify {
            output.minify = minify;
        }
        if o.sourcemap.is_some() {
            output.sourcemap =
                sourcemap_from(o.sourcemap.as_ref()).map_err(BuildError::InvalidOption)?;
        }
        if let Some(target) = &o.target {
            output.target = target.clone();
        }
        if let Some(name) = &o.name {
            output.name = Some(name.clone());
        }
        if let Some(entry) = &o.entry_file_names {
            output.entry_file_names = entry.clone();
        }
        if let Some(chunk) = &o.chunk_file_names {
            output.chunk_file_names = chunk.clone();
        }
        if let Some(dir) = &o.dir {
            output.dir = config.cwd.join(dir);
        }
    }

    Ok(())
}
