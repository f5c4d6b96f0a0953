// src/cli.rs

//! CLI argument parsing using `clap`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{EntrySpec, UserOptions};
use crate::config::model::FlagOr;
use crate::types::{OutputFormat, Platform};

/// Command-line arguments for `tsforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tsforge",
    version,
    about = "Bundle TypeScript/JavaScript libraries into ESM, CJS, IIFE and UMD outputs.",
    long_about = None
)]
pub struct CliArgs {
    /// Entry files or globs. Overrides `entry` from the config file.
    #[arg(value_name = "ENTRY")]
    pub entries: Vec<String>,

    /// Path to the config file. Default: discovered in the working directory.
    #[arg(long, short = 'c', value_name = "PATH", conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Ignore any config file.
    #[arg(long)]
    pub no_config: bool,

    /// Output formats, comma separated (esm, cjs, iife, umd).
    #[arg(long, short = 'f', value_name = "FORMAT", value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    #[arg(long, short = 'd', value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Compilation target(s), comma separated (e.g. es2020,node18).
    #[arg(long, value_name = "TARGET", value_delimiter = ',')]
    pub target: Vec<String>,

    /// Emit type declarations.
    #[arg(long)]
    pub dts: bool,

    #[arg(long)]
    pub minify: bool,

    #[arg(long)]
    pub sourcemap: bool,

    /// Rebuild on change. Optionally restrict to the given paths.
    #[arg(long, short = 'w', value_name = "PATH", num_args = 0.., value_delimiter = ',')]
    pub watch: Option<Vec<String>>,

    /// Shell command run after every successful build.
    #[arg(long, value_name = "CMD")]
    pub on_success: Option<String>,

    /// Compile-time environment variable, exposed as `process.env.KEY`.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Always leave these imports external.
    #[arg(long, value_name = "PATTERN")]
    pub external: Vec<String>,

    /// Always bundle these imports.
    #[arg(long, value_name = "PATTERN")]
    pub no_external: Vec<String>,

    /// Suppress the size report.
    #[arg(long)]
    pub silent: bool,

    /// Command used to invoke the compilation engine.
    #[arg(long, value_name = "CMD")]
    pub engine: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TSFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the build plan without compiling anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Flags become the outermost option layer; unset flags leave the
    /// config file's values alone.
    pub fn to_user_options(&self) -> UserOptions {
        UserOptions {
            config: self.config.clone(),
            no_config: self.no_config,
            entry: (!self.entries.is_empty()).then(|| EntrySpec::List(self.entries.clone())),
            format: (!self.format.is_empty()).then(|| self.format.clone()),
            out_dir: self.out_dir.clone(),
            platform: self.platform,
            target: (!self.target.is_empty()).then(|| self.target.clone()),
            sourcemap: self.sourcemap.then_some(FlagOr::Flag(true)),
            minify: self.minify.then_some(true),
            dts: self.dts.then_some(FlagOr::Flag(true)),
            watch: self.watch.clone().map(|paths| {
                if paths.is_empty() {
                    FlagOr::Flag(true)
                } else {
                    FlagOr::Value(paths)
                }
            }),
            on_success: self.on_success.clone(),
            env: self.env.iter().cloned().collect::<BTreeMap<_, _>>(),
            external: self.external.clone(),
            no_external: self.no_external.clone(),
            silent: self.silent.then_some(true),
            engine: self.engine.clone(),
            ..Default::default()
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_leave_options_empty() {
        let args = CliArgs::parse_from(["tsforge"]);
        let opts = args.to_user_options();
        assert!(opts.entry.is_none());
        assert!(opts.format.is_none());
        assert!(opts.minify.is_none());
        assert!(opts.watch.is_none());
    }

    #[test]
    fn flags_map_onto_user_options() {
        let args = CliArgs::parse_from([
            "tsforge",
            "src/index.ts",
            "--format",
            "esm,cjs",
            "--dts",
            "--env",
            "MODE=prod",
            "--watch",
            "--no-external",
            "lodash",
        ]);
        let opts = args.to_user_options();
        assert_eq!(opts.entry, Some(EntrySpec::List(vec!["src/index.ts".into()])));
        assert_eq!(opts.format, Some(vec![OutputFormat::Esm, OutputFormat::Cjs]));
        assert_eq!(opts.dts, Some(FlagOr::Flag(true)));
        assert_eq!(opts.env.get("MODE").map(String::as_str), Some("prod"));
        assert_eq!(opts.watch, Some(FlagOr::Flag(true)));
        assert_eq!(opts.no_external, vec!["lodash".to_string()]);
    }

    #[test]
    fn env_requires_key_value() {
        assert!(parse_key_value("NOEQUALS").is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(parse_key_value("A=b=c").unwrap(), ("A".into(), "b=c".into()));
    }
}
