// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod external;
pub mod fs;
pub mod hooks;
pub mod logging;
pub mod options;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ResolvedConfig, resolve_options};
use crate::engine::{BuildSession, Coordinator};
use crate::external::ExternalClassifier;
use crate::fs::{FileSystem, RealFileSystem};
use crate::options::{CompilePass, get_build_options};
use crate::types::OutputFormat;

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let user = args.to_user_options();

    if args.dry_run {
        print_dry_run(&resolve_options(user, fs.as_ref())?.configs, fs)?;
        return Ok(0);
    }

    build(BuildSession::with_process_engine(user, fs)).await
}

/// Build every config once; keep watching while any config asks for it.
///
/// Returns the exit code of the last `on_success` command (0 when none ran).
pub async fn build(session: BuildSession) -> Result<i32> {
    let exit_code = session.services.exit_code.clone();
    let state = session.build_all().await?;

    if state.is_watching() {
        let coordinator = Coordinator::new(session, state)?;
        let handle = coordinator.handle();

        // Ctrl-C -> graceful shutdown.
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            handle.request_shutdown().await;
        });

        coordinator.run().await?;
    } else {
        state.wait_success().await;
    }

    debug!(exit_code = exit_code.get(), "build finished");
    Ok(exit_code.get())
}

/// Print each config's plan: formats, passes, output names and stages.
fn print_dry_run(configs: &[ResolvedConfig], fs: Arc<dyn FileSystem>) -> Result<()> {
    println!("tsforge dry-run");
    println!("configs ({}):", configs.len());

    for config in configs {
        println!("  - {}", config.name);
        println!("      cwd: {}", config.cwd.display());
        println!("      out_dir: {}", config.out_dir.display());
        println!("      platform: {:?}", config.platform);
        println!("      entries:");
        for (name, path) in &config.entries {
            println!("        {name}: {}", path.display());
        }

        let classifier = Arc::new(ExternalClassifier::new(config, fs.clone())?);
        let multi = config.is_multi_format();
        for &format in &config.formats {
            let mut passes = vec![CompilePass::Primary];
            if format == OutputFormat::Cjs && config.dts.applies_to(format) {
                passes.push(CompilePass::DeclarationsOnly);
            }
            for pass in passes {
                let opts = get_build_options(config, classifier.clone(), format, pass, multi)?;
                println!(
                    "      {format} ({pass:?}): {} stages=[{}]",
                    opts.output.entry_file_names,
                    opts.stage_names().join(", ")
                );
            }
        }
        if !config.config_files.is_empty() {
            println!("      config files: {:?}", config.config_files);
        }
    }

    info!("dry-run complete (nothing compiled)");
    Ok(())
}
