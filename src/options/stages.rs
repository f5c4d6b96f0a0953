// src/options/stages.rs

use serde::Serialize;

use crate::config::{PluginSpec, ResolvedConfig};
use crate::options::CompilePass;
use crate::types::{NodeProtocolMode, OutputFormat};

/// One engine plugin stage. The list handed to the engine is always in the
/// order of these variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum Stage {
    NodeProtocol { mode: NodeProtocolMode },
    ExternalResolution,
    #[serde(rename_all = "camelCase")]
    Declarations { emit_only: bool, cjs_shape: bool },
    UnusedExports,
    #[serde(rename_all = "camelCase")]
    TargetCompat { target: Vec<String>, inject_helpers: bool },
    Shebang,
    #[serde(rename_all = "camelCase")]
    Report { show_format: bool },
    Css { target: Vec<String> },
    User { plugin: PluginSpec },
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::NodeProtocol { .. } => "node-protocol",
            Stage::ExternalResolution => "external",
            Stage::Declarations { .. } => "dts",
            Stage::UnusedExports => "unused",
            Stage::TargetCompat { .. } => "target",
            Stage::Shebang => "shebang",
            Stage::Report { .. } => "report",
            Stage::Css { .. } => "css",
            Stage::User { plugin } => plugin.name(),
        }
    }
}

/// Assemble the stage list for one (config, format, pass).
pub fn build_stages(
    config: &ResolvedConfig,
    format: OutputFormat,
    pass: CompilePass,
    is_multi_format: bool,
) -> Vec<Stage> {
    let declarations_only = pass == CompilePass::DeclarationsOnly;
    let mut stages = Vec::new();

    if let Some(mode) = config.node_protocol {
        stages.push(Stage::NodeProtocol { mode });
    }

    stages.push(Stage::ExternalResolution);

    let dts_here = config.dts.applies_to(format)
        && match (format, pass) {
            (OutputFormat::Esm, CompilePass::Primary) => true,
            (OutputFormat::Cjs, CompilePass::DeclarationsOnly) => true,
            _ => false,
        };
    if dts_here {
        stages.push(Stage::Declarations {
            emit_only: declarations_only,
            cjs_shape: format == OutputFormat::Cjs,
        });
    }

    if config.unused && !declarations_only {
        stages.push(Stage::UnusedExports);
    }

    if !config.target.is_empty() {
        stages.push(Stage::TargetCompat {
            target: config.target.clone(),
            inject_helpers: format != OutputFormat::Esm,
        });
    }

    if !declarations_only {
        stages.push(Stage::Shebang);
    }

    if config.report && !config.silent {
        stages.push(Stage::Report {
            show_format: is_multi_format,
        });
    }

    stages.push(Stage::Css {
        target: config.target.clone(),
    });

    stages.extend(
        config
            .plugins
            .iter()
            .cloned()
            .map(|plugin| Stage::User { plugin }),
    );

    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DtsMode;

    fn names(stages: &[Stage]) -> Vec<&str> {
        stages.iter().map(Stage::name).collect()
    }

    #[test]
    fn full_stage_order() {
        let mut cfg = crate::config::ResolvedConfig::new("p", "/p");
        cfg.node_protocol = Some(NodeProtocolMode::Strip);
        cfg.dts = DtsMode::On;
        cfg.unused = true;
        cfg.target = vec!["node18".into()];
        cfg.plugins = vec![PluginSpec::Name("svg".into())];

        let stages = build_stages(&cfg, OutputFormat::Esm, CompilePass::Primary, false);
        assert_eq!(
            names(&stages),
            vec!["node-protocol", "external", "dts", "unused", "target", "shebang", "report", "css", "svg"]
        );
    }

    #[test]
    fn cjs_declarations_only_pass() {
        let mut cfg = crate::config::ResolvedConfig::new("p", "/p");
        cfg.dts = DtsMode::On;
        cfg.unused = true;

        let primary = build_stages(&cfg, OutputFormat::Cjs, CompilePass::Primary, true);
        assert!(!names(&primary).contains(&"dts"));

        let dts = build_stages(&cfg, OutputFormat::Cjs, CompilePass::DeclarationsOnly, true);
        assert_eq!(names(&dts), vec!["external", "dts", "report", "css"]);
        assert!(dts.contains(&Stage::Declarations {
            emit_only: true,
            cjs_shape: true
        }));
    }

    #[test]
    fn silent_drops_report() {
        let mut cfg = crate::config::ResolvedConfig::new("p", "/p");
        cfg.silent = true;
        let stages = build_stages(&cfg, OutputFormat::Iife, CompilePass::Primary, false);
        assert_eq!(names(&stages), vec!["external", "shebang", "css"]);
    }
}
