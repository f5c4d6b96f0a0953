// src/config/validate.rs

//! Option combinations that are rejected before anything is built.

use crate::config::model::{RawConfigFile, UserOptions};
use crate::errors::{BuildError, Result};
use crate::types::{DtsMode, OutputFormat};

/// `workspace` and `[[configs]]` are two different ways of producing several
/// configs; only one may be used.
pub fn validate_expansion(raw: &RawConfigFile, user: &UserOptions) -> Result<()> {
    let uses_workspace = raw.base.workspace.is_some()
        || user.workspace.is_some()
        || raw.configs.iter().any(|c| c.workspace.is_some());

    if uses_workspace && !raw.configs.is_empty() {
        return Err(BuildError::InvalidOption(
            "`workspace` cannot be combined with a `[[configs]]` list".to_string(),
        ));
    }
    Ok(())
}

/// Checks on one merged layer.
pub fn validate_layer(opts: &UserOptions) -> Result<()> {
    if let Some(formats) = &opts.format {
        if formats.is_empty() {
            return Err(BuildError::InvalidOption(
                "`format` must list at least one output format".to_string(),
            ));
        }
    }

    if opts.entry.is_some() && !opts.entry_groups.is_empty() {
        return Err(BuildError::InvalidOption(
            "`entry` and `entry_groups` cannot both be set".to_string(),
        ));
    }

    if let Err(msg) = opts.sourcemap_mode() {
        return Err(BuildError::InvalidOption(msg));
    }
    if let Err(msg) = opts.node_protocol_mode() {
        return Err(BuildError::InvalidOption(msg));
    }

    for (key, _) in opts.env.iter() {
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(BuildError::InvalidOption(format!(
                "invalid environment variable name {key:?}"
            )));
        }
    }

    Ok(())
}

/// Per-format declarations must name formats that are actually built.
pub fn validate_dts_formats(dts: &DtsMode, formats: &[OutputFormat]) -> Result<()> {
    if let DtsMode::Formats(requested) = dts {
        for f in requested {
            if !formats.contains(f) {
                return Err(BuildError::InvalidOption(format!(
                    "`dts` requests declarations for {f}, which is not in `format` ({})",
                    formats
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_format_list_is_rejected() {
        let opts = UserOptions {
            format: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(validate_layer(&opts), Err(BuildError::InvalidOption(_))));
    }

    #[test]
    fn dts_for_unbuilt_format_is_rejected() {
        let dts = DtsMode::Formats(vec![OutputFormat::Cjs]);
        assert!(validate_dts_formats(&dts, &[OutputFormat::Esm]).is_err());
        assert!(validate_dts_formats(&dts, &[OutputFormat::Esm, OutputFormat::Cjs]).is_ok());
    }

    #[test]
    fn workspace_with_config_list_is_rejected() {
        let raw: RawConfigFile = toml::from_str(
            r#"
workspace = ["packages/*"]

[[configs]]
entry = "src/a.ts"
"#,
        )
        .unwrap();
        let err = validate_expansion(&raw, &UserOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidOption(msg) if msg.contains("workspace")));
    }
}
