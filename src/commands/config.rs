//! Configuration file editor command.
//!
//! Opens the micwave configuration file in the user's preferred editor,
//! writing one with default values first if none exists.

use std::process::Command;

use crate::config::{get_config_path, MicwaveConfig};

/// Opens the micwave configuration file in the user's preferred editor.
///
/// Tries editors in this order:
/// 1. $EDITOR environment variable
/// 2. nano (most user-friendly fallback)
/// 3. vi (ultimate fallback, always available)
///
/// # Errors
/// - If no editor can be found or executed
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        MicwaveConfig::default().save_to(&config_path)?;
        tracing::info!("Created default config at {}", config_path.display());
    }

    tracing::info!("Opening config file: {}", config_path.display());

    let (program, args) = find_editor()?;
    tracing::debug!("Using editor: {} {:?}", program, args);

    let status = Command::new(&program)
        .args(&args)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{program}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    tracing::info!("Config file edited successfully");
    Ok(())
}

/// Finds the editor to run, split into program and leading arguments.
///
/// Tries $VISUAL, then $EDITOR, then nano and vi from PATH.
fn find_editor() -> anyhow::Result<(String, Vec<String>)> {
    for var in ["VISUAL", "EDITOR"] {
        if let Some(command) = std::env::var(var).ok().and_then(|v| split_command(&v)) {
            return Ok(command);
        }
    }

    for editor in ["nano", "vi"] {
        if is_editor_available(editor) {
            return Ok((editor.to_string(), Vec::new()));
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Please set the $EDITOR environment variable."
    ))
}

/// Splits `code --wait` style values on whitespace.
fn split_command(value: &str) -> Option<(String, Vec<String>)> {
    let mut parts = value.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Checks if an editor is available in the system PATH.
fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
