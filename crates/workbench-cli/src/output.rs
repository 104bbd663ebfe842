//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / `--json`
//! 2. `FORMAT` env var, `pretty` | `text` | `json`
//! 3. `output` in the user config
//! 4. Default: [`OutputMode::Pretty`] on a TTY, [`OutputMode::Text`] when piped.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};
use workbench_core::config::resolve_output;
use workbench_core::error::WorkbenchError;

/// Shared width for pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Left-aligned key/value line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-oriented output with headings and rules.
    Pretty,
    /// Plain rows for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    #[must_use]
    pub const fn is_pretty(self) -> bool {
        matches!(self, Self::Pretty)
    }

    fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

/// Resolve the output mode from flags, environment, user config and TTY.
#[must_use]
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    user_output: Option<&str>,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    let env_format = std::env::var("FORMAT").ok();
    OutputMode::from_resolved(&resolve_output(
        json_flag,
        user_output,
        env_format.as_deref(),
    ))
}

/// A structured error with an optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&WorkbenchError> for CliError {
    fn from(err: &WorkbenchError) -> Self {
        Self::with_details(err.to_string(), err.suggestion(), err.error_code().code())
    }
}

/// Render a serializable value to stdout.
///
/// JSON mode serializes `value`; pretty and text mode call `human_fn`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, mode, value, human_fn)
}

fn render_to<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => human_fn(value, out)?,
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    render_error_to(&mut out, mode, error)
}

fn render_error_to(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(suggestion) = &error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_flag_wins() {
        assert_eq!(
            resolve_output_mode(Some(OutputMode::Text), true, Some("json")),
            OutputMode::Text
        );
    }

    #[test]
    fn json_flag_selects_json() {
        assert!(resolve_output_mode(None, true, Some("pretty")).is_json());
    }

    #[test]
    fn json_render_is_pretty_printed_json() {
        let mut out = Vec::new();
        render_to(&mut out, OutputMode::Json, &serde_json::json!({"a": 1}), |_, _| {
            Ok(())
        })
        .expect("render");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn text_render_uses_closure() {
        let mut out = Vec::new();
        render_to(&mut out, OutputMode::Text, &3, |v, w| writeln!(w, "n={v}")).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "n=3\n");
    }

    #[test]
    fn workbench_errors_carry_codes() {
        let err = WorkbenchError::ProjectLoad {
            path: PathBuf::from("p.json"),
            reason: "expected value".to_string(),
        };
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E1003"));
        assert!(cli.message.contains("p.json"));

        let mut out = Vec::new();
        render_error_to(&mut out, OutputMode::Text, &cli).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("error[E1003]:"));
        assert!(text.contains("suggestion:"));
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut out = Vec::new();
        let error = CliError {
            message: "boom".to_string(),
            suggestion: None,
            error_code: None,
        };
        render_error_to(&mut out, OutputMode::Json, &error).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["error"]["message"], "boom");
        assert!(value["error"].get("suggestion").is_none());
    }
}
