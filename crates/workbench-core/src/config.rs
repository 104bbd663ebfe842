//! Project and user configuration.
//!
//! - project: `<root>/.workbench/config.toml`
//! - user: `<config dir>/workbench/config.toml`
//!
//! Missing files yield defaults. Unknown keys are ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::geometry::{Orientation, Size};
use crate::hierarchy::LayoutConfig;
use crate::hierarchy::layout::DEFAULT_PADDING;

/// Directory holding project-level workbench state.
pub const PROJECT_DIR: &str = ".workbench";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub layout: LayoutSection,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSection {
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_item_size")]
    pub item_size: Size,
    #[serde(default = "default_view_size")]
    pub view_size: Size,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            item_size: default_item_size(),
            view_size: default_view_size(),
            orientation: Orientation::default(),
        }
    }
}

impl LayoutSection {
    #[must_use]
    pub const fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            padding: self.padding,
            item_size: self.item_size,
            view_size: self.view_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default)]
    pub hide_empty_views: bool,
    #[serde(default)]
    pub excluded_states: Vec<String>,
    /// View map titles to expand; empty expands all.
    #[serde(default)]
    pub selected_views: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// How often the terminal view checks the project file for changes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join("config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("workbench/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode precedence: `--json`, then `FORMAT`, then the user config,
/// then `pretty` on a terminal and `text` otherwise.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    env_format
        .and_then(normalize_output_mode)
        .or_else(|| user_output.and_then(normalize_output_mode))
        .unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                "pretty"
            } else {
                "text"
            }
        })
        .to_string()
}

const fn default_padding() -> f64 {
    DEFAULT_PADDING
}

const fn default_item_size() -> Size {
    Size::new(160.0, 60.0)
}

const fn default_view_size() -> Size {
    Size::new(140.0, 40.0)
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.layout.padding, 50.0);
        assert_eq!(cfg.layout.layout_config(), LayoutConfig::default());
        assert_eq!(cfg.layout.orientation, Orientation::Horizontal);
        assert!(!cfg.hierarchy.hide_empty_views);
        assert_eq!(cfg.refresh.poll_interval_ms, 1000);
    }

    #[test]
    fn project_config_overrides_sections() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join(PROJECT_DIR)).expect("mkdir");
        std::fs::write(
            project_config_path(root.path()),
            r#"
[layout]
padding = 20
orientation = "vertical"
item_size = { width = 120, height = 30.5 }

[hierarchy]
hide_empty_views = true
excluded_states = ["Closed", "Removed"]
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.layout.padding, 20.0);
        assert_eq!(cfg.layout.orientation, Orientation::Vertical);
        assert_eq!(cfg.layout.item_size, Size::new(120.0, 30.5));
        assert_eq!(cfg.layout.view_size, default_view_size());
        assert!(cfg.hierarchy.hide_empty_views);
        assert_eq!(cfg.hierarchy.excluded_states.len(), 2);
    }

    #[test]
    fn malformed_project_config_names_the_file() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join(PROJECT_DIR)).expect("mkdir");
        std::fs::write(project_config_path(root.path()), "[layout\npadding = ").expect("write");
        let err = load_project_config(root.path()).expect_err("should fail");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn user_config_reads_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output = \"json\"\n").expect("write");
        let cfg = load_user_config_from(&path).expect("load");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(
            load_user_config_from(&dir.path().join("missing.toml")).expect("load"),
            UserConfig::default()
        );
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("plain"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("plain"), Some("bogus")), "text");
    }
}
