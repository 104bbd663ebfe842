pub mod completions;
pub mod config;
pub mod cycles;
pub mod render;
pub mod tree;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use workbench_core::config::{ProjectConfig, load_project_config};
use workbench_core::controller::{DisplaySettings, RootSelection};
use workbench_core::error::{ErrorCode, WorkbenchError};
use workbench_core::geometry::Orientation;
use workbench_core::hierarchy::{ElementId, HierarchyCanvas, RenderOptions};
use workbench_core::model::ItemId;
use workbench_core::project::{ProjectData, ProjectFile};

use crate::output::{CliError, OutputMode, render_error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    Horizontal,
    Vertical,
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Horizontal => Self::Horizontal,
            OrientationArg::Vertical => Self::Vertical,
        }
    }
}

/// Project file plus the display settings shared by every diagram command.
#[derive(Args, Debug, Clone)]
pub struct HierarchyArgs {
    /// Project file (JSON with `items`, `links` and `view_maps`).
    pub project: PathBuf,

    /// Growth direction; overrides `layout.orientation`.
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Skip views with no matching children.
    #[arg(long, overrides_with = "show_empty")]
    pub hide_empty: bool,

    /// Draw views even when they have no children.
    #[arg(long, overrides_with = "hide_empty")]
    pub show_empty: bool,

    /// Drop child items in this state (repeatable).
    #[arg(long = "exclude-state", value_name = "STATE")]
    pub exclude_states: Vec<String>,

    /// Expand only the view map with this title (repeatable).
    #[arg(long = "view", value_name = "TITLE")]
    pub views: Vec<String>,

    /// Use every item of this type as a root (repeatable).
    #[arg(long = "root-type", value_name = "TYPE", conflicts_with = "roots")]
    pub root_types: Vec<String>,

    /// Use this item as a root (repeatable).
    #[arg(long = "root", value_name = "ID")]
    pub roots: Vec<ItemId>,
}

impl HierarchyArgs {
    /// Settings from the project config with command-line overrides applied.
    #[must_use]
    pub fn settings(&self, config: &ProjectConfig) -> DisplaySettings {
        let orientation = self
            .orientation
            .map_or(config.layout.orientation, Orientation::from);
        let mut settings = DisplaySettings::from_config(orientation, &config.hierarchy);
        if self.hide_empty {
            settings.hide_empty_views = true;
        } else if self.show_empty {
            settings.hide_empty_views = false;
        }
        if !self.exclude_states.is_empty() {
            settings.excluded_states = self.exclude_states.iter().cloned().collect();
        }
        if !self.views.is_empty() {
            settings.selected_views = self.views.iter().cloned().collect();
        }
        if !self.roots.is_empty() {
            settings.roots = RootSelection::Items(self.roots.iter().copied().collect());
        } else if !self.root_types.is_empty() {
            settings.roots =
                RootSelection::Types(self.root_types.iter().cloned().collect::<BTreeSet<_>>());
        }
        settings
    }
}

/// Load a project file into memory.
///
/// # Errors
///
/// Returns [`WorkbenchError::ProjectLoad`] if the file cannot be read or parsed.
pub fn load_project(path: &Path) -> Result<ProjectData, WorkbenchError> {
    ProjectFile::load(path).map(ProjectData::from_file)
}

/// Build and lay out the hierarchy for `settings`.
///
/// # Errors
///
/// Propagates precondition failures from [`HierarchyCanvas::render_view`].
pub fn render_hierarchy(
    canvas: &mut HierarchyCanvas,
    project: &ProjectData,
    settings: &DisplaySettings,
) -> Result<Vec<ElementId>, WorkbenchError> {
    let predicate = settings.roots.predicate();
    let options = RenderOptions {
        orientation: settings.orientation,
        selected_views: Some(&settings.selected_views),
        hide_empty_views: settings.hide_empty_views,
        excluded_states: Some(&settings.excluded_states),
        filter: predicate.as_deref(),
    };
    canvas.render_view(Some(project), &options)
}

/// Load `<root>/.workbench/config.toml`, reporting parse failures as `E1004`.
pub fn project_config(project_root: &Path, output: OutputMode) -> anyhow::Result<ProjectConfig> {
    match load_project_config(project_root) {
        Ok(config) => Ok(config),
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            Err(err.context(code.message()))
        }
    }
}

/// Render `err` in the output mode and turn it into a command failure.
pub fn fail(output: OutputMode, err: &WorkbenchError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(err)) {
        return render_err;
    }
    anyhow::anyhow!("{}: {err}", err.error_code())
}
