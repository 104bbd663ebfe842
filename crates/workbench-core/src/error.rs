use std::fmt;
use std::path::PathBuf;

use crate::model::{ItemId, ViewMapId};

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    ProjectNotLoaded,
    ProjectParseError,
    ConfigParseError,
    ItemNotFound,
    ViewMapNotFound,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "E1001",
            Self::ProjectNotLoaded => "E1002",
            Self::ProjectParseError => "E1003",
            Self::ConfigParseError => "E1004",
            Self::ItemNotFound => "E2001",
            Self::ViewMapNotFound => "E2002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidArgument => "Invalid argument",
            Self::ProjectNotLoaded => "No project data loaded",
            Self::ProjectParseError => "Project file parse error",
            Self::ConfigParseError => "Config file parse error",
            Self::ItemNotFound => "Work item not found",
            Self::ViewMapNotFound => "View map not found",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument => Some("Check layout sizes and padding are positive numbers."),
            Self::ProjectNotLoaded => Some("Open a project file before rendering the hierarchy."),
            Self::ProjectParseError => {
                Some("The project file must be JSON with `items`, `links` and `view_maps`.")
            }
            Self::ConfigParseError => Some("Fix syntax in .workbench/config.toml and retry."),
            Self::ItemNotFound | Self::ViewMapNotFound => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the public entry points of the engine.
///
/// Missing data met while walking the link graph (an item type without view
/// maps, a view without matching children) is never an error; those branches
/// simply end.
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    /// A precondition on an entry point was violated.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// An operation needed project data and none was attached.
    #[error("no project data is attached")]
    ProjectNotLoaded,

    /// The referenced work item is not part of the project.
    #[error("work item {0} not found")]
    ItemNotFound(ItemId),

    /// The referenced view map is not part of the project.
    #[error("view map {0} not found")]
    ViewMapNotFound(ViewMapId),

    /// A project file could not be read or parsed.
    #[error("failed to load project {}: {reason}", path.display())]
    ProjectLoad { path: PathBuf, reason: String },
}

impl WorkbenchError {
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::ProjectNotLoaded => ErrorCode::ProjectNotLoaded,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::ViewMapNotFound(_) => ErrorCode::ViewMapNotFound,
            Self::ProjectLoad { .. } => ErrorCode::ProjectParseError,
        }
    }

    /// Remediation text suitable for terminal output.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.error_code()
            .hint()
            .unwrap_or("Check the item and view map ids in the project file.")
            .to_string()
    }
}
