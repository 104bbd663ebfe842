//! JSON project files.
//!
//! ```json
//! {
//!   "items":     [{ "id": 1, "type": "Story", "state": "Active", "caption": "Login" }],
//!   "links":     [{ "name": "Contains", "parent": 1, "child": 2 }],
//!   "view_maps": [{ "title": "Tasks", "parent_types": ["Story"],
//!                   "child_type": "Task", "link_name": "Contains" }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::WorkbenchError;
use crate::model::{Link, ViewMap, WorkItem};

/// Serialized form of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub items: Vec<WorkItem>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub view_maps: Vec<ViewMap>,
}

impl ProjectFile {
    /// Parse a project from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ProjectLoad`] if the text is not a valid
    /// project document.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, WorkbenchError> {
        serde_json::from_str(text).map_err(|e| WorkbenchError::ProjectLoad {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a project file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ProjectLoad`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, WorkbenchError> {
        let text = std::fs::read_to_string(path).map_err(|e| WorkbenchError::ProjectLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    /// Write the project as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize project")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;

    #[test]
    fn parse_reports_path_on_error() {
        let err = ProjectFile::parse("{ not json", Path::new("broken.json"))
            .expect_err("should fail");
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let file = ProjectFile::parse(r#"{"items": []}"#, Path::new("p.json")).expect("parse");
        assert!(file.links.is_empty());
        assert!(file.view_maps.is_empty());
    }

    #[test]
    fn save_then_load_preserves_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.json");
        let file = ProjectFile {
            items: vec![WorkItem::new(1, "Story", "Active", "Login")],
            links: vec![Link::new("Contains", ItemId(1), ItemId(2))],
            view_maps: vec![],
        };
        file.save(&path).expect("save");
        let loaded = ProjectFile::load(&path).expect("load");
        assert_eq!(loaded, file);
    }
}
