//! Work-item data consumed by the hierarchy engine.
//!
//! The engine never owns work items; it reads them from
//! [`crate::project::ProjectData`] and refers to them by [`ItemId`].
//!
//! - [`item`]: work items, links and the selection DTO.
//! - [`view_map`]: view definitions that decide which links are drawn.

pub mod item;
pub mod view_map;

pub use item::{ItemId, Link, SelectedValue, WorkItem, selected_texts};
pub use view_map::{SortField, SortOrder, ViewMap, ViewMapId};

use std::fmt;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}
