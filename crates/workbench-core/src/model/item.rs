use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a work item on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

/// A work item as seen by the hierarchy engine: a type name plus the few
/// fields the diagram displays or filters on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub caption: String,
}

impl WorkItem {
    pub fn new(
        id: u64,
        type_name: impl Into<String>,
        state: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId(id),
            type_name: type_name.into(),
            state: state.into(),
            caption: caption.into(),
        }
    }

    /// Short label used on diagram cards.
    #[must_use]
    pub fn label(&self) -> String {
        if self.caption.is_empty() {
            format!("{} {}", self.type_name, self.id)
        } else {
            format!("{} {}", self.id, self.caption)
        }
    }
}

/// A named, directed relation from a parent work item to a child work item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub parent: ItemId,
    pub child: ItemId,
}

impl Link {
    pub fn new(name: impl Into<String>, parent: ItemId, child: ItemId) -> Self {
        Self {
            name: name.into(),
            parent,
            child,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.parent, self.name, self.child)
    }
}

/// A text value with a selection flag, used for view and state pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedValue {
    pub text: String,
    pub is_selected: bool,
}

impl SelectedValue {
    pub fn new(text: impl Into<String>, is_selected: bool) -> Self {
        Self {
            text: text.into(),
            is_selected,
        }
    }

    pub fn selected(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }
}

/// Collect the texts of all selected values.
#[must_use]
pub fn selected_texts(values: &[SelectedValue]) -> BTreeSet<String> {
    values
        .iter()
        .filter(|v| v.is_selected)
        .map(|v| v.text.clone())
        .collect()
}
