//! View maps: which links between which item types appear in the diagram.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::item::{Link, WorkItem};

/// Stable identifier assigned to a view map by the project data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ViewMapId(pub u32);

impl fmt::Display for ViewMapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Field a [`SortOrder`] compares on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Id,
    Caption,
    State,
}

/// Declared ordering of work items, used as the child (or parent) comparer of
/// a view map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOrder {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub descending: bool,
}

impl SortOrder {
    #[must_use]
    pub const fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    #[must_use]
    pub const fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Compare two items. Ties on the sort field fall back to the item id so
    /// the result is total and deterministic.
    #[must_use]
    pub fn compare(&self, a: &WorkItem, b: &WorkItem) -> Ordering {
        let primary = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Caption => a.caption.cmp(&b.caption),
            SortField::State => a.state.cmp(&b.state),
        };
        let ordered = primary.then_with(|| a.id.cmp(&b.id));
        if self.descending {
            ordered.reverse()
        } else {
            ordered
        }
    }

    /// Sort `items` in place by this order.
    pub fn sort(&self, items: &mut [&WorkItem]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

/// A view definition: for items of any of `parent_types`, show children of
/// `child_type` reached through links named `link_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMap {
    #[serde(default)]
    pub id: ViewMapId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub parent_types: Vec<String>,
    pub child_type: String,
    pub link_name: String,
    #[serde(default)]
    pub child_sort: SortOrder,
    #[serde(default)]
    pub parent_sort: SortOrder,
    #[serde(default)]
    pub display_order: i32,
}

impl ViewMap {
    pub fn new(
        title: impl Into<String>,
        parent_types: &[&str],
        child_type: impl Into<String>,
        link_name: impl Into<String>,
    ) -> Self {
        Self {
            id: ViewMapId::default(),
            title: title.into(),
            description: String::new(),
            parent_types: parent_types.iter().map(|t| (*t).to_string()).collect(),
            child_type: child_type.into(),
            link_name: link_name.into(),
            child_sort: SortOrder::default(),
            parent_sort: SortOrder::default(),
            display_order: 0,
        }
    }

    #[must_use]
    pub fn with_child_sort(mut self, order: SortOrder) -> Self {
        self.child_sort = order;
        self
    }

    #[must_use]
    pub const fn with_display_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    #[must_use]
    pub fn applies_to(&self, type_name: &str) -> bool {
        self.parent_types.iter().any(|t| t == type_name)
    }

    /// Returns `true` if `link` is drawn by this view, given the type of the
    /// link's child item.
    #[must_use]
    pub fn is_view_link(&self, link: &Link, child_type: &str) -> bool {
        link.name == self.link_name && child_type == self.child_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ItemId;

    fn item(id: u64, state: &str, caption: &str) -> WorkItem {
        WorkItem::new(id, "Task", state, caption)
    }

    #[test]
    fn compare_breaks_ties_by_id() {
        let order = SortOrder::ascending(SortField::State);
        let a = item(2, "Active", "b");
        let b = item(1, "Active", "a");
        assert_eq!(order.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn descending_reverses_the_full_order() {
        let order = SortOrder::descending(SortField::Caption);
        let a = item(1, "Active", "alpha");
        let b = item(2, "Active", "beta");
        let mut items = vec![&a, &b];
        order.sort(&mut items);
        assert_eq!(items[0].id, ItemId(2));
    }

    #[test]
    fn view_link_requires_name_and_child_type() {
        let map = ViewMap::new("Tasks", &["Story"], "Task", "Contains");
        let link = Link::new("Contains", ItemId(1), ItemId(2));
        assert!(map.is_view_link(&link, "Task"));
        assert!(!map.is_view_link(&link, "Bug"));
        let other = Link::new("Related", ItemId(1), ItemId(2));
        assert!(!map.is_view_link(&other, "Task"));
        assert!(map.applies_to("Story"));
        assert!(!map.applies_to("Task"));
    }

    #[test]
    fn view_map_defaults_when_fields_are_missing() {
        let map: ViewMap = serde_json::from_str(
            r#"{"title":"Tasks","parent_types":["Story"],"child_type":"Task","link_name":"Contains"}"#,
        )
        .expect("parse");
        assert_eq!(map.child_sort, SortOrder::ascending(SortField::Id));
        assert_eq!(map.display_order, 0);
    }
}
