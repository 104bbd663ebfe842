//! Display settings and change notifications.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::HierarchyConfig;
use crate::geometry::Orientation;
use crate::model::{ItemId, WorkItem};

/// How root items are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RootSelection {
    /// Items with an applicable view map and no mapped parent.
    #[default]
    TopLevel,
    /// Items of these types.
    Types(BTreeSet<String>),
    /// Exactly these items.
    Items(BTreeSet<ItemId>),
}

impl RootSelection {
    /// Predicate for explicit selections; `None` for [`Self::TopLevel`].
    #[must_use]
    pub fn predicate(&self) -> Option<Box<dyn Fn(&WorkItem) -> bool + '_>> {
        match self {
            Self::TopLevel => None,
            Self::Types(types) => Some(Box::new(|item: &WorkItem| types.contains(&item.type_name))),
            Self::Items(ids) => Some(Box::new(|item: &WorkItem| ids.contains(&item.id))),
        }
    }
}

/// Everything that shapes the rendered hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplaySettings {
    pub orientation: Orientation,
    pub selected_views: BTreeSet<String>,
    pub hide_empty_views: bool,
    pub excluded_states: BTreeSet<String>,
    pub roots: RootSelection,
}

impl DisplaySettings {
    #[must_use]
    pub fn from_config(orientation: Orientation, hierarchy: &HierarchyConfig) -> Self {
        Self {
            orientation,
            selected_views: hierarchy.selected_views.iter().cloned().collect(),
            hide_empty_views: hierarchy.hide_empty_views,
            excluded_states: hierarchy.excluded_states.iter().cloned().collect(),
            roots: RootSelection::TopLevel,
        }
    }

    /// Apply `change`. Returns `false` if it changed nothing.
    pub fn apply(&mut self, change: &SettingChange) -> bool {
        match change {
            SettingChange::Orientation(o) => replace(&mut self.orientation, *o),
            SettingChange::SelectedViews(v) => replace(&mut self.selected_views, v.clone()),
            SettingChange::HideEmptyViews(h) => replace(&mut self.hide_empty_views, *h),
            SettingChange::ExcludedStates(s) => replace(&mut self.excluded_states, s.clone()),
            SettingChange::Roots(r) => replace(&mut self.roots, r.clone()),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A single settings update, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Orientation(Orientation),
    SelectedViews(BTreeSet<String>),
    HideEmptyViews(bool),
    ExcludedStates(BTreeSet<String>),
    Roots(RootSelection),
}

impl fmt::Display for SettingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orientation(o) => write!(f, "orientation={o}"),
            Self::SelectedViews(v) => write!(f, "selected_views={}", v.len()),
            Self::HideEmptyViews(h) => write!(f, "hide_empty_views={h}"),
            Self::ExcludedStates(s) => write!(f, "excluded_states={}", s.len()),
            Self::Roots(_) => f.write_str("roots"),
        }
    }
}

/// Callback invoked after a setting changed.
pub type SettingObserver = Box<dyn FnMut(&SettingChange)>;
