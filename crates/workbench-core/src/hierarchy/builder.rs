//! Builds the element forest from project data.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, warn};

use super::tree::{ElementId, HierarchyTree};
use crate::model::{ViewMap, ViewMapId, WorkItem};
use crate::project::ProjectData;

/// Active view maps keyed by parent type name.
///
/// Maps for one type are ordered by display order, then id.
#[derive(Debug, Clone, Default)]
pub struct ViewMapIndex {
    by_type: BTreeMap<String, Vec<ViewMapId>>,
    active: Vec<ViewMapId>,
}

impl ViewMapIndex {
    /// Index the view maps whose titles are in `selected`. An empty
    /// selection activates every map; unknown titles are ignored.
    #[must_use]
    pub fn new(project: &ProjectData, selected: &BTreeSet<String>) -> Self {
        for title in selected {
            if project.view_map_by_title(title).is_none() {
                warn!(title = %title, "selected view map does not exist");
            }
        }

        let mut maps: Vec<&ViewMap> = project
            .view_maps()
            .iter()
            .filter(|m| selected.is_empty() || selected.contains(&m.title))
            .collect();
        maps.sort_by_key(|m| (m.display_order, m.id));

        let mut by_type: BTreeMap<String, Vec<ViewMapId>> = BTreeMap::new();
        for map in &maps {
            for parent_type in &map.parent_types {
                by_type.entry(parent_type.clone()).or_default().push(map.id);
            }
        }
        Self {
            by_type,
            active: maps.iter().map(|m| m.id).collect(),
        }
    }

    /// Maps applying to items of `type_name`.
    #[must_use]
    pub fn maps_for(&self, type_name: &str) -> &[ViewMapId] {
        self.by_type.get(type_name).map_or(&[], Vec::as_slice)
    }

    /// Active maps in display order.
    #[must_use]
    pub fn active(&self) -> &[ViewMapId] {
        &self.active
    }

    #[must_use]
    pub fn contains(&self, id: ViewMapId) -> bool {
        self.active.contains(&id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Inputs shared by every level of one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub project: &'a ProjectData,
    pub index: &'a ViewMapIndex,
    pub hide_empty: bool,
    pub excluded_states: &'a BTreeSet<String>,
}

/// Children of `item` shown by `map`: linked through the map's link name,
/// of the map's child type, and not in an excluded state. Links pointing at
/// items that are not loaded are skipped.
#[must_use]
pub fn matching_children<'p>(
    project: &'p ProjectData,
    item: &WorkItem,
    map: &ViewMap,
    excluded_states: &BTreeSet<String>,
) -> Vec<&'p WorkItem> {
    let mut children: Vec<&WorkItem> = project
        .child_links(item.id)
        .iter()
        .filter_map(|link| {
            let child = project.item(link.child)?;
            map.is_view_link(link, &child.type_name).then_some(child)
        })
        .filter(|child| !excluded_states.contains(&child.state))
        .collect();
    map.child_sort.sort(&mut children);
    children
}

/// Insert one item element per entry of `roots` under `parent_view` and
/// expand their views recursively. Returns the inserted item elements.
///
/// An item that already appears on the path above the insertion point is
/// inserted as a leaf, which keeps circular link graphs finite.
#[instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub fn build_hierarchy(
    tree: &mut HierarchyTree,
    ctx: &BuildContext<'_>,
    roots: &[&WorkItem],
    parent_view: Option<ElementId>,
) -> Vec<ElementId> {
    let mut built = Vec::with_capacity(roots.len());
    for item in roots {
        let repeated = tree.is_parent_in_tree(parent_view, item.id);
        let element = tree.insert_item(parent_view, item.id, item.label());
        built.push(element);
        if repeated {
            debug!(item = %item.id, "item already on this path, not expanding");
            continue;
        }
        expand_views(tree, ctx, item, element);
    }
    built
}

fn expand_views(
    tree: &mut HierarchyTree,
    ctx: &BuildContext<'_>,
    item: &WorkItem,
    element: ElementId,
) {
    for map_id in ctx.index.maps_for(&item.type_name) {
        let Some(map) = ctx.project.view_map(*map_id) else {
            continue;
        };
        let children = matching_children(ctx.project, item, map, ctx.excluded_states);
        if children.is_empty() && ctx.hide_empty {
            continue;
        }
        let view = tree.insert_view(element, map.id, item.id, map.title.clone());
        build_hierarchy(tree, ctx, &children, Some(view));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ElementKind;
    use crate::model::{ItemId, Link, SortField, SortOrder};

    fn project() -> ProjectData {
        let mut p = ProjectData::new();
        p.add_item(WorkItem::new(1, "Story", "Active", "Login"));
        p.add_item(WorkItem::new(2, "Task", "Active", "b-form"));
        p.add_item(WorkItem::new(3, "Task", "Active", "a-backend"));
        p.add_item(WorkItem::new(4, "Bug", "Active", "crash"));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(2)));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(3)));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(4)));
        p.add_view_map(
            ViewMap::new("Tasks", &["Story"], "Task", "Contains")
                .with_child_sort(SortOrder::ascending(SortField::Caption)),
        );
        p.add_view_map(ViewMap::new("Bugs", &["Story"], "Bug", "Fixes").with_display_order(5));
        p
    }

    #[test]
    fn index_orders_maps_by_display_order() {
        let p = project();
        let index = ViewMapIndex::new(&p, &BTreeSet::new());
        let titles: Vec<&str> = index
            .maps_for("Story")
            .iter()
            .filter_map(|id| p.view_map(*id))
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Tasks", "Bugs"]);
        assert!(index.maps_for("Task").is_empty());
    }

    #[test]
    fn selection_restricts_active_maps() {
        let p = project();
        let selected = BTreeSet::from(["Bugs".to_string(), "Missing".to_string()]);
        let index = ViewMapIndex::new(&p, &selected);
        assert_eq!(index.active().len(), 1);
    }

    #[test]
    fn matching_children_filter_by_type_and_sort() {
        let p = project();
        let story = p.item(ItemId(1)).expect("story");
        let tasks = p.view_map_by_title("Tasks").expect("map");
        let children = matching_children(&p, story, tasks, &BTreeSet::new());
        let ids: Vec<ItemId> = children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ItemId(3), ItemId(2)]);
    }

    #[test]
    fn empty_views_follow_hide_flag() {
        let p = project();
        let index = ViewMapIndex::new(&p, &BTreeSet::new());
        let excluded = BTreeSet::new();
        let story = p.item(ItemId(1)).expect("story");

        for (hide, expected_views) in [(true, 1), (false, 2)] {
            let mut tree = HierarchyTree::new();
            let ctx = BuildContext {
                project: &p,
                index: &index,
                hide_empty: hide,
                excluded_states: &excluded,
            };
            let roots = build_hierarchy(&mut tree, &ctx, &[story], None);
            assert_eq!(tree.children(roots[0]).len(), expected_views);
        }
    }

    #[test]
    fn repeated_item_is_a_leaf() {
        let mut p = project();
        p.add_view_map(ViewMap::new("Back", &["Task"], "Story", "Contains"));
        p.add_link(Link::new("Contains", ItemId(2), ItemId(1)));
        let index = ViewMapIndex::new(&p, &BTreeSet::new());
        let excluded = BTreeSet::new();
        let ctx = BuildContext {
            project: &p,
            index: &index,
            hide_empty: true,
            excluded_states: &excluded,
        };
        let story = p.item(ItemId(1)).expect("story");
        let mut tree = HierarchyTree::new();
        build_hierarchy(&mut tree, &ctx, &[story], None);

        let stories = tree.items_for(ItemId(1));
        assert_eq!(stories.len(), 2);
        assert!(tree.children(stories[1]).is_empty());
        assert!(matches!(
            tree.get(stories[1]).map(|e| &e.kind),
            Some(ElementKind::Item { .. })
        ));
    }
}
