//! The hierarchy display's canvas: scene, element arena and layout settings
//! bundled into one owned object.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, instrument};

use super::builder::{BuildContext, ViewMapIndex, build_hierarchy};
use super::layout::{self, LayoutConfig, LayoutPass};
use super::tree::{ElementId, HierarchyTree};
use crate::error::WorkbenchError;
use crate::geometry::{Orientation, Point, Size, Vector};
use crate::model::{ItemId, ViewMap, WorkItem};
use crate::project::ProjectData;
use crate::scene::Canvas;

/// Root item predicate supplied by a filter subsystem.
pub type RootFilter<'a> = &'a dyn Fn(&WorkItem) -> bool;

/// Inputs of one [`HierarchyCanvas::render_view`] call.
#[derive(Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    pub orientation: Orientation,
    /// Titles of the view maps to expand. Empty means all.
    pub selected_views: Option<&'a BTreeSet<String>>,
    pub hide_empty_views: bool,
    pub excluded_states: Option<&'a BTreeSet<String>>,
    /// Chooses the root items. Without a filter, top-level items are used.
    pub filter: Option<RootFilter<'a>>,
}

impl std::fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("orientation", &self.orientation)
            .field("selected_views", &self.selected_views)
            .field("hide_empty_views", &self.hide_empty_views)
            .field("excluded_states", &self.excluded_states)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Parents that show `item` through an active map.
fn mapped_parents<'p>(
    project: &'p ProjectData,
    index: &'p ViewMapIndex,
    item: &'p WorkItem,
) -> impl Iterator<Item = ItemId> + 'p {
    project.parent_links(item.id).into_iter().filter_map(move |link| {
        let parent = project.item(link.parent)?;
        index
            .maps_for(&parent.type_name)
            .iter()
            .filter_map(|id| project.view_map(*id))
            .any(|map| map.is_view_link(&link, &item.type_name))
            .then_some(parent.id)
    })
}

/// Items reachable from `start` through active maps, ignoring states.
fn reachable(project: &ProjectData, index: &ViewMapIndex, start: &WorkItem) -> HashSet<ItemId> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(item) = stack.pop() {
        for map_id in index.maps_for(&item.type_name) {
            let Some(map) = project.view_map(*map_id) else {
                continue;
            };
            for link in project.child_links(item.id) {
                let Some(child) = project.item(link.child) else {
                    continue;
                };
                if map.is_view_link(&link, &child.type_name) && seen.insert(child.id) {
                    stack.push(child);
                }
            }
        }
    }
    seen
}

/// Returns `true` if `item` is a parent type of an active map and is not the
/// child, through an active map, of another loaded item.
#[must_use]
pub fn is_top_level(project: &ProjectData, index: &ViewMapIndex, item: &WorkItem) -> bool {
    !index.maps_for(&item.type_name).is_empty()
        && mapped_parents(project, index, item).next().is_none()
}

/// Root items for a render, ordered by the display order of their first
/// map, then by that map's parent comparer.
///
/// With a filter, every accepted item is a root; types without a map become
/// leaves. Without one, top-level items are used, and each group of items
/// only reachable from itself (a link cycle nobody enters) contributes its
/// first member so that no part of the graph goes missing.
#[must_use]
pub fn root_items<'p>(
    project: &'p ProjectData,
    index: &ViewMapIndex,
    filter: Option<RootFilter<'_>>,
) -> Vec<&'p WorkItem> {
    let first_map = |item: &WorkItem| -> Option<(usize, &'p ViewMap)> {
        let id = *index.maps_for(&item.type_name).first()?;
        let rank = index.active().iter().position(|m| *m == id)?;
        Some((rank, project.view_map(id)?))
    };

    let mut candidates: Vec<(&WorkItem, usize, Option<&ViewMap>)> = project
        .items()
        .iter()
        .filter(|&item| match filter {
            Some(f) => f(item),
            None => !index.maps_for(&item.type_name).is_empty(),
        })
        .map(|item| {
            let first = first_map(item);
            (item, first.map_or(usize::MAX, |(r, _)| r), first.map(|(_, m)| m))
        })
        .collect();

    candidates.sort_by(|(a, rank_a, map_a), (b, rank_b, _)| {
        rank_a.cmp(rank_b).then_with(|| match map_a {
            Some(map) => map.parent_sort.compare(a, b),
            None => a.id.cmp(&b.id),
        })
    });
    let ordered = candidates.into_iter().map(|(item, _, _)| item);
    if filter.is_some() {
        return ordered.collect();
    }

    let (mut roots, rest): (Vec<&WorkItem>, Vec<&WorkItem>) =
        ordered.partition(|item| is_top_level(project, index, item));
    let mut covered: HashSet<ItemId> = HashSet::new();
    for item in &roots {
        covered.extend(reachable(project, index, item));
    }
    for item in rest {
        if covered.contains(&item.id) {
            continue;
        }
        // Seed only from a cycle with no way in from outside; anything
        // below it is picked up by the seed's own expansion.
        let below = reachable(project, index, item);
        if !mapped_parents(project, index, item).all(|p| below.contains(&p)) {
            continue;
        }
        debug!(item = %item.id, "seeding root for unentered link cycle");
        covered.insert(item.id);
        covered.extend(below);
        roots.push(item);
    }
    roots
}

/// Scene canvas plus the element tree rendered onto it.
#[derive(Debug, Default)]
pub struct HierarchyCanvas {
    canvas: Canvas,
    tree: HierarchyTree,
    layout: LayoutConfig,
    orientation: Orientation,
}

impl HierarchyCanvas {
    #[must_use]
    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[must_use]
    pub const fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    #[must_use]
    pub const fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutConfig) {
        self.layout = layout;
    }

    /// Orientation of the last successful render.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Rebuild the whole diagram.
    ///
    /// Preconditions are checked before anything is cleared, so a failed
    /// call leaves the previous diagram in place.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ProjectNotLoaded`] when `project` is `None`
    /// and [`WorkbenchError::InvalidArgument`] for an invalid layout config.
    #[instrument(level = "debug", skip_all, fields(orientation = %options.orientation))]
    pub fn render_view(
        &mut self,
        project: Option<&ProjectData>,
        options: &RenderOptions<'_>,
    ) -> Result<Vec<ElementId>, WorkbenchError> {
        let project = project.ok_or(WorkbenchError::ProjectNotLoaded)?;
        self.layout.validate()?;

        let no_selection = BTreeSet::new();
        let excluded_states = options.excluded_states.unwrap_or(&no_selection);
        let index = ViewMapIndex::new(project, options.selected_views.unwrap_or(&no_selection));
        let mut roots = root_items(project, &index, options.filter);
        roots.retain(|item| !excluded_states.contains(&item.state));

        self.clear_canvas();
        let ctx = BuildContext {
            project,
            index: &index,
            hide_empty: options.hide_empty_views,
            excluded_states,
        };
        let elements = build_hierarchy(&mut self.tree, &ctx, &roots, None);

        LayoutPass::new(self.layout, options.orientation).render_forest(
            &mut self.tree,
            &mut self.canvas,
            &elements,
        );
        let size = layout::resize_canvas_to_content(&mut self.canvas);
        self.orientation = options.orientation;

        debug!(
            roots = elements.len(),
            elements = self.tree.len(),
            width = size.width,
            height = size.height,
            "hierarchy rendered"
        );
        Ok(elements)
    }

    /// Lay the current tree out again without rebuilding it.
    pub fn relayout(&mut self, orientation: Orientation) -> Size {
        let roots = self.tree.roots().to_vec();
        LayoutPass::new(self.layout, orientation).render_forest(
            &mut self.tree,
            &mut self.canvas,
            &roots,
        );
        self.orientation = orientation;
        layout::resize_canvas_to_content(&mut self.canvas)
    }

    /// Release every element rendered for `item`. Returns how many item
    /// elements were released; unknown items release nothing.
    pub fn remove_associated_visual(&mut self, item: ItemId) -> usize {
        let mut released = 0;
        for id in self.tree.items_for(item) {
            // An earlier release may already have taken this one with it.
            if !self.tree.contains(id) {
                continue;
            }
            layout::release_resources(&mut self.tree, &mut self.canvas, id);
            released += 1;
        }
        if released > 0 {
            debug!(%item, released, "released hierarchy elements");
        }
        released
    }

    /// Remove every visual and element.
    pub fn clear_canvas(&mut self) {
        for root in self.tree.roots().to_vec() {
            layout::remove_visuals(&mut self.tree, &mut self.canvas, root);
        }
        self.tree.clear();
        self.canvas.clear();
    }

    /// Item elements currently rendered for `item`.
    #[must_use]
    pub fn try_get_associated_visuals(&self, item: ItemId) -> Option<Vec<ElementId>> {
        let found = self.tree.items_for(item);
        (!found.is_empty()).then_some(found)
    }

    /// Highlight the cards rendered for `item`, clearing any earlier
    /// highlight. Returns the number of highlighted cards.
    pub fn highlight(&mut self, item: ItemId) -> usize {
        self.canvas.clear_highlights();
        let visuals: Vec<_> = self
            .try_get_associated_visuals(item)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.tree.get(id)?.visual)
            .collect();
        visuals
            .into_iter()
            .filter(|v| self.canvas.set_highlighted(*v, true))
            .count()
    }

    /// Element whose card lies under `point`.
    #[must_use]
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.canvas
            .hit_test(point)
            .filter(|id| self.tree.contains(*id))
    }

    /// Top-left corner of an element's card.
    #[must_use]
    pub fn element_position(&self, id: ElementId) -> Option<Point> {
        self.canvas.position(self.tree.get(id)?.visual?)
    }

    /// Move an element by `delta`, with or without its descendants.
    pub fn translate(&mut self, id: ElementId, delta: Vector, move_descendants: bool) {
        layout::translate_subtree(&mut self.tree, &mut self.canvas, id, delta, move_descendants);
    }

    pub fn move_elements_to_top_left(&mut self) -> Vector {
        layout::move_elements_to_top_left(&mut self.tree, &mut self.canvas)
    }

    pub fn resize_to_content(&mut self) -> Size {
        layout::resize_canvas_to_content(&mut self.canvas)
    }
}
