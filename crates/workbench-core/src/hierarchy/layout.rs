//! Tree layout: desired sizes, element placement, connectors and the
//! whole-diagram adjustments run after a drag.
//!
//! Positions are computed in `(sibling, level)` coordinates and mapped to
//! canvas X/Y through [`Orientation`]. An element's box is centered inside
//! its desired sibling extent; its children start one and a half paddings
//! past its exit point and are laid out one after another.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::tree::{ElementId, ElementKind, HierarchyTree, RenderState};
use crate::error::WorkbenchError;
use crate::geometry::{Orientation, Point, Size, Vector};
use crate::scene::{Canvas, CardKind, Visual, VisualId};

/// Standard padding between elements, in layout units.
pub const DEFAULT_PADDING: f64 = 50.0;

/// Fixed element sizes and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub padding: f64,
    pub item_size: Size,
    pub view_size: Size,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            item_size: Size::new(160.0, 60.0),
            view_size: Size::new(140.0, 40.0),
        }
    }
}

impl LayoutConfig {
    /// Reject non-positive or non-finite sizes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::InvalidArgument`] naming the offending field.
    pub fn validate(&self) -> Result<(), WorkbenchError> {
        if !self.padding.is_finite() || self.padding <= 0.0 {
            return Err(WorkbenchError::invalid_argument(
                "padding",
                format!("must be a positive number, got {}", self.padding),
            ));
        }
        if !self.item_size.is_positive() {
            return Err(WorkbenchError::invalid_argument(
                "item_size",
                "width and height must be positive",
            ));
        }
        if !self.view_size.is_positive() {
            return Err(WorkbenchError::invalid_argument(
                "view_size",
                "width and height must be positive",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn fixed_size(&self, kind: &ElementKind) -> Size {
        match kind {
            ElementKind::Item { .. } => self.item_size,
            ElementKind::View(_) => self.view_size,
        }
    }

    /// Gap between a parent's exit point and its children's level.
    #[must_use]
    pub fn level_gap(&self) -> f64 {
        self.padding * 1.5
    }
}

/// One layout pass. Desired sizes are cached for the lifetime of the pass;
/// build a new pass after the tree changes.
#[derive(Debug)]
pub struct LayoutPass {
    config: LayoutConfig,
    orientation: Orientation,
    desired: HashMap<ElementId, Size>,
}

impl LayoutPass {
    #[must_use]
    pub fn new(config: LayoutConfig, orientation: Orientation) -> Self {
        Self {
            config,
            orientation,
            desired: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Minimum box needed by `id` and its whole subtree.
    ///
    /// The sibling extent is the element's own extent plus half a padding,
    /// grown to the sum of its children's extents. The level extent is never
    /// smaller than the parent's own fixed level extent; [`Self::render`]
    /// starts the children's level that far past the element's offset, so
    /// a short view card still takes a full item row.
    pub fn desired_size(&mut self, tree: &HierarchyTree, id: ElementId) -> Size {
        if let Some(size) = self.desired.get(&id) {
            return *size;
        }
        let Some(element) = tree.get(id) else {
            return Size::ZERO;
        };

        let o = self.orientation;
        let (own_sibling, own_level) = o.split_size(self.config.fixed_size(&element.kind));
        let children_sibling: f64 = element
            .children
            .iter()
            .map(|child| o.split_size(self.desired_size(tree, *child)).0)
            .sum();
        let sibling = (own_sibling + self.config.padding / 2.0).max(children_sibling);

        let parent_level = element
            .parent
            .and_then(|p| tree.get(p))
            .map_or(0.0, |p| o.split_size(self.config.fixed_size(&p.kind)).1);
        let size = o.size(sibling, own_level.max(parent_level));

        self.desired.insert(id, size);
        size
    }

    /// Lay out every root one after another starting at the origin.
    pub fn render_forest(
        &mut self,
        tree: &mut HierarchyTree,
        canvas: &mut Canvas,
        roots: &[ElementId],
    ) -> Point {
        roots.iter().fold(Point::ZERO, |offset, root| {
            self.render(tree, canvas, *root, offset)
        })
    }

    /// Place `id` and its subtree at `offset`, creating visuals on first use.
    ///
    /// Children start one level gap past this element's desired level
    /// extent. Returns the offset of the next sibling: `offset` advanced by
    /// this element's desired sibling extent.
    pub fn render(
        &mut self,
        tree: &mut HierarchyTree,
        canvas: &mut Canvas,
        id: ElementId,
        offset: Point,
    ) -> Point {
        let o = self.orientation;
        let (desired_sibling, desired_level) = o.split_size(self.desired_size(tree, id));
        let (offset_sibling, offset_level) = o.split_point(offset);

        let children = {
            let Some(element) = tree.get_mut(id) else {
                return offset;
            };
            let size = self.config.fixed_size(&element.kind);
            let (sibling, level) = o.split_size(size);
            let box_sibling = offset_sibling + (desired_sibling - sibling) / 2.0;
            let center = box_sibling + sibling / 2.0;

            element.entry_point = o.point(center, offset_level);
            element.exit_point = o.point(center, offset_level + level);

            let visual = match element.visual.filter(|v| canvas.contains(*v)) {
                Some(v) => v,
                None => {
                    let kind = if element.kind.is_view() {
                        CardKind::View
                    } else {
                        CardKind::Item
                    };
                    canvas.add(Visual::card(kind, element.label.clone(), id, size))
                }
            };
            canvas.set_position(visual, o.point(box_sibling, offset_level));
            element.visual = Some(visual);
            element.state = RenderState::Rendered;
            element.children.clone()
        };

        let children_sibling: f64 = children
            .iter()
            .map(|c| o.split_size(self.desired_size(tree, *c)).0)
            .sum();
        let mut cursor = o.point(
            offset_sibling + (desired_sibling - children_sibling) / 2.0,
            offset_level + desired_level + self.config.level_gap(),
        );
        for child in children {
            cursor = self.render(tree, canvas, child, cursor);
        }

        draw_connections(tree, canvas, id);
        trace!(?id, ?offset, "element rendered");
        o.point(offset_sibling + desired_sibling, offset_level)
    }
}

/// Create or reposition the entry and exit markers of `id` and the line from
/// its parent's exit point to its entry point. Safe to call repeatedly.
pub fn draw_connections(tree: &mut HierarchyTree, canvas: &mut Canvas, id: ElementId) {
    let parent_exit = tree
        .parent(id)
        .and_then(|p| tree.get(p))
        .map(|p| p.exit_point);
    let Some(element) = tree.get_mut(id) else {
        return;
    };
    let (entry, exit) = (element.entry_point, element.exit_point);
    let connectors = &mut element.connectors;

    connectors.entry_marker = Some(place_marker(canvas, connectors.entry_marker, entry));
    connectors.exit_marker = Some(place_marker(canvas, connectors.exit_marker, exit));

    connectors.line = match parent_exit {
        Some(from) => Some(match connectors.line.filter(|l| canvas.contains(*l)) {
            Some(line) => {
                canvas.set_line(line, from, entry);
                line
            }
            None => canvas.add(Visual::line(from, entry)),
        }),
        None => {
            if let Some(stale) = connectors.line {
                canvas.remove(stale);
            }
            None
        }
    };
}

fn place_marker(canvas: &mut Canvas, existing: Option<VisualId>, at: Point) -> VisualId {
    match existing.filter(|m| canvas.contains(*m)) {
        Some(marker) => {
            canvas.set_marker_center(marker, at);
            marker
        }
        None => canvas.add(Visual::marker(at)),
    }
}

/// Remove the visuals of `id` and its descendants from the canvas.
/// Idempotent; the elements stay in the tree.
pub fn remove_visuals(tree: &mut HierarchyTree, canvas: &mut Canvas, id: ElementId) {
    if !tree.contains(id) {
        return;
    }
    let mut targets = vec![id];
    targets.extend(tree.descendants(id));
    for target in targets {
        let Some(element) = tree.get_mut(target) else {
            continue;
        };
        let connectors = std::mem::take(&mut element.connectors);
        for handle in element.visual.take().into_iter().chain(connectors.handles()) {
            canvas.remove(handle);
        }
        if element.state == RenderState::Rendered {
            element.state = RenderState::Removed;
        }
    }
}

/// Remove the visuals of `id`'s subtree, detach it from its parent and drop
/// it from the arena. Returns the number of elements released.
pub fn release_resources(tree: &mut HierarchyTree, canvas: &mut Canvas, id: ElementId) -> usize {
    remove_visuals(tree, canvas, id);
    tree.remove_subtree(id)
}

/// Move the card and connector points of one element by `delta`. Connectors
/// are not redrawn.
pub fn translate_element(
    tree: &mut HierarchyTree,
    canvas: &mut Canvas,
    id: ElementId,
    delta: Vector,
) {
    let Some(element) = tree.get_mut(id) else {
        return;
    };
    element.entry_point = element.entry_point + delta;
    element.exit_point = element.exit_point + delta;
    if let Some((visual, position)) = element
        .visual
        .and_then(|v| canvas.position(v).map(|p| (v, p)))
    {
        canvas.set_position(visual, position + delta);
    }
}

/// Move `id` by `delta` and redraw connectors below it. With
/// `move_descendants` the whole subtree moves rigidly; without it only the
/// descendants' connectors are redrawn.
pub fn translate_subtree(
    tree: &mut HierarchyTree,
    canvas: &mut Canvas,
    id: ElementId,
    delta: Vector,
    move_descendants: bool,
) {
    translate_element(tree, canvas, id, delta);
    draw_connections(tree, canvas, id);
    for descendant in tree.descendants(id) {
        if move_descendants {
            translate_element(tree, canvas, descendant, delta);
        }
        draw_connections(tree, canvas, descendant);
    }
}

/// Shift every rendered element so the top-left-most card sits at the
/// origin. Returns the applied translation.
pub fn move_elements_to_top_left(tree: &mut HierarchyTree, canvas: &mut Canvas) -> Vector {
    let order = tree.preorder();
    let min = order
        .iter()
        .filter_map(|id| tree.get(*id)?.visual)
        .filter_map(|v| canvas.position(v))
        .reduce(|a, b| Point::new(a.x.min(b.x), a.y.min(b.y)));
    let Some(min) = min else {
        return Vector::ZERO;
    };
    let delta = Point::ZERO - min;
    if delta.is_zero() {
        return delta;
    }
    for id in &order {
        translate_element(tree, canvas, *id, delta);
    }
    for id in &order {
        if tree.get(*id).is_some_and(|e| e.state == RenderState::Rendered) {
            draw_connections(tree, canvas, *id);
        }
    }
    delta
}

/// Resize the canvas to the bounding box of its visuals.
pub fn resize_canvas_to_content(canvas: &mut Canvas) -> Size {
    canvas.resize_to_content()
}
