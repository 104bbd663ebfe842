//! Retained-mode canvas.
//!
//! The canvas is an arena of [`Visual`]s addressed by [`VisualId`]. Nothing on
//! the canvas knows about the hierarchy; hierarchy elements hold the ids of the
//! visuals they own and are solely responsible for adding and removing them.
//! Card visuals carry the [`ElementId`] of their owner so hit tests can map a
//! pointer position back to an element.

use serde::Serialize;
use slotmap::SlotMap;

use crate::geometry::{Point, Rect, Size};
use crate::hierarchy::ElementId;

slotmap::new_key_type! {
    /// Handle to a visual on a [`Canvas`].
    pub struct VisualId;
}

/// Diameter of the entry/exit marker ellipses.
pub const MARKER_SIZE: f64 = 6.0;

/// What a card represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Item,
    View,
}

/// Drawable content of a visual.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Shape {
    /// A labelled box representing a hierarchy element.
    Card {
        kind: CardKind,
        label: String,
        #[serde(skip)]
        owner: ElementId,
    },
    /// A small ellipse marking a connector end.
    Marker,
    /// A straight connector line.
    Line { from: Point, to: Point },
}

/// A positioned shape on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visual {
    pub shape: Shape,
    pub bounds: Rect,
    pub highlighted: bool,
}

impl Visual {
    #[must_use]
    pub fn card(kind: CardKind, label: impl Into<String>, owner: ElementId, size: Size) -> Self {
        Self {
            shape: Shape::Card {
                kind,
                label: label.into(),
                owner,
            },
            bounds: Rect::new(Point::ZERO, size),
            highlighted: false,
        }
    }

    #[must_use]
    pub fn marker(center: Point) -> Self {
        Self {
            shape: Shape::Marker,
            bounds: marker_bounds(center),
            highlighted: false,
        }
    }

    #[must_use]
    pub fn line(from: Point, to: Point) -> Self {
        Self {
            shape: Shape::Line { from, to },
            bounds: Rect::spanning(from, to),
            highlighted: false,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> Option<ElementId> {
        match self.shape {
            Shape::Card { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

fn marker_bounds(center: Point) -> Rect {
    let half = MARKER_SIZE / 2.0;
    Rect::new(
        Point::new(center.x - half, center.y - half),
        Size::new(MARKER_SIZE, MARKER_SIZE),
    )
}

/// An arena of visuals plus the canvas extent.
#[derive(Debug, Default)]
pub struct Canvas {
    visuals: SlotMap<VisualId, Visual>,
    /// Insertion order, used as paint order.
    order: Vec<VisualId>,
    size: Size,
}

impl Canvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, visual: Visual) -> VisualId {
        let id = self.visuals.insert(visual);
        self.order.push(id);
        id
    }

    /// Remove a visual. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: VisualId) -> bool {
        if self.visuals.remove(id).is_none() {
            return false;
        }
        self.order.retain(|v| *v != id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: VisualId) -> bool {
        self.visuals.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: VisualId) -> Option<&Visual> {
        self.visuals.get(id)
    }

    /// Move a visual's top-left corner.
    pub fn set_position(&mut self, id: VisualId, position: Point) -> bool {
        self.visuals.get_mut(id).is_some_and(|v| {
            v.bounds.x = position.x;
            v.bounds.y = position.y;
            true
        })
    }

    #[must_use]
    pub fn position(&self, id: VisualId) -> Option<Point> {
        self.visuals.get(id).map(|v| v.bounds.origin())
    }

    /// Center a marker visual on `center`.
    pub fn set_marker_center(&mut self, id: VisualId, center: Point) -> bool {
        self.visuals.get_mut(id).is_some_and(|v| {
            v.bounds = marker_bounds(center);
            true
        })
    }

    /// Set both endpoints of a line visual.
    pub fn set_line(&mut self, id: VisualId, from: Point, to: Point) -> bool {
        match self.visuals.get_mut(id) {
            Some(v) if matches!(v.shape, Shape::Line { .. }) => {
                v.shape = Shape::Line { from, to };
                v.bounds = Rect::spanning(from, to);
                true
            }
            _ => false,
        }
    }

    pub fn set_highlighted(&mut self, id: VisualId, highlighted: bool) -> bool {
        self.visuals.get_mut(id).is_some_and(|v| {
            v.highlighted = highlighted;
            true
        })
    }

    /// Clear the highlight flag on every visual.
    pub fn clear_highlights(&mut self) {
        for v in self.visuals.values_mut() {
            v.highlighted = false;
        }
    }

    /// Visuals in paint order.
    pub fn iter(&self) -> impl Iterator<Item = (VisualId, &Visual)> {
        self.order
            .iter()
            .filter_map(|id| self.visuals.get(*id).map(|v| (*id, v)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// Remove every visual and reset the extent.
    pub fn clear(&mut self) {
        self.visuals.clear();
        self.order.clear();
        self.size = Size::ZERO;
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Resize the canvas to the bounding box of its content: the maximum of
    /// `position + size` over all visuals, clamped to non-negative values.
    pub fn resize_to_content(&mut self) -> Size {
        let (width, height) = self
            .visuals
            .values()
            .fold((0.0_f64, 0.0_f64), |(w, h), v| {
                (w.max(v.bounds.right()), h.max(v.bounds.bottom()))
            });
        self.size = Size::new(width.max(0.0), height.max(0.0));
        self.size
    }

    /// Topmost card under `point`, as the element that owns it.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.visuals.get(*id))
            .find(|v| v.owner().is_some() && v.bounds.contains(point))
            .and_then(Visual::owner)
    }
}
