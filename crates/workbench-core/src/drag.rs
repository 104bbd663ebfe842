//! Pointer-driven repositioning of diagram elements.

use tracing::debug;

use crate::geometry::{Point, Vector};
use crate::hierarchy::{ElementId, HierarchyCanvas};

/// Pointer cursor shown by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Arrow,
    Grab,
}

/// Modifier keys held during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragModifiers {
    /// Move only the grabbed element and leave its descendants in place.
    pub move_only_node: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Capture {
    element: ElementId,
    /// Pointer position relative to the card's top-left corner at press.
    grab_offset: Vector,
}

/// Tracks the element being dragged, if any.
#[derive(Debug, Default)]
pub struct DragController {
    capture: Option<Capture>,
    cursor: Cursor,
}

impl DragController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn captured(&self) -> Option<ElementId> {
        self.capture.map(|c| c.element)
    }

    /// Primary button pressed at `point`. Captures the element under the
    /// pointer, if any.
    pub fn press(&mut self, canvas: &HierarchyCanvas, point: Point) -> Option<ElementId> {
        let element = canvas.element_at(point)?;
        let origin = canvas.element_position(element)?;
        self.capture = Some(Capture {
            element,
            grab_offset: point - origin,
        });
        self.cursor = Cursor::Grab;
        debug!(?element, "drag started");
        Some(element)
    }

    /// Pointer moved to `point`. Moves the captured element so the spot that
    /// was grabbed sits under the pointer again, and returns whether anything
    /// moved.
    pub fn drag_to(
        &mut self,
        canvas: &mut HierarchyCanvas,
        point: Point,
        modifiers: DragModifiers,
    ) -> bool {
        let Some(capture) = self.capture else {
            return false;
        };
        let Some(origin) = canvas.element_position(capture.element) else {
            debug!(element = ?capture.element, "dragged element disappeared, dropping capture");
            self.capture = None;
            self.cursor = Cursor::Arrow;
            return false;
        };
        let delta = point - (origin + capture.grab_offset);
        if delta.is_zero() {
            return false;
        }
        canvas.translate(capture.element, delta, !modifiers.move_only_node);
        true
    }

    /// Primary button released. Re-anchors the diagram at the origin and
    /// resizes the canvas. Returns `false` if nothing was captured.
    pub fn release(&mut self, canvas: &mut HierarchyCanvas) -> bool {
        self.cursor = Cursor::Arrow;
        if self.capture.take().is_none() {
            return false;
        }
        canvas.move_elements_to_top_left();
        canvas.resize_to_content();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::RenderOptions;
    use crate::model::{ItemId, Link, ViewMap, WorkItem};
    use crate::project::ProjectData;

    fn rendered() -> (ProjectData, HierarchyCanvas) {
        let mut p = ProjectData::new();
        p.add_item(WorkItem::new(1, "Story", "Active", "Login"));
        p.add_item(WorkItem::new(2, "Task", "Active", "Form"));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(2)));
        p.add_view_map(ViewMap::new("Tasks", &["Story"], "Task", "Contains"));
        let mut canvas = HierarchyCanvas::default();
        canvas
            .render_view(Some(&p), &RenderOptions::default())
            .expect("render");
        (p, canvas)
    }

    fn center_of(canvas: &HierarchyCanvas, item: u64) -> (ElementId, Point) {
        let id = canvas.try_get_associated_visuals(ItemId(item)).expect("rendered")[0];
        let visual = canvas.tree().get(id).and_then(|e| e.visual).expect("visual");
        (id, canvas.canvas().get(visual).expect("on canvas").bounds.center())
    }

    #[test]
    fn press_on_empty_space_captures_nothing() {
        let (_p, canvas) = rendered();
        let mut drag = DragController::new();
        assert!(drag.press(&canvas, Point::new(-500.0, -500.0)).is_none());
        assert_eq!(drag.cursor(), Cursor::Arrow);
    }

    #[test]
    fn dragging_a_root_moves_its_subtree() {
        let (_p, mut canvas) = rendered();
        let (story, at) = center_of(&canvas, 1);
        let (task, _) = center_of(&canvas, 2);
        let task_before = canvas.element_position(task).expect("pos");

        let mut drag = DragController::new();
        assert_eq!(drag.press(&canvas, at), Some(story));
        assert_eq!(drag.cursor(), Cursor::Grab);
        assert!(drag.drag_to(&mut canvas, at + Vector::new(30.0, 10.0), DragModifiers::default()));

        let task_after = canvas.element_position(task).expect("pos");
        assert_eq!(task_after - task_before, Vector::new(30.0, 10.0));
    }

    #[test]
    fn grabbed_spot_stays_under_the_pointer() {
        let (_p, mut canvas) = rendered();
        let (story, at) = center_of(&canvas, 1);
        let mut drag = DragController::new();
        drag.press(&canvas, at);

        // The card moves under a held pointer, e.g. after a re-anchor.
        canvas.translate(story, Vector::new(100.0, 0.0), true);
        let target = at + Vector::new(5.0, 5.0);
        assert!(drag.drag_to(&mut canvas, target, DragModifiers::default()));
        assert_eq!(center_of(&canvas, 1).1, target);

        assert!(!drag.drag_to(&mut canvas, target, DragModifiers::default()));
    }

    #[test]
    fn move_only_node_leaves_descendants() {
        let (_p, mut canvas) = rendered();
        let (_, at) = center_of(&canvas, 1);
        let (task, _) = center_of(&canvas, 2);
        let task_before = canvas.element_position(task);

        let mut drag = DragController::new();
        drag.press(&canvas, at);
        drag.drag_to(
            &mut canvas,
            at + Vector::new(30.0, 0.0),
            DragModifiers {
                move_only_node: true,
            },
        );
        assert_eq!(canvas.element_position(task), task_before);
    }

    #[test]
    fn release_reanchors_at_origin() {
        let (_p, mut canvas) = rendered();
        let (_, at) = center_of(&canvas, 2);
        let mut drag = DragController::new();
        drag.press(&canvas, at);
        drag.drag_to(&mut canvas, at + Vector::new(-400.0, 0.0), DragModifiers::default());
        assert!(drag.release(&mut canvas));
        assert_eq!(drag.cursor(), Cursor::Arrow);
        assert!(drag.captured().is_none());

        let min_x = canvas
            .tree()
            .preorder()
            .iter()
            .filter_map(|id| canvas.element_position(*id))
            .map(|p| p.x)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(min_x, 0.0);
        assert!(!drag.release(&mut canvas));
    }

    #[test]
    fn removed_element_drops_capture() {
        let (_p, mut canvas) = rendered();
        let (_, at) = center_of(&canvas, 2);
        let mut drag = DragController::new();
        drag.press(&canvas, at);
        canvas.remove_associated_visual(ItemId(2));
        assert!(!drag.drag_to(&mut canvas, at + Vector::new(5.0, 5.0), DragModifiers::default()));
        assert!(drag.captured().is_none());
        assert_eq!(drag.cursor(), Cursor::Arrow);
    }
}
