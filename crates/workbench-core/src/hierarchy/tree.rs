//! Arena of hierarchy elements.
//!
//! Items and views alternate by level: an item's children are views, a view's
//! children are items. Parent and child relations are stored as
//! [`ElementId`] handles, so removing a subtree never leaves a dangling
//! reference behind; lookups on a removed id simply return `None`.

use std::cell::OnceCell;

use slotmap::SlotMap;

use crate::geometry::Point;
use crate::model::{ItemId, ViewMap, ViewMapId};
use crate::scene::VisualId;

slotmap::new_key_type! {
    /// Stable handle to a node of a [`HierarchyTree`].
    pub struct ElementId;
}

/// Lifecycle of an element's visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Unrendered,
    Rendered,
    Removed,
}

/// Parameters for offering "add a new linked child" under a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildCreationParameters {
    pub parent: ItemId,
    pub link_name: String,
    pub child_type: String,
}

/// A view node: one view map expanded under the item that spawned it.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub view_map: ViewMapId,
    pub parent_item: ItemId,
    creation: OnceCell<ChildCreationParameters>,
}

impl ViewNode {
    #[must_use]
    pub const fn new(view_map: ViewMapId, parent_item: ItemId) -> Self {
        Self {
            view_map,
            parent_item,
            creation: OnceCell::new(),
        }
    }

    /// Child creation parameters, derived from `map` on first use.
    pub fn creation_parameters(&self, map: &ViewMap) -> &ChildCreationParameters {
        self.creation.get_or_init(|| ChildCreationParameters {
            parent: self.parent_item,
            link_name: map.link_name.clone(),
            child_type: map.child_type.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Item { item: ItemId },
    View(ViewNode),
}

impl ElementKind {
    #[must_use]
    pub const fn item(&self) -> Option<ItemId> {
        match self {
            Self::Item { item } => Some(*item),
            Self::View(_) => None,
        }
    }

    #[must_use]
    pub const fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }
}

/// Decorations drawn for an element's connectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connectors {
    pub entry_marker: Option<VisualId>,
    pub exit_marker: Option<VisualId>,
    pub line: Option<VisualId>,
}

impl Connectors {
    /// Every decoration handle currently held.
    pub fn handles(&self) -> impl Iterator<Item = VisualId> {
        [self.entry_marker, self.exit_marker, self.line]
            .into_iter()
            .flatten()
    }
}

/// One node of the hierarchy.
#[derive(Debug, Clone)]
pub struct HierarchyElement {
    pub kind: ElementKind,
    pub label: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub entry_point: Point,
    pub exit_point: Point,
    pub visual: Option<VisualId>,
    pub connectors: Connectors,
    pub state: RenderState,
}

impl HierarchyElement {
    fn new(kind: ElementKind, label: String, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            label,
            parent,
            children: Vec::new(),
            entry_point: Point::ZERO,
            exit_point: Point::ZERO,
            visual: None,
            connectors: Connectors::default(),
            state: RenderState::Unrendered,
        }
    }
}

/// The forest of hierarchy elements.
#[derive(Debug, Default)]
pub struct HierarchyTree {
    elements: SlotMap<ElementId, HierarchyElement>,
    roots: Vec<ElementId>,
}

impl HierarchyTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item node under `parent_view`, or as a root when `None`.
    pub fn insert_item(
        &mut self,
        parent_view: Option<ElementId>,
        item: ItemId,
        label: impl Into<String>,
    ) -> ElementId {
        self.insert(parent_view, ElementKind::Item { item }, label.into())
    }

    /// Insert a view node under `parent`.
    pub fn insert_view(
        &mut self,
        parent: ElementId,
        view_map: ViewMapId,
        parent_item: ItemId,
        label: impl Into<String>,
    ) -> ElementId {
        self.insert(
            Some(parent),
            ElementKind::View(ViewNode::new(view_map, parent_item)),
            label.into(),
        )
    }

    fn insert(&mut self, parent: Option<ElementId>, kind: ElementKind, label: String) -> ElementId {
        let parent = parent.filter(|p| self.elements.contains_key(*p));
        let id = self
            .elements
            .insert(HierarchyElement::new(kind, label, parent));
        match parent.and_then(|p| self.elements.get_mut(p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&HierarchyElement> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut HierarchyElement> {
        self.elements.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements.get(id).map_or(&[], |e| e.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id).and_then(|e| e.parent)
    }

    /// Returns `true` if `item` is wrapped by `from` or any of its ancestors.
    ///
    /// Only the path from `from` up to its root is inspected; the same item
    /// may still appear in sibling branches.
    #[must_use]
    pub fn is_parent_in_tree(&self, from: Option<ElementId>, item: ItemId) -> bool {
        let mut cursor = from;
        while let Some(id) = cursor {
            let Some(element) = self.elements.get(id) else {
                return false;
            };
            if element.kind.item() == Some(item) {
                return true;
            }
            cursor = element.parent;
        }
        false
    }

    /// All elements in depth-first pre-order, roots in insertion order.
    #[must_use]
    pub fn preorder(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.elements.len());
        for root in &self.roots {
            self.collect_preorder(*root, &mut out);
        }
        out
    }

    /// Descendants of `id` in pre-order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        for child in self.children(id) {
            self.collect_preorder(*child, &mut out);
        }
        out
    }

    fn collect_preorder(&self, id: ElementId, out: &mut Vec<ElementId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.elements.get(current) {
                out.push(current);
                stack.extend(element.children.iter().rev().copied());
            }
        }
    }

    /// Item elements wrapping `item`, in pre-order.
    #[must_use]
    pub fn items_for(&self, item: ItemId) -> Vec<ElementId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.elements.get(*id).and_then(|e| e.kind.item()) == Some(item))
            .collect()
    }

    /// Number of ancestors above `id`.
    #[must_use]
    pub fn depth(&self, id: ElementId) -> usize {
        std::iter::successors(self.parent(id), |p| self.parent(*p)).count()
    }

    /// Unlink `id` from its parent's children (or from the roots).
    pub fn detach(&mut self, id: ElementId) {
        let parent = self.elements.get_mut(id).and_then(|e| e.parent.take());
        match parent.and_then(|p| self.elements.get_mut(p)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Detach `id` and drop it and its descendants from the arena.
    ///
    /// Returns the number of elements removed; zero if `id` was already gone.
    pub fn remove_subtree(&mut self, id: ElementId) -> usize {
        if !self.elements.contains_key(id) {
            return 0;
        }
        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        self.detach(id);
        doomed
            .into_iter()
            .filter(|d| self.elements.remove(*d).is_some())
            .count()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.roots.clear();
    }
}
