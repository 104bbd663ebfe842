//! Link storage behind an injectable interface.
//!
//! The hierarchy engine only asks for the child and parent links of an item.
//! Whatever owns the links (a server-backed provider, or the in-memory store
//! used by project files) implements [`LinkManager`] and is handed to
//! [`crate::project::ProjectData`] at construction time.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ItemId, Link};

/// Owner of the links between work items.
pub trait LinkManager: Send {
    /// Add a link. Returns `false` if an identical link already exists.
    fn add_link(&mut self, link: Link) -> bool;

    /// Remove a link. Returns `false` if it did not exist.
    fn remove_link(&mut self, link: &Link) -> bool;

    /// Links whose parent is `item`, in insertion order.
    fn child_links(&self, item: ItemId) -> Vec<Link>;

    /// Links whose child is `item`, in insertion order.
    fn parent_links(&self, item: ItemId) -> Vec<Link>;

    /// Every link, in insertion order.
    fn links(&self) -> Vec<Link>;

    /// Remove every link.
    fn clear(&mut self);
}

/// In-process [`LinkManager`] with per-item indexes.
#[derive(Debug, Default)]
pub struct MemoryLinkManager {
    links: Vec<Link>,
    present: BTreeSet<Link>,
    by_parent: BTreeMap<ItemId, Vec<usize>>,
    by_child: BTreeMap<ItemId, Vec<usize>>,
}

impl MemoryLinkManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut manager = Self::new();
        for link in links {
            manager.add_link(link);
        }
        manager
    }

    fn reindex(&mut self) {
        self.by_parent.clear();
        self.by_child.clear();
        for (idx, link) in self.links.iter().enumerate() {
            self.by_parent.entry(link.parent).or_default().push(idx);
            self.by_child.entry(link.child).or_default().push(idx);
        }
    }

    fn collect(&self, indexes: Option<&Vec<usize>>) -> Vec<Link> {
        indexes
            .map(|idxs| idxs.iter().map(|&i| self.links[i].clone()).collect())
            .unwrap_or_default()
    }
}

impl LinkManager for MemoryLinkManager {
    fn add_link(&mut self, link: Link) -> bool {
        if !self.present.insert(link.clone()) {
            return false;
        }
        let idx = self.links.len();
        self.by_parent.entry(link.parent).or_default().push(idx);
        self.by_child.entry(link.child).or_default().push(idx);
        self.links.push(link);
        true
    }

    fn remove_link(&mut self, link: &Link) -> bool {
        if !self.present.remove(link) {
            return false;
        }
        self.links.retain(|l| l != link);
        self.reindex();
        true
    }

    fn child_links(&self, item: ItemId) -> Vec<Link> {
        self.collect(self.by_parent.get(&item))
    }

    fn parent_links(&self, item: ItemId) -> Vec<Link> {
        self.collect(self.by_child.get(&item))
    }

    fn links(&self) -> Vec<Link> {
        self.links.clone()
    }

    fn clear(&mut self) {
        self.links.clear();
        self.present.clear();
        self.by_parent.clear();
        self.by_child.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &str, parent: u64, child: u64) -> Link {
        Link::new(name, ItemId(parent), ItemId(child))
    }

    #[test]
    fn duplicate_links_are_rejected() {
        let mut m = MemoryLinkManager::new();
        assert!(m.add_link(link("Contains", 1, 2)));
        assert!(!m.add_link(link("Contains", 1, 2)));
        assert!(m.add_link(link("Related", 1, 2)));
        assert_eq!(m.child_links(ItemId(1)).len(), 2);
    }

    #[test]
    fn removal_keeps_indexes_consistent() {
        let mut m = MemoryLinkManager::from_links([
            link("Contains", 1, 2),
            link("Contains", 1, 3),
            link("Contains", 3, 4),
        ]);
        assert!(m.remove_link(&link("Contains", 1, 2)));
        assert!(!m.remove_link(&link("Contains", 1, 2)));
        assert_eq!(m.child_links(ItemId(1)), vec![link("Contains", 1, 3)]);
        assert_eq!(m.parent_links(ItemId(4)), vec![link("Contains", 3, 4)]);
        assert!(m.parent_links(ItemId(2)).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut m = MemoryLinkManager::from_links([link("Contains", 1, 2)]);
        m.clear();
        assert!(m.links().is_empty());
        assert!(m.child_links(ItemId(1)).is_empty());
        assert!(m.add_link(link("Contains", 1, 2)));
    }
}
