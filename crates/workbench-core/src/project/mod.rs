//! Project data: the observable work-item and view-map collections the
//! hierarchy display reads from.
//!
//! Every mutation publishes a [`ProjectEvent`] to all subscribers. Events are
//! delivered over `std::sync::mpsc` channels, so a subscriber may live on a
//! different thread from the code that mutates the project; the receiving
//! side decides when to drain them (see [`crate::controller`]).
//!
//! Links are owned by an injected [`LinkManager`]; the project only forwards
//! link mutations to it and announces them.

pub mod file;
pub mod links;

pub use file::ProjectFile;
pub use links::{LinkManager, MemoryLinkManager};

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, trace};

use crate::error::WorkbenchError;
use crate::model::{ItemId, Link, ViewMap, ViewMapId, WorkItem};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Change to an observable collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange<K> {
    Add(Vec<K>),
    Remove(Vec<K>),
    Clear,
    Refresh,
}

/// Whether a link appeared or disappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Added,
    Removed,
}

/// A notification published by [`ProjectData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// The work-item collection changed.
    Items(CollectionChange<ItemId>),
    /// A field of an existing work item changed.
    ItemChanged(ItemId),
    /// A link was added or removed.
    LinkChanged { link: Link, change: LinkChange },
    /// The view-map collection changed.
    ViewMaps(CollectionChange<ViewMapId>),
}

// ---------------------------------------------------------------------------
// ProjectData
// ---------------------------------------------------------------------------

/// Work items, view maps and links of one project.
pub struct ProjectData {
    items: Vec<WorkItem>,
    index: HashMap<ItemId, usize>,
    view_maps: Vec<ViewMap>,
    next_view_map: u32,
    links: Box<dyn LinkManager>,
    subscribers: Vec<Sender<ProjectEvent>>,
}

impl fmt::Debug for ProjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectData")
            .field("items", &self.items.len())
            .field("view_maps", &self.view_maps.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl Default for ProjectData {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectData {
    /// Empty project backed by a [`MemoryLinkManager`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_link_manager(Box::new(MemoryLinkManager::new()))
    }

    /// Empty project backed by the given link manager.
    #[must_use]
    pub fn with_link_manager(links: Box<dyn LinkManager>) -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            view_maps: Vec::new(),
            next_view_map: 1,
            links,
            subscribers: Vec::new(),
        }
    }

    /// Build a project from a parsed [`ProjectFile`].
    #[must_use]
    pub fn from_file(file: ProjectFile) -> Self {
        let mut project = Self::new();
        project.load_contents(file);
        project
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&mut self) -> Receiver<ProjectEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: &ProjectEvent) {
        trace!(?event, "project event");
        // Drop subscribers whose receiver has gone away.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // -- items --------------------------------------------------------------

    #[must_use]
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&WorkItem> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    #[must_use]
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    /// Add or replace a work item.
    pub fn add_item(&mut self, item: WorkItem) {
        let id = item.id;
        if let Some(&idx) = self.index.get(&id) {
            self.items[idx] = item;
            self.publish(&ProjectEvent::ItemChanged(id));
            return;
        }
        self.index.insert(id, self.items.len());
        self.items.push(item);
        self.publish(&ProjectEvent::Items(CollectionChange::Add(vec![id])));
    }

    /// Remove a work item from the collection. Links are left to the link
    /// manager; links to absent items are ignored by the hierarchy builder.
    pub fn remove_item(&mut self, id: ItemId) -> Option<WorkItem> {
        let idx = self.index.remove(&id)?;
        let removed = self.items.remove(idx);
        for (i, item) in self.items.iter().enumerate().skip(idx) {
            self.index.insert(item.id, i);
        }
        self.publish(&ProjectEvent::Items(CollectionChange::Remove(vec![id])));
        Some(removed)
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
        self.index.clear();
        self.publish(&ProjectEvent::Items(CollectionChange::Clear));
    }

    /// Announce that the item collection should be treated as reloaded.
    pub fn refresh(&mut self) {
        self.publish(&ProjectEvent::Items(CollectionChange::Refresh));
    }

    /// Set the state field of an item.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ItemNotFound`] if the item is not loaded.
    pub fn set_item_state(
        &mut self,
        id: ItemId,
        state: impl Into<String>,
    ) -> Result<(), WorkbenchError> {
        let idx = *self.index.get(&id).ok_or(WorkbenchError::ItemNotFound(id))?;
        self.items[idx].state = state.into();
        self.publish(&ProjectEvent::ItemChanged(id));
        Ok(())
    }

    /// Set the caption field of an item.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ItemNotFound`] if the item is not loaded.
    pub fn set_item_caption(
        &mut self,
        id: ItemId,
        caption: impl Into<String>,
    ) -> Result<(), WorkbenchError> {
        let idx = *self.index.get(&id).ok_or(WorkbenchError::ItemNotFound(id))?;
        self.items[idx].caption = caption.into();
        self.publish(&ProjectEvent::ItemChanged(id));
        Ok(())
    }

    // -- links --------------------------------------------------------------

    /// Add a link between two items. Returns `false` for duplicates.
    pub fn add_link(&mut self, link: Link) -> bool {
        if !self.links.add_link(link.clone()) {
            return false;
        }
        self.publish(&ProjectEvent::LinkChanged {
            link,
            change: LinkChange::Added,
        });
        true
    }

    /// Remove a link. Returns `false` if it was not present.
    pub fn remove_link(&mut self, link: &Link) -> bool {
        if !self.links.remove_link(link) {
            return false;
        }
        self.publish(&ProjectEvent::LinkChanged {
            link: link.clone(),
            change: LinkChange::Removed,
        });
        true
    }

    #[must_use]
    pub fn child_links(&self, item: ItemId) -> Vec<Link> {
        self.links.child_links(item)
    }

    #[must_use]
    pub fn parent_links(&self, item: ItemId) -> Vec<Link> {
        self.links.parent_links(item)
    }

    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        self.links.links()
    }

    // -- view maps ----------------------------------------------------------

    #[must_use]
    pub fn view_maps(&self) -> &[ViewMap] {
        &self.view_maps
    }

    #[must_use]
    pub fn view_map(&self, id: ViewMapId) -> Option<&ViewMap> {
        self.view_maps.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn view_map_by_title(&self, title: &str) -> Option<&ViewMap> {
        self.view_maps.iter().find(|m| m.title == title)
    }

    /// Add a view map, assigning it a fresh id.
    pub fn add_view_map(&mut self, mut map: ViewMap) -> ViewMapId {
        let id = ViewMapId(self.next_view_map);
        self.next_view_map += 1;
        map.id = id;
        self.view_maps.push(map);
        self.publish(&ProjectEvent::ViewMaps(CollectionChange::Add(vec![id])));
        id
    }

    /// Remove a view map by id.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbenchError::ViewMapNotFound`] if no map has this id.
    pub fn remove_view_map(&mut self, id: ViewMapId) -> Result<ViewMap, WorkbenchError> {
        let pos = self
            .view_maps
            .iter()
            .position(|m| m.id == id)
            .ok_or(WorkbenchError::ViewMapNotFound(id))?;
        let removed = self.view_maps.remove(pos);
        self.publish(&ProjectEvent::ViewMaps(CollectionChange::Remove(vec![id])));
        Ok(removed)
    }

    // -- bulk ---------------------------------------------------------------

    /// Replace the whole project contents, e.g. after the backing file
    /// changed on disk.
    pub fn replace_contents(&mut self, file: ProjectFile) {
        self.load_contents(file);
        self.publish(&ProjectEvent::ViewMaps(CollectionChange::Refresh));
        self.publish(&ProjectEvent::Items(CollectionChange::Refresh));
    }

    fn load_contents(&mut self, file: ProjectFile) {
        self.items.clear();
        self.index.clear();
        self.view_maps.clear();
        self.next_view_map = 1;
        self.links.clear();

        for item in file.items {
            if let Some(&idx) = self.index.get(&item.id) {
                self.items[idx] = item;
            } else {
                self.index.insert(item.id, self.items.len());
                self.items.push(item);
            }
        }
        for link in file.links {
            self.links.add_link(link);
        }
        for mut map in file.view_maps {
            map.id = ViewMapId(self.next_view_map);
            self.next_view_map += 1;
            self.view_maps.push(map);
        }
        debug!(
            items = self.items.len(),
            view_maps = self.view_maps.len(),
            "project contents loaded"
        );
    }

    /// Snapshot the project into its file representation.
    #[must_use]
    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            items: self.items.clone(),
            links: self.links.links(),
            view_maps: self.view_maps.clone(),
        }
    }
}
