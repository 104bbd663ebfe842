//! Keeps the hierarchy canvas in step with project data.
//!
//! Project events are drained with [`HierarchyDisplay::pump_events`]. Item
//! removals are applied in place; every other relevant change queues one
//! full rebuild. A rebuild runs in two scheduled phases: `Begin` marks the
//! display busy and `Complete` (posted at background priority) rebuilds and
//! re-enables input. At most one rebuild is pending at any time, and none is
//! scheduled while the display is hidden.

pub mod settings;

pub use settings::{DisplaySettings, RootSelection, SettingChange, SettingObserver};

use std::fmt;
use std::sync::mpsc::Receiver;

use tracing::{debug, error, info};

use crate::hierarchy::{HierarchyCanvas, LayoutConfig, RenderOptions};
use crate::model::{ItemId, Link};
use crate::project::{CollectionChange, ProjectData, ProjectEvent};
use crate::scheduler::{Priority, Scheduler, WorkQueue};

/// Message shown while a rebuild is pending.
pub const BUSY_MESSAGE: &str = "Building hierarchy...";

/// Phases of a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    Complete,
}

/// The hierarchy display mode: canvas, settings and update bookkeeping.
pub struct HierarchyDisplay<S: Scheduler<Phase> = WorkQueue<Phase>> {
    canvas: HierarchyCanvas,
    settings: DisplaySettings,
    observers: Vec<SettingObserver>,
    queue: S,
    events: Option<Receiver<ProjectEvent>>,
    update_queued: bool,
    visible: bool,
    input_enabled: bool,
    busy: Option<&'static str>,
    banner: Option<String>,
}

impl<S: Scheduler<Phase>> fmt::Debug for HierarchyDisplay<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyDisplay")
            .field("settings", &self.settings)
            .field("update_queued", &self.update_queued)
            .field("visible", &self.visible)
            .field("pending", &self.queue.pending())
            .field("banner", &self.banner)
            .finish_non_exhaustive()
    }
}

impl HierarchyDisplay {
    #[must_use]
    pub fn new(layout: LayoutConfig, settings: DisplaySettings) -> Self {
        Self::with_scheduler(layout, settings, WorkQueue::new())
    }
}

impl<S: Scheduler<Phase>> HierarchyDisplay<S> {
    pub fn with_scheduler(layout: LayoutConfig, settings: DisplaySettings, queue: S) -> Self {
        Self {
            canvas: HierarchyCanvas::new(layout),
            settings,
            observers: Vec::new(),
            queue,
            events: None,
            update_queued: false,
            visible: true,
            input_enabled: true,
            busy: None,
            banner: None,
        }
    }

    #[must_use]
    pub const fn canvas(&self) -> &HierarchyCanvas {
        &self.canvas
    }

    pub const fn canvas_mut(&mut self) -> &mut HierarchyCanvas {
        &mut self.canvas
    }

    #[must_use]
    pub const fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    #[must_use]
    pub const fn is_update_queued(&self) -> bool {
        self.update_queued
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub const fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Busy indicator text, set between the two rebuild phases.
    #[must_use]
    pub const fn busy_message(&self) -> Option<&'static str> {
        self.busy
    }

    /// Error banner left by the last failed rebuild.
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.queue.pending()
    }

    /// Subscribe to `project` and queue the first rebuild.
    pub fn attach(&mut self, project: &mut ProjectData) {
        self.events = Some(project.subscribe());
        self.enqueue_update();
    }

    /// Stop listening and clear the diagram.
    pub fn detach(&mut self) {
        self.events = None;
        self.update_queued = false;
        self.canvas.clear_canvas();
    }

    /// Register a callback run after every effective settings change.
    pub fn on_setting_change(&mut self, observer: impl FnMut(&SettingChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Apply a settings change, notify observers and queue a rebuild.
    /// Returns `false` if the change was a no-op.
    pub fn change_setting(&mut self, change: SettingChange) -> bool {
        if !self.settings.apply(&change) {
            return false;
        }
        debug!(%change, "display setting changed");
        for observer in &mut self.observers {
            observer(&change);
        }
        self.enqueue_update();
        true
    }

    /// Drain pending project events. Without project data the events stay
    /// queued and nothing happens.
    pub fn pump_events(&mut self, project: Option<&ProjectData>) -> usize {
        let Some(project) = project else {
            return 0;
        };
        let events: Vec<ProjectEvent> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => return 0,
        };
        for event in &events {
            self.handle_event(Some(project), event);
        }
        events.len()
    }

    /// React to one project event.
    pub fn handle_event(&mut self, project: Option<&ProjectData>, event: &ProjectEvent) {
        let Some(project) = project else {
            return;
        };
        match event {
            ProjectEvent::Items(CollectionChange::Remove(ids)) => self.remove_items(ids),
            ProjectEvent::Items(_) | ProjectEvent::ViewMaps(_) => {
                self.enqueue_update();
            }
            ProjectEvent::LinkChanged { link, .. } => {
                if self.link_affects_view(project, link) {
                    self.enqueue_update();
                }
            }
            ProjectEvent::ItemChanged(id) => {
                if self.item_affects_view(project, *id) {
                    self.enqueue_update();
                }
            }
        }
    }

    fn remove_items(&mut self, ids: &[ItemId]) {
        let released: usize = ids
            .iter()
            .map(|id| self.canvas.remove_associated_visual(*id))
            .sum();
        if released > 0 {
            self.canvas.resize_to_content();
        } else {
            debug!(?ids, "removed items were not rendered");
        }
    }

    fn link_affects_view(&self, project: &ProjectData, link: &Link) -> bool {
        if self.canvas.try_get_associated_visuals(link.parent).is_none() {
            return false;
        }
        let Some(parent) = project.item(link.parent) else {
            return false;
        };
        let child_type = project.item(link.child).map(|c| c.type_name.as_str());
        let selected = &self.settings.selected_views;
        project
            .view_maps()
            .iter()
            .filter(|m| selected.is_empty() || selected.contains(&m.title))
            .filter(|m| m.applies_to(&parent.type_name))
            .any(|m| match child_type {
                Some(t) => m.is_view_link(link, t),
                None => link.name == m.link_name,
            })
    }

    fn item_affects_view(&self, project: &ProjectData, id: ItemId) -> bool {
        self.canvas.try_get_associated_visuals(id).is_some()
            || project
                .parent_links(id)
                .iter()
                .any(|l| self.canvas.try_get_associated_visuals(l.parent).is_some())
    }

    /// Queue a full rebuild unless one is already queued. The first phase
    /// is only scheduled while the display is visible.
    pub fn enqueue_update(&mut self) -> bool {
        if self.update_queued {
            return false;
        }
        self.update_queued = true;
        if self.visible {
            self.queue.post(Priority::Input, Phase::Begin);
        }
        true
    }

    /// Show or hide the display. A rebuild deferred while hidden is
    /// scheduled as soon as the display becomes visible.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible && self.update_queued && self.queue.is_idle() {
            self.queue.post(Priority::Input, Phase::Begin);
        }
    }

    /// Run the next scheduled phase, if any.
    pub fn run_next(&mut self, project: Option<&ProjectData>) -> Option<Phase> {
        let phase = self.queue.next()?;
        match phase {
            Phase::Begin => {
                self.busy = Some(BUSY_MESSAGE);
                self.input_enabled = false;
                self.queue.post(Priority::Background, Phase::Complete);
            }
            Phase::Complete => {
                self.update_queued = false;
                self.rebuild(project);
                self.busy = None;
                self.input_enabled = true;
            }
        }
        Some(phase)
    }

    /// Run phases until the queue is empty. Returns how many ran.
    pub fn run_pending(&mut self, project: Option<&ProjectData>) -> usize {
        std::iter::from_fn(|| self.run_next(project)).count()
    }

    fn rebuild(&mut self, project: Option<&ProjectData>) {
        let Some(project) = project else {
            debug!("no project data, skipping rebuild");
            return;
        };
        let predicate = self.settings.roots.predicate();
        let options = RenderOptions {
            orientation: self.settings.orientation,
            selected_views: Some(&self.settings.selected_views),
            hide_empty_views: self.settings.hide_empty_views,
            excluded_states: Some(&self.settings.excluded_states),
            filter: predicate.as_deref(),
        };
        match self.canvas.render_view(Some(project), &options) {
            Ok(roots) => {
                self.banner = None;
                info!(roots = roots.len(), "hierarchy rebuilt");
            }
            Err(e) => {
                error!(error = %e, code = %e.error_code(), "hierarchy rebuild failed");
                self.banner = Some(format!("{}: {e}", e.error_code()));
            }
        }
    }
}
