//! Full-screen hierarchy diagram.
//!
//! Keys: `o` toggle orientation, `e` toggle empty views, `r` reload the
//! project file, `/` find an item by id, `q` quit. Drag a card with the left
//! button to move it with its subtree; hold Shift to move only the card.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph,
        canvas::{self, Canvas, Points, Rectangle},
    },
};
use tracing::{debug, warn};
use workbench_core::controller::{DisplaySettings, HierarchyDisplay, SettingChange};
use workbench_core::drag::{Cursor, DragController, DragModifiers};
use workbench_core::geometry::{Point, Size};
use workbench_core::hierarchy::{HierarchyCanvas, LayoutConfig};
use workbench_core::model::ItemId;
use workbench_core::project::{ProjectData, ProjectFile};
use workbench_core::scene::{CardKind, Shape};
use workbench_core::scheduler::DispatcherHandle;

use super::AppMessage;

const HELP: &str = "o orientation  e empty views  r reload  / find  q quit";

/// Maps terminal cells onto layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub area: Rect,
    pub extent: Size,
}

impl Viewport {
    /// Layout point at the center of the cell `(column, row)`, if the cell
    /// lies inside the diagram area.
    #[must_use]
    pub fn to_point(self, column: u16, row: u16) -> Option<Point> {
        let area = self.area;
        if area.width == 0
            || area.height == 0
            || column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        Some(Point::new(fx * self.extent.width, fy * self.extent.height))
    }
}

/// Drawable pieces of the scene, detached from the canvas borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum Sprite {
    Card {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        label: String,
        view: bool,
        highlighted: bool,
    },
    Marker(Point),
    Line(Point, Point),
}

/// Sprites in paint order.
#[must_use]
pub fn sprites(canvas: &HierarchyCanvas) -> Vec<Sprite> {
    canvas
        .canvas()
        .iter()
        .map(|(_, visual)| match &visual.shape {
            Shape::Card { kind, label, .. } => Sprite::Card {
                x: visual.bounds.x,
                y: visual.bounds.y,
                width: visual.bounds.width,
                height: visual.bounds.height,
                label: label.clone(),
                view: *kind == CardKind::View,
                highlighted: visual.highlighted,
            },
            Shape::Marker => Sprite::Marker(visual.bounds.center()),
            Shape::Line { from, to } => Sprite::Line(*from, *to),
        })
        .collect()
}

pub struct DiagramView {
    display: HierarchyDisplay,
    project: ProjectData,
    path: PathBuf,
    handle: DispatcherHandle<AppMessage>,
    drag: DragController,
    search: Option<String>,
    status: Option<String>,
    viewport: Viewport,
    should_quit: bool,
}

impl DiagramView {
    pub fn new(
        mut project: ProjectData,
        path: PathBuf,
        layout: LayoutConfig,
        settings: DisplaySettings,
        handle: DispatcherHandle<AppMessage>,
    ) -> Self {
        let mut display = HierarchyDisplay::new(layout, settings);
        display.attach(&mut project);
        Self {
            display,
            project,
            path,
            handle,
            drag: DragController::new(),
            search: None,
            status: None,
            viewport: Viewport {
                area: Rect::default(),
                extent: Size::new(1.0, 1.0),
            },
            should_quit: false,
        }
    }

    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub const fn display(&self) -> &HierarchyDisplay {
        &self.display
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Deliver project events and run one scheduled phase. Returns whether
    /// a phase ran, so the caller can redraw between phases.
    pub fn tick(&mut self) -> bool {
        self.display.pump_events(Some(&self.project));
        self.display.run_next(Some(&self.project)).is_some()
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::Reload => self.reload(),
        }
    }

    fn reload(&mut self) {
        match ProjectFile::load(&self.path) {
            Ok(file) => {
                self.project.replace_contents(file);
                self.status = Some(format!("reloaded {}", self.path.display()));
            }
            Err(err) => {
                warn!(error = %err, "project reload failed");
                self.status = Some(format!("{}: {err}", err.error_code()));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(query) = self.search.as_mut() {
            match key.code {
                KeyCode::Esc => self.search = None,
                KeyCode::Enter => {
                    let query = self.search.take().unwrap_or_default();
                    self.find(&query);
                }
                KeyCode::Backspace => {
                    query.pop();
                }
                KeyCode::Char(c) => query.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            _ if !self.display.input_enabled() => {}
            KeyCode::Char('o') => {
                let next = self.display.settings().orientation.toggled();
                self.display.change_setting(SettingChange::Orientation(next));
            }
            KeyCode::Char('e') => {
                let hide = !self.display.settings().hide_empty_views;
                self.display.change_setting(SettingChange::HideEmptyViews(hide));
            }
            KeyCode::Char('r') => {
                if let Some(message) = self.handle.marshal(AppMessage::Reload) {
                    self.handle_message(message);
                }
            }
            KeyCode::Char('/') => self.search = Some(String::new()),
            _ => {}
        }
    }

    fn find(&mut self, query: &str) {
        let Ok(item) = query.parse::<ItemId>() else {
            self.status = Some(format!("not an item id: '{query}'"));
            return;
        };
        let found = self.display.canvas_mut().highlight(item);
        self.status = Some(if found == 0 {
            format!("{item} is not in the diagram")
        } else {
            format!("{item}: {found} card(s) highlighted")
        });
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !self.display.input_enabled() {
            return;
        }
        let point = self.viewport.to_point(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(point) = point {
                    self.drag.press(self.display.canvas(), point);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(point) = point {
                    let modifiers = DragModifiers {
                        move_only_node: mouse.modifiers.contains(KeyModifiers::SHIFT),
                    };
                    self.drag.drag_to(self.display.canvas_mut(), point, modifiers);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag.release(self.display.canvas_mut()) {
                    debug!("drag released");
                }
            }
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        let settings = self.display.settings();
        let title = format!(
            " {} | {} | {} ",
            self.path.display(),
            settings.orientation,
            if settings.hide_empty_views {
                "empty views hidden"
            } else {
                "empty views shown"
            }
        );
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(chunks[0]);

        let size = self.display.canvas().canvas().size();
        let extent = Size::new(size.width.max(1.0), size.height.max(1.0));
        self.viewport = Viewport {
            area: inner,
            extent,
        };

        let sprites = sprites(self.display.canvas());
        let diagram = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([0.0, extent.width])
            .y_bounds([0.0, extent.height])
            .paint(move |ctx| paint(ctx, &sprites, extent.height));
        frame.render_widget(diagram, chunks[0]);
        frame.render_widget(self.status_line(), chunks[1]);
    }

    fn status_line(&self) -> Paragraph<'_> {
        let dim = Style::default().fg(Color::DarkGray);
        let mut spans = Vec::new();
        if let Some(query) = &self.search {
            spans.push(Span::styled(format!("find #{query}"), Style::default().fg(Color::Cyan)));
        } else if let Some(busy) = self.display.busy_message() {
            spans.push(Span::styled(busy, Style::default().fg(Color::Yellow)));
        } else if let Some(banner) = self.display.banner() {
            spans.push(Span::styled(banner, Style::default().fg(Color::Red)));
        } else if let Some(status) = &self.status {
            spans.push(Span::raw(status.as_str()));
        }
        if self.drag.cursor() == Cursor::Grab {
            spans.push(Span::styled("  [moving]", Style::default().fg(Color::Cyan)));
        }
        spans.push(Span::styled(format!("  {HELP}"), dim));
        Paragraph::new(Line::from(spans))
    }
}

/// Draw sprites with the y axis flipped so layout "down" is screen "down".
fn paint(ctx: &mut canvas::Context<'_>, sprites: &[Sprite], height: f64) {
    for sprite in sprites {
        match sprite {
            Sprite::Line(from, to) => ctx.draw(&canvas::Line {
                x1: from.x,
                y1: height - from.y,
                x2: to.x,
                y2: height - to.y,
                color: Color::DarkGray,
            }),
            Sprite::Marker(center) => ctx.draw(&Points {
                coords: &[(center.x, height - center.y)],
                color: Color::Gray,
            }),
            Sprite::Card {
                x,
                y,
                width,
                height: card_height,
                label,
                view,
                highlighted,
            } => {
                let color = match (*highlighted, *view) {
                    (true, _) => Color::Yellow,
                    (false, true) => Color::Blue,
                    (false, false) => Color::Green,
                };
                ctx.draw(&Rectangle {
                    x: *x,
                    y: height - (y + card_height),
                    width: *width,
                    height: *card_height,
                    color,
                });
                let mut style = Style::default().fg(color);
                if *highlighted {
                    style = style.add_modifier(Modifier::BOLD);
                }
                ctx.print(
                    x + width * 0.05,
                    height - (y + card_height / 2.0),
                    Span::styled(label.clone(), style),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workbench_core::model::{Link, ViewMap, WorkItem};
    use workbench_core::scheduler::Dispatcher;

    fn project() -> ProjectData {
        let mut p = ProjectData::new();
        p.add_item(WorkItem::new(1, "Story", "Active", "Login"));
        p.add_item(WorkItem::new(2, "Task", "Active", "Form"));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(2)));
        p.add_view_map(ViewMap::new("Tasks", &["Story"], "Task", "Contains"));
        p.add_view_map(ViewMap::new("Bugs", &["Story"], "Bug", "Fixes"));
        p
    }

    fn view(dispatcher: &Dispatcher<AppMessage>) -> DiagramView {
        let mut view = DiagramView::new(
            project(),
            PathBuf::from("missing.json"),
            LayoutConfig::default(),
            DisplaySettings::default(),
            dispatcher.handle(),
        );
        while view.tick() {}
        view
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn viewport_maps_cell_centers() {
        let vp = Viewport {
            area: Rect::new(1, 1, 10, 5),
            extent: Size::new(100.0, 50.0),
        };
        assert_eq!(vp.to_point(1, 1), Some(Point::new(5.0, 5.0)));
        assert_eq!(vp.to_point(10, 5), Some(Point::new(95.0, 45.0)));
        assert_eq!(vp.to_point(0, 3), None);
        assert_eq!(vp.to_point(11, 3), None);
    }

    #[test]
    fn sprites_cover_cards_markers_and_lines() {
        let dispatcher = Dispatcher::new();
        let view = view(&dispatcher);
        let sprites = sprites(view.display().canvas());
        let cards = sprites.iter().filter(|s| matches!(s, Sprite::Card { .. })).count();
        let lines = sprites.iter().filter(|s| matches!(s, Sprite::Line(..))).count();
        assert_eq!(cards, 4);
        assert_eq!(lines, 3);
    }

    #[test]
    fn keys_change_settings_and_rebuild() {
        let dispatcher = Dispatcher::new();
        let mut view = view(&dispatcher);
        let elements = view.display().canvas().tree().len();

        view.handle_key(key(KeyCode::Char('e')));
        assert!(view.display().is_update_queued());
        while view.tick() {}
        assert!(view.display().settings().hide_empty_views);
        assert_eq!(view.display().canvas().tree().len(), elements - 1);

        view.handle_key(key(KeyCode::Char('o')));
        while view.tick() {}
        assert_eq!(
            view.display().canvas().orientation(),
            workbench_core::geometry::Orientation::Vertical
        );
    }

    #[test]
    fn find_highlights_matching_cards() {
        let dispatcher = Dispatcher::new();
        let mut view = view(&dispatcher);
        for code in [KeyCode::Char('/'), KeyCode::Char('2'), KeyCode::Enter] {
            view.handle_key(key(code));
        }
        assert_eq!(view.status(), Some("#2: 1 card(s) highlighted"));

        for code in [KeyCode::Char('/'), KeyCode::Char('x'), KeyCode::Enter] {
            view.handle_key(key(code));
        }
        assert_eq!(view.status(), Some("not an item id: 'x'"));
    }

    #[test]
    fn reload_failure_is_reported_in_status() {
        let dispatcher = Dispatcher::new();
        let mut view = view(&dispatcher);
        view.handle_key(key(KeyCode::Char('r')));
        assert!(view.status().is_some_and(|s| s.starts_with("E1003")));
        assert!(dispatcher.drain().is_empty());
    }

    #[test]
    fn quit_keys() {
        let dispatcher = Dispatcher::new();
        let mut view = view(&dispatcher);
        assert!(!view.should_quit());
        view.handle_key(key(KeyCode::Char('q')));
        assert!(view.should_quit());
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn mouse_drag_moves_and_reanchors() {
        let dispatcher = Dispatcher::new();
        let mut view = view(&dispatcher);
        let size = view.display().canvas().canvas().size();
        view.viewport = Viewport {
            area: Rect::new(0, 0, 100, 100),
            extent: size,
        };
        let story = view
            .display()
            .canvas()
            .try_get_associated_visuals(ItemId(1))
            .expect("story")[0];
        let center = view
            .display()
            .canvas()
            .tree()
            .get(story)
            .and_then(|e| e.visual)
            .and_then(|v| view.display().canvas().canvas().get(v))
            .expect("card")
            .bounds
            .center();
        let column = (center.x / size.width * 100.0) as u16;
        let row = (center.y / size.height * 100.0) as u16;

        view.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row));
        assert_eq!(view.drag.cursor(), Cursor::Grab);
        view.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), column + 10, row));
        view.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), column + 10, row));
        assert_eq!(view.drag.cursor(), Cursor::Arrow);

        let min_x = view
            .display()
            .canvas()
            .tree()
            .preorder()
            .iter()
            .filter_map(|id| view.display().canvas().element_position(*id))
            .map(|p| p.x)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(min_x, 0.0);
    }
}
