//! Terminal diagram viewer.
//!
//! ## Entry points
//!
//! - [`run_view`]: full-screen hierarchy diagram with mouse dragging. A
//!   background poller watches the project file and posts reloads through a
//!   [`Dispatcher`], so the diagram is only ever touched on the UI thread.

pub mod diagram;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::Args;
use crossterm::event::{self as ct_event, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info};
use workbench_core::scheduler::{Dispatcher, DispatcherHandle};

use crate::cmd::{HierarchyArgs, fail, load_project, project_config};
use crate::output::OutputMode;
use diagram::DiagramView;

/// How long the UI waits for input before running scheduled work.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Arguments for `wb view`.
#[derive(Args, Debug)]
pub struct ViewArgs {
    #[command(flatten)]
    pub hierarchy: HierarchyArgs,

    /// Project file poll interval; overrides `refresh.poll_interval_ms`.
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,
}

/// Messages delivered to the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessage {
    /// The project file should be read again.
    Reload,
}

pub fn run_view(args: &ViewArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let config = project_config(project_root, output)?;
    let path = args.hierarchy.project.clone();
    let project = load_project(&path).map_err(|e| fail(output, &e))?;
    let settings = args.hierarchy.settings(&config);
    let interval =
        Duration::from_millis(args.poll_ms.unwrap_or(config.refresh.poll_interval_ms).max(1));

    let dispatcher = Dispatcher::new();
    let mut view = DiagramView::new(
        project,
        path.clone(),
        config.layout.layout_config(),
        settings,
        dispatcher.handle(),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let poller = spawn_poller(path, interval, dispatcher.handle(), Arc::clone(&stop));
    info!(interval_ms = interval.as_millis(), "diagram viewer started");

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut view, &dispatcher);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    stop.store(true, Ordering::Relaxed);
    if poller.join().is_err() {
        debug!("project poller panicked");
    }
    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut DiagramView,
    dispatcher: &Dispatcher<AppMessage>,
) -> Result<()> {
    loop {
        for message in dispatcher.drain() {
            view.handle_message(message);
        }
        let worked = view.tick();
        terminal
            .draw(|frame| view.render(frame))
            .context("failed to draw diagram")?;

        // Keep going without waiting while rebuild phases are pending.
        let wait = if worked { Duration::ZERO } else { INPUT_POLL };
        if ct_event::poll(wait)? {
            match ct_event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => view.handle_key(key),
                Event::Mouse(mouse) => view.handle_mouse(mouse),
                _ => {}
            }
        }
        if view.should_quit() {
            return Ok(());
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Watch `path` for modification-time changes and post a reload for each.
fn spawn_poller(
    path: PathBuf,
    interval: Duration,
    handle: DispatcherHandle<AppMessage>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut last = modified(&path);
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(interval);
            let current = modified(&path);
            if current == last {
                continue;
            }
            last = current;
            debug!(path = %path.display(), "project file changed");
            // Off the UI thread this always posts.
            if handle.marshal(AppMessage::Reload).is_some() {
                debug!("poller unexpectedly ran on the UI thread");
            }
        }
    })
}
