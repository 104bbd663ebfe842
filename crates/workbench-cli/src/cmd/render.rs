//! `wb render`: lay the hierarchy out and print the geometry of every element.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use tracing::debug;
use workbench_core::geometry::{Orientation, Point, Rect};
use workbench_core::hierarchy::{ElementId, ElementKind, HierarchyCanvas, HierarchyTree};
use workbench_core::model::ItemId;
use workbench_core::scene::Canvas;

use super::{HierarchyArgs, fail, load_project, project_config, render_hierarchy};
use crate::output::{OutputMode, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub hierarchy: HierarchyArgs,
}

#[derive(Debug, Serialize)]
struct RenderReport {
    orientation: Orientation,
    width: f64,
    height: f64,
    elements: Vec<ElementRow>,
}

#[derive(Debug, Serialize)]
struct ElementRow {
    depth: usize,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<ItemId>,
    label: String,
    bounds: Option<Rect>,
    entry: Point,
    exit: Point,
}

pub fn run_render(args: &RenderArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let config = project_config(project_root, output)?;
    let project = load_project(&args.hierarchy.project).map_err(|e| fail(output, &e))?;
    let settings = args.hierarchy.settings(&config);

    let mut canvas = HierarchyCanvas::new(config.layout.layout_config());
    render_hierarchy(&mut canvas, &project, &settings).map_err(|e| fail(output, &e))?;
    debug!(visuals = canvas.canvas().len(), "render complete");

    let report = build_report(&canvas);
    render(output, &report, |report, w| {
        if output.is_pretty() {
            render_pretty(report, w)
        } else {
            render_text(report, w)
        }
    })
}

fn build_report(canvas: &HierarchyCanvas) -> RenderReport {
    let tree = canvas.tree();
    let elements = tree
        .preorder()
        .into_iter()
        .filter_map(|id| row(tree, canvas.canvas(), id))
        .collect();
    let size = canvas.canvas().size();
    RenderReport {
        orientation: canvas.orientation(),
        width: size.width,
        height: size.height,
        elements,
    }
}

fn row(tree: &HierarchyTree, canvas: &Canvas, id: ElementId) -> Option<ElementRow> {
    let element = tree.get(id)?;
    let (kind, item) = match &element.kind {
        ElementKind::Item { item } => ("item", Some(*item)),
        ElementKind::View(_) => ("view", None),
    };
    Some(ElementRow {
        depth: tree.depth(id),
        kind,
        item,
        label: element.label.clone(),
        bounds: element.visual.and_then(|v| canvas.get(v)).map(|v| v.bounds),
        entry: element.entry_point,
        exit: element.exit_point,
    })
}

fn render_text(report: &RenderReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "kind  depth  x  y  width  height  label")?;
    for row in &report.elements {
        let Some(b) = row.bounds else { continue };
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}  {}",
            row.kind, row.depth, b.x, b.y, b.width, b.height, row.label
        )?;
    }
    Ok(())
}

fn render_pretty(report: &RenderReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Hierarchy layout")?;
    pretty_kv(w, "Orientation", report.orientation.as_str())?;
    pretty_kv(w, "Canvas", format!("{} x {}", report.width, report.height))?;
    pretty_kv(w, "Elements", report.elements.len().to_string())?;
    writeln!(w)?;
    for row in &report.elements {
        let indent = "  ".repeat(row.depth);
        match row.bounds {
            Some(b) => writeln!(
                w,
                "{indent}{:<5} {}  @ ({}, {}) {}x{}",
                row.kind, row.label, b.x, b.y, b.width, b.height
            )?,
            None => writeln!(w, "{indent}{:<5} {}  (not drawn)", row.kind, row.label)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workbench_core::controller::DisplaySettings;
    use workbench_core::model::{Link, ViewMap, WorkItem};
    use workbench_core::project::ProjectData;

    fn rendered() -> HierarchyCanvas {
        let mut p = ProjectData::new();
        p.add_item(WorkItem::new(1, "Story", "Active", "Login"));
        p.add_item(WorkItem::new(2, "Task", "Active", "Form"));
        p.add_link(Link::new("Contains", ItemId(1), ItemId(2)));
        p.add_view_map(ViewMap::new("Tasks", &["Story"], "Task", "Contains"));
        let mut canvas = HierarchyCanvas::default();
        render_hierarchy(&mut canvas, &p, &DisplaySettings::default()).expect("render");
        canvas
    }

    #[test]
    fn report_lists_elements_in_preorder() {
        let report = build_report(&rendered());
        let kinds: Vec<_> = report.elements.iter().map(|r| (r.kind, r.depth)).collect();
        assert_eq!(kinds, vec![("item", 0), ("view", 1), ("item", 2)]);
        assert_eq!(report.elements[2].item, Some(ItemId(2)));
        assert!(report.width > 0.0 && report.height > 0.0);
    }

    #[test]
    fn text_rows_have_a_header() {
        let report = build_report(&rendered());
        let mut out = Vec::new();
        render_text(&report, &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("kind  depth"));
        assert_eq!(text.lines().count(), 4);
    }
}
