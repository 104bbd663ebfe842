//! `wb tree`: print the item/view hierarchy as an ASCII tree.

use std::fmt::Write as FmtWrite;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use workbench_core::hierarchy::{ElementId, ElementKind, HierarchyCanvas, HierarchyTree};
use workbench_core::model::ItemId;

use super::{HierarchyArgs, fail, load_project, project_config, render_hierarchy};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub hierarchy: HierarchyArgs,

    /// Maximum depth to print, counting items and views (default: unlimited).
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TreeNode {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<ItemId>,
    label: String,
    /// The item already appears above this node; it is drawn but not expanded.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    cycle: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TreeNode>,
}

pub fn run_tree(args: &TreeArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let config = project_config(project_root, output)?;
    let project = load_project(&args.hierarchy.project).map_err(|e| fail(output, &e))?;
    let settings = args.hierarchy.settings(&config);

    let mut canvas = HierarchyCanvas::new(config.layout.layout_config());
    let roots = render_hierarchy(&mut canvas, &project, &settings).map_err(|e| fail(output, &e))?;
    let nodes: Vec<TreeNode> = roots
        .iter()
        .filter_map(|id| collect(canvas.tree(), *id, args.depth, 0))
        .collect();

    render(output, &nodes, |nodes, w| {
        let mut out = String::new();
        render_ascii(nodes, &mut out);
        w.write_all(out.as_bytes())
    })
}

fn collect(
    tree: &HierarchyTree,
    id: ElementId,
    depth_limit: Option<usize>,
    depth: usize,
) -> Option<TreeNode> {
    let element = tree.get(id)?;
    let (kind, item) = match &element.kind {
        ElementKind::Item { item } => ("item", Some(*item)),
        ElementKind::View(_) => ("view", None),
    };
    let cycle = item.is_some_and(|item| tree.is_parent_in_tree(tree.parent(id), item));
    let children = if depth_limit.is_some_and(|limit| depth + 1 >= limit) {
        Vec::new()
    } else {
        tree.children(id)
            .iter()
            .filter_map(|child| collect(tree, *child, depth_limit, depth + 1))
            .collect()
    };
    Some(TreeNode {
        kind,
        item,
        label: element.label.clone(),
        cycle,
        children,
    })
}

fn render_ascii(nodes: &[TreeNode], out: &mut String) {
    if nodes.is_empty() {
        let _ = writeln!(out, "(no root items)");
        return;
    }
    for node in nodes {
        let _ = writeln!(out, "{}", node_line(node));
        render_children(&node.children, "", out);
    }
}

fn render_children(nodes: &[TreeNode], prefix: &str, out: &mut String) {
    let count = nodes.len();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let _ = writeln!(out, "{prefix}{connector}{}", node_line(node));
        render_children(&node.children, &child_prefix, out);
    }
}

fn node_line(node: &TreeNode) -> String {
    match node.kind {
        "view" => format!("[{}]", node.label),
        _ if node.cycle => format!("{} [cycle]", node.label),
        _ => node.label.clone(),
    }
}
