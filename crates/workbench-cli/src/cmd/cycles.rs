//! `wb cycles`: list circular links (strongly connected components).

use std::collections::HashMap;
use std::io::Write;

use clap::Args;
use serde::Serialize;
use workbench_core::graph::LinkGraph;
use workbench_core::model::ItemId;
use workbench_core::project::ProjectData;

use super::{fail, load_project};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Project file to inspect.
    pub project: std::path::PathBuf,

    /// Only consider links with this name.
    #[arg(long = "link", value_name = "NAME")]
    pub link_name: Option<String>,

    /// Check whether linking PARENT:CHILD would close a loop.
    #[arg(long, value_name = "PARENT:CHILD", value_parser = parse_pair)]
    pub check: Option<(ItemId, ItemId)>,
}

fn parse_pair(raw: &str) -> Result<(ItemId, ItemId), String> {
    let (parent, child) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected PARENT:CHILD, got '{raw}'"))?;
    let parse = |s: &str| s.parse::<ItemId>().map_err(|e| format!("invalid item id '{s}': {e}"));
    Ok((parse(parent)?, parse(child)?))
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<Vec<ItemId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<CheckOutput>,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    parent: ItemId,
    child: ItemId,
    /// The loop the new link would close, if any.
    closes: Option<Vec<ItemId>>,
}

pub fn run_cycles(args: &CyclesArgs, output: OutputMode) -> anyhow::Result<()> {
    let project = load_project(&args.project).map_err(|e| fail(output, &e))?;
    let links = project.links();
    let graph = LinkGraph::from_links(&links, args.link_name.as_deref());
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "link graph built"
    );

    let payload = CyclesOutput {
        cycles: graph.find_cycles(),
        check: args.check.map(|(parent, child)| CheckOutput {
            parent,
            child,
            closes: graph.would_create_cycle(parent, child),
        }),
    };
    let captions = captions(&project, &payload.cycles);
    render(output, &payload, |payload, w| {
        render_cycles_human(payload, &captions, w)
    })
}

fn captions(project: &ProjectData, cycles: &[Vec<ItemId>]) -> HashMap<ItemId, String> {
    cycles
        .iter()
        .flatten()
        .filter_map(|id| project.item(*id).map(|item| (*id, item.label())))
        .collect()
}

fn render_cycles_human(
    payload: &CyclesOutput,
    captions: &HashMap<ItemId, String>,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No link cycles found.")?;
    } else {
        writeln!(w, "Link cycles ({})", payload.cycles.len())?;
        for (idx, cycle) in payload.cycles.iter().enumerate() {
            writeln!(w, "\nCycle {}:", idx + 1)?;
            for id in cycle {
                match captions.get(id) {
                    Some(label) => writeln!(w, "  - {label}")?,
                    None => writeln!(w, "  - {id} (not loaded)")?,
                }
            }
        }
    }

    if let Some(check) = &payload.check {
        writeln!(w)?;
        match &check.closes {
            Some(path) => {
                let path: Vec<String> = path.iter().map(ToString::to_string).collect();
                writeln!(
                    w,
                    "Linking {} -> {} would close a loop: {}",
                    check.parent,
                    check.child,
                    path.join(" -> ")
                )?;
            }
            None => writeln!(w, "Linking {} -> {} is safe.", check.parent, check.child)?,
        }
    }
    Ok(())
}
