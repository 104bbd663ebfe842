//! Link graph diagnostics.
//!
//! The hierarchy builder tolerates circular links by cutting the repeated
//! item off as a leaf. These helpers report where such loops exist so they
//! can be fixed at the source.
//!
//! Edges point `parent → child`.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::model::{ItemId, Link};

/// Directed graph of links, optionally restricted to one link name.
#[derive(Debug, Default)]
pub struct LinkGraph {
    graph: DiGraph<ItemId, String>,
    nodes: HashMap<ItemId, NodeIndex>,
}

impl LinkGraph {
    #[must_use]
    pub fn from_links<'a>(links: impl IntoIterator<Item = &'a Link>, link_name: Option<&str>) -> Self {
        let mut out = Self::default();
        for link in links {
            if link_name.is_some_and(|name| name != link.name) {
                continue;
            }
            let parent = out.node(link.parent);
            let child = out.node(link.child);
            out.graph.add_edge(parent, child, link.name.clone());
        }
        out
    }

    fn node(&mut self, item: ItemId) -> NodeIndex {
        *self
            .nodes
            .entry(item)
            .or_insert_with(|| self.graph.add_node(item))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Strongly connected components that form cycles, each sorted by id.
    /// Self-links are reported as one-element cycles.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<ItemId>> {
        let mut cycles: Vec<Vec<ItemId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|node| self.graph.contains_edge(*node, *node))
            })
            .map(|component| {
                let mut ids: Vec<ItemId> = component.into_iter().map(|idx| self.graph[idx]).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        cycles.sort_unstable();
        cycles
    }

    /// Check whether linking `parent → child` would close a cycle.
    ///
    /// Returns the loop as `parent, child, ..., parent` when it would.
    #[must_use]
    pub fn would_create_cycle(&self, parent: ItemId, child: ItemId) -> Option<Vec<ItemId>> {
        if parent == child {
            return Some(vec![parent, parent]);
        }
        let (&from, &to) = (self.nodes.get(&parent)?, self.nodes.get(&child)?);

        // Breadth-first from the child looking for the parent.
        let mut queue = VecDeque::from([to]);
        let mut visited = HashSet::from([to]);
        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        while let Some(current) = queue.pop_front() {
            if current == from {
                let mut path = vec![self.graph[from]];
                let mut cursor = from;
                while cursor != to {
                    cursor = *came_from.get(&cursor)?;
                    path.push(self.graph[cursor]);
                }
                path.reverse();
                path.insert(0, parent);
                return Some(path);
            }
            for edge in self.graph.edges(current) {
                let next = edge.target();
                if visited.insert(next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

/// Cycles among `links`, optionally restricted to one link name.
#[must_use]
pub fn find_link_cycles(links: &[Link], link_name: Option<&str>) -> Vec<Vec<ItemId>> {
    LinkGraph::from_links(links, link_name).find_cycles()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &str, parent: u64, child: u64) -> Link {
        Link::new(name, ItemId(parent), ItemId(child))
    }

    #[test]
    fn acyclic_links_have_no_cycles() {
        let links = [link("Contains", 1, 2), link("Contains", 2, 3), link("Contains", 1, 3)];
        assert!(find_link_cycles(&links, None).is_empty());
    }

    #[test]
    fn two_node_loop_and_self_link_are_reported() {
        let links = [
            link("Contains", 1, 2),
            link("Contains", 2, 1),
            link("Contains", 5, 5),
            link("Contains", 2, 3),
        ];
        assert_eq!(
            find_link_cycles(&links, None),
            vec![vec![ItemId(1), ItemId(2)], vec![ItemId(5)]]
        );
    }

    #[test]
    fn link_name_filter_ignores_other_links() {
        let links = [link("Contains", 1, 2), link("Related", 2, 1)];
        assert!(find_link_cycles(&links, Some("Contains")).is_empty());
        assert_eq!(find_link_cycles(&links, None).len(), 1);
    }

    #[test]
    fn would_create_cycle_returns_closing_path() {
        let links = [link("Contains", 1, 2), link("Contains", 2, 3)];
        let graph = LinkGraph::from_links(&links, None);
        assert_eq!(
            graph.would_create_cycle(ItemId(3), ItemId(1)),
            Some(vec![ItemId(3), ItemId(1), ItemId(2), ItemId(3)])
        );
        assert_eq!(graph.would_create_cycle(ItemId(1), ItemId(3)), None);
        assert_eq!(graph.would_create_cycle(ItemId(4), ItemId(4)), Some(vec![ItemId(4), ItemId(4)]));
        assert_eq!(graph.edge_count(), 2);
    }
}
