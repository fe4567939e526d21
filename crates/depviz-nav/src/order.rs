//! Load order: every package after all of its dependencies.

use depviz_core::graph::DependencyGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Result of ordering a dependency graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadOrder {
    /// Packages in installable order (dependencies first).
    pub order: Vec<String>,
    /// Packages that sit on a cycle or depend on one; they cannot be ordered.
    pub blocked: Vec<String>,
}

impl LoadOrder {
    pub fn is_complete(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Compute a load order with Kahn's algorithm.
///
/// Ties are broken alphabetically so the order is stable across runs.
pub fn load_order(graph: &DependencyGraph) -> LoadOrder {
    // remaining[p] = number of unprocessed dependencies of p
    let mut remaining: BTreeMap<&str, usize> =
        graph.packages.keys().map(|k| (k.as_str(), 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for edge in &graph.edges {
        if !graph.contains(&edge.source) || !graph.contains(&edge.target) {
            continue;
        }
        if let Some(count) = remaining.get_mut(edge.source.as_str()) {
            *count += 1;
        }
        dependents
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|&(_, &n)| n == 0)
        .map(|(&p, _)| p)
        .collect();
    let mut order = Vec::with_capacity(remaining.len());

    while let Some(next) = ready.pop_first() {
        order.push(next.to_string());
        remaining.remove(next);
        for &dependent in dependents.get(next).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    let blocked: Vec<String> = remaining.keys().map(|p| p.to_string()).collect();
    if !blocked.is_empty() {
        tracing::debug!(blocked = blocked.len(), "load order blocked by cycles");
    }

    LoadOrder { order, blocked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depviz_core::graph::PackageNode;

    fn graph_from(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(edges.first().map(|e| e.0).unwrap_or("root"));
        for (s, t) in edges {
            for name in [s, t] {
                if !graph.contains(name) {
                    graph.insert_package(PackageNode::new(*name, None, 0));
                }
            }
            graph.add_edge(*s, *t, None);
        }
        graph
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = graph_from(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let order = load_order(&graph);
        assert_eq!(order.order, vec!["D", "B", "C", "A"]);
        assert!(order.is_complete());
    }

    #[test]
    fn test_cycle_blocks_dependents() {
        let graph = graph_from(&[("A", "B"), ("B", "C"), ("C", "B"), ("A", "D")]);
        let order = load_order(&graph);
        assert_eq!(order.order, vec!["D"]);
        assert_eq!(order.blocked, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_self_dependency_is_blocked() {
        let graph = graph_from(&[("A", "A")]);
        let order = load_order(&graph);
        assert!(order.order.is_empty());
        assert_eq!(order.blocked, vec!["A"]);
    }

    #[test]
    fn test_single_package() {
        let mut graph = DependencyGraph::new("solo");
        graph.insert_package(PackageNode::new("solo", None, 0));
        assert_eq!(load_order(&graph).order, vec!["solo"]);
    }
}
