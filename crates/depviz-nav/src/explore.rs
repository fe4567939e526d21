//! Dependency traversal trees: what a package uses, and what uses it.

use depviz_core::graph::{DependencyGraph, NodeStatus};
use std::collections::{HashSet, VecDeque};

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges where the package is the dependent (what it uses).
    Downstream,
    /// Follow edges where the package is the dependency (what uses it).
    Upstream,
    /// Both directions.
    Both,
}

/// A node in the traversal result tree.
#[derive(Debug, Clone)]
pub struct TraversalNode {
    pub package: String,
    /// `name@version` when a version is known.
    pub label: String,
    /// Requirement on the edge leading to this node.
    pub requirement: Option<String>,
    pub direction: Option<Direction>,
    pub depth: usize,
    /// Already shown elsewhere in the tree; not expanded again.
    pub repeated: bool,
    /// Annotation derived from the package status (`truncated`, `unresolved: ...`).
    pub note: Option<String>,
    pub children: Vec<TraversalNode>,
}

/// Explore the dependency graph from a starting package.
///
/// Breadth-first, so every package is expanded at its shortest distance from
/// the start. Later edges to an already-expanded package appear as `repeated`
/// leaves, which keeps cycles visible without infinite trees.
pub fn explore(
    graph: &DependencyGraph,
    start: &str,
    direction: Direction,
    max_depth: usize,
) -> Option<TraversalNode> {
    let start_node = graph.get_package(start)?;

    let mut root = TraversalNode {
        package: start.to_string(),
        label: start_node.label(),
        requirement: None,
        direction: None,
        depth: 0,
        repeated: false,
        note: status_note(&start_node.status),
        children: Vec::new(),
    };

    let mut visited = HashSet::new();
    visited.insert(start.to_string());

    let mut queue: VecDeque<(String, usize, Vec<usize>)> = VecDeque::new();
    queue.push_back((start.to_string(), 0, Vec::new()));

    // BFS traversal
    while let Some((current, depth, path_indices)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        for (neighbor, requirement, dir) in get_neighbors(graph, &current, direction) {
            let Some(package) = graph.get_package(&neighbor) else {
                continue;
            };
            let repeated = !visited.insert(neighbor.clone());

            let child = TraversalNode {
                package: neighbor.clone(),
                label: package.label(),
                requirement,
                direction: Some(dir),
                depth: depth + 1,
                repeated,
                note: status_note(&package.status),
                children: Vec::new(),
            };

            insert_child(&mut root, &path_indices, child);

            if !repeated {
                let mut new_path = path_indices.clone();
                new_path.push(get_child_count(&root, &path_indices) - 1);
                queue.push_back((neighbor, depth + 1, new_path));
            }
        }
    }

    Some(root)
}

/// Packages that depend on `package`, directly or transitively.
pub fn reverse_dependencies(
    graph: &DependencyGraph,
    package: &str,
    max_depth: usize,
) -> Option<TraversalNode> {
    explore(graph, package, Direction::Upstream, max_depth)
}

/// Unique package names in the tree, excluding the root, in BFS order.
pub fn collect_ids(node: &TraversalNode) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&TraversalNode> = node.children.iter().collect();
    while let Some(n) = queue.pop_front() {
        if seen.insert(n.package.as_str()) {
            out.push(n.package.clone());
        }
        queue.extend(n.children.iter());
    }
    out
}

fn status_note(status: &NodeStatus) -> Option<String> {
    match status {
        NodeStatus::Resolved => None,
        NodeStatus::Truncated => Some("truncated".to_string()),
        NodeStatus::Unresolved(reason) => Some(format!("unresolved: {}", reason)),
    }
}

fn get_neighbors(
    graph: &DependencyGraph,
    package: &str,
    direction: Direction,
) -> Vec<(String, Option<String>, Direction)> {
    let mut neighbors = Vec::new();

    for edge in &graph.edges {
        let down = edge.source == package;
        let up = edge.target == package;
        match direction {
            Direction::Downstream if down => {
                neighbors.push((edge.target.clone(), edge.requirement.clone(), Direction::Downstream));
            }
            Direction::Upstream if up => {
                neighbors.push((edge.source.clone(), edge.requirement.clone(), Direction::Upstream));
            }
            Direction::Both => {
                if down {
                    neighbors.push((edge.target.clone(), edge.requirement.clone(), Direction::Downstream));
                }
                if up {
                    neighbors.push((edge.source.clone(), edge.requirement.clone(), Direction::Upstream));
                }
            }
            _ => {}
        }
    }

    neighbors.sort_by(|a, b| a.0.cmp(&b.0));
    neighbors
}

fn insert_child(root: &mut TraversalNode, path: &[usize], child: TraversalNode) {
    if path.is_empty() {
        root.children.push(child);
        return;
    }

    if let Some(node) = root.children.get_mut(path[0]) {
        insert_child(node, &path[1..], child);
    }
}

fn get_child_count(root: &TraversalNode, path: &[usize]) -> usize {
    if path.is_empty() {
        return root.children.len();
    }

    if let Some(node) = root.children.get(path[0]) {
        get_child_count(node, &path[1..])
    } else {
        0
    }
}

/// Format a traversal result as a tree with box-drawing guides.
pub fn format_tree(node: &TraversalNode) -> String {
    let mut output = node_line(node, false);
    output.push('\n');
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        format_tree_inner(child, "", i + 1 == count, &mut output);
    }
    output
}

fn format_tree_inner(node: &TraversalNode, prefix: &str, is_last: bool, output: &mut String) {
    let connector = if is_last { "└── " } else { "├── " };
    output.push_str(prefix);
    output.push_str(connector);
    output.push_str(&node_line(node, true));
    output.push('\n');

    let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        format_tree_inner(child, &child_prefix, i + 1 == count, output);
    }
}

fn node_line(node: &TraversalNode, with_edge: bool) -> String {
    let mut line = node.label.clone();
    if with_edge && let Some(req) = &node.requirement {
        line.push_str(&format!(" ({})", req));
    }
    if node.repeated {
        line.push_str(" (*)");
    }
    if let Some(note) = &node.note {
        line.push_str(&format!(" [{}]", note));
    }
    line
}
