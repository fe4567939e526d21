//! Graph data model for resolved package dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current on-disk schema version of [`DependencyGraph`].
pub const GRAPH_VERSION: &str = "1.0.0";

/// A package dependency graph rooted at one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// Name of the analyzed package.
    pub root: String,
    pub metadata: GraphMetadata,
    /// Packages keyed by name. A name is resolved to at most one version.
    pub packages: BTreeMap<String, PackageNode>,
    /// Directed edges `dependent -> dependency`.
    pub edges: Vec<DependencyEdge>,
    /// Packages excluded by the name filter.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skipped: BTreeSet<String>,
    /// `(source, target)` of every edge, for constant-time duplicate checks.
    #[serde(skip)]
    edge_index: BTreeSet<(String, String)>,
}

/// Aggregate statistics for the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Human-readable description of where packages came from.
    pub source: String,
    pub total_packages: usize,
    pub total_edges: usize,
    pub max_depth_reached: usize,
    pub unresolved_packages: usize,
}

/// A package vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    pub name: String,
    /// Resolved version. Test repositories carry no versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// BFS distance from the root.
    pub depth: usize,
    pub status: NodeStatus,
}

/// Expansion state of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum NodeStatus {
    /// Dependencies were fetched and expanded.
    Resolved,
    /// Depth limit reached before the dependencies were expanded.
    Truncated,
    /// Metadata could not be fetched.
    Unresolved(String),
}

/// A directed dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent package.
    pub source: String,
    /// The dependency.
    pub target: String,
    /// Version requirement as declared by `source`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
}

impl PackageNode {
    pub fn new(name: impl Into<String>, version: Option<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            version,
            depth,
            status: NodeStatus::Resolved,
        }
    }

    /// `name@version`, or just the name when no version is known.
    pub fn label(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.name, v),
            None => self.name.clone(),
        }
    }
}

impl DependencyGraph {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            version: GRAPH_VERSION.to_string(),
            generated_at: Utc::now(),
            root: root.into(),
            metadata: GraphMetadata::default(),
            packages: BTreeMap::new(),
            edges: Vec::new(),
            skipped: BTreeSet::new(),
            edge_index: BTreeSet::new(),
        }
    }

    /// Insert a package, replacing any previous node with the same name.
    pub fn insert_package(&mut self, node: PackageNode) {
        self.packages.insert(node.name.clone(), node);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn get_package(&self, name: &str) -> Option<&PackageNode> {
        self.packages.get(name)
    }

    pub fn get_package_mut(&mut self, name: &str) -> Option<&mut PackageNode> {
        self.packages.get_mut(name)
    }

    /// Add an edge. Returns false if the same `source -> target` edge already exists.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        requirement: Option<String>,
    ) -> bool {
        let source = source.into();
        let target = target.into();
        if self.edge_index.len() != self.edges.len() {
            self.reindex_edges();
        }
        if !self.edge_index.insert((source.clone(), target.clone())) {
            return false;
        }
        self.edges.push(DependencyEdge {
            source,
            target,
            requirement,
        });
        true
    }

    /// Direct dependencies of a package, sorted.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .edges
            .iter()
            .filter(|e| e.source == name)
            .map(|e| e.target.as_str())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Direct dependents of a package (packages that depend on it), sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .edges
            .iter()
            .filter(|e| e.target == name)
            .map(|e| e.source.as_str())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Find the edge between two packages.
    pub fn edge(&self, source: &str, target: &str) -> Option<&DependencyEdge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    /// Rebuild the duplicate-edge index from `edges`. Needed after `edges` is
    /// replaced wholesale, e.g. when a graph is loaded from JSON.
    pub fn reindex_edges(&mut self) {
        self.edge_index = self
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
    }

    /// Recompute metadata counters from current packages and edges.
    pub fn refresh_metadata(&mut self) {
        self.metadata.total_packages = self.packages.len();
        self.metadata.total_edges = self.edges.len();
        self.metadata.max_depth_reached = self.packages.values().map(|p| p.depth).max().unwrap_or(0);
        self.metadata.unresolved_packages = self
            .packages
            .values()
            .filter(|p| matches!(p.status, NodeStatus::Unresolved(_)))
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_with_and_without_version() {
        assert_eq!(
            PackageNode::new("react", Some("18.2.0".into()), 0).label(),
            "react@18.2.0"
        );
        assert_eq!(PackageNode::new("A", None, 0).label(), "A");
    }

    #[test]
    fn test_add_edge_deduplicates() {
        let mut graph = DependencyGraph::new("A");
        assert!(graph.add_edge("A", "B", None));
        assert!(!graph.add_edge("A", "B", Some("^1".into())));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_add_edge_after_edges_replaced() {
        let mut graph = DependencyGraph::new("A");
        graph.edges.push(DependencyEdge {
            source: "A".into(),
            target: "B".into(),
            requirement: None,
        });
        assert!(!graph.add_edge("A", "B", None));
        assert!(graph.add_edge("B", "A", None));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_add_edge_many_dependencies() {
        let mut graph = DependencyGraph::new("root");
        for i in 0..20_000 {
            assert!(graph.add_edge("root", format!("dep-{}", i), None));
        }
        assert!(!graph.add_edge("root", "dep-19999", None));
        assert_eq!(graph.edges.len(), 20_000);
    }

    #[test]
    fn test_status_serializes_with_reason() {
        let json = serde_json::to_string(&NodeStatus::Unresolved("404".into())).unwrap();
        assert_eq!(json, r#"{"state":"unresolved","reason":"404"}"#);
    }
}
