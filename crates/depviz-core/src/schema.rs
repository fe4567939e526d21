//! JSON persistence for exported graphs.
//!
//! Loading checks more than syntax: the schema major version must match and
//! the graph must be closed (root and every edge endpoint are known packages,
//! no edge appears twice), since traversal code relies on both.

use crate::graph::{DependencyGraph, GRAPH_VERSION};
use anyhow::{Context, Result};
use std::collections::BTreeSet;

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Accept graphs written by any release with the same schema major version.
pub fn validate_version(graph: &DependencyGraph) -> Result<()> {
    if major(&graph.version) != major(GRAPH_VERSION) {
        anyhow::bail!(
            "graph version mismatch: expected {}.x, found {}",
            major(GRAPH_VERSION),
            graph.version
        );
    }
    Ok(())
}

/// Check that the graph only refers to packages it contains.
pub fn validate_structure(graph: &DependencyGraph) -> Result<()> {
    if !graph.packages.is_empty() && !graph.contains(&graph.root) {
        anyhow::bail!("root package '{}' is missing from the graph", graph.root);
    }

    let mut seen = BTreeSet::new();
    for edge in &graph.edges {
        for end in [&edge.source, &edge.target] {
            if !graph.contains(end) {
                anyhow::bail!(
                    "edge {} -> {} refers to unknown package '{}'",
                    edge.source,
                    edge.target,
                    end
                );
            }
        }
        if !seen.insert((edge.source.as_str(), edge.target.as_str())) {
            anyhow::bail!("duplicate edge {} -> {}", edge.source, edge.target);
        }
    }

    if let Some(name) = graph.skipped.iter().find(|s| graph.contains(s)) {
        anyhow::bail!("package '{}' is both resolved and filtered out", name);
    }
    Ok(())
}

/// Serialize a graph to a pretty-printed JSON string.
pub fn to_json(graph: &DependencyGraph) -> Result<String> {
    serde_json::to_string_pretty(graph).context("failed to serialize dependency graph to JSON")
}

/// Deserialize and validate a graph. Metadata counters are recomputed.
pub fn from_json(json: &str) -> Result<DependencyGraph> {
    let mut graph: DependencyGraph =
        serde_json::from_str(json).context("failed to deserialize dependency graph from JSON")?;
    validate_version(&graph)?;
    validate_structure(&graph).context("invalid dependency graph")?;
    graph.reindex_edges();
    graph.refresh_metadata();
    Ok(graph)
}
