//! Export dependency graphs as DOT (Graphviz), Mermaid flowcharts, or JSON.

use crate::cycles::CycleReport;
use depviz_core::graph::{DependencyGraph, NodeStatus, PackageNode};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::path::Path;

/// Export format for graph visualization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    Dot,
    Mermaid,
    Json,
    /// A Graphviz-rendered image; the string is the `dot -T` format (png, svg, pdf).
    Image(String),
}

/// Errors selecting an export format.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unsupported output format '{0}' (use dot, gv, mmd, json, png, svg or pdf)")]
    Unsupported(String),
}

impl ExportFormat {
    /// Pick the format from an output file extension.
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self::from_name(&ext)
    }

    /// Parse a format name as used on the command line.
    pub fn from_name(name: &str) -> Result<Self, FormatError> {
        match name.to_lowercase().as_str() {
            "dot" | "gv" | "graphviz" => Ok(Self::Dot),
            "mmd" | "mermaid" => Ok(Self::Mermaid),
            "json" => Ok(Self::Json),
            ext @ ("png" | "svg" | "pdf") => Ok(Self::Image(ext.to_string())),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }
}

const ROOT_FILL: &str = "#ffe8a0";
const RESOLVED_FILL: &str = "#e0ffe0";
const TRUNCATED_FILL: &str = "#e0e0e0";
const UNRESOLVED_FILL: &str = "#ffd0d0";

fn fill_color(graph: &DependencyGraph, node: &PackageNode) -> &'static str {
    if node.name == graph.root {
        return ROOT_FILL;
    }
    match node.status {
        NodeStatus::Resolved => RESOLVED_FILL,
        NodeStatus::Truncated => TRUNCATED_FILL,
        NodeStatus::Unresolved(_) => UNRESOLVED_FILL,
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Export the graph as a DOT (Graphviz) string.
pub fn export_dot(graph: &DependencyGraph, cycles: &CycleReport) -> String {
    let mut out = String::new();
    writeln!(out, "digraph dependencies {{").unwrap();
    writeln!(out, "  rankdir=LR;").unwrap();
    writeln!(out, "  node [shape=box, style=filled, fontsize=10];").unwrap();
    writeln!(out).unwrap();

    for (name, node) in &graph.packages {
        let mut style = "filled".to_string();
        if matches!(node.status, NodeStatus::Unresolved(_)) {
            style.push_str(",dashed");
        }
        if *name == graph.root {
            style.push_str(",bold");
        }
        writeln!(
            out,
            "  \"{}\" [label=\"{}\", style=\"{}\", fillcolor=\"{}\"];",
            dot_escape(name),
            dot_escape(&node.label()),
            style,
            fill_color(graph, node)
        )
        .unwrap();
    }

    writeln!(out).unwrap();

    for edge in &graph.edges {
        let mut attrs = Vec::new();
        if let Some(req) = &edge.requirement {
            attrs.push(format!("label=\"{}\"", dot_escape(req)));
        }
        if cycles.contains_edge(&edge.source, &edge.target) {
            attrs.push("color=red".to_string());
            attrs.push("penwidth=2".to_string());
        }
        let attrs = if attrs.is_empty() {
            String::new()
        } else {
            format!(" [{}]", attrs.join(", "))
        };
        writeln!(
            out,
            "  \"{}\" -> \"{}\"{};",
            dot_escape(&edge.source),
            dot_escape(&edge.target),
            attrs
        )
        .unwrap();
    }

    writeln!(out, "}}").unwrap();
    out
}

/// Export the graph as a Mermaid flowchart string.
pub fn export_mermaid(graph: &DependencyGraph, cycles: &CycleReport) -> String {
    let ids = mermaid_ids(graph);
    let id = |name: &String| {
        ids.get(name.as_str())
            .cloned()
            .unwrap_or_else(|| mermaid_safe_id(name))
    };

    let mut out = String::new();
    writeln!(out, "flowchart LR").unwrap();

    for (name, node) in &graph.packages {
        writeln!(out, "  {}[\"{}\"]", id(name), mermaid_text(&node.label())).unwrap();
    }

    writeln!(out).unwrap();

    for edge in &graph.edges {
        let src = id(&edge.source);
        let tgt = id(&edge.target);
        let on_cycle = cycles.contains_edge(&edge.source, &edge.target);
        let arrow = if on_cycle { "==>" } else { "-->" };
        let label = match (&edge.requirement, on_cycle) {
            (Some(req), true) => Some(format!("{} cycle", req)),
            (Some(req), false) => Some(req.clone()),
            (None, true) => Some("cycle".to_string()),
            (None, false) => None,
        };
        match label {
            Some(label) => {
                writeln!(out, "  {} {}|\"{}\"| {}", src, arrow, mermaid_text(&label), tgt).unwrap();
            }
            None => writeln!(out, "  {} {} {}", src, arrow, tgt).unwrap(),
        }
    }

    writeln!(out).unwrap();
    writeln!(out, "  classDef root fill:{},stroke-width:2px;", ROOT_FILL).unwrap();
    writeln!(out, "  classDef truncated fill:{};", TRUNCATED_FILL).unwrap();
    writeln!(
        out,
        "  classDef unresolved fill:{},stroke-dasharray:4 2;",
        UNRESOLVED_FILL
    )
    .unwrap();
    writeln!(out, "  class {} root;", id(&graph.root)).unwrap();
    for (name, node) in &graph.packages {
        if *name == graph.root {
            continue;
        }
        let class = match node.status {
            NodeStatus::Resolved => continue,
            NodeStatus::Truncated => "truncated",
            NodeStatus::Unresolved(_) => "unresolved",
        };
        writeln!(out, "  class {} {};", id(name), class).unwrap();
    }

    out
}

/// Replace characters outside `[A-Za-z0-9]` and add the `p_` prefix.
fn mermaid_safe_id(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("p_{}", safe)
}

/// One Mermaid ID per package. Names that sanitize to the same ID
/// (`string-width`, `string.width`) get a numeric suffix in name order.
fn mermaid_ids(graph: &DependencyGraph) -> BTreeMap<&str, String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut ids = BTreeMap::new();
    for name in graph.packages.keys() {
        let base = mermaid_safe_id(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        used.insert(candidate.clone());
        ids.insert(name.as_str(), candidate);
    }
    ids
}

/// Escape text placed inside a quoted node or edge label.
fn mermaid_text(text: &str) -> String {
    text.replace('"', "#quot;").replace('|', "#124;")
}

/// Export the graph in a text format. Images are rendered from the DOT text.
pub fn export(graph: &DependencyGraph, format: &ExportFormat, cycles: &CycleReport) -> anyhow::Result<String> {
    Ok(match format {
        ExportFormat::Dot | ExportFormat::Image(_) => export_dot(graph, cycles),
        ExportFormat::Mermaid => export_mermaid(graph, cycles),
        ExportFormat::Json => depviz_core::schema::to_json(graph)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depviz_core::graph::PackageNode;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(&PathBuf::from("g.dot")).unwrap(), ExportFormat::Dot);
        assert_eq!(ExportFormat::from_path(&PathBuf::from("g.GV")).unwrap(), ExportFormat::Dot);
        assert_eq!(ExportFormat::from_path(&PathBuf::from("g.mmd")).unwrap(), ExportFormat::Mermaid);
        assert_eq!(ExportFormat::from_path(&PathBuf::from("g.json")).unwrap(), ExportFormat::Json);
        assert_eq!(
            ExportFormat::from_path(&PathBuf::from("out/graph.png")).unwrap(),
            ExportFormat::Image("png".into())
        );
        assert!(ExportFormat::from_path(&PathBuf::from("graph")).is_err());
        assert!(ExportFormat::from_path(&PathBuf::from("graph.bmp")).is_err());
    }

    #[test]
    fn test_mermaid_safe_id() {
        assert_eq!(mermaid_safe_id("@types/node"), "p__types_node");
        assert_eq!(mermaid_safe_id("A"), "p_A");
    }

    fn graph_with(edges: &[(&str, &str, Option<&str>)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(edges[0].0);
        for (s, t, req) in edges {
            for name in [s, t] {
                if !graph.contains(name) {
                    graph.insert_package(PackageNode::new(*name, None, 0));
                }
            }
            graph.add_edge(*s, *t, req.map(str::to_string));
        }
        graph
    }

    fn no_cycles() -> CycleReport {
        crate::cycles::detect_cycles(&DependencyGraph::new("none"), &Default::default())
    }

    #[test]
    fn test_mermaid_ids_stay_unique() {
        let graph = graph_with(&[
            ("app", "string-width", Some("^4.0.0")),
            ("app", "string.width", None),
        ]);
        let out = export_mermaid(&graph, &no_cycles());
        assert!(out.contains("p_string_width[\"string-width\"]"));
        assert!(out.contains("p_string_width_2[\"string.width\"]"));
        assert!(out.contains("p_app -->|\"^4.0.0\"| p_string_width\n"));
        assert!(out.contains("p_app --> p_string_width_2\n"));
    }

    #[test]
    fn test_mermaid_label_escapes_pipes() {
        let graph = graph_with(&[("app", "x", Some("^1.0.0 || ^2.0.0"))]);
        let out = export_mermaid(&graph, &no_cycles());
        assert!(out.contains("p_app -->|\"^1.0.0 #124;#124; ^2.0.0\"| p_x"));
        assert!(!out.contains("||"));
    }

    #[test]
    fn test_dot_highlights_chord_cycle() {
        let graph = graph_with(&[("a", "b", None), ("b", "c", None), ("c", "a", None), ("a", "c", None)]);
        let cycles = crate::cycles::detect_cycles(&graph, &Default::default());
        let dot = export_dot(&graph, &cycles);
        assert!(dot.contains("\"a\" -> \"c\" [color=red, penwidth=2];"));
    }

    #[test]
    fn test_dot_escape() {
        assert_eq!(dot_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
