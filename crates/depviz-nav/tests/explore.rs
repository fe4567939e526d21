use depviz_core::graph::*;
use depviz_nav::explore::{Direction, collect_ids, explore, format_tree, reverse_dependencies};

fn make_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new("A");
    for (name, depth) in [("A", 0), ("B", 1), ("C", 2), ("D", 0)] {
        graph.insert_package(PackageNode::new(name, None, depth));
    }

    // A -> B -> C, D -> A
    graph.add_edge("A", "B", None);
    graph.add_edge("B", "C", None);
    graph.add_edge("D", "A", None);
    graph
}

#[test]
fn test_explore_downstream() {
    let graph = make_graph();
    let tree = explore(&graph, "A", Direction::Downstream, 3).unwrap();
    assert_eq!(tree.package, "A");
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].package, "B");
    assert_eq!(tree.children[0].children[0].package, "C");
}

#[test]
fn test_explore_upstream() {
    let graph = make_graph();
    let tree = explore(&graph, "A", Direction::Upstream, 3).unwrap();
    assert_eq!(collect_ids(&tree), vec!["D"]);
}

#[test]
fn test_explore_both() {
    let graph = make_graph();
    let tree = explore(&graph, "A", Direction::Both, 1).unwrap();
    let mut ids = collect_ids(&tree);
    ids.sort();
    assert_eq!(ids, vec!["B", "D"]);
}

#[test]
fn test_explore_depth_limit() {
    let graph = make_graph();
    let tree = explore(&graph, "A", Direction::Downstream, 1).unwrap();
    assert_eq!(tree.children.len(), 1);
    assert!(tree.children[0].children.is_empty());
}

#[test]
fn test_explore_unknown_package() {
    let graph = make_graph();
    assert!(explore(&graph, "Z", Direction::Downstream, 3).is_none());
}

#[test]
fn test_reverse_dependencies_transitive() {
    let graph = make_graph();
    let tree = reverse_dependencies(&graph, "C", 5).unwrap();
    assert_eq!(collect_ids(&tree), vec!["B", "A", "D"]);
}

#[test]
fn test_cycle_shows_repeated_leaf() {
    let mut graph = make_graph();
    graph.add_edge("C", "A", None);
    let tree = explore(&graph, "A", Direction::Downstream, 10).unwrap();
    let c = &tree.children[0].children[0];
    assert_eq!(c.children.len(), 1);
    assert_eq!(c.children[0].package, "A");
    assert!(c.children[0].repeated);
    assert!(c.children[0].children.is_empty());
}

#[test]
fn test_format_tree() {
    let mut graph = make_graph();
    graph.add_edge("A", "D", Some("^2.0.0".into()));
    graph.get_package_mut("C").unwrap().status = NodeStatus::Truncated;
    let tree = explore(&graph, "A", Direction::Downstream, 3).unwrap();
    let text = format_tree(&tree);
    let expected = "\
A
├── B
│   └── C [truncated]
└── D (^2.0.0)
    └── A (*)
";
    assert_eq!(text, expected);
}
