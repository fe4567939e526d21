//! Breadth-first dependency resolution from a package source.

use depviz_core::graph::{DependencyGraph, NodeStatus, PackageNode};
use depviz_source::{PackageSource, ResolvedPackage, SourceError};
use std::collections::VecDeque;

/// Limits applied while expanding the graph.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Packages at this depth are resolved but not expanded. The root is depth 0.
    pub max_depth: usize,
    /// Packages whose name contains this substring are skipped.
    pub filter: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            filter: None,
        }
    }
}

impl ResolveOptions {
    /// True if the name filter excludes this package.
    pub fn excludes(&self, name: &str) -> bool {
        self.filter
            .as_deref()
            .is_some_and(|f| !f.is_empty() && name.contains(f))
    }
}

/// Errors that abort resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("package '{name}' is excluded by filter '{filter}'")]
    RootFiltered { name: String, filter: String },
    #[error("failed to resolve '{name}': {source}")]
    Root {
        name: String,
        #[source]
        source: SourceError,
    },
}

/// Resolve the transitive dependencies of `root`.
///
/// Each package is expanded at most once, so cyclic dependencies terminate;
/// the edge closing a cycle is still recorded. Failures below the root mark the
/// package as unresolved instead of aborting.
pub fn resolve<S: PackageSource + ?Sized>(
    source: &S,
    root: &str,
    requirement: Option<&str>,
    options: &ResolveOptions,
) -> Result<DependencyGraph, ResolveError> {
    if options.excludes(root) {
        return Err(ResolveError::RootFiltered {
            name: root.to_string(),
            filter: options.filter.clone().unwrap_or_default(),
        });
    }

    let mut graph = DependencyGraph::new(root);
    graph.metadata.source = source.describe();
    expand(source, &mut graph, root, requirement, options.max_depth, options)?;
    graph.refresh_metadata();

    tracing::info!(
        root,
        packages = graph.metadata.total_packages,
        edges = graph.metadata.total_edges,
        skipped = graph.skipped.len(),
        "resolved dependency graph"
    );
    Ok(graph)
}

/// Resolve every package the source can enumerate, without a depth limit.
///
/// Used for reverse lookups, where dependents of a package can only be found
/// by looking at the whole repository. Returns `None` if the source cannot
/// enumerate its packages. `root` is recorded as the graph root and is resolved first.
pub fn resolve_universe<S: PackageSource + ?Sized>(
    source: &S,
    root: &str,
    options: &ResolveOptions,
) -> Option<Result<DependencyGraph, ResolveError>> {
    let mut names = source.packages()?;
    names.retain(|n| n != root);
    names.insert(0, root.to_string());

    let mut graph = DependencyGraph::new(root);
    graph.metadata.source = source.describe();
    for name in names {
        if graph.contains(&name) {
            continue;
        }
        if options.excludes(&name) {
            graph.skipped.insert(name);
            continue;
        }
        if let Err(e) = expand(source, &mut graph, &name, None, usize::MAX, options) {
            return Some(Err(e));
        }
    }
    graph.refresh_metadata();
    Some(Ok(graph))
}

fn expand<S: PackageSource + ?Sized>(
    source: &S,
    graph: &mut DependencyGraph,
    seed: &str,
    requirement: Option<&str>,
    max_depth: usize,
    options: &ResolveOptions,
) -> Result<(), ResolveError> {
    let resolved = source
        .resolve(seed, requirement)
        .map_err(|source| ResolveError::Root {
            name: seed.to_string(),
            source,
        })?;
    graph.insert_package(PackageNode::new(seed, resolved.version.clone(), 0));

    let mut queue: VecDeque<(ResolvedPackage, usize)> = VecDeque::new();
    queue.push_back((resolved, 0));

    while let Some((package, depth)) = queue.pop_front() {
        if depth >= max_depth {
            if !package.dependencies.is_empty()
                && let Some(node) = graph.get_package_mut(&package.name)
            {
                node.status = NodeStatus::Truncated;
            }
            continue;
        }

        tracing::debug!(
            package = %package.name,
            depth,
            dependencies = package.dependencies.len(),
            "expanding"
        );

        for dep in package.dependencies {
            if options.excludes(&dep.name) {
                graph.skipped.insert(dep.name);
                continue;
            }
            graph.add_edge(&package.name, &dep.name, dep.requirement.clone());
            if graph.contains(&dep.name) {
                continue;
            }

            match source.resolve(&dep.name, dep.requirement.as_deref()) {
                Ok(child) => {
                    graph.insert_package(PackageNode::new(
                        &dep.name,
                        child.version.clone(),
                        depth + 1,
                    ));
                    queue.push_back((child, depth + 1));
                }
                Err(e) => {
                    tracing::warn!(package = %dep.name, error = %e, "could not resolve dependency");
                    let mut node = PackageNode::new(&dep.name, None, depth + 1);
                    node.status = NodeStatus::Unresolved(e.to_string());
                    graph.insert_package(node);
                }
            }
        }
    }

    Ok(())
}
