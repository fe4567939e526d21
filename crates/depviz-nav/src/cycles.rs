//! Circular dependency detection.
//!
//! A cycle exists when a package depends, directly or transitively, on itself:
//! - A depends on B, B depends on C, and C depends back on A
//! - A package listing itself as a dependency is a cycle of length 1
//! - No package in a cycle can be installed strictly after all of its dependencies

use depviz_core::graph::DependencyGraph;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// A single circular dependency cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    /// Package names forming the cycle, in dependency order.
    pub cycle: Vec<String>,
    /// Human-readable representation: A → B → C → A
    pub representation: String,
    /// Number of packages in the cycle.
    pub length: usize,
}

/// Ordering of reported cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CycleSort {
    /// Shortest first, then by first package.
    #[default]
    Length,
    /// By first package, then shortest first.
    Package,
}

/// Configuration for cycle detection.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Maximum number of cycles to return.
    pub max_cycles: usize,
    /// Maximum cycle length to detect.
    pub max_cycle_length: usize,
    /// Minimum cycle length to report.
    pub min_cycle_length: usize,
    pub sort_by: CycleSort,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_cycles: usize::MAX,
            max_cycle_length: 20,
            min_cycle_length: 1,
            sort_by: CycleSort::Length,
        }
    }
}

/// Report of all circular dependencies found.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Total number of cycles detected (before `max_cycles` truncation).
    pub cycle_count: usize,
    /// Total number of packages involved in cycles.
    pub packages_in_cycles: usize,
    /// Number of packages that depend on themselves.
    pub self_dependencies: usize,
    pub max_cycle_length: usize,
    pub min_cycle_length: usize,
    pub avg_cycle_length: f64,
    pub length_distribution: LengthDistribution,
    /// Reported cycles, at most `max_cycles`.
    pub cycles: Vec<Cycle>,
    pub summary: String,
}

/// Distribution of cycles by length.
#[derive(Debug, Clone, Serialize, Default)]
pub struct LengthDistribution {
    pub length_1: usize,
    pub length_2: usize,
    pub length_3: usize,
    pub length_4_plus: usize,
}

impl CycleReport {
    /// True if the edge `source -> target` lies on a reported cycle.
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.cycles.iter().any(|c| {
            let n = c.cycle.len();
            (0..n).any(|i| c.cycle[i] == source && c.cycle[(i + 1) % n] == target)
        })
    }

    /// Every package that lies on a reported cycle, sorted.
    pub fn packages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .cycles
            .iter()
            .flat_map(|c| c.cycle.iter().map(String::as_str))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Upper bound on enumerated cycles; densely cyclic graphs have exponentially many.
const ENUMERATION_LIMIT: usize = 100_000;

/// Search state for one start package.
///
/// Only packages that sort after `start` may be entered, so every simple cycle
/// is found exactly once: from its smallest member.
struct CycleSearch<'g> {
    adj: &'g BTreeMap<&'g str, Vec<&'g str>>,
    start: &'g str,
    path: Vec<&'g str>,
    on_path: HashSet<&'g str>,
    max_length: usize,
    found: Vec<Vec<&'g str>>,
}

impl<'g> CycleSearch<'g> {
    fn run(&mut self, node: &'g str) {
        self.path.push(node);
        self.on_path.insert(node);

        let adj = self.adj;
        for &next in adj.get(node).map(Vec::as_slice).unwrap_or_default() {
            if self.found.len() >= ENUMERATION_LIMIT {
                break;
            }
            if next == self.start {
                self.found.push(self.path.clone());
            } else if next > self.start
                && !self.on_path.contains(next)
                && self.path.len() < self.max_length
            {
                self.run(next);
            }
        }

        self.on_path.remove(node);
        self.path.pop();
    }
}

/// Detect circular dependencies by enumerating every simple cycle.
///
/// Cycles are listed starting at their alphabetically smallest package, so
/// rotations of the same cycle are never reported twice. Cycles longer than
/// `max_cycle_length` are not explored.
pub fn detect_cycles(graph: &DependencyGraph, config: &CycleConfig) -> CycleReport {
    let mut adj: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &graph.edges {
        adj.entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    for targets in adj.values_mut() {
        targets.sort_unstable();
        targets.dedup();
    }

    let mut found: Vec<Vec<&str>> = Vec::new();
    for start in graph.packages.keys().map(String::as_str) {
        if !adj.contains_key(start) {
            continue;
        }
        let mut search = CycleSearch {
            adj: &adj,
            start,
            path: Vec::new(),
            on_path: HashSet::new(),
            max_length: config.max_cycle_length.max(1),
            found: std::mem::take(&mut found),
        };
        search.run(start);
        found = search.found;
        if found.len() >= ENUMERATION_LIMIT {
            tracing::warn!(limit = ENUMERATION_LIMIT, "cycle enumeration stopped early");
            break;
        }
    }

    let mut cycles: Vec<Cycle> = found
        .into_iter()
        .filter(|path| path.len() >= config.min_cycle_length)
        .map(|path| {
            let cycle: Vec<String> = path.into_iter().map(str::to_string).collect();
            Cycle {
                length: cycle.len(),
                representation: format_cycle(&cycle),
                cycle,
            }
        })
        .collect();

    match config.sort_by {
        CycleSort::Length => cycles.sort_by(|a, b| {
            a.length.cmp(&b.length).then_with(|| a.cycle.cmp(&b.cycle))
        }),
        CycleSort::Package => cycles.sort_by(|a, b| {
            a.cycle
                .first()
                .cmp(&b.cycle.first())
                .then_with(|| a.length.cmp(&b.length))
                .then_with(|| a.cycle.cmp(&b.cycle))
        }),
    }

    let cycle_count = cycles.len();
    let packages_in_cycles: HashSet<&str> = cycles
        .iter()
        .flat_map(|c| c.cycle.iter().map(|s| s.as_str()))
        .collect();
    let packages_in_cycles = packages_in_cycles.len();
    let self_dependencies = cycles.iter().filter(|c| c.length == 1).count();

    let max_cycle_length = cycles.iter().map(|c| c.length).max().unwrap_or(0);
    let min_cycle_length = cycles.iter().map(|c| c.length).min().unwrap_or(0);
    let total_length: usize = cycles.iter().map(|c| c.length).sum();
    let avg_cycle_length = if cycle_count > 0 {
        total_length as f64 / cycle_count as f64
    } else {
        0.0
    };

    let mut length_distribution = LengthDistribution::default();
    for cycle in &cycles {
        match cycle.length {
            1 => length_distribution.length_1 += 1,
            2 => length_distribution.length_2 += 1,
            3 => length_distribution.length_3 += 1,
            _ => length_distribution.length_4_plus += 1,
        }
    }

    let summary = if cycle_count == 0 {
        "No circular dependencies detected.".to_string()
    } else if cycle_count == 1 {
        format!(
            "Found 1 circular dependency involving {} package(s): {}",
            packages_in_cycles, cycles[0].representation
        )
    } else {
        format!(
            "Found {} circular dependencies involving {} packages. \
             Cycles range from {} to {} packages.",
            cycle_count, packages_in_cycles, min_cycle_length, max_cycle_length
        )
    };

    cycles.truncate(config.max_cycles);

    CycleReport {
        cycle_count,
        packages_in_cycles,
        self_dependencies,
        max_cycle_length,
        min_cycle_length,
        avg_cycle_length,
        length_distribution,
        cycles,
        summary,
    }
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} → {}", cycle.join(" → "), first),
        None => String::new(),
    }
}
