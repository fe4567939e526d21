//! Test repository backed by a plain-text graph file.
//!
//! Each non-comment line names a package and its direct dependencies:
//!
//! ```text
//! # comment
//! A: B C
//! B -> C, D
//! D:
//! ```
//!
//! Repeated lines for one package merge. A name that only appears on the right
//! side is a package without dependencies.

use crate::{PackageSource, Requirement, ResolvedPackage, SourceError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// An in-memory test repository.
#[derive(Debug, Clone, Default)]
pub struct GraphFile {
    origin: Option<PathBuf>,
    packages: BTreeMap<String, Vec<String>>,
}

impl GraphFile {
    /// Read and parse a graph file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut graph = Self::parse(&text)?;
        graph.origin = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            packages = graph.packages.len(),
            "loaded graph file"
        );
        Ok(graph)
    }

    /// Parse graph-file text.
    pub fn parse(text: &str) -> Result<Self, SourceError> {
        let mut packages: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, rest) = if let Some((name, rest)) = line.split_once("->") {
                (name, rest)
            } else if let Some((name, rest)) = line.split_once(':') {
                (name, rest)
            } else {
                return Err(SourceError::Syntax {
                    line: line_no,
                    message: format!("expected 'NAME: DEPS' or 'NAME -> DEPS', found '{}'", line),
                });
            };

            let name = name.trim();
            if name.is_empty() {
                return Err(SourceError::Syntax {
                    line: line_no,
                    message: "missing package name".to_string(),
                });
            }
            if name.chars().any(char::is_whitespace) {
                return Err(SourceError::Syntax {
                    line: line_no,
                    message: format!("package name '{}' contains whitespace", name),
                });
            }

            let deps: Vec<String> = rest
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();

            for dep in &deps {
                packages.entry(dep.clone()).or_default();
            }
            let entry = packages.entry(name.to_string()).or_default();
            for dep in deps {
                if !entry.contains(&dep) {
                    entry.push(dep);
                }
            }
        }

        Ok(Self {
            origin: None,
            packages,
        })
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Direct dependencies of a package in declaration order.
    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.packages.get(name).map(Vec::as_slice)
    }

    /// The known package name closest to `name`, if any is close enough.
    pub fn suggest(&self, name: &str) -> Option<String> {
        self.packages
            .keys()
            .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.clone())
    }
}

impl PackageSource for GraphFile {
    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => format!("test repository {}", path.display()),
            None => "in-memory test repository".to_string(),
        }
    }

    fn resolve(
        &self,
        name: &str,
        _requirement: Option<&str>,
    ) -> Result<ResolvedPackage, SourceError> {
        let deps = self
            .dependencies(name)
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_string(),
                suggestion: self.suggest(name),
            })?;
        Ok(ResolvedPackage {
            name: name.to_string(),
            version: None,
            dependencies: deps
                .iter()
                .map(|d| Requirement::new(d.clone(), None))
                .collect(),
        })
    }

    fn packages(&self) -> Option<Vec<String>> {
        Some(self.packages.keys().cloned().collect())
    }
}
