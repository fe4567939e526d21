//! Package metadata sources.
//!
//! A [`PackageSource`] answers one question: given a package name and a version
//! requirement, which version is it and what does it depend on. Two sources are
//! provided: [`graph_file::GraphFile`] (a plain-text test repository) and
//! [`registry::Registry`] (an npm-style HTTP registry).

pub mod graph_file;
pub mod registry;

/// Errors from package sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("package '{name}' not found{}", suggestion_suffix(.suggestion.as_deref()))]
    NotFound {
        name: String,
        suggestion: Option<String>,
    },
    #[error("no version of '{name}' matches '{requirement}'")]
    NoMatchingVersion { name: String, requirement: String },
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("graph file line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("response parse error: {0}")]
    Parse(String),
}

fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

/// A declared dependency: package name plus the requirement string as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    /// `None` when the source has no notion of versions.
    pub requirement: Option<String>,
}

impl Requirement {
    pub fn new(name: impl Into<String>, requirement: Option<String>) -> Self {
        Self {
            name: name.into(),
            requirement,
        }
    }
}

/// A package whose version has been selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Option<String>,
    pub dependencies: Vec<Requirement>,
}

/// Abstraction over package metadata providers.
pub trait PackageSource {
    /// Human-readable description (for display/logging).
    fn describe(&self) -> String;

    /// Select a version of `name` matching `requirement` and list its dependencies.
    /// `None` means "any version" (the latest for registries).
    fn resolve(&self, name: &str, requirement: Option<&str>)
    -> Result<ResolvedPackage, SourceError>;

    /// Every package the source knows about, if it can be enumerated.
    fn packages(&self) -> Option<Vec<String>> {
        None
    }
}

impl<S: PackageSource + ?Sized> PackageSource for &S {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn resolve(
        &self,
        name: &str,
        requirement: Option<&str>,
    ) -> Result<ResolvedPackage, SourceError> {
        (**self).resolve(name, requirement)
    }

    fn packages(&self) -> Option<Vec<String>> {
        (**self).packages()
    }
}

impl<S: PackageSource + ?Sized> PackageSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn resolve(
        &self,
        name: &str,
        requirement: Option<&str>,
    ) -> Result<ResolvedPackage, SourceError> {
        (**self).resolve(name, requirement)
    }

    fn packages(&self) -> Option<Vec<String>> {
        (**self).packages()
    }
}
