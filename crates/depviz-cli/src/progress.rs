//! Terminal progress display while packages are being resolved.

use depviz_source::{PackageSource, ResolvedPackage, SourceError};
use indicatif::{ProgressBar, ProgressStyle};

/// Wraps a source and ticks a spinner for every package it resolves.
pub struct ProgressSource<S> {
    inner: S,
    spinner: ProgressBar,
}

impl<S: PackageSource> ProgressSource<S> {
    /// Spinner on stderr. Use `visible = false` for local sources that resolve instantly.
    pub fn new(inner: S, visible: bool) -> Self {
        let spinner = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} resolved · {msg}")
                .expect("valid template"),
        );
        Self { inner, spinner }
    }

    /// Clear the spinner once resolution is done.
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl<S: PackageSource> PackageSource for ProgressSource<S> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn resolve(
        &self,
        name: &str,
        requirement: Option<&str>,
    ) -> Result<ResolvedPackage, SourceError> {
        self.spinner.set_message(format!("resolving {}", name));
        let result = self.inner.resolve(name, requirement);
        self.spinner.inc(1);
        result
    }

    fn packages(&self) -> Option<Vec<String>> {
        self.inner.packages()
    }
}
