//! Write a visualization to the configured output file.
//!
//! Text formats are written directly. Images are produced by piping DOT into
//! Graphviz (`dot -T<format> -o <path>`); when Graphviz is missing or fails the
//! DOT source is written next to the requested file instead.

use crate::cycles::CycleReport;
use crate::export::{self, ExportFormat, FormatError};
use depviz_core::graph::DependencyGraph;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Errors writing the visualization.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to export graph: {0}")]
    Export(String),
}

/// What ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A text format was written to the requested path.
    Written(PathBuf),
    /// Graphviz rendered an image at the requested path.
    Rendered(PathBuf),
    /// The image could not be rendered; DOT source was written instead.
    Fallback {
        requested: PathBuf,
        written: PathBuf,
        reason: String,
    },
}

impl RenderOutcome {
    /// The file that was actually written.
    pub fn path(&self) -> &Path {
        match self {
            RenderOutcome::Written(p) | RenderOutcome::Rendered(p) => p,
            RenderOutcome::Fallback { written, .. } => written,
        }
    }
}

/// Graphviz-backed renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// The Graphviz `dot` executable.
    pub dot_binary: PathBuf,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            dot_binary: PathBuf::from("dot"),
        }
    }
}

impl Renderer {
    /// Write `graph` to `path`, choosing the format from the extension.
    pub fn write_output(
        &self,
        graph: &DependencyGraph,
        path: &Path,
        cycles: &CycleReport,
    ) -> Result<RenderOutcome, RenderError> {
        let format = ExportFormat::from_path(path)?;
        self.write_as(graph, path, &format, cycles)
    }

    /// Write `graph` to `path` in an explicit format.
    pub fn write_as(
        &self,
        graph: &DependencyGraph,
        path: &Path,
        format: &ExportFormat,
        cycles: &CycleReport,
    ) -> Result<RenderOutcome, RenderError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let text = export::export(graph, format, cycles)
            .map_err(|e| RenderError::Export(e.to_string()))?;

        let ExportFormat::Image(image_format) = format else {
            write_file(path, &text)?;
            return Ok(RenderOutcome::Written(path.to_path_buf()));
        };

        match self.run_graphviz(&text, image_format, path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "rendered image with graphviz");
                Ok(RenderOutcome::Rendered(path.to_path_buf()))
            }
            Err(reason) => {
                let written = path.with_extension("dot");
                tracing::warn!(
                    %reason,
                    fallback = %written.display(),
                    "graphviz rendering failed, writing DOT source instead"
                );
                write_file(&written, &text)?;
                Ok(RenderOutcome::Fallback {
                    requested: path.to_path_buf(),
                    written,
                    reason,
                })
            }
        }
    }

    fn run_graphviz(&self, dot: &str, format: &str, path: &Path) -> Result<(), String> {
        let mut child = Command::new(&self.dot_binary)
            .arg(format!("-T{}", format))
            .arg("-o")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("cannot run '{}': {}", self.dot_binary.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin.write_all(dot.as_bytes());
            // Close stdin so graphviz sees EOF.
            drop(stdin);
            if let Err(e) = written {
                // Reap the child so a failed write never leaves it behind.
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("cannot write to graphviz: {}", e));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("graphviz did not finish: {}", e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "graphviz exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), RenderError> {
    std::fs::write(path, text).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}
