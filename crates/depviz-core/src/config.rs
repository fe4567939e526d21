//! Visualizer configuration.
//!
//! Load order: config file (INI, or TOML when the extension is `.toml`) →
//! environment variables → defaults for optional keys.

use crate::ini::{IniDocument, IniError, Section};
use std::path::{Path, PathBuf};

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file '{}' not found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file: {0}")]
    Syntax(#[from] IniError),
    #[error("failed to parse TOML configuration: {0}")]
    Toml(String),
    #[error("missing required section '{0}'")]
    MissingSection(String),
    #[error("missing required parameter '{key}' in section '{section}'")]
    MissingKey { section: String, key: String },
    #[error("parameter '{key}' in section '{section}' must not be empty")]
    EmptyValue { section: String, key: String },
    #[error("parameter '{key}' in section '{section}' must be 'true' or 'false', got '{value}'")]
    InvalidBool {
        section: String,
        key: String,
        value: String,
    },
    #[error("parameter '{key}' in section '{section}' must be a non-negative integer, got '{value}'")]
    InvalidNumber {
        section: String,
        key: String,
        value: String,
    },
}

/// The package whose dependencies are analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSettings {
    pub name: String,
    /// Exact version, dist-tag (e.g. `latest`) or version range.
    pub version: String,
    /// Where the visualization is written. The extension selects the format.
    pub output_file: PathBuf,
}

/// Where package metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    /// Registry base URL, or the path of a graph file in test mode.
    pub url: String,
    pub test_mode: bool,
}

/// Optional analysis limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Maximum depth of the dependency expansion (root is depth 0).
    pub max_depth: usize,
    /// Packages whose name contains this substring are excluded.
    pub filter: Option<String>,
    /// Maximum number of cycles listed in reports.
    pub max_cycles: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            filter: None,
            max_cycles: 50,
        }
    }
}

/// Fully validated settings for one visualizer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub package: PackageSettings,
    pub repository: RepositorySettings,
    pub analysis: AnalysisSettings,
}

const TRUE_WORDS: &[&str] = &["true", "1", "yes", "on"];
const FALSE_WORDS: &[&str] = &["false", "0", "no", "off"];

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.trim().parse()
    {
        *target = n;
    }
}

impl Settings {
    /// Load and validate a configuration file, then apply `DEPVIZ_*` overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let doc = if is_toml {
            toml_document(&text)?
        } else {
            IniDocument::parse(&text)?
        };

        let mut settings = Self::from_document(path, &doc)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Validate an already-parsed document. No environment overrides are applied.
    pub fn from_document(path: &Path, doc: &IniDocument) -> Result<Self, ConfigError> {
        let package = doc
            .section("package")
            .ok_or_else(|| ConfigError::MissingSection("package".to_string()))?;
        let repository = doc
            .section("repository")
            .ok_or_else(|| ConfigError::MissingSection("repository".to_string()))?;

        let package = PackageSettings {
            name: required(package, "package", "name")?,
            version: required(package, "package", "version")?,
            output_file: PathBuf::from(required(package, "package", "output_file")?),
        };

        let test_mode_raw = required(repository, "repository", "test_mode")?;
        let repository = RepositorySettings {
            url: required(repository, "repository", "url")?,
            test_mode: parse_bool("repository", "test_mode", &test_mode_raw)?,
        };

        let mut analysis = AnalysisSettings::default();
        if let Some(section) = doc.section("analysis") {
            if let Some(v) = section.get("max_depth") {
                analysis.max_depth = parse_number("analysis", "max_depth", v)?;
            }
            if let Some(v) = section.get("max_cycles") {
                analysis.max_cycles = parse_number("analysis", "max_cycles", v)?;
            }
            analysis.filter = section.get("filter").and_then(|v| non_empty(v));
        }

        Ok(Self {
            config_path: path.to_path_buf(),
            package,
            repository,
            analysis,
        })
    }

    fn apply_env_overrides(&mut self) {
        env_override("DEPVIZ_MAX_DEPTH", &mut self.analysis.max_depth);
        env_override("DEPVIZ_MAX_CYCLES", &mut self.analysis.max_cycles);
        if let Ok(v) = std::env::var("DEPVIZ_FILTER") {
            self.analysis.filter = non_empty(&v);
        }
    }

    /// Point the run at a graph file given on the command line.
    /// A graph file always means test mode.
    #[must_use]
    pub fn with_graph_file(mut self, graph_file: &Path) -> Self {
        self.repository.url = graph_file.display().to_string();
        self.repository.test_mode = true;
        self
    }

    /// All parameters grouped by section, in display order.
    pub fn entries(&self) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
        vec![
            (
                "package",
                vec![
                    ("Package name", self.package.name.clone()),
                    ("Package version", self.package.version.clone()),
                    (
                        "Output file",
                        self.package.output_file.display().to_string(),
                    ),
                ],
            ),
            (
                "repository",
                vec![
                    ("Repository URL or graph file", self.repository.url.clone()),
                    ("Test mode", self.repository.test_mode.to_string()),
                ],
            ),
            (
                "analysis",
                vec![
                    ("Max depth", self.analysis.max_depth.to_string()),
                    (
                        "Filter",
                        self.analysis
                            .filter
                            .clone()
                            .unwrap_or_else(|| "(none)".to_string()),
                    ),
                    ("Max cycles", self.analysis.max_cycles.to_string()),
                ],
            ),
        ]
    }
}

fn required(section: &Section, section_name: &str, key: &str) -> Result<String, ConfigError> {
    let value = section.get(key).ok_or_else(|| ConfigError::MissingKey {
        section: section_name.to_string(),
        key: key.to_string(),
    })?;
    non_empty(value).ok_or_else(|| ConfigError::EmptyValue {
        section: section_name.to_string(),
        key: key.to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    let lowered = value.trim().to_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(ConfigError::InvalidBool {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_number(section: &str, key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Flatten a TOML document into the same section/key shape as INI.
/// Nested tables below the first level are not part of the format.
fn toml_document(text: &str) -> Result<IniDocument, ConfigError> {
    let table: toml::Table = toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))?;
    let mut doc = IniDocument::default();
    for (name, value) in table {
        let toml::Value::Table(inner) = value else {
            return Err(ConfigError::Toml(format!(
                "top-level key '{}' must be a table",
                name
            )));
        };
        let section: Section = inner
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k.to_lowercase(), v)
            })
            .collect();
        doc.insert_section(&name, section);
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
[package]
name = express
version = 4.18.2
output_file = express.svg

[repository]
url = https://registry.npmjs.org
test_mode = false
";

    fn parse(text: &str) -> Result<Settings, ConfigError> {
        let doc = IniDocument::parse(text)?;
        Settings::from_document(Path::new("config.ini"), &doc)
    }

    #[test]
    fn test_valid_config() {
        let settings = parse(VALID).unwrap();
        assert_eq!(settings.package.name, "express");
        assert_eq!(settings.package.version, "4.18.2");
        assert_eq!(settings.package.output_file, PathBuf::from("express.svg"));
        assert_eq!(settings.repository.url, "https://registry.npmjs.org");
        assert!(!settings.repository.test_mode);
        assert_eq!(settings.analysis, AnalysisSettings::default());
    }

    #[test]
    fn test_missing_package_section() {
        let err = parse("[repository]\nurl = x\ntest_mode = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(ref s) if s == "package"));
    }

    #[test]
    fn test_missing_repository_section() {
        let err = parse("[package]\nname = a\nversion = 1\noutput_file = o.dot\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(ref s) if s == "repository"));
    }

    #[test]
    fn test_missing_key() {
        let text = VALID.replace("version = 4.18.2\n", "");
        let err = parse(&text).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingKey { ref section, ref key } if section == "package" && key == "version")
        );
    }

    #[test]
    fn test_empty_value() {
        let text = VALID.replace("name = express", "name =   ");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue { ref key, .. } if key == "name"));
    }

    #[test]
    fn test_test_mode_words() {
        for (word, expected) in [("TRUE", true), ("yes", true), ("1", true), ("No", false)] {
            let text = VALID.replace("test_mode = false", &format!("test_mode = {}", word));
            assert_eq!(parse(&text).unwrap().repository.test_mode, expected, "{}", word);
        }
    }

    #[test]
    fn test_invalid_test_mode() {
        let text = VALID.replace("test_mode = false", "test_mode = maybe");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { ref value, .. } if value == "maybe"));
    }

    #[test]
    fn test_analysis_section() {
        let text = format!("{}\n[analysis]\nmax_depth = 5\nfilter = test\nmax_cycles = 3\n", VALID);
        let settings = parse(&text).unwrap();
        assert_eq!(settings.analysis.max_depth, 5);
        assert_eq!(settings.analysis.filter.as_deref(), Some("test"));
        assert_eq!(settings.analysis.max_cycles, 3);
    }

    #[test]
    fn test_empty_filter_means_none() {
        let text = format!("{}\n[analysis]\nfilter =\n", VALID);
        assert!(parse(&text).unwrap().analysis.filter.is_none());
    }

    #[test]
    fn test_invalid_depth() {
        let text = format!("{}\n[analysis]\nmax_depth = -1\n", VALID);
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { ref key, .. } if key == "max_depth"));
    }

    #[test]
    fn test_with_graph_file_forces_test_mode() {
        let settings = parse(VALID)
            .unwrap()
            .with_graph_file(Path::new("graphs/graph1.txt"));
        assert!(settings.repository.test_mode);
        assert_eq!(settings.repository.url, "graphs/graph1.txt");
    }

    #[test]
    fn test_toml_document() {
        let doc = toml_document(
            r#"
[package]
name = "A"
version = "1.0"
output_file = "a.dot"

[repository]
url = "graph.txt"
test_mode = true

[analysis]
max_depth = 2
"#,
        )
        .unwrap();
        let settings = Settings::from_document(Path::new("c.toml"), &doc).unwrap();
        assert!(settings.repository.test_mode);
        assert_eq!(settings.analysis.max_depth, 2);
    }

    #[test]
    fn test_entries_cover_every_parameter() {
        let settings = parse(VALID).unwrap();
        let count: usize = settings.entries().iter().map(|(_, e)| e.len()).sum();
        assert_eq!(count, 8);
    }
}
