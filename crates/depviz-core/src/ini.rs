//! Minimal INI reader for visualizer configuration files.
//!
//! Supports `[section]` headers, `key = value` / `key: value` pairs and
//! full-line `#` or `;` comments. Section and key names are case-insensitive.

use std::collections::BTreeMap;

/// A syntax error at a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct IniError {
    pub line: usize,
    pub message: String,
}

/// Key/value pairs of a single section.
pub type Section = BTreeMap<String, String>;

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: BTreeMap<String, Section>,
}

impl IniDocument {
    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut doc = Self::default();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    return Err(IniError {
                        line: line_no,
                        message: format!("unterminated section header '{}'", line),
                    });
                };
                let name = name.trim().to_lowercase();
                if name.is_empty() {
                    return Err(IniError {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                doc.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let Some(split_at) = line.find(['=', ':']) else {
                return Err(IniError {
                    line: line_no,
                    message: format!("expected 'key = value', found '{}'", line),
                });
            };
            let key = line[..split_at].trim().to_lowercase();
            let value = line[split_at + 1..].trim().to_string();
            if key.is_empty() {
                return Err(IniError {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            let Some(section) = current.as_ref() else {
                return Err(IniError {
                    line: line_no,
                    message: format!("key '{}' appears before any section header", key),
                });
            };
            doc.sections
                .entry(section.clone())
                .or_default()
                .insert(key, value);
        }

        Ok(doc)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(&name.to_lowercase())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(&name.to_lowercase())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    /// Section names in sorted order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub(crate) fn insert_section(&mut self, name: &str, section: Section) {
        self.sections.insert(name.to_lowercase(), section);
    }
}
