//! npm-style package registry.
//!
//! `GET {base}/{name}` returns a packument listing every published version and
//! its dependencies. Uses blocking HTTP via `ureq`; the CLI has no async runtime.
//! A base that is not an `http(s)://` URL is treated as a directory of
//! `<name>.json` packuments, which is how mirrors and fixtures are served offline.

use crate::{PackageSource, Requirement, ResolvedPackage, SourceError};
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Request timeout for a single packument fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Popular packages publish thousands of versions; packuments get large.
const MAX_PACKUMENT_BYTES: u64 = 64 * 1024 * 1024;

/// Registry metadata for one package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,
}

/// Metadata of a single published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

enum Transport {
    Http(ureq::Agent),
    Directory(PathBuf),
}

/// A registry client with a per-run packument cache.
pub struct Registry {
    base: String,
    transport: Transport,
    cache: RefCell<HashMap<String, Rc<Packument>>>,
}

impl Registry {
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        let transport = if base.starts_with("http://") || base.starts_with("https://") {
            Transport::Http(ureq::Agent::new_with_config(
                ureq::config::Config::builder()
                    .timeout_global(Some(FETCH_TIMEOUT))
                    .build(),
            ))
        } else {
            Transport::Directory(PathBuf::from(base.trim_start_matches("file://")))
        };
        Self {
            base,
            transport,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Number of packuments fetched so far.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    fn packument(&self, name: &str) -> Result<Rc<Packument>, SourceError> {
        if let Some(hit) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }
        let mut packument = match &self.transport {
            Transport::Http(agent) => self.fetch_http(agent, name)?,
            Transport::Directory(dir) => fetch_file(dir, name)?,
        };
        if packument.name.is_empty() {
            packument.name = name.to_string();
        }
        let packument = Rc::new(packument);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&packument));
        Ok(packument)
    }

    fn fetch_http(&self, agent: &ureq::Agent, name: &str) -> Result<Packument, SourceError> {
        let url = format!("{}/{}", self.base, encode_name(name));
        tracing::debug!(%url, "fetching packument");

        let mut response = agent
            .get(url.as_str())
            .header("accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(404) => SourceError::NotFound {
                    name: name.to_string(),
                    suggestion: None,
                },
                other => SourceError::Http(other.to_string()),
            })?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_PACKUMENT_BYTES)
            .read_json::<Packument>()
            .map_err(|e| SourceError::Parse(format!("{}: {}", name, e)))
    }
}

fn fetch_file(dir: &std::path::Path, name: &str) -> Result<Packument, SourceError> {
    let path = dir.join(format!("{}.json", name.replace('/', "__")));
    if !path.exists() {
        return Err(SourceError::NotFound {
            name: name.to_string(),
            suggestion: None,
        });
    }
    let text = std::fs::read_to_string(&path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_packument(&text)
}

/// Scoped names keep their `@` but escape the slash.
fn encode_name(name: &str) -> String {
    name.replace('/', "%2F")
}

/// Parse a packument from JSON text.
pub fn parse_packument(json: &str) -> Result<Packument, SourceError> {
    serde_json::from_str(json).map_err(|e| SourceError::Parse(e.to_string()))
}

/// Translate an npm range into semver requirements (any one may match).
///
/// Handles `||` alternatives, space-separated comparators, hyphen ranges,
/// `x`/`*` wildcards and bare versions (exact in npm). Returns `None` for
/// anything semver cannot express, such as git or tarball specifiers.
pub fn npm_range_to_reqs(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alt| {
            let alt = alt.trim();
            if alt.is_empty() || alt == "*" || alt.eq_ignore_ascii_case("x") {
                return Some(VersionReq::STAR);
            }
            let translated = if let Some((low, high)) = alt.split_once(" - ") {
                format!(">={}, <={}", low.trim(), high.trim())
            } else {
                comparators(alt).join(", ")
            };
            VersionReq::parse(&translated).ok()
        })
        .collect()
}

fn comparators(alt: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending_op = String::new();
    for token in alt.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{}{}", std::mem::take(&mut pending_op), token);
        let op_len = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(op_len);
        let version = version.trim_start_matches(['v', 'V']);
        let wildcard = version.contains(['x', 'X', '*']);
        let op = if op.is_empty() && !wildcard { "=" } else { op };
        out.push(format!("{}{}", op, version));
    }
    out
}

/// Pick the version of a packument that satisfies `requirement`.
///
/// `None`, `*` and `latest` select the `latest` dist-tag. Exact versions and
/// other dist-tags are looked up directly; ranges select the highest matching
/// version. An untranslatable range falls back to `latest`.
pub fn select_version(packument: &Packument, requirement: Option<&str>) -> Result<String, SourceError> {
    let name = packument.name.clone();
    let requirement = requirement.map(str::trim).filter(|r| !r.is_empty());

    let latest = || -> Result<String, SourceError> {
        if let Some(tag) = packument.dist_tags.get("latest")
            && packument.versions.contains_key(tag)
        {
            return Ok(tag.clone());
        }
        highest_matching(packument, &[VersionReq::STAR]).ok_or_else(|| {
            SourceError::NoMatchingVersion {
                name: name.clone(),
                requirement: "latest".to_string(),
            }
        })
    };

    let Some(req) = requirement else {
        return latest();
    };
    if req == "*" || req == "latest" {
        return latest();
    }
    if packument.versions.contains_key(req) {
        return Ok(req.to_string());
    }
    if let Some(tagged) = packument.dist_tags.get(req) {
        return Ok(tagged.clone());
    }

    match npm_range_to_reqs(req) {
        Some(reqs) => highest_matching(packument, &reqs).ok_or_else(|| {
            SourceError::NoMatchingVersion {
                name: name.clone(),
                requirement: req.to_string(),
            }
        }),
        None => {
            tracing::warn!(package = %name, requirement = req, "unsupported range, using latest");
            latest()
        }
    }
}

fn highest_matching(packument: &Packument, reqs: &[VersionReq]) -> Option<String> {
    packument
        .versions
        .keys()
        .filter_map(|raw| Version::parse(raw).ok().map(|v| (v, raw)))
        .filter(|(v, _)| reqs.iter().any(|r| r.matches(v)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw.clone())
}

impl PackageSource for Registry {
    fn describe(&self) -> String {
        format!("registry {}", self.base)
    }

    fn resolve(
        &self,
        name: &str,
        requirement: Option<&str>,
    ) -> Result<ResolvedPackage, SourceError> {
        let packument = self.packument(name)?;
        let version = select_version(&packument, requirement)?;
        let dependencies = packument
            .versions
            .get(&version)
            .map(|manifest| {
                manifest
                    .dependencies
                    .iter()
                    .map(|(dep, req)| Requirement::new(dep.clone(), Some(req.clone())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResolvedPackage {
            name: name.to_string(),
            version: Some(version),
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packument() -> Packument {
        parse_packument(
            r#"{
                "name": "demo",
                "dist-tags": {"latest": "1.4.0", "next": "2.0.0-beta.1"},
                "versions": {
                    "0.9.0": {},
                    "1.0.0": {"dependencies": {"a": "^1.0.0"}},
                    "1.2.3": {},
                    "1.4.0": {"dependencies": {"b": "~2.1"}},
                    "2.0.0-beta.1": {}
                }
            }"#,
        )
        .unwrap()
    }

    fn select(req: Option<&str>) -> String {
        select_version(&packument(), req).unwrap()
    }

    #[test]
    fn test_latest_by_default() {
        assert_eq!(select(None), "1.4.0");
        assert_eq!(select(Some("latest")), "1.4.0");
        assert_eq!(select(Some("*")), "1.4.0");
    }

    #[test]
    fn test_exact_and_tag() {
        assert_eq!(select(Some("1.2.3")), "1.2.3");
        assert_eq!(select(Some("next")), "2.0.0-beta.1");
    }

    #[test]
    fn test_caret_and_tilde_ranges() {
        assert_eq!(select(Some("^1.0.0")), "1.4.0");
        assert_eq!(select(Some("~1.2.0")), "1.2.3");
    }

    #[test]
    fn test_or_and_comparator_ranges() {
        assert_eq!(select(Some("<1.0.0 || =1.2.3")), "1.2.3");
        assert_eq!(select(Some(">= 1.0.0 < 1.3.0")), "1.2.3");
        assert_eq!(select(Some("1.0.0 - 1.3.0")), "1.2.3");
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(select(Some("1.x")), "1.4.0");
        assert_eq!(select(Some("0.x")), "0.9.0");
    }

    #[test]
    fn test_prerelease_not_selected_by_range() {
        assert_eq!(select(Some(">=1.0.0")), "1.4.0");
    }

    #[test]
    fn test_no_matching_version() {
        let err = select_version(&packument(), Some("^3.0.0")).unwrap_err();
        assert!(matches!(err, SourceError::NoMatchingVersion { .. }));
    }

    #[test]
    fn test_unsupported_range_falls_back_to_latest() {
        assert_eq!(select(Some("github:user/repo")), "1.4.0");
    }

    #[test]
    fn test_bare_version_is_exact() {
        let reqs = npm_range_to_reqs("1.0.0").unwrap();
        assert!(reqs[0].matches(&Version::parse("1.0.0").unwrap()));
        assert!(!reqs[0].matches(&Version::parse("1.4.0").unwrap()));
    }

    #[test]
    fn test_cache_hit_shares_packument() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("demo.json"),
            r#"{"dist-tags": {"latest": "1.0.0"}, "versions": {"1.0.0": {}}}"#,
        )
        .unwrap();
        let registry = Registry::new(tmp.path().to_str().unwrap());

        let first = registry.packument("demo").unwrap();
        let second = registry.packument("demo").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.name, "demo");
        assert_eq!(registry.cached(), 1);
    }

    #[test]
    fn test_encode_scoped_name() {
        assert_eq!(encode_name("@types/node"), "@types%2Fnode");
    }
}
