//! Ignore-rule documents.
//!
//! Two formats: the flat text form lists one identifier per line and
//! applies to every finding kind; the YAML form has typed sections whose
//! entries can additionally scope themselves to path globs and carry an
//! expiry timestamp.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::{FindingAttributes, FindingKind};

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    vulnerabilities: Vec<RawRule>,

    #[serde(default)]
    misconfigurations: Vec<RawRule>,

    #[serde(default)]
    secrets: Vec<RawRule>,

    #[serde(default)]
    licenses: Vec<RawRule>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRule {
    #[serde(default)]
    id: String,

    #[serde(default)]
    paths: Vec<String>,

    #[serde(default, rename = "expired-at")]
    expired_at: Option<DateTime<Utc>>,

    #[serde(default)]
    statement: Option<String>,
}

/// A single compiled suppression rule.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRule {
    pub id: String,

    pub statement: Option<String>,

    expired_at: Option<DateTime<Utc>>,

    paths: Option<GlobSet>,
}

impl IgnoreRule {
    fn compile(raw: RawRule) -> Result<Self> {
        let paths = if raw.paths.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &raw.paths {
                // literal_separator keeps `*` within one path segment and
                // leaves crossing directories to `**`.
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .with_context(|| format!("invalid path glob {pattern:?}"))?;
                builder.add(glob);
            }
            Some(builder.build()?)
        };
        Ok(Self {
            id: raw.id,
            statement: raw.statement,
            expired_at: raw.expired_at,
            paths,
        })
    }

    /// An empty rule id matches any identifier; an absent `paths` list
    /// matches any location. Expired rules never match.
    fn matches(&self, ids: &[&str], paths: &[&str], now: DateTime<Utc>) -> bool {
        if let Some(expired_at) = self.expired_at {
            if expired_at < now {
                return false;
            }
        }
        if !self.id.is_empty() && !ids.contains(&self.id.as_str()) {
            return false;
        }
        if let Some(globs) = &self.paths {
            if !paths
                .iter()
                .any(|path| !path.is_empty() && globs.is_match(path))
            {
                return false;
            }
        }
        true
    }
}

/// Every suppression rule loaded from one ignore file, grouped by the
/// finding kind it applies to.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    source: String,
    vulnerabilities: Vec<IgnoreRule>,
    misconfigurations: Vec<IgnoreRule>,
    secrets: Vec<IgnoreRule>,
    licenses: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// A rule set that matches nothing, for runs without an ignore file.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("unable to open the ignore file {path}"))?;
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::parse_yaml(path, &data),
            _ => Ok(Self::parse_flat(path, &data)),
        }
    }

    fn parse_flat(path: &str, data: &str) -> Self {
        let rules: Vec<IgnoreRule> = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|id| IgnoreRule {
                id: id.to_string(),
                ..IgnoreRule::default()
            })
            .collect();

        // Flat entries are untyped: the same identifiers apply to every
        // finding kind.
        Self {
            source: path.to_string(),
            vulnerabilities: rules.clone(),
            misconfigurations: rules.clone(),
            secrets: rules.clone(),
            licenses: rules,
        }
    }

    fn parse_yaml(path: &str, data: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(data)
            .with_context(|| format!("unable to parse the ignore file {path}"))?;
        let compile = |rules: Vec<RawRule>| -> Result<Vec<IgnoreRule>> {
            rules.into_iter().map(IgnoreRule::compile).collect()
        };
        Ok(Self {
            source: path.to_string(),
            vulnerabilities: compile(raw.vulnerabilities)?,
            misconfigurations: compile(raw.misconfigurations)?,
            secrets: compile(raw.secrets)?,
            licenses: compile(raw.licenses)?,
        })
    }

    /// The file the rules came from, recorded on every modified finding.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match one finding, of any kind, against the rules for its kind. The
    /// finding's identifier, alias and both location paths are eligible, so
    /// a vulnerability answers to the result target as well as its nested
    /// package path, and a misconfiguration to both its check id and AVD id.
    pub fn match_finding<F: FindingAttributes>(
        &self,
        finding: &F,
        target: &str,
        now: DateTime<Utc>,
    ) -> Option<&IgnoreRule> {
        let rules = match finding.kind() {
            FindingKind::Vulnerability => &self.vulnerabilities,
            FindingKind::Misconfiguration => &self.misconfigurations,
            FindingKind::Secret => &self.secrets,
            FindingKind::License => &self.licenses,
        };
        let ids = [finding.identifier(), finding.alias()];
        let paths = [finding.target_path(target), finding.nested_path()];
        rules.iter().find(|rule| rule.matches(&ids, &paths, now))
    }
}
