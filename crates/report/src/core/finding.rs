//! Finding variants produced by the scanners and the records kept for
//! findings the filter pipeline suppresses.
//!
//! Four finding shapes share one suppression contract. Generic filters
//! (ignore rules, policy) go through the `Finding` accessors; kind-specific
//! filters (VEX, dedup) work on the concrete variants directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identifiers attached to a package: a PURL and, when the scan
/// originated from an SBOM, the component's BOM-ref.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PkgIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
}

impl PkgIdentifier {
    pub fn is_empty(&self) -> bool {
        self.purl.is_none() && self.bom_ref.is_none()
    }
}

/// Distro-assigned handling status of a vulnerability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnStatus {
    #[default]
    Unknown,
    NotAffected,
    Affected,
    Fixed,
    UnderInvestigation,
    WillNotFix,
    FixDeferred,
    EndOfLife,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub vulnerability_id: String,

    pub pkg_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pkg_path: String,

    pub installed_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fixed_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,

    #[serde(default, skip_serializing_if = "PkgIdentifier::is_empty")]
    pub pkg_identifier: PkgIdentifier,

    #[serde(default)]
    pub status: VulnStatus,
}

impl Vulnerability {
    pub fn new(
        vulnerability_id: impl Into<String>,
        pkg_name: impl Into<String>,
        installed_version: impl Into<String>,
    ) -> Self {
        Self {
            vulnerability_id: vulnerability_id.into(),
            pkg_name: pkg_name.into(),
            installed_version: installed_version.into(),
            ..Self::default()
        }
    }

    pub fn with_fixed_version(mut self, version: impl Into<String>) -> Self {
        self.fixed_version = version.into();
        self
    }

    pub fn with_pkg_path(mut self, path: impl Into<String>) -> Self {
        self.pkg_path = path.into();
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.pkg_identifier.purl = Some(purl.into());
        self
    }

    pub fn with_bom_ref(mut self, bom_ref: impl Into<String>) -> Self {
        self.pkg_identifier.bom_ref = Some(bom_ref.into());
        self
    }

    pub fn with_status(mut self, status: VulnStatus) -> Self {
        self.status = status;
        self
    }
}

/// Outcome of a single configuration check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MisconfStatus {
    Passed,
    #[default]
    Failure,
    Exception,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Misconfiguration {
    pub check_type: String,

    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub avd_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,

    #[serde(default)]
    pub status: MisconfStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub rule_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,

    pub title: String,

    pub start_line: usize,

    pub end_line: usize,

    #[serde(rename = "match")]
    pub matched: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,

    pub file_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,

    #[serde(default)]
    pub confidence: f64,
}

/// The closed set of finding kinds the pipeline operates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Vulnerability,
    Misconfiguration,
    Secret,
    License,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vulnerability => write!(f, "vulnerability"),
            Self::Misconfiguration => write!(f, "misconfiguration"),
            Self::Secret => write!(f, "secret"),
            Self::License => write!(f, "license"),
        }
    }
}

/// Capability surface shared by every finding variant. The generic filters
/// (severity gate, ignore rules) work against this interface instead of the
/// concrete structs.
pub trait FindingAttributes {
    fn kind(&self) -> FindingKind;

    /// The raw severity label; may be empty until normalized.
    fn severity(&self) -> &str;

    /// The identifier an ignore rule is matched against.
    fn identifier(&self) -> &str;

    /// A secondary identifier some kinds also answer to.
    fn alias(&self) -> &str {
        ""
    }

    /// The location path rules are matched against, given the enclosing
    /// result target.
    fn target_path<'a>(&'a self, target: &'a str) -> &'a str {
        target
    }

    /// An additional location eligible for path rules.
    fn nested_path(&self) -> &str {
        ""
    }
}

impl FindingAttributes for Vulnerability {
    fn kind(&self) -> FindingKind {
        FindingKind::Vulnerability
    }

    fn severity(&self) -> &str {
        &self.severity
    }

    fn identifier(&self) -> &str {
        &self.vulnerability_id
    }

    fn nested_path(&self) -> &str {
        &self.pkg_path
    }
}

impl FindingAttributes for Misconfiguration {
    fn kind(&self) -> FindingKind {
        FindingKind::Misconfiguration
    }

    fn severity(&self) -> &str {
        &self.severity
    }

    fn identifier(&self) -> &str {
        if self.avd_id.is_empty() {
            &self.id
        } else {
            &self.avd_id
        }
    }

    fn alias(&self) -> &str {
        &self.id
    }
}

impl FindingAttributes for Secret {
    fn kind(&self) -> FindingKind {
        FindingKind::Secret
    }

    fn severity(&self) -> &str {
        &self.severity
    }

    fn identifier(&self) -> &str {
        &self.rule_id
    }
}

impl FindingAttributes for License {
    fn kind(&self) -> FindingKind {
        FindingKind::License
    }

    fn severity(&self) -> &str {
        &self.severity
    }

    fn identifier(&self) -> &str {
        &self.name
    }

    fn target_path<'a>(&'a self, _target: &'a str) -> &'a str {
        &self.file_path
    }
}

/// Sum type over the four finding variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Vulnerability(Vulnerability),
    Misconfiguration(Misconfiguration),
    Secret(Secret),
    License(License),
}

impl Finding {
    fn inner(&self) -> &dyn FindingAttributes {
        match self {
            Self::Vulnerability(v) => v,
            Self::Misconfiguration(m) => m,
            Self::Secret(s) => s,
            Self::License(l) => l,
        }
    }
}

impl FindingAttributes for Finding {
    fn kind(&self) -> FindingKind {
        self.inner().kind()
    }

    fn severity(&self) -> &str {
        self.inner().severity()
    }

    fn identifier(&self) -> &str {
        self.inner().identifier()
    }

    fn alias(&self) -> &str {
        self.inner().alias()
    }

    fn target_path<'a>(&'a self, target: &'a str) -> &'a str {
        self.inner().target_path(target)
    }

    fn nested_path(&self) -> &str {
        self.inner().nested_path()
    }
}

impl From<Vulnerability> for Finding {
    fn from(v: Vulnerability) -> Self {
        Self::Vulnerability(v)
    }
}

impl From<Misconfiguration> for Finding {
    fn from(m: Misconfiguration) -> Self {
        Self::Misconfiguration(m)
    }
}

impl From<Secret> for Finding {
    fn from(s: Secret) -> Self {
        Self::Secret(s)
    }
}

impl From<License> for Finding {
    fn from(l: License) -> Self {
        Self::License(l)
    }
}

/// Status recorded for a suppressed or altered finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Ignored,
    Unknown,
    NotAffected,
    Affected,
    Fixed,
    UnderInvestigation,
}

/// A finding removed or altered by the filter pipeline, together with the
/// reason and the document that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedFinding {
    pub kind: FindingKind,

    pub status: FindingStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub statement: String,

    pub source: String,

    pub finding: Finding,
}

impl ModifiedFinding {
    pub fn new(
        finding: impl Into<Finding>,
        status: FindingStatus,
        statement: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let finding = finding.into();
        Self {
            kind: finding.kind(),
            status,
            statement: statement.into(),
            source: source.into(),
            finding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_finding_carries_kind() {
        let vuln = Vulnerability::new("CVE-2024-0001", "foo", "1.0.0");
        let modified = ModifiedFinding::new(vuln, FindingStatus::Ignored, "", "ignore.yaml");
        assert_eq!(modified.kind, FindingKind::Vulnerability);
        assert_eq!(modified.source, "ignore.yaml");
    }

    #[test]
    fn test_misconfiguration_identifier_prefers_avd_id() {
        let mut misconf = Misconfiguration {
            check_type: "Kubernetes Security Check".to_string(),
            id: "ID100".to_string(),
            avd_id: "AVD-ID100".to_string(),
            title: "Bad Deployment".to_string(),
            message: String::new(),
            severity: "HIGH".to_string(),
            status: MisconfStatus::Failure,
        };
        assert_eq!(misconf.identifier(), "AVD-ID100");
        assert_eq!(misconf.alias(), "ID100");

        misconf.avd_id.clear();
        assert_eq!(misconf.identifier(), "ID100");
    }

    #[test]
    fn test_license_path_overrides_target() {
        let license = License {
            name: "GPL-3.0".to_string(),
            severity: "LOW".to_string(),
            file_path: "usr/share/doc/COPYING".to_string(),
            category: "restricted".to_string(),
            confidence: 1.0,
        };
        assert_eq!(license.target_path("rootfs"), "usr/share/doc/COPYING");

        let secret = Secret {
            rule_id: "aws-key".to_string(),
            severity: String::new(),
            title: "AWS key".to_string(),
            start_line: 1,
            end_line: 1,
            matched: "*****".to_string(),
        };
        assert_eq!(secret.target_path("config.yaml"), "config.yaml");
    }
}
