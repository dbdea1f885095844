//! The scan report: one result per scanned target, each carrying the four
//! finding lists plus the records of everything the filters removed.

use serde::{Deserialize, Serialize};

use crate::core::finding::{License, Misconfiguration, ModifiedFinding, Secret, Vulnerability};

/// Identity of the CycloneDX SBOM a report was produced from. Used to check
/// that an external CycloneDX VEX actually refers to this report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomMetadata {
    pub serial_number: String,

    pub version: i32,
}

/// Kind of target a result was produced for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultClass {
    #[serde(rename = "lang-pkgs")]
    LangPkg,
    #[serde(rename = "os-pkgs")]
    OsPkg,
    #[serde(rename = "config")]
    Config,
    #[serde(rename = "secret")]
    Secret,
    #[serde(rename = "license")]
    License,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Counters describing the configuration checks of one result: checks that
/// passed, checks that failed, and checks suppressed by an exception.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisconfSummary {
    pub successes: u32,

    pub failures: u32,

    pub exceptions: u32,
}

impl MisconfSummary {
    pub fn is_empty(&self) -> bool {
        self.successes == 0 && self.failures == 0 && self.exceptions == 0
    }
}

/// Findings scoped to a single scanned target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,

    #[serde(default)]
    pub class: ResultClass,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misconf_summary: Option<MisconfSummary>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub misconfigurations: Vec<Misconfiguration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified_findings: Vec<ModifiedFinding>,
}

impl ScanResult {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: ResultClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_vulnerabilities(mut self, vulnerabilities: Vec<Vulnerability>) -> Self {
        self.vulnerabilities = vulnerabilities;
        self
    }

    pub fn with_misconfigurations(mut self, misconfigurations: Vec<Misconfiguration>) -> Self {
        self.misconfigurations = misconfigurations;
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<Secret>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_licenses(mut self, licenses: Vec<License>) -> Self {
        self.licenses = licenses;
        self
    }
}

/// A full scan report. Filtering mutates it in place, one result at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclonedx: Option<BomMetadata>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ScanResult>,
}

impl Report {
    pub fn new(results: Vec<ScanResult>) -> Self {
        Self {
            cyclonedx: None,
            results,
        }
    }

    pub fn with_cyclonedx(mut self, bom: BomMetadata) -> Self {
        self.cyclonedx = Some(bom);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_emptiness() {
        assert!(MisconfSummary::default().is_empty());
        let summary = MisconfSummary {
            successes: 0,
            failures: 1,
            exceptions: 0,
        };
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_result_class_serde_names() {
        let json = serde_json::to_string(&ResultClass::LangPkg).unwrap();
        assert_eq!(json, r#""lang-pkgs""#);
        let class: ResultClass = serde_json::from_str(r#""os-pkgs""#).unwrap();
        assert_eq!(class, ResultClass::OsPkg);
    }
}
