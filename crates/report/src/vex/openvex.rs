//! OpenVEX backend.
//!
//! Statements carry a vulnerability identifier and the PURLs of the
//! products they speak about. Later statements override earlier ones for
//! the same (vulnerability, product) pair, so matching always takes the
//! last statement in document order.

use serde::Deserialize;

use crate::core::{FindingStatus, ModifiedFinding, ScanResult};

const SOURCE: &str = "OpenVEX";

#[derive(Debug, Deserialize)]
pub struct OpenVex {
    #[serde(rename = "@context")]
    context: String,

    #[serde(default)]
    statements: Vec<Statement>,
}

#[derive(Debug, Deserialize)]
struct Statement {
    #[serde(default)]
    vulnerability: Option<String>,

    #[serde(default)]
    products: Vec<String>,

    status: Status,

    #[serde(default)]
    justification: Option<String>,

    #[serde(default)]
    impact_statement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    NotAffected,
    Affected,
    Fixed,
    UnderInvestigation,
}

impl Statement {
    /// The text recorded on the modified finding. Justification is the
    /// normative field for `not_affected`; the impact statement is the
    /// free-form fallback.
    fn statement_text(&self) -> String {
        self.justification
            .clone()
            .or_else(|| self.impact_statement.clone())
            .unwrap_or_default()
    }
}

fn finding_status(status: Status) -> FindingStatus {
    match status {
        Status::NotAffected => FindingStatus::NotAffected,
        Status::Fixed => FindingStatus::Fixed,
        Status::UnderInvestigation => FindingStatus::UnderInvestigation,
        Status::Affected => FindingStatus::Affected,
    }
}

/// Probe `data` as an OpenVEX document. The `@context` URI is the format
/// marker; anything else is left for the next decoder.
pub fn decode(data: &str) -> Option<OpenVex> {
    let doc: OpenVex = serde_json::from_str(data).ok()?;
    if doc.context.contains("openvex") {
        Some(doc)
    } else {
        None
    }
}

impl OpenVex {
    fn matches<'a>(&'a self, vuln_id: &str, purl: &str) -> Vec<&'a Statement> {
        self.statements
            .iter()
            .filter(|stmt| {
                stmt.vulnerability.as_deref() == Some(vuln_id)
                    && stmt.products.iter().any(|product| product == purl)
            })
            .collect()
    }
}

impl super::VexDocument for OpenVex {
    fn filter(&self, result: &mut ScanResult) {
        let mut kept = Vec::with_capacity(result.vulnerabilities.len());
        for vuln in std::mem::take(&mut result.vulnerabilities) {
            let Some(purl) = vuln.pkg_identifier.purl.clone() else {
                kept.push(vuln);
                continue;
            };

            let stmts = self.matches(&vuln.vulnerability_id, &purl);
            // The last statement for a product wins: statements are ordered
            // and newer ones override older ones.
            let Some(stmt) = stmts.last() else {
                kept.push(vuln);
                continue;
            };

            match stmt.status {
                Status::NotAffected | Status::Fixed => {
                    result.modified_findings.push(ModifiedFinding::new(
                        vuln,
                        finding_status(stmt.status),
                        stmt.statement_text(),
                        SOURCE,
                    ));
                }
                _ => kept.push(vuln),
            }
        }
        result.vulnerabilities = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vulnerability;
    use crate::vex::VexDocument;

    const DOC: &str = r#"{
        "@context": "https://openvex.dev/ns",
        "@id": "https://openvex.dev/docs/example/vex-2e67563e128250cb",
        "author": "Wolfi J Inkinson",
        "role": "Document Creator",
        "version": "1",
        "statements": [
            {
                "vulnerability": "CVE-2021-44228",
                "products": ["pkg:maven/org.springframework.boot/spring-boot@2.6.0"],
                "status": "not_affected",
                "justification": "vulnerable_code_not_in_execute_path"
            }
        ]
    }"#;

    fn spring_boot(vuln_id: &str) -> Vulnerability {
        Vulnerability::new(vuln_id, "spring-boot", "2.6.0")
            .with_purl("pkg:maven/org.springframework.boot/spring-boot@2.6.0")
    }

    #[test]
    fn test_decode_requires_openvex_context() {
        assert!(decode(DOC).is_some());
        assert!(decode(r#"{"@context": "https://example.com", "statements": []}"#).is_none());
        assert!(decode("not json").is_none());
    }

    #[test]
    fn test_not_affected_is_dropped_and_recorded() {
        let doc = decode(DOC).unwrap();
        let mut result = ScanResult::default()
            .with_vulnerabilities(vec![spring_boot("CVE-2021-44228"), spring_boot("CVE-2021-0001")]);

        doc.filter(&mut result);

        assert_eq!(result.vulnerabilities.len(), 1);
        assert_eq!(result.vulnerabilities[0].vulnerability_id, "CVE-2021-0001");
        assert_eq!(result.modified_findings.len(), 1);
        let modified = &result.modified_findings[0];
        assert_eq!(modified.status, FindingStatus::NotAffected);
        assert_eq!(modified.statement, "vulnerable_code_not_in_execute_path");
        assert_eq!(modified.source, "OpenVEX");
    }

    #[test]
    fn test_missing_purl_is_kept() {
        let doc = decode(DOC).unwrap();
        let mut result = ScanResult::default().with_vulnerabilities(vec![Vulnerability::new(
            "CVE-2021-44228",
            "spring-boot",
            "2.6.0",
        )]);

        doc.filter(&mut result);

        assert_eq!(result.vulnerabilities.len(), 1);
        assert!(result.modified_findings.is_empty());
    }

    #[test]
    fn test_last_statement_wins() {
        let doc = decode(
            r#"{
                "@context": "https://openvex.dev/ns",
                "statements": [
                    {
                        "vulnerability": "CVE-2021-44228",
                        "products": ["pkg:maven/org.springframework.boot/spring-boot@2.6.0"],
                        "status": "not_affected",
                        "justification": "component_not_present"
                    },
                    {
                        "vulnerability": "CVE-2021-44228",
                        "products": ["pkg:maven/org.springframework.boot/spring-boot@2.6.0"],
                        "status": "affected"
                    }
                ]
            }"#,
        )
        .unwrap();

        let mut result =
            ScanResult::default().with_vulnerabilities(vec![spring_boot("CVE-2021-44228")]);
        doc.filter(&mut result);

        // The later "affected" statement overrides the earlier suppression.
        assert_eq!(result.vulnerabilities.len(), 1);
        assert!(result.modified_findings.is_empty());
    }
}
