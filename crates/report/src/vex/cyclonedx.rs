//! CycloneDX VEX backend.
//!
//! The document is a CycloneDX BOM carrying a `vulnerabilities` array. Each
//! entry names affected components either by plain BOM-ref (VEX embedded in
//! the SBOM itself) or by BOM link (`urn:cdx:<uuid>/<version>#<ref>`) for an
//! external VEX. A BOM link must point at the report's own SBOM; links to
//! some other document are skipped with a warning, and a report that has no
//! SBOM identity at all is the same mismatch taken to its end: the document
//! loads, but no statement ever matches.

use serde::Deserialize;
use tracing::warn;

use crate::core::{BomMetadata, FindingStatus, ModifiedFinding, Report, ScanResult};

const SOURCE: &str = "CycloneDX VEX";

#[derive(Debug, Deserialize)]
struct CdxDocument {
    #[serde(default)]
    vulnerabilities: Vec<CdxVulnerability>,
}

#[derive(Debug, Deserialize)]
struct CdxVulnerability {
    id: String,

    #[serde(default)]
    analysis: Option<Analysis>,

    #[serde(default)]
    affects: Vec<Affect>,
}

#[derive(Debug, Default, Deserialize)]
struct Analysis {
    #[serde(default)]
    state: String,

    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Affect {
    #[serde(rename = "ref")]
    reference: String,
}

#[derive(Debug)]
pub struct CycloneDxVex {
    sbom: Option<BomMetadata>,
    statements: Vec<Statement>,
}

#[derive(Debug)]
struct Statement {
    vulnerability_id: String,
    affects: Vec<String>,
    status: Option<FindingStatus>,
    statement: String,
}

fn finding_status(state: &str) -> Option<FindingStatus> {
    match state {
        "not_affected" | "false_positive" => Some(FindingStatus::NotAffected),
        "resolved" | "resolved_with_pedigree" => Some(FindingStatus::Fixed),
        "exploitable" => Some(FindingStatus::Affected),
        "in_triage" => Some(FindingStatus::UnderInvestigation),
        _ => None,
    }
}

/// A parsed `urn:cdx` BOM link: the referenced document's serial number,
/// version, and the component fragment.
fn parse_bom_link(reference: &str) -> Option<(String, i32, &str)> {
    let rest = reference.strip_prefix("urn:cdx:")?;
    let (base, fragment) = rest.split_once('#')?;
    let (uuid, version) = base.split_once('/')?;
    let version = version.parse().ok()?;
    Some((format!("urn:uuid:{uuid}"), version, fragment))
}

/// Probe `data` as a CycloneDX VEX. CSAF advisories also carry a
/// `vulnerabilities` key, so this decoder must run after the CSAF probe.
pub fn decode(data: &str, report: &Report) -> Option<CycloneDxVex> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    value.get("vulnerabilities")?;
    let doc: CdxDocument = serde_json::from_value(value).ok()?;

    let sbom = report.cyclonedx.clone();
    if sbom.is_none() {
        warn!("the report carries no CycloneDX SBOM identity, VEX statements will not match");
    }

    let statements = doc
        .vulnerabilities
        .into_iter()
        .map(|vuln| {
            let analysis = vuln.analysis.unwrap_or_default();
            Statement {
                vulnerability_id: vuln.id,
                affects: vuln.affects.into_iter().map(|a| a.reference).collect(),
                status: finding_status(&analysis.state),
                statement: analysis.detail.unwrap_or_default(),
            }
        })
        .collect();

    Some(CycloneDxVex { sbom, statements })
}

impl CycloneDxVex {
    /// Whether a statement's affected refs name this vulnerability's
    /// component, either directly or through a BOM link into our SBOM.
    fn affects(&self, stmt: &Statement, purl: Option<&str>, bom_ref: Option<&str>) -> bool {
        let Some(sbom) = &self.sbom else {
            return false;
        };
        stmt.affects.iter().any(|reference| {
            let target = match parse_bom_link(reference) {
                Some((serial, version, fragment)) => {
                    if serial != sbom.serial_number || version != sbom.version {
                        warn!("BOM link {} does not point at this SBOM, skipping", reference);
                        return false;
                    }
                    fragment
                }
                None => reference.as_str(),
            };
            purl == Some(target) || bom_ref == Some(target)
        })
    }
}

impl super::VexDocument for CycloneDxVex {
    fn filter(&self, result: &mut ScanResult) {
        let mut kept = Vec::with_capacity(result.vulnerabilities.len());
        for vuln in std::mem::take(&mut result.vulnerabilities) {
            let stmt = self.statements.iter().find(|stmt| {
                stmt.vulnerability_id == vuln.vulnerability_id
                    && self.affects(
                        stmt,
                        vuln.pkg_identifier.purl.as_deref(),
                        vuln.pkg_identifier.bom_ref.as_deref(),
                    )
            });
            match stmt {
                Some(stmt)
                    if matches!(
                        stmt.status,
                        Some(FindingStatus::NotAffected) | Some(FindingStatus::Fixed)
                    ) =>
                {
                    // Status is present by the match guard above.
                    let status = stmt.status.unwrap_or(FindingStatus::Unknown);
                    result.modified_findings.push(ModifiedFinding::new(
                        vuln,
                        status,
                        stmt.statement.clone(),
                        SOURCE,
                    ));
                }
                _ => kept.push(vuln),
            }
        }
        result.vulnerabilities = kept;
    }
}
