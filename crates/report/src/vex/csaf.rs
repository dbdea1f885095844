//! CSAF VEX backend.
//!
//! A CSAF advisory names products in a recursive product tree and assigns
//! them to status groups per vulnerability. Products are resolved to PURLs
//! through their identification helper; a vulnerability is suppressed only
//! when its PURL lands in the `known_not_affected` or `fixed` group.

use serde::Deserialize;
use std::collections::HashMap;

use crate::core::{FindingStatus, ModifiedFinding, ScanResult};

const SOURCE: &str = "CSAF VEX";

#[derive(Debug, Deserialize)]
pub struct Csaf {
    document: DocumentMeta,

    #[serde(default)]
    product_tree: Option<ProductTree>,

    #[serde(default)]
    vulnerabilities: Vec<CsafVulnerability>,
}

#[derive(Debug, Deserialize)]
struct DocumentMeta {
    category: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProductTree {
    #[serde(default)]
    branches: Vec<Branch>,

    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    #[serde(default)]
    branches: Vec<Branch>,

    #[serde(default)]
    product: Option<FullProductName>,
}

#[derive(Debug, Deserialize)]
struct FullProductName {
    product_id: String,

    #[serde(default)]
    product_identification_helper: Option<IdentificationHelper>,
}

#[derive(Debug, Deserialize)]
struct IdentificationHelper {
    #[serde(default)]
    purl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    product_reference: String,

    #[serde(default)]
    full_product_name: Option<FullProductName>,
}

#[derive(Debug, Deserialize)]
struct CsafVulnerability {
    #[serde(default)]
    cve: Option<String>,

    #[serde(default)]
    product_status: Option<ProductStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductStatus {
    #[serde(default)]
    known_not_affected: Vec<String>,

    #[serde(default)]
    fixed: Vec<String>,

    #[serde(default)]
    known_affected: Vec<String>,
}

/// Probe `data` as a CSAF VEX. Only documents categorized `csaf_vex` are
/// accepted; other CSAF profiles carry no exploitability statements.
pub fn decode(data: &str) -> Option<Csaf> {
    let doc: Csaf = serde_json::from_str(data).ok()?;
    if doc.document.category == "csaf_vex" {
        Some(doc)
    } else {
        None
    }
}

impl Csaf {
    /// Map every product id in the tree to its PURL, following relationship
    /// entries back to the product they reference.
    fn product_purls(&self) -> HashMap<&str, &str> {
        let mut purls = HashMap::new();
        let Some(tree) = &self.product_tree else {
            return purls;
        };

        fn walk<'a>(branches: &'a [Branch], purls: &mut HashMap<&'a str, &'a str>) {
            for branch in branches {
                if let Some(product) = &branch.product {
                    if let Some(purl) = product
                        .product_identification_helper
                        .as_ref()
                        .and_then(|helper| helper.purl.as_deref())
                    {
                        purls.insert(product.product_id.as_str(), purl);
                    }
                }
                walk(&branch.branches, purls);
            }
        }
        walk(&tree.branches, &mut purls);

        for relationship in &tree.relationships {
            let Some(product) = &relationship.full_product_name else {
                continue;
            };
            if let Some(purl) = purls.get(relationship.product_reference.as_str()).copied() {
                purls.insert(product.product_id.as_str(), purl);
            }
        }
        purls
    }

    fn status_for(&self, vuln_id: &str, purl: &str) -> Option<FindingStatus> {
        let vuln = self
            .vulnerabilities
            .iter()
            .find(|item| item.cve.as_deref() == Some(vuln_id))?;
        let status = vuln.product_status.as_ref()?;
        let purls = self.product_purls();

        let in_group = |group: &[String]| {
            group
                .iter()
                .any(|id| purls.get(id.as_str()).copied() == Some(purl))
        };

        if in_group(&status.known_not_affected) {
            Some(FindingStatus::NotAffected)
        } else if in_group(&status.fixed) {
            Some(FindingStatus::Fixed)
        } else {
            None
        }
    }
}

impl super::VexDocument for Csaf {
    fn filter(&self, result: &mut ScanResult) {
        let mut kept = Vec::with_capacity(result.vulnerabilities.len());
        for vuln in std::mem::take(&mut result.vulnerabilities) {
            let Some(purl) = vuln.pkg_identifier.purl.clone() else {
                kept.push(vuln);
                continue;
            };
            match self.status_for(&vuln.vulnerability_id, &purl) {
                Some(status) => {
                    result
                        .modified_findings
                        .push(ModifiedFinding::new(vuln, status, "", SOURCE));
                }
                None => kept.push(vuln),
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

    fn doc(product_status: &str) -> String {
        format!(
            r#"{{
                "document": {{"category": "csaf_vex", "title": "Example VEX"}},
                "product_tree": {{
                    "branches": [
                        {{
                            "category": "vendor",
                            "name": "Spring",
                            "branches": [
                                {{
                                    "category": "product_name",
                                    "name": "Spring Boot",
                                    "product": {{
                                        "name": "Spring Boot",
                                        "product_id": "SPRING-BOOT-2.6.0",
                                        "product_identification_helper": {{
                                            "purl": "pkg:maven/org.springframework.boot/spring-boot@2.6.0"
                                        }}
                                    }}
                                }}
                            ]
                        }}
                    ]
                }},
                "vulnerabilities": [
                    {{
                        "cve": "CVE-2021-44228",
                        "product_status": {{"{product_status}": ["SPRING-BOOT-2.6.0"]}}
                    }}
                ]
            }}"#
        )
    }

    fn spring_boot() -> Vulnerability {
        Vulnerability::new("CVE-2021-44228", "spring-boot", "2.6.0")
            .with_purl("pkg:maven/org.springframework.boot/spring-boot@2.6.0")
    }

    #[test]
    fn test_decode_requires_csaf_vex_category() {
        assert!(decode(&doc("known_not_affected")).is_some());
        assert!(decode(r#"{"document": {"category": "csaf_base"}}"#).is_none());
    }

    #[test]
    fn test_known_not_affected_suppresses() {
        let doc = decode(&doc("known_not_affected")).unwrap();
        let mut result = ScanResult::default().with_vulnerabilities(vec![spring_boot()]);

        doc.filter(&mut result);

        assert!(result.vulnerabilities.is_empty());
        assert_eq!(result.modified_findings.len(), 1);
        assert_eq!(result.modified_findings[0].status, FindingStatus::NotAffected);
        assert_eq!(result.modified_findings[0].source, "CSAF VEX");
    }

    #[test]
    fn test_fixed_suppresses() {
        let doc = decode(&doc("fixed")).unwrap();
        let mut result = ScanResult::default().with_vulnerabilities(vec![spring_boot()]);

        doc.filter(&mut result);

        assert!(result.vulnerabilities.is_empty());
        assert_eq!(result.modified_findings[0].status, FindingStatus::Fixed);
    }

    #[test]
    fn test_known_affected_keeps() {
        let doc = decode(&doc("known_affected")).unwrap();
        let mut result = ScanResult::default().with_vulnerabilities(vec![spring_boot()]);

        doc.filter(&mut result);

        assert_eq!(result.vulnerabilities.len(), 1);
        assert!(result.modified_findings.is_empty());
    }

    #[test]
    fn test_relationship_products_resolve() {
        let raw = r#"{
            "document": {"category": "csaf_vex"},
            "product_tree": {
                "branches": [
                    {
                        "product": {
                            "name": "lib",
                            "product_id": "LIB-1.0",
                            "product_identification_helper": {
                                "purl": "pkg:maven/org.example/lib@1.0"
                            }
                        }
                    }
                ],
                "relationships": [
                    {
                        "category": "default_component_of",
                        "product_reference": "LIB-1.0",
                        "relates_to_product_reference": "APP-2.0",
                        "full_product_name": {
                            "name": "lib as part of app",
                            "product_id": "LIB-1.0:APP-2.0"
                        }
                    }
                ]
            },
            "vulnerabilities": [
                {
                    "cve": "CVE-2024-0001",
                    "product_status": {"known_not_affected": ["LIB-1.0:APP-2.0"]}
                }
            ]
        }"#;
        let doc = decode(raw).unwrap();
        let mut result = ScanResult::default().with_vulnerabilities(vec![Vulnerability::new(
            "CVE-2024-0001",
            "lib",
            "1.0",
        )
        .with_purl("pkg:maven/org.example/lib@1.0")]);

        doc.filter(&mut result);

        assert!(result.vulnerabilities.is_empty());
        assert_eq!(result.modified_findings.len(), 1);
    }
}
