//! Vulnerability deduplication.
//!
//! Scanners can report the same CVE against the same installed package more
//! than once, differing only in the advisory's fixed version. One record
//! per (id, package, path, installed version) survives; a record carrying a
//! fix wins over one without, and among fixes the greatest version string
//! wins. The comparison is plain lexicographic, not semver-aware.

use std::collections::HashMap;

use crate::core::{Severity, Vulnerability};

// A typed tuple rather than a joined string: package names and paths can
// contain the would-be delimiter themselves.
type GroupKey = (String, String, String, String);

fn group_key(vuln: &Vulnerability) -> GroupKey {
    (
        vuln.vulnerability_id.clone(),
        vuln.pkg_name.clone(),
        vuln.pkg_path.clone(),
        vuln.installed_version.clone(),
    )
}

fn prefer(candidate: &Vulnerability, current: &Vulnerability) -> bool {
    if current.fixed_version.is_empty() {
        return !candidate.fixed_version.is_empty();
    }
    candidate.fixed_version > current.fixed_version
}

/// Collapse duplicate vulnerability records, preserving first-seen group
/// order. Idempotent: a deduplicated list passes through unchanged.
pub fn unique_vulnerabilities(vulns: Vec<Vulnerability>) -> Vec<Vulnerability> {
    let mut order = Vec::with_capacity(vulns.len());
    let mut uniq: HashMap<GroupKey, Vulnerability> = HashMap::with_capacity(vulns.len());

    for mut vuln in vulns {
        if vuln.severity.is_empty() {
            vuln.severity = Severity::Unknown.to_string();
        }
        let key = group_key(&vuln);
        match uniq.get(&key) {
            Some(current) => {
                if prefer(&vuln, current) {
                    uniq.insert(key, vuln);
                }
            }
            None => {
                order.push(key.clone());
                uniq.insert(key, vuln);
            }
        }
    }

    order.into_iter().filter_map(|key| uniq.remove(&key)).collect()
}
