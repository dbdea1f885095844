//! The suppression pipeline.
//!
//! Phases run in a fixed order per result: VEX, severity gate, ignore
//! rules, vulnerability status, policy, dedup, ordering, misconfiguration
//! summary. Every phase that removes a finding appends a record to the
//! result's modified findings, except the status filter which drops
//! silently. Suppression documents are loaded up front so a load failure
//! aborts before the report is touched.

pub mod dedup;
pub mod ignore;
pub mod policy;

use anyhow::{bail, Result};

use crate::context::FilterContext;
use crate::core::{
    FindingAttributes, FindingStatus, MisconfStatus, MisconfSummary, ModifiedFinding, Report,
    ScanResult, Severity, VulnStatus,
};
use crate::vex;

pub use ignore::{IgnoreRule, IgnoreRules};
pub use policy::PolicyFilter;

/// Caller-selected suppression inputs. Empty paths disable the respective
/// source; `severities` is the allow-list every finding must pass.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub severities: Vec<Severity>,

    pub ignore_statuses: Vec<VulnStatus>,

    pub ignore_file: String,

    pub policy_file: String,

    pub vex_path: String,

    pub include_non_failures: bool,
}

/// Apply every configured suppression source to `report`, in place.
pub fn filter(ctx: &FilterContext, report: &mut Report, opt: FilterOptions) -> Result<()> {
    let ignore_rules = if opt.ignore_file.is_empty() {
        IgnoreRules::empty()
    } else {
        IgnoreRules::load(&opt.ignore_file)?
    };
    let mut policy = if opt.policy_file.is_empty() {
        None
    } else {
        Some(PolicyFilter::load(&opt.policy_file)?)
    };

    if !opt.vex_path.is_empty() {
        let vex_doc = vex::load(&opt.vex_path, report)?;
        for result in &mut report.results {
            vex_doc.filter(result);
        }
    }

    for result in &mut report.results {
        filter_result(ctx, result, &ignore_rules, &mut policy, &opt)?;
    }
    Ok(())
}

fn filter_result(
    ctx: &FilterContext,
    result: &mut ScanResult,
    ignore_rules: &IgnoreRules,
    policy: &mut Option<PolicyFilter>,
    opt: &FilterOptions,
) -> Result<()> {
    filter_vulnerabilities(ctx, result, ignore_rules, policy, opt)?;
    filter_misconfigurations(ctx, result, ignore_rules, policy, opt)?;
    filter_secrets(ctx, result, ignore_rules, policy, opt)?;
    filter_licenses(ctx, result, ignore_rules, policy, opt)?;
    sort_findings(result);
    Ok(())
}

fn filter_vulnerabilities(
    ctx: &FilterContext,
    result: &mut ScanResult,
    ignore_rules: &IgnoreRules,
    policy: &mut Option<PolicyFilter>,
    opt: &FilterOptions,
) -> Result<()> {
    let mut kept = Vec::with_capacity(result.vulnerabilities.len());
    for mut vuln in std::mem::take(&mut result.vulnerabilities) {
        vuln.severity = Severity::normalize(&vuln.severity);
        if !passes_gate(&vuln, &opt.severities) {
            continue;
        }

        if let Some(rule) = ignore_rules.match_finding(&vuln, &result.target, ctx.now()) {
            let statement = rule.statement.clone().unwrap_or_default();
            result.modified_findings.push(ModifiedFinding::new(
                vuln,
                FindingStatus::Ignored,
                statement,
                ignore_rules.source(),
            ));
            continue;
        }

        // Coarse suppression of e.g. will_not_fix: dropped without a
        // modified-finding record, keeping parity with legacy reports.
        if opt.ignore_statuses.contains(&vuln.status) {
            continue;
        }

        if let Some(policy) = policy.as_mut() {
            ensure_active(ctx)?;
            if policy.ignored(&vuln)? {
                result.modified_findings.push(ModifiedFinding::new(
                    vuln,
                    FindingStatus::Ignored,
                    policy::POLICY_STATEMENT,
                    policy.source(),
                ));
                continue;
            }
        }

        kept.push(vuln);
    }
    result.vulnerabilities = dedup::unique_vulnerabilities(kept);
    Ok(())
}

fn filter_misconfigurations(
    ctx: &FilterContext,
    result: &mut ScanResult,
    ignore_rules: &IgnoreRules,
    policy: &mut Option<PolicyFilter>,
    opt: &FilterOptions,
) -> Result<()> {
    let mut summary = MisconfSummary::default();
    let mut kept = Vec::with_capacity(result.misconfigurations.len());
    for mut misconf in std::mem::take(&mut result.misconfigurations) {
        misconf.severity = Severity::normalize(&misconf.severity);
        if !passes_gate(&misconf, &opt.severities) {
            continue;
        }

        if let Some(rule) = ignore_rules.match_finding(&misconf, &result.target, ctx.now()) {
            summary.exceptions += 1;
            let statement = rule.statement.clone().unwrap_or_default();
            result.modified_findings.push(ModifiedFinding::new(
                misconf,
                FindingStatus::Ignored,
                statement,
                ignore_rules.source(),
            ));
            continue;
        }

        if let Some(policy) = policy.as_mut() {
            ensure_active(ctx)?;
            if policy.ignored(&misconf)? {
                summary.exceptions += 1;
                result.modified_findings.push(ModifiedFinding::new(
                    misconf,
                    FindingStatus::Ignored,
                    policy::POLICY_STATEMENT,
                    policy.source(),
                ));
                continue;
            }
        }

        match misconf.status {
            MisconfStatus::Passed => {
                summary.successes += 1;
                if opt.include_non_failures {
                    kept.push(misconf);
                }
            }
            MisconfStatus::Exception => {
                summary.exceptions += 1;
                if opt.include_non_failures {
                    kept.push(misconf);
                }
            }
            MisconfStatus::Failure => {
                summary.failures += 1;
                kept.push(misconf);
            }
        }
    }
    result.misconf_summary = (!summary.is_empty()).then_some(summary);
    result.misconfigurations = kept;
    Ok(())
}

fn filter_secrets(
    ctx: &FilterContext,
    result: &mut ScanResult,
    ignore_rules: &IgnoreRules,
    policy: &mut Option<PolicyFilter>,
    opt: &FilterOptions,
) -> Result<()> {
    let mut kept = Vec::with_capacity(result.secrets.len());
    for mut secret in std::mem::take(&mut result.secrets) {
        secret.severity = Severity::normalize(&secret.severity);
        if !passes_gate(&secret, &opt.severities) {
            continue;
        }

        if let Some(rule) = ignore_rules.match_finding(&secret, &result.target, ctx.now()) {
            let statement = rule.statement.clone().unwrap_or_default();
            result.modified_findings.push(ModifiedFinding::new(
                secret,
                FindingStatus::Ignored,
                statement,
                ignore_rules.source(),
            ));
            continue;
        }

        if let Some(policy) = policy.as_mut() {
            ensure_active(ctx)?;
            if policy.ignored(&secret)? {
                result.modified_findings.push(ModifiedFinding::new(
                    secret,
                    FindingStatus::Ignored,
                    policy::POLICY_STATEMENT,
                    policy.source(),
                ));
                continue;
            }
        }

        kept.push(secret);
    }
    result.secrets = kept;
    Ok(())
}

fn filter_licenses(
    ctx: &FilterContext,
    result: &mut ScanResult,
    ignore_rules: &IgnoreRules,
    policy: &mut Option<PolicyFilter>,
    opt: &FilterOptions,
) -> Result<()> {
    let mut kept = Vec::with_capacity(result.licenses.len());
    for mut license in std::mem::take(&mut result.licenses) {
        license.severity = Severity::normalize(&license.severity);
        if !passes_gate(&license, &opt.severities) {
            continue;
        }

        if let Some(rule) = ignore_rules.match_finding(&license, &result.target, ctx.now()) {
            let statement = rule.statement.clone().unwrap_or_default();
            result.modified_findings.push(ModifiedFinding::new(
                license,
                FindingStatus::Ignored,
                statement,
                ignore_rules.source(),
            ));
            continue;
        }

        if let Some(policy) = policy.as_mut() {
            ensure_active(ctx)?;
            if policy.ignored(&license)? {
                result.modified_findings.push(ModifiedFinding::new(
                    license,
                    FindingStatus::Ignored,
                    policy::POLICY_STATEMENT,
                    policy.source(),
                ));
                continue;
            }
        }

        kept.push(license);
    }
    result.licenses = kept;
    Ok(())
}

/// The severity gate shared by every finding kind. Labels are expected to
/// be normalized before this check.
fn passes_gate<F: FindingAttributes>(finding: &F, severities: &[Severity]) -> bool {
    severities.contains(&Severity::from_label(finding.severity()))
}

fn ensure_active(ctx: &FilterContext) -> Result<()> {
    if ctx.is_cancelled() {
        bail!("filtering cancelled");
    }
    Ok(())
}

fn sort_findings(result: &mut ScanResult) {
    result.vulnerabilities.sort_by(|a, b| {
        a.pkg_name
            .cmp(&b.pkg_name)
            .then_with(|| Severity::from_label(&b.severity).cmp(&Severity::from_label(&a.severity)))
            .then_with(|| a.vulnerability_id.cmp(&b.vulnerability_id))
            .then_with(|| a.pkg_path.cmp(&b.pkg_path))
            .then_with(|| a.installed_version.cmp(&b.installed_version))
    });
    result.misconfigurations.sort_by(|a, b| {
        Severity::from_label(&b.severity)
            .cmp(&Severity::from_label(&a.severity))
            .then_with(|| a.check_type.cmp(&b.check_type))
            .then_with(|| a.avd_id.cmp(&b.avd_id))
    });
    result.secrets.sort_by(|a, b| {
        a.rule_id
            .cmp(&b.rule_id)
            .then_with(|| a.start_line.cmp(&b.start_line))
    });
    result.licenses.sort_by(|a, b| {
        Severity::from_label(&b.severity)
            .cmp(&Severity::from_label(&a.severity))
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.name.cmp(&b.name))
    });
}
