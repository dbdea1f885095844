//! Senbetsu Report - Post-Scan Finding Filtering
//!
//! This crate takes a finished scan report and applies the layered,
//! deterministic suppression pipeline that turns raw scanner output into
//! what a user actually needs to act on: severity gating, VEX statements,
//! ignore files, policy rules, deduplication and stable ordering.

pub mod context;
pub mod core;
pub mod filter;
pub mod vex;

pub use context::FilterContext;

pub use crate::core::{
    BomMetadata, Finding, FindingAttributes, FindingKind, FindingStatus, License,
    Misconfiguration, MisconfStatus, MisconfSummary, ModifiedFinding, PkgIdentifier, Report,
    ResultClass, ScanResult, Secret, Severity, Vulnerability, VulnStatus,
};

pub use filter::{filter, FilterOptions, IgnoreRules, PolicyFilter};

pub use vex::VexDocument;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
