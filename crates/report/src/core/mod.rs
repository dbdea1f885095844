//! Core report model shared by every filter stage.

pub mod finding;
pub mod report;
pub mod severity;

pub use finding::{
    Finding, FindingAttributes, FindingKind, FindingStatus, License, Misconfiguration,
    MisconfStatus, ModifiedFinding, PkgIdentifier, Secret, Vulnerability, VulnStatus,
};
pub use report::{BomMetadata, MisconfSummary, Report, ResultClass, ScanResult};
pub use severity::Severity;
