//! VEX document loading and matching.
//!
//! A VEX document declares, per vulnerability and product, whether a CVE
//! actually applies to the scanned artifact. Three formats are supported;
//! the loader probes them in a fixed order and returns a boxed filter so
//! the pipeline never cares which format it got.

pub mod csaf;
pub mod cyclonedx;
pub mod openvex;

use anyhow::{bail, Context, Result};
use std::fs;

use crate::core::{Report, ScanResult};

/// Capability shared by every VEX backend: drop the vulnerabilities the
/// document declares not applicable and record them as modified findings.
pub trait VexDocument: std::fmt::Debug {
    fn filter(&self, result: &mut ScanResult);
}

/// Load a VEX document from `path`, probing formats in order: OpenVEX,
/// CSAF, CycloneDX. The report is consulted for its SBOM identity, which a
/// CycloneDX VEX must reference.
pub fn load(path: &str, report: &Report) -> Result<Box<dyn VexDocument>> {
    let data =
        fs::read_to_string(path).with_context(|| format!("unable to open VEX file {path}"))?;

    if let Some(doc) = openvex::decode(&data) {
        return Ok(Box::new(doc));
    }
    if let Some(doc) = csaf::decode(&data) {
        return Ok(Box::new(doc));
    }
    if let Some(doc) = cyclonedx::decode(&data, report) {
        return Ok(Box::new(doc));
    }
    bail!("unable to load VEX: {path}")
}
