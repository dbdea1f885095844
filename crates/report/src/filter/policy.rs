//! Policy-engine adapter.
//!
//! The policy file is a Rego module compiled once per filter run. Each
//! finding is serialized to its public attributes and offered to the
//! `data.trivy.ignore` entry point; a `true` verdict suppresses it.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;

const ENTRYPOINT: &str = "data.trivy.ignore";

/// Statement recorded on findings a policy suppressed.
pub const POLICY_STATEMENT: &str = "Filtered by Rego";

#[derive(Debug)]
pub struct PolicyFilter {
    engine: regorus::Engine,
    source: String,
}

impl PolicyFilter {
    pub fn load(path: &str) -> Result<Self> {
        let module = fs::read_to_string(path)
            .with_context(|| format!("unable to load the policy file {path}"))?;
        let mut engine = regorus::Engine::new();
        engine
            .add_policy(path.to_string(), module)
            .with_context(|| format!("unable to load the policy file {path}"))?;
        Ok(Self {
            engine,
            source: path.to_string(),
        })
    }

    /// The file the policy came from, recorded on every modified finding.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the entry point with `finding` as input. Anything but a
    /// definite `true` keeps the finding; evaluation errors propagate.
    pub fn ignored<T: Serialize>(&mut self, finding: &T) -> Result<bool> {
        let input = serde_json::to_string(finding)?;
        self.engine
            .set_input(regorus::Value::from_json_str(&input)?);
        let verdict = self
            .engine
            .eval_rule(ENTRYPOINT.to_string())
            .context("policy evaluation error")?;
        Ok(verdict == regorus::Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vulnerability;
    use std::io::Write;

    fn write_policy(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignore.rego");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{contents}").unwrap();
        (dir, path.to_str().unwrap().to_string())
    }

    #[test]
    fn test_truthy_rule_ignores() {
        let (_dir, path) = write_policy(
            "package trivy\n\nimport future.keywords.if\n\ndefault ignore := false\n\nignore if input.vulnerability_id == \"CVE-2019-0003\"\n",
        );
        let mut policy = PolicyFilter::load(&path).unwrap();

        let hit = Vulnerability::new("CVE-2019-0003", "foo", "1.2.3");
        let miss = Vulnerability::new("CVE-2019-0004", "foo", "1.2.3");
        assert!(policy.ignored(&hit).unwrap());
        assert!(!policy.ignored(&miss).unwrap());
    }

    #[test]
    fn test_compile_error_is_load_error() {
        let (_dir, path) = write_policy("package trivy\n\nignore {\n");
        let err = PolicyFilter::load(&path).unwrap_err();
        assert!(err.to_string().contains("unable to load the policy file"));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = PolicyFilter::load("no/such/policy.rego").unwrap_err();
        assert!(err.to_string().contains("unable to load the policy file"));
    }
}
