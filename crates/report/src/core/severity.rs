use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity labels carried by findings, ordered from least to most severe.
///
/// Findings store their severity as a free-form string; this enum is the
/// normalized form used for gating and ordering. An empty or unrecognized
/// label maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(anyhow::anyhow!("unknown severity: {s}")),
        }
    }
}

impl Severity {
    /// Lenient parse used when comparing finding labels: anything that is
    /// not a known label counts as `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }

    /// Missing severities are reported as `UNKNOWN` so that a filter set
    /// containing `Unknown` retains them.
    pub fn normalize(label: &str) -> String {
        if label.is_empty() {
            Self::Unknown.to_string()
        } else {
            label.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Unknown);
    }

    #[test]
    fn test_round_trip() {
        for label in ["CRITICAL", "HIGH", "MEDIUM", "LOW", "UNKNOWN"] {
            let severity: Severity = label.parse().unwrap();
            assert_eq!(severity.to_string(), label);
        }
    }

    #[test]
    fn test_from_label_lenient() {
        assert_eq!(Severity::from_label(""), Severity::Unknown);
        assert_eq!(Severity::from_label("bogus"), Severity::Unknown);
        assert_eq!(Severity::from_label("HIGH"), Severity::High);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(Severity::normalize(""), "UNKNOWN");
        assert_eq!(Severity::normalize("LOW"), "LOW");
    }
}
