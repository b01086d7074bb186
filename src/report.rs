use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

/// Plugin identifier the reporting host uses to attribute this scan.
pub const PLUGIN_ID: &str = "provider-proxmox";

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub passed: bool,
    pub score: u32,
    pub max_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub plugin_id: &'static str,
    pub checks: Vec<CheckResult>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Write(#[from] io::Error),
}

pub fn print_report(report: &ScanReport) -> Result<(), ReportError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, report)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_check_omits_remediation() {
        let report = ScanReport {
            plugin_id: PLUGIN_ID,
            checks: vec![CheckResult {
                id: "PVE-VER".to_string(),
                name: "Proxmox Version".to_string(),
                description: "Connected to Proxmox 8.1".to_string(),
                passed: true,
                score: 5,
                max_score: 5,
                remediation: None,
            }],
        };

        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains(r#""plugin_id":"provider-proxmox""#));
        assert!(json.contains(r#""max_score":5"#));
        assert!(!json.contains("remediation"));
    }

    #[test]
    fn failing_check_carries_remediation() {
        let check = CheckResult {
            id: "PVE-NODE-pve-01".to_string(),
            name: "Node Status: pve-01".to_string(),
            description: "Checking if node pve-01 is online. CPU: 0.0%".to_string(),
            passed: false,
            score: 0,
            max_score: 20,
            remediation: Some("Start the node or check network connectivity.".to_string()),
        };

        let json = serde_json::to_string(&check).expect("serialize");
        assert!(json.contains(r#""remediation":"Start the node or check network connectivity.""#));
    }
}
