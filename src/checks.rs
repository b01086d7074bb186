use crate::client::{ApiError, ClusterApi, NodeStatus, StorageVolume};
use crate::report::CheckResult;
use tracing::warn;

const VERSION_WEIGHT: u32 = 5;
const NODE_WEIGHT: u32 = 20;
const STORAGE_WEIGHT: u32 = 10;

const STORAGE_USAGE_THRESHOLD_PERCENT: f64 = 90.0;
const ELIGIBLE_STORAGE_TYPES: [&str; 4] = ["zfspool", "dir", "lvm", "nfs"];

const NODE_REMEDIATION: &str = "Start the node or check network connectivity.";
const STORAGE_REMEDIATION: &str = "Expand storage or delete old backups/ISOs.";

/// Runs the full scan against the cluster API.
///
/// Only a failed version probe is fatal and surfaces as `Err`. A failed node
/// listing stops evaluation but still returns the version check; a failed
/// per-node storage listing is logged and skips that node's storage checks
/// only.
pub async fn run_checks(api: &impl ClusterApi) -> Result<Vec<CheckResult>, ApiError> {
    let version = api.probe().await?;
    let mut checks = vec![version_check(&version)];

    let nodes = match api.list_nodes().await {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(error = %err, "failed to fetch nodes, reporting partial results");
            return Ok(checks);
        }
    };

    for node in &nodes {
        checks.push(node_check(node));
    }

    for node in &nodes {
        match api.list_storage(&node.node).await {
            Ok(volumes) => {
                for volume in volumes.iter().filter(|v| is_eligible(&v.kind)) {
                    checks.push(storage_check(&node.node, volume));
                }
            }
            Err(err) => {
                warn!(node = %node.node, error = %err, "failed to read storage for node");
            }
        }
    }

    Ok(checks)
}

fn version_check(release: &str) -> CheckResult {
    CheckResult {
        id: "PVE-VER".to_string(),
        name: "Proxmox Version".to_string(),
        description: format!("Connected to Proxmox {release}"),
        passed: true,
        score: VERSION_WEIGHT,
        max_score: VERSION_WEIGHT,
        remediation: None,
    }
}

fn node_check(node: &NodeStatus) -> CheckResult {
    let passed = node.status == "online";
    CheckResult {
        id: format!("PVE-NODE-{}", node.node),
        name: format!("Node Status: {}", node.node),
        description: format!(
            "Checking if node {} is online. CPU: {:.1}%",
            node.node,
            node.cpu * 100.0
        ),
        passed,
        score: if passed { NODE_WEIGHT } else { 0 },
        max_score: NODE_WEIGHT,
        remediation: (!passed).then(|| NODE_REMEDIATION.to_string()),
    }
}

fn storage_check(node: &str, volume: &StorageVolume) -> CheckResult {
    // total == 0 means the source could not measure capacity; treat as empty.
    let percent = if volume.total > 0 {
        volume.used as f64 / volume.total as f64 * 100.0
    } else {
        0.0
    };
    let passed = percent < STORAGE_USAGE_THRESHOLD_PERCENT;
    let free_gib = volume.total.saturating_sub(volume.used) / 1024 / 1024 / 1024;

    CheckResult {
        id: format!("PVE-DISK-{}-{}", node, volume.storage),
        name: format!("Storage: {} on {}", volume.storage, node),
        description: format!("Usage: {percent:.1}% ({free_gib} GB free)"),
        passed,
        score: if passed { STORAGE_WEIGHT } else { 0 },
        max_score: STORAGE_WEIGHT,
        remediation: (!passed).then(|| STORAGE_REMEDIATION.to_string()),
    }
}

fn is_eligible(kind: &str) -> bool {
    ELIGIBLE_STORAGE_TYPES.contains(&kind)
}
