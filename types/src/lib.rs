//! Shared wire types for the codespace lifecycle system: the contract
//! between the lifecycle controller and the orchestrator adapter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocols a port mapping can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl Default for PortProtocol {
    fn default() -> Self {
        Self::Tcp
    }
}

/// A single container port published through the workload's service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub name: String,
    pub port: u16,
    pub target_port: u16,
    #[serde(default)]
    pub protocol: PortProtocol,
}

impl PortMapping {
    pub fn tcp(name: impl Into<String>, port: u16, target_port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            target_port,
            protocol: PortProtocol::Tcp,
        }
    }
}

/// Resource limits carried through to the workload's container spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub storage: Option<String>,
}

/// Declarative input to the orchestrator adapter describing one
/// student's codespace workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub name: String,
    pub user_id: String,
    pub image: String,
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub limits: ResourceLimits,
}

/// Status of a workload as observed through the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum JobStatus {
    Pending,
    Starting,
    Running,
    Suspended,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Starting => write!(f, "Starting"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Suspended => write!(f, "Suspended"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Observed state of a workload, as reported by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub user_id: String,
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub env: BTreeMap<String, String>,
    pub status: JobStatus,
    /// Externally reachable URL for the primary port, or `"pending"`
    /// while the load balancer has not yet assigned an address.
    pub service_url: String,
    pub created_at: i64,
}

/// Labels applied to every object this system manages in the cluster.
pub mod labels {
    pub const MANAGED_BY_KEY: &str = "managed-by";
    pub const MANAGED_BY_VALUE: &str = "codeloom";
    pub const USER_ID_KEY: &str = "user-id";
    pub const TYPE_KEY: &str = "type";
    pub const TYPE_VALUE: &str = "codespace";
    /// Pod-selector label shared by the workload and its service.
    pub const APP_KEY: &str = "app";
}

/// Annotations recording suspension state on a workload.
pub mod annotations {
    pub const SUSPENDED: &str = "codeloom.dev/suspended";
    pub const ORIGINAL_REPLICAS: &str = "codeloom.dev/original-replicas";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_params_roundtrips_through_json() {
        let params = JobParams {
            name: "codespace-24111352".into(),
            user_id: "24111352".into(),
            image: "codespace-base:latest".into(),
            ports: vec![PortMapping::tcp("ide", 80, 443)],
            env: BTreeMap::from([("PASSWORD".to_string(), "secret".to_string())]),
            limits: ResourceLimits::default(),
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: JobParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn job_status_display_matches_variant_name() {
        assert_eq!(JobStatus::Running.to_string(), "Running");
        assert_eq!(JobStatus::Suspended.to_string(), "Suspended");
    }
}
