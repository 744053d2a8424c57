use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a manager's own post-approval edit request is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditRequestPolicy {
    /// The request waits in `EDIT_REQUESTED` until a manager approves it.
    #[default]
    CounterpartApproval,
    /// A manager's request is approved in the same call.
    ManagerSelfApproves,
}

impl EditRequestPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "counterpart_approval" | "counterpart" => Some(Self::CounterpartApproval),
            "manager_self_approves" | "self_approve" => Some(Self::ManagerSelfApproves),
            _ => None,
        }
    }
}

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionWorkflowConfig {
    pub edit_policy: EditRequestPolicy,
    /// Polling interval advertised to views that mirror the pending queues.
    pub refresh_interval: Duration,
}

impl Default for InspectionWorkflowConfig {
    fn default() -> Self {
        Self {
            edit_policy: EditRequestPolicy::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}
