//! Transition table for inspection records plus submission validation.

use serde::{Deserialize, Serialize};

use super::domain::{Inspection, InspectionStatus};

/// Actions that move an inspection record between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionAction {
    Submit,
    Approve,
    RequestRevision,
    Resubmit,
    RequestEdit,
    ApproveEdit,
}

impl InspectionAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::RequestRevision => "request_revision",
            Self::Resubmit => "resubmit",
            Self::RequestEdit => "request_edit",
            Self::ApproveEdit => "approve_edit",
        }
    }
}

/// Every permitted `(from, action, to)` edge. Anything else is an invalid transition.
pub const TRANSITIONS: [(InspectionStatus, InspectionAction, InspectionStatus); 7] = [
    (
        InspectionStatus::Draft,
        InspectionAction::Submit,
        InspectionStatus::PendingApproval,
    ),
    (
        InspectionStatus::PendingApproval,
        InspectionAction::Approve,
        InspectionStatus::Approved,
    ),
    (
        InspectionStatus::PendingApproval,
        InspectionAction::RequestRevision,
        InspectionStatus::RevisionRequested,
    ),
    (
        InspectionStatus::RevisionRequested,
        InspectionAction::Resubmit,
        InspectionStatus::PendingApproval,
    ),
    (
        InspectionStatus::Approved,
        InspectionAction::RequestEdit,
        InspectionStatus::EditRequested,
    ),
    (
        InspectionStatus::EditRequested,
        InspectionAction::ApproveEdit,
        InspectionStatus::EditApproved,
    ),
    (
        InspectionStatus::EditApproved,
        InspectionAction::Resubmit,
        InspectionStatus::PendingApproval,
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} an inspection in status {}", .action.label(), .from.code())]
pub struct InvalidTransition {
    pub from: InspectionStatus,
    pub action: InspectionAction,
}

pub fn next_status(from: InspectionStatus, action: InspectionAction) -> Option<InspectionStatus> {
    TRANSITIONS
        .iter()
        .find(|(source, candidate, _)| *source == from && *candidate == action)
        .map(|(_, _, target)| *target)
}

pub fn transition(
    from: InspectionStatus,
    action: InspectionAction,
) -> Result<InspectionStatus, InvalidTransition> {
    next_status(from, action).ok_or(InvalidTransition { from, action })
}

/// Which submit edge applies to a record in `status`, if any.
pub fn submission_action(status: InspectionStatus) -> Option<InspectionAction> {
    match status {
        InspectionStatus::Draft => Some(InspectionAction::Submit),
        InspectionStatus::RevisionRequested | InspectionStatus::EditApproved => {
            Some(InspectionAction::Resubmit)
        }
        _ => None,
    }
}

/// Statuses in which the form fields may be changed.
pub const fn is_editable(status: InspectionStatus) -> bool {
    matches!(
        status,
        InspectionStatus::Draft
            | InspectionStatus::RevisionRequested
            | InspectionStatus::EditApproved
    )
}

/// An active inspection still has work outstanding before an approval is on record.
pub const fn is_active(status: InspectionStatus) -> bool {
    !matches!(status, InspectionStatus::Approved)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("inspector name is required")]
    MissingInspectorName,
    #[error("inspection date is required")]
    MissingInspectionDate,
    #[error("cost for {item} must be a non-negative amount (found {value})")]
    InvalidCost { item: String, value: f64 },
    #[error("{field} must not be empty")]
    MissingNotes { field: &'static str },
}

/// Check the fields required for submission and return the aggregated cost.
pub fn validate_submission(inspection: &Inspection) -> Result<f64, ValidationError> {
    let has_inspector = inspection
        .inspector_name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());
    if !has_inspector {
        return Err(ValidationError::MissingInspectorName);
    }
    if inspection.inspection_date.is_none() {
        return Err(ValidationError::MissingInspectionDate);
    }

    let items = inspection.assessment.itemized_costs();
    if let Some((item, value)) = items
        .iter()
        .find(|(_, cost)| !cost.is_finite() || *cost < 0.0)
    {
        return Err(ValidationError::InvalidCost {
            item: item.clone(),
            value: *value,
        });
    }

    Ok(items.iter().map(|(_, cost)| cost).sum())
}

/// Trimmed notes, rejecting blank input.
pub fn required_notes(field: &'static str, notes: &str) -> Result<String, ValidationError> {
    let trimmed = notes.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingNotes { field })
    } else {
        Ok(trimmed.to_string())
    }
}
