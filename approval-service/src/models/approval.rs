//! Approval model - one generated step bound to one approver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::visibility::{HasDepartmentAndStations, HasOwner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    NotStarted,
    PendingApproval,
    Completed,
    Rejected,
    Forwarded,
    OnHold,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::PendingApproval => "pending_approval",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
            Self::OnHold => "on_hold",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending_approval" => Self::PendingApproval,
            "completed" => Self::Completed,
            "rejected" => Self::Rejected,
            "forwarded" => Self::Forwarded,
            "on_hold" => Self::OnHold,
            _ => Self::NotStarted,
        }
    }
}

/// A persisted approval step.
///
/// `step_number` is contiguous from 1 across the approvals of one requisition.
/// `approver_id` is a payroll number, or an external token such as a vendor id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Approval {
    pub approval_id: Uuid,
    pub requisition_id: Uuid,
    pub step_name: String,
    pub step_number: i32,
    pub approver_id: String,
    pub department_id: String,
    pub station_id: String,
    pub status_code: String,
    pub created_utc: Option<DateTime<Utc>>,
    pub updated_utc: Option<DateTime<Utc>>,
}

impl Approval {
    /// Create a not-yet-numbered approval in `NotStarted`.
    pub fn new(
        requisition_id: Uuid,
        step_name: impl Into<String>,
        approver_id: impl Into<String>,
        department_id: impl Into<String>,
        station_id: impl Into<String>,
    ) -> Self {
        Self {
            approval_id: Uuid::new_v4(),
            requisition_id,
            step_name: step_name.into(),
            step_number: 0,
            approver_id: approver_id.into(),
            department_id: department_id.into(),
            station_id: station_id.into(),
            status_code: ApprovalStatus::NotStarted.as_str().to_string(),
            created_utc: None,
            updated_utc: None,
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        ApprovalStatus::parse(&self.status_code)
    }

    pub fn set_status(&mut self, status: ApprovalStatus) {
        self.status_code = status.as_str().to_string();
    }
}

impl HasOwner for Approval {
    fn owner_id(&self) -> &str {
        &self.approver_id
    }
}

impl HasDepartmentAndStations for Approval {
    fn department_id(&self) -> &str {
        &self.department_id
    }

    fn station_ids(&self) -> Vec<&str> {
        vec![&self.station_id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip_and_default_to_not_started() {
        for status in [
            ApprovalStatus::NotStarted,
            ApprovalStatus::PendingApproval,
            ApprovalStatus::Completed,
            ApprovalStatus::Rejected,
            ApprovalStatus::Forwarded,
            ApprovalStatus::OnHold,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()), status);
        }
        assert_eq!(ApprovalStatus::parse("garbage"), ApprovalStatus::NotStarted);
    }
}
