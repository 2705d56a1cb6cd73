//! Collaborator interfaces consumed by the workflow and visibility engines.
//!
//! Every method returns `AppError` only for infrastructure failures. "Not found"
//! is expressed as `None` or an empty list.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Approval, Department, Person, RoleGroupMembership, Station, WorkflowDefinition, WorkflowKey,
};

/// Read-only employee/location directory.
///
/// Listing methods return active people only, ordered by display name then
/// payroll number.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up a person regardless of their active flag.
    async fn person_by_id(&self, payroll_no: &str) -> Result<Option<Person>, AppError>;

    async fn persons_by_department(&self, department_id: &str) -> Result<Vec<Person>, AppError>;

    /// People whose station normalises to the same id as `station_id`.
    async fn persons_by_station(&self, station_id: &str) -> Result<Vec<Person>, AppError>;

    /// People whose designation contains `fragment`, ignoring case.
    async fn persons_by_designation(&self, fragment: &str) -> Result<Vec<Person>, AppError>;

    /// Case-insensitive exact lookup on the department name.
    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, AppError>;

    /// Case-insensitive exact lookup on the station name.
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, AppError>;
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Definition for the key, steps included.
    async fn workflow_definition(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<WorkflowDefinition>, AppError>;

    /// Replace any definition with the same key.
    async fn upsert_workflow_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait RoleGroupStore: Send + Sync {
    /// Active member rows of `payroll_no`, joined to their groups.
    async fn active_memberships(
        &self,
        payroll_no: &str,
    ) -> Result<Vec<RoleGroupMembership>, AppError>;

    /// Returns false when no member row has `member_id`.
    async fn set_membership_active(&self, member_id: Uuid, active: bool)
    -> Result<bool, AppError>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Persist all approvals of one requisition, or none of them.
    async fn save_approvals(
        &self,
        requisition_id: Uuid,
        approvals: &[Approval],
    ) -> Result<(), AppError>;

    /// Approvals of a requisition ordered by step number.
    async fn approvals_for(&self, requisition_id: Uuid) -> Result<Vec<Approval>, AppError>;
}
