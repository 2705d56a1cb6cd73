//! Domain models for approval-service.

pub mod approval;
pub mod person;
pub mod requisition;
pub mod role_group;
pub mod workflow;

pub use approval::{Approval, ApprovalStatus};
pub use person::{Department, Person, Station};
pub use requisition::Requisition;
pub use role_group::{RoleGroup, RoleGroupMember, RoleGroupMembership};
pub use workflow::{
    DEFAULT_FALLBACK_ROLES, ResolutionParams, StepConditions, StepDefinition, WorkflowDefinition,
    WorkflowKey,
};
