//! Approval workflow generation.

pub mod conditions;
pub mod generator;
pub mod resolver;
pub mod significance;

pub use conditions::ConditionField;
pub use generator::ApprovalStepGenerator;
pub use resolver::{ApproverResolver, ResolutionRequest, ResolvedApprover, ResolverSettings};
pub use significance::most_significant;
