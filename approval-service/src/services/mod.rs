//! Storage, caching and metrics services for approval-service.

pub mod cache;
pub mod database;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod stores;

pub use cache::{CachedRoleGroupStore, CachedWorkflowStore, ConfigCache};
pub use database::{APPROVAL_SCOPE, Database, REQUISITION_SCOPE};
pub use error::ApprovalError;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use stores::{ApprovalStore, Directory, RoleGroupStore, WorkflowStore};
