//! Approval Service - dynamic approval workflows and visibility scoping for requisitions.

pub mod config;
pub mod models;
pub mod service;
pub mod services;
pub mod startup;
pub mod visibility;
pub mod workflow;

pub use service::ApprovalService;
pub use services::ApprovalError;
