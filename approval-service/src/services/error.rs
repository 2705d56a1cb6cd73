use service_core::error::AppError;
use thiserror::Error;

/// Errors surfaced by [`crate::service::ApprovalService`].
///
/// Configuration gaps, unresolved approvers and malformed conditions are not
/// errors; they shrink the generated approval list instead.
#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Requesting person {0} is not in the directory")]
    UnknownRequester(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::UnknownRequester(payroll_no) => AppError::NotFound(anyhow::anyhow!(
                "Requesting person {} not found",
                payroll_no
            )),
            ApprovalError::Store(e) => e,
        }
    }
}
