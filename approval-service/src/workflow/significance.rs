use crate::models::{Approval, ApprovalStatus};

/// Statuses in the order that makes an approval representative of its chain.
const PRIORITY: [ApprovalStatus; 4] = [
    ApprovalStatus::PendingApproval,
    ApprovalStatus::Completed,
    ApprovalStatus::Rejected,
    ApprovalStatus::Forwarded,
];

/// The approval that best summarises a requisition's progress.
///
/// The lowest-numbered approval with the highest-priority status, falling back
/// to the first approval by step number.
pub fn most_significant(approvals: &[Approval]) -> Option<&Approval> {
    let mut ordered: Vec<&Approval> = approvals.iter().collect();
    ordered.sort_by_key(|a| a.step_number);

    PRIORITY
        .iter()
        .find_map(|status| ordered.iter().find(|a| a.status() == *status).copied())
        .or_else(|| ordered.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn approval(step: i32, status: ApprovalStatus) -> Approval {
        let mut a = Approval::new(Uuid::nil(), format!("step {}", step), "1", "D", "S");
        a.step_number = step;
        a.set_status(status);
        a
    }

    #[test]
    fn pending_beats_everything() {
        let chain = vec![
            approval(1, ApprovalStatus::Completed),
            approval(2, ApprovalStatus::PendingApproval),
            approval(3, ApprovalStatus::NotStarted),
        ];
        assert_eq!(most_significant(&chain).map(|a| a.step_number), Some(2));
    }

    #[test]
    fn completed_then_rejected_then_forwarded() {
        let chain = vec![
            approval(3, ApprovalStatus::Forwarded),
            approval(2, ApprovalStatus::Rejected),
            approval(1, ApprovalStatus::Completed),
        ];
        assert_eq!(most_significant(&chain).map(|a| a.step_number), Some(1));

        let chain = vec![
            approval(1, ApprovalStatus::Forwarded),
            approval(2, ApprovalStatus::Rejected),
        ];
        assert_eq!(most_significant(&chain).map(|a| a.step_number), Some(2));
    }

    #[test]
    fn falls_back_to_first_step_then_none() {
        let chain = vec![
            approval(2, ApprovalStatus::OnHold),
            approval(1, ApprovalStatus::NotStarted),
        ];
        assert_eq!(most_significant(&chain).map(|a| a.step_number), Some(1));
        assert!(most_significant(&[]).is_none());
    }
}
