//! Turns a workflow definition into the ordered approval chain of one requisition.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::conditions;
use super::resolver::{ApproverResolver, ResolutionRequest, ResolvedApprover};
use crate::models::{Approval, ApprovalStatus, Person, Requisition, StepDefinition, WorkflowKey};
use crate::services::metrics::{record_generation_gap, record_generation_run};
use crate::services::stores::{Directory, WorkflowStore};
use service_core::error::AppError;

/// Location side an included step resolves against.
struct StepContext<'a> {
    location: &'a str,
    department_id: String,
    station_id: &'a str,
}

#[derive(Clone)]
pub struct ApprovalStepGenerator {
    directory: Arc<dyn Directory>,
    workflows: Arc<dyn WorkflowStore>,
    resolver: ApproverResolver,
}

impl ApprovalStepGenerator {
    pub fn new(
        directory: Arc<dyn Directory>,
        workflows: Arc<dyn WorkflowStore>,
        resolver: ApproverResolver,
    ) -> Self {
        Self {
            directory,
            workflows,
            resolver,
        }
    }

    /// Build the approvals for `requisition` without persisting them.
    ///
    /// A missing workflow yields an empty list and an unresolved step is dropped;
    /// neither is an error. Only store failures are returned as `Err`.
    #[instrument(skip(self, requisition, requester), fields(requisition_id = %requisition.requisition_id, requester = %requester.payroll_no))]
    pub async fn generate(
        &self,
        requisition: &Requisition,
        requester: &Person,
    ) -> Result<Vec<Approval>, AppError> {
        let key = WorkflowKey::new(&requisition.issue_category, &requisition.delivery_category);
        let Some(definition) = self.workflows.workflow_definition(&key).await? else {
            warn!(
                issue_category = %key.issue_category,
                delivery_category = %key.delivery_category,
                "No workflow configured for category pair - no approvals generated"
            );
            record_generation_gap("configuration_gap");
            record_generation_run("configuration_gap");
            return Ok(Vec::new());
        };

        let issue_side = StepContext {
            location: &requisition.issue_location,
            department_id: requisition.department_id.clone(),
            station_id: &requisition.issue_station_id,
        };
        let delivery_side = StepContext {
            location: &requisition.delivery_location,
            department_id: self.delivery_department(requisition).await?,
            station_id: &requisition.delivery_station_id,
        };

        let included: Vec<(bool, &StepDefinition)> = definition
            .ordered_steps()
            .into_iter()
            .enumerate()
            .map(|(position, step)| (position == 0, step))
            .filter(|(_, step)| conditions::evaluate(&step.step_name, &step.conditions, requisition))
            .collect();

        let resolutions = join_all(included.iter().map(|(is_first, step)| {
            let context = if *is_first { &issue_side } else { &delivery_side };
            self.resolve_step(step, context, *is_first, requisition, requester)
        }))
        .await;

        let mut approvals = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            if let Some(approval) = resolution? {
                approvals.push(approval);
            }
        }

        number_approvals(&mut approvals);

        let outcome = if approvals.is_empty() { "empty" } else { "generated" };
        record_generation_run(outcome);
        info!(
            workflow = %definition.name,
            approvals = approvals.len(),
            "Approval steps generated"
        );
        Ok(approvals)
    }

    async fn delivery_department(&self, requisition: &Requisition) -> Result<String, AppError> {
        Ok(self
            .directory
            .department_by_name(&requisition.delivery_location)
            .await?
            .map(|d| d.department_id)
            .unwrap_or_else(|| requisition.department_id.clone()))
    }

    async fn resolve_step(
        &self,
        step: &StepDefinition,
        context: &StepContext<'_>,
        is_first_step: bool,
        requisition: &Requisition,
        requester: &Person,
    ) -> Result<Option<Approval>, AppError> {
        let role = step.approver_role.trim().to_lowercase();

        let resolved = if role == "vendor" && requisition.is_dispatched_by("vendor") {
            requisition
                .vendor_id
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|vendor| ResolvedApprover {
                    approver_id: vendor.to_string(),
                    department_id: context.department_id.clone(),
                })
        } else if role == "dispatchadmin" && requisition.is_dispatched_by("admin") {
            match requisition.dispatch_payroll_no.as_deref() {
                Some(payroll_no) => self.resolver.resolve_by_payroll(payroll_no).await?,
                None => None,
            }
        } else {
            self.resolver
                .resolve(ResolutionRequest {
                    role_token: &step.approver_role,
                    location_context: context.location,
                    department_id: &context.department_id,
                    station_id: context.station_id,
                    is_first_step,
                    requester,
                    parameters: &step.parameters,
                })
                .await?
        };

        let Some(approver) = resolved else {
            warn!(
                step = %step.step_name,
                role = %step.approver_role,
                location = %context.location,
                "No approver resolved - step dropped"
            );
            record_generation_gap("resolution_miss");
            return Ok(None);
        };

        Ok(Some(Approval::new(
            requisition.requisition_id,
            step.step_name.clone(),
            approver.approver_id,
            approver.department_id,
            context.station_id,
        )))
    }
}

/// Number surviving approvals 1..N and open the first one.
fn number_approvals(approvals: &mut [Approval]) {
    let now = Utc::now();
    for (index, approval) in approvals.iter_mut().enumerate() {
        approval.step_number = index as i32 + 1;
        if index == 0 {
            approval.set_status(ApprovalStatus::PendingApproval);
            approval.created_utc = Some(now);
        } else {
            approval.set_status(ApprovalStatus::NotStarted);
            approval.created_utc = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn numbering_is_contiguous_and_opens_only_the_first() {
        let id = Uuid::new_v4();
        let mut approvals = vec![
            Approval::new(id, "a", "1", "D", "S"),
            Approval::new(id, "b", "2", "D", "S"),
            Approval::new(id, "c", "3", "D", "S"),
        ];
        number_approvals(&mut approvals);

        let numbers: Vec<i32> = approvals.iter().map(|a| a.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(approvals[0].status(), ApprovalStatus::PendingApproval);
        assert!(approvals[0].created_utc.is_some());
        for later in &approvals[1..] {
            assert_eq!(later.status(), ApprovalStatus::NotStarted);
            assert!(later.created_utc.is_none());
        }
    }
}
