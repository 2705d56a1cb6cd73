//! Outward operations of the approval core.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Approval, Requisition, WorkflowDefinition};
use crate::services::cache::{CachedRoleGroupStore, CachedWorkflowStore};
use crate::services::error::ApprovalError;
use crate::services::metrics::record_requisition_without_approvals;
use crate::services::stores::{ApprovalStore, Directory, RoleGroupStore, WorkflowStore};
use crate::visibility::{HasDepartmentAndStations, HasOwner, ScopeResolver, VisibilityFilter};
use crate::workflow::{ApprovalStepGenerator, ApproverResolver, ResolverSettings, most_significant};

/// Facade over workflow generation and visibility scoping.
///
/// Workflow and role-group reads go through TTL caches owned by the service;
/// administrative writes made here invalidate them.
#[derive(Clone)]
pub struct ApprovalService {
    directory: Arc<dyn Directory>,
    workflows: Arc<CachedWorkflowStore>,
    role_groups: Arc<CachedRoleGroupStore>,
    approvals: Arc<dyn ApprovalStore>,
    generator: ApprovalStepGenerator,
    scopes: ScopeResolver,
}

impl ApprovalService {
    pub fn new(
        directory: Arc<dyn Directory>,
        workflows: Arc<dyn WorkflowStore>,
        role_groups: Arc<dyn RoleGroupStore>,
        approvals: Arc<dyn ApprovalStore>,
        settings: ResolverSettings,
        cache_ttl: Duration,
    ) -> Self {
        let workflows = Arc::new(CachedWorkflowStore::new(workflows, cache_ttl));
        let role_groups = Arc::new(CachedRoleGroupStore::new(role_groups, cache_ttl));
        let resolver = ApproverResolver::new(directory.clone(), settings);
        let generator = ApprovalStepGenerator::new(directory.clone(), workflows.clone(), resolver);
        let scopes = ScopeResolver::new(directory.clone(), role_groups.clone());

        Self {
            directory,
            workflows,
            role_groups,
            approvals,
            generator,
            scopes,
        }
    }

    /// Build a service whose every store is `store`.
    pub fn from_store<S>(store: Arc<S>, settings: ResolverSettings, cache_ttl: Duration) -> Self
    where
        S: Directory + WorkflowStore + RoleGroupStore + ApprovalStore + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            settings,
            cache_ttl,
        )
    }

    /// Approvals the requisition would get, without persisting them.
    #[instrument(skip(self, requisition), fields(requisition_id = %requisition.requisition_id))]
    pub async fn generate_approval_steps(
        &self,
        requisition: &Requisition,
        requester_payroll_no: &str,
    ) -> Result<Vec<Approval>, ApprovalError> {
        let Some(requester) = self.directory.person_by_id(requester_payroll_no).await? else {
            warn!(requester = %requester_payroll_no, "Requesting person not found - generation stopped");
            return Err(ApprovalError::UnknownRequester(
                requester_payroll_no.to_string(),
            ));
        };
        Ok(self.generator.generate(requisition, &requester).await?)
    }

    /// Generate and atomically persist the approval chain of a new requisition.
    #[instrument(skip(self, requisition), fields(requisition_id = %requisition.requisition_id))]
    pub async fn submit_requisition(
        &self,
        requisition: &Requisition,
        requester_payroll_no: &str,
    ) -> Result<Vec<Approval>, ApprovalError> {
        let approvals = self
            .generate_approval_steps(requisition, requester_payroll_no)
            .await?;

        if approvals.is_empty() {
            error!(
                alert = "requisition_without_approvals",
                requisition_id = %requisition.requisition_id,
                issue_category = %requisition.issue_category,
                delivery_category = %requisition.delivery_category,
                "Requisition submitted without any approval step"
            );
            record_requisition_without_approvals();
            return Ok(approvals);
        }

        self.approvals
            .save_approvals(requisition.requisition_id, &approvals)
            .await?;
        info!(approvals = approvals.len(), "Approval chain saved");
        Ok(approvals)
    }

    pub async fn most_significant_approval(
        &self,
        requisition_id: Uuid,
    ) -> Result<Option<Approval>, ApprovalError> {
        let approvals = self.approvals.approvals_for(requisition_id).await?;
        Ok(most_significant(&approvals).cloned())
    }

    /// Filter describing what `payroll_no` may read.
    pub async fn visibility_filter(
        &self,
        payroll_no: &str,
    ) -> Result<VisibilityFilter, ApprovalError> {
        Ok(self.scopes.filter_for(payroll_no).await?)
    }

    /// Keep the entities `payroll_no` may read.
    pub async fn apply_visibility_scope<E, I>(
        &self,
        entities: I,
        payroll_no: &str,
    ) -> Result<Vec<E>, ApprovalError>
    where
        I: IntoIterator<Item = E>,
        E: HasOwner + HasDepartmentAndStations,
    {
        let filter = self.visibility_filter(payroll_no).await?;
        Ok(filter.apply(entities))
    }

    pub async fn can_access_entity<E>(
        &self,
        entity: &E,
        payroll_no: &str,
    ) -> Result<bool, ApprovalError>
    where
        E: HasOwner + HasDepartmentAndStations + ?Sized,
    {
        let filter = self.visibility_filter(payroll_no).await?;
        Ok(filter.matches(entity))
    }

    #[instrument(skip(self, definition), fields(workflow = %definition.name))]
    pub async fn upsert_workflow_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), ApprovalError> {
        Ok(self.workflows.upsert_workflow_definition(definition).await?)
    }

    /// Returns false when the member row does not exist.
    #[instrument(skip(self))]
    pub async fn set_membership_active(
        &self,
        member_id: Uuid,
        active: bool,
    ) -> Result<bool, ApprovalError> {
        Ok(self
            .role_groups
            .set_membership_active(member_id, active)
            .await?)
    }

    /// Drop every cached workflow and membership.
    pub fn invalidate_caches(&self) {
        self.workflows.invalidate_all();
        self.role_groups.invalidate_all();
    }
}
