//! In-process implementation of every store trait.
//!
//! Backs local runs without PostgreSQL and the integration tests. Lookups follow
//! the same matching rules as the SQL implementation in `database.rs`.

use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::stores::{ApprovalStore, Directory, RoleGroupStore, WorkflowStore};
use crate::models::{
    Approval, Department, Person, Requisition, RoleGroup, RoleGroupMember, RoleGroupMembership,
    Station, WorkflowDefinition, WorkflowKey,
};
use crate::visibility::{normalize_station, trim_id, VisibilityFilter};

#[derive(Default)]
struct State {
    persons: Vec<Person>,
    departments: Vec<Department>,
    stations: Vec<Station>,
    workflows: Vec<WorkflowDefinition>,
    groups: Vec<RoleGroup>,
    members: Vec<RoleGroupMember>,
    requisitions: Vec<Requisition>,
    approvals: HashMap<Uuid, Vec<Approval>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
    workflow_reads: AtomicUsize,
    membership_reads: AtomicUsize,
}

fn by_display_name(mut persons: Vec<Person>) -> Vec<Person> {
    persons.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.payroll_no.cmp(&b.payroll_no))
    });
    persons
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable);
        }
        Ok(())
    }

    /// Make every store call fail with `ServiceUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of workflow lookups that reached this store.
    pub fn workflow_reads(&self) -> usize {
        self.workflow_reads.load(Ordering::SeqCst)
    }

    /// Number of membership lookups that reached this store.
    pub fn membership_reads(&self) -> usize {
        self.membership_reads.load(Ordering::SeqCst)
    }

    pub fn add_person(&self, person: Person) {
        let mut state = self.write();
        state.persons.retain(|p| p.payroll_no != person.payroll_no);
        state.persons.push(person);
    }

    pub fn add_department(&self, department: Department) {
        self.write().departments.push(department);
    }

    pub fn add_station(&self, station: Station) {
        self.write().stations.push(station);
    }

    /// Insert a workflow, replacing any with the same key.
    pub fn add_workflow(&self, definition: WorkflowDefinition) {
        let key = definition.key();
        let mut state = self.write();
        state.workflows.retain(|w| w.key() != key);
        state.workflows.push(definition);
    }

    pub fn add_role_group(&self, group: RoleGroup) {
        self.write().groups.push(group);
    }

    pub fn add_member(&self, member: RoleGroupMember) {
        self.write().members.push(member);
    }

    pub fn add_requisition(&self, requisition: Requisition) {
        self.write().requisitions.push(requisition);
    }

    pub fn requisitions(&self) -> Vec<Requisition> {
        self.read().requisitions.clone()
    }

    /// Every stored approval, ordered by requisition then step number.
    pub fn all_approvals(&self) -> Vec<Approval> {
        let state = self.read();
        let mut approvals: Vec<Approval> = state.approvals.values().flatten().cloned().collect();
        approvals.sort_by_key(|a| (a.requisition_id, a.step_number));
        approvals
    }

    /// Requisitions visible through `filter`.
    pub fn list_requisitions_scoped(
        &self,
        filter: &VisibilityFilter,
    ) -> Result<Vec<Requisition>, AppError> {
        self.check_available()?;
        Ok(filter.apply(self.read().requisitions.clone()))
    }

    /// Approvals visible through `filter`.
    pub fn list_approvals_scoped(&self, filter: &VisibilityFilter) -> Result<Vec<Approval>, AppError> {
        self.check_available()?;
        Ok(filter.apply(self.all_approvals()))
    }
}

#[async_trait]
impl Directory for InMemoryStore {
    async fn person_by_id(&self, payroll_no: &str) -> Result<Option<Person>, AppError> {
        self.check_available()?;
        Ok(self
            .read()
            .persons
            .iter()
            .find(|p| p.payroll_no == trim_id(payroll_no))
            .cloned())
    }

    async fn persons_by_department(&self, department_id: &str) -> Result<Vec<Person>, AppError> {
        self.check_available()?;
        let department_id = trim_id(department_id);
        let matches = self
            .read()
            .persons
            .iter()
            .filter(|p| p.active_flag && trim_id(&p.department_id) == department_id)
            .cloned()
            .collect();
        Ok(by_display_name(matches))
    }

    async fn persons_by_station(&self, station_id: &str) -> Result<Vec<Person>, AppError> {
        self.check_available()?;
        let station = normalize_station(station_id);
        let matches = self
            .read()
            .persons
            .iter()
            .filter(|p| p.active_flag && normalize_station(&p.station_id) == station)
            .cloned()
            .collect();
        Ok(by_display_name(matches))
    }

    async fn persons_by_designation(&self, fragment: &str) -> Result<Vec<Person>, AppError> {
        self.check_available()?;
        let matches = self
            .read()
            .persons
            .iter()
            .filter(|p| p.active_flag && p.designation_contains(fragment))
            .cloned()
            .collect();
        Ok(by_display_name(matches))
    }

    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        self.check_available()?;
        let name = trim_id(name);
        Ok(self
            .read()
            .departments
            .iter()
            .find(|d| trim_id(&d.name).eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, AppError> {
        self.check_available()?;
        let name = trim_id(name);
        Ok(self
            .read()
            .stations
            .iter()
            .find(|s| trim_id(&s.name).eq_ignore_ascii_case(name))
            .cloned())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn workflow_definition(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<WorkflowDefinition>, AppError> {
        self.check_available()?;
        self.workflow_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()
            .workflows
            .iter()
            .find(|w| &w.key() == key)
            .cloned())
    }

    async fn upsert_workflow_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), AppError> {
        self.check_available()?;
        self.add_workflow(definition.clone());
        Ok(())
    }
}

#[async_trait]
impl RoleGroupStore for InMemoryStore {
    async fn active_memberships(
        &self,
        payroll_no: &str,
    ) -> Result<Vec<RoleGroupMembership>, AppError> {
        self.check_available()?;
        self.membership_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.read();
        let memberships = state
            .members
            .iter()
            .filter(|m| m.active_flag && m.payroll_no == payroll_no)
            .filter_map(|m| {
                state
                    .groups
                    .iter()
                    .find(|g| g.group_id == m.group_id && g.active_flag)
                    .map(|g| RoleGroupMembership::join(g, m))
            })
            .collect();
        Ok(memberships)
    }

    async fn set_membership_active(
        &self,
        member_id: Uuid,
        active: bool,
    ) -> Result<bool, AppError> {
        self.check_available()?;
        let mut state = self.write();
        match state.members.iter_mut().find(|m| m.member_id == member_id) {
            Some(member) => {
                member.active_flag = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn save_approvals(
        &self,
        requisition_id: Uuid,
        approvals: &[Approval],
    ) -> Result<(), AppError> {
        self.check_available()?;
        if approvals.iter().any(|a| a.requisition_id != requisition_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Approval batch mixes requisitions"
            )));
        }
        let mut state = self.write();
        if state
            .approvals
            .get(&requisition_id)
            .is_some_and(|existing| !existing.is_empty())
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Approvals already exist for requisition {}",
                requisition_id
            )));
        }
        state.approvals.insert(requisition_id, approvals.to_vec());
        Ok(())
    }

    async fn approvals_for(&self, requisition_id: Uuid) -> Result<Vec<Approval>, AppError> {
        self.check_available()?;
        let mut approvals = self
            .read()
            .approvals
            .get(&requisition_id)
            .cloned()
            .unwrap_or_default();
        approvals.sort_by_key(|a| a.step_number);
        Ok(approvals)
    }
}
