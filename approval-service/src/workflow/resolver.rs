//! Approver resolution.
//!
//! Strategies are tried in a fixed order and the first one that applies wins:
//!
//! 1. `supervisor`/`hod`: the requester's supervisor link, then the first person
//!    in the requester's department holding one of the step's fallback roles.
//! 2. `dispatchadmin` with a `payrollNo` parameter: that person.
//! 3. Department or first-step HQ context: a role match in the named department.
//! 4. Field or later-step factory context: designation or station lookups.
//! 5. Region role or later-step region context: the regional designation holder.
//! 6. Role match in the context department, then at the context station.
//!
//! Strategies 1 and 2 fall through on a miss. Strategies 3 to 5 own their
//! context: once their guard matches, a miss means no approver.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::models::{Person, ResolutionParams};
use crate::services::stores::Directory;
use crate::visibility::is_hq_station;
use service_core::error::AppError;

/// Designation fragments used by the singleton lookups.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub regional_ict_designation: String,
    pub field_systems_designation: String,
    pub regional_designation: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            regional_ict_designation: "Regional ICT".to_string(),
            field_systems_designation: "Field Systems Administrator".to_string(),
            regional_designation: "Regional Manager".to_string(),
        }
    }
}

/// Inputs of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRequest<'a> {
    pub role_token: &'a str,
    /// Issue location for the first step, delivery location afterwards.
    pub location_context: &'a str,
    pub department_id: &'a str,
    pub station_id: &'a str,
    pub is_first_step: bool,
    pub requester: &'a Person,
    pub parameters: &'a ResolutionParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApprover {
    pub approver_id: String,
    pub department_id: String,
}

impl ResolvedApprover {
    fn from_person(person: &Person) -> Self {
        Self {
            approver_id: person.payroll_no.clone(),
            department_id: person.department_id.clone(),
        }
    }
}

fn first_with_role<'a>(persons: &'a [Person], role: &str) -> Option<&'a Person> {
    persons.iter().find(|p| p.has_role(role))
}

#[derive(Clone)]
pub struct ApproverResolver {
    directory: Arc<dyn Directory>,
    settings: ResolverSettings,
}

impl ApproverResolver {
    pub fn new(directory: Arc<dyn Directory>, settings: ResolverSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Active person with this payroll number.
    pub async fn resolve_by_payroll(
        &self,
        payroll_no: &str,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        if payroll_no.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .directory
            .person_by_id(payroll_no)
            .await?
            .filter(|p| p.active_flag)
            .map(|p| ResolvedApprover::from_person(&p)))
    }

    #[instrument(skip(self, request), fields(role = %request.role_token, context = %request.location_context))]
    pub async fn resolve(
        &self,
        request: ResolutionRequest<'_>,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        let role = request.role_token.trim().to_lowercase();
        let context = request.location_context.to_lowercase();

        if role == "supervisor" || role == "hod" {
            if let Some(found) = self.supervisor_or_department_head(&request).await? {
                debug!(approver = %found.approver_id, "Resolved through supervisor chain");
                return Ok(Some(found));
            }
        }

        if role == "dispatchadmin" {
            if let Some(payroll_no) = request.parameters.payroll_no.as_deref() {
                if let Some(found) = self.resolve_by_payroll(payroll_no).await? {
                    return Ok(Some(found));
                }
            }
        }

        if context.contains("department") || (request.is_first_step && context.contains("hq")) {
            return self.department_context(&request).await;
        }

        if role.contains("field") || (!request.is_first_step && context.contains("factory")) {
            return self.field_context(&role, &request).await;
        }

        if role.contains("region") || (!request.is_first_step && context.contains("region")) {
            return self
                .first_by_designation(&self.settings.regional_designation)
                .await;
        }

        self.generic(&request).await
    }

    async fn supervisor_or_department_head(
        &self,
        request: &ResolutionRequest<'_>,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        if let Some(link) = request.requester.supervisor_payroll_no.as_deref() {
            if let Some(found) = self.resolve_by_payroll(link).await? {
                return Ok(Some(found));
            }
        }

        let colleagues = self
            .directory
            .persons_by_department(&request.requester.department_id)
            .await?;
        let roles = request.parameters.fallback_roles();
        Ok(colleagues
            .iter()
            .find(|p| roles.iter().any(|r| p.has_role(r)))
            .map(ResolvedApprover::from_person))
    }

    async fn department_context(
        &self,
        request: &ResolutionRequest<'_>,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        let department_id = match self
            .directory
            .department_by_name(request.location_context)
            .await?
        {
            Some(department) => department.department_id,
            None => request.department_id.to_string(),
        };
        let members = self.directory.persons_by_department(&department_id).await?;
        Ok(first_with_role(&members, request.role_token).map(ResolvedApprover::from_person))
    }

    async fn field_context(
        &self,
        role: &str,
        request: &ResolutionRequest<'_>,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        match role {
            "fieldsupervisor" => {
                self.first_by_designation(&self.settings.regional_ict_designation)
                    .await
            }
            "fielduser" => {
                let station_id = self.context_station(request).await?;
                if is_hq_station(&station_id) {
                    return Ok(None);
                }
                let staff = self.directory.persons_by_station(&station_id).await?;
                Ok(staff
                    .iter()
                    .find(|p| p.designation_contains(&self.settings.field_systems_designation))
                    .map(ResolvedApprover::from_person))
            }
            _ => {
                let station_id = self.context_station(request).await?;
                let staff = self.directory.persons_by_station(&station_id).await?;
                Ok(first_with_role(&staff, request.role_token).map(ResolvedApprover::from_person))
            }
        }
    }

    async fn generic(
        &self,
        request: &ResolutionRequest<'_>,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        let members = self
            .directory
            .persons_by_department(request.department_id)
            .await?;
        if let Some(found) = first_with_role(&members, request.role_token) {
            return Ok(Some(ResolvedApprover::from_person(found)));
        }

        let station_id = self.context_station(request).await?;
        let staff = self.directory.persons_by_station(&station_id).await?;
        Ok(first_with_role(&staff, request.role_token).map(ResolvedApprover::from_person))
    }

    /// Station named by the location context, else the context station id.
    async fn context_station(&self, request: &ResolutionRequest<'_>) -> Result<String, AppError> {
        Ok(match self
            .directory
            .station_by_name(request.location_context)
            .await?
        {
            Some(station) => station.station_id,
            None => request.station_id.to_string(),
        })
    }

    async fn first_by_designation(
        &self,
        designation: &str,
    ) -> Result<Option<ResolvedApprover>, AppError> {
        let holders = self.directory.persons_by_designation(designation).await?;
        Ok(holders.first().map(ResolvedApprover::from_person))
    }
}
