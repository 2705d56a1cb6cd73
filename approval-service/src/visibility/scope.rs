//! Visibility scope computation.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::filter::VisibilityFilter;
use crate::models::{Person, RoleGroupMembership};
use crate::services::metrics::record_scope_computation;
use crate::services::stores::{Directory, RoleGroupStore};
use service_core::error::AppError;

/// Role value that bypasses group-based scoping. Compared case-sensitively.
pub const ADMIN_ROLE: &str = "Admin";

/// Read-access tier of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityScope {
    /// No active group membership: only records the person owns.
    PersonalOnly,
    /// Member of groups granting nothing: home department at home station.
    DepartmentAtStation,
    /// Cross-station grant only: home department at every station.
    CrossStation,
    /// Cross-department grant only: every department at the home station.
    CrossDepartment,
    Unrestricted,
}

impl VisibilityScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalOnly => "personal_only",
            Self::DepartmentAtStation => "department_at_station",
            Self::CrossStation => "cross_station",
            Self::CrossDepartment => "cross_department",
            Self::Unrestricted => "unrestricted",
        }
    }

    fn from_grants(across_stations: bool, across_departments: bool) -> Self {
        match (across_stations, across_departments) {
            (true, true) => Self::Unrestricted,
            (true, false) => Self::CrossStation,
            (false, true) => Self::CrossDepartment,
            (false, false) => Self::DepartmentAtStation,
        }
    }
}

/// Compute the scope of `person` from their memberships.
///
/// Grants are OR-ed across every effective (member and group active)
/// membership, so one group can grant what another withholds.
pub fn compute_scope(person: &Person, memberships: &[RoleGroupMembership]) -> VisibilityScope {
    if person.role == ADMIN_ROLE {
        return VisibilityScope::Unrestricted;
    }

    let mut effective = memberships.iter().filter(|m| m.is_effective()).peekable();
    if effective.peek().is_none() {
        return VisibilityScope::PersonalOnly;
    }

    let (stations, departments) = effective.fold((false, false), |(s, d), m| {
        (
            s || m.can_access_across_stations,
            d || m.can_access_across_departments,
        )
    });
    VisibilityScope::from_grants(stations, departments)
}

/// Resolves people to scopes and filters through the directory and role-group
/// stores.
#[derive(Clone)]
pub struct ScopeResolver {
    directory: Arc<dyn Directory>,
    role_groups: Arc<dyn RoleGroupStore>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<dyn Directory>, role_groups: Arc<dyn RoleGroupStore>) -> Self {
        Self {
            directory,
            role_groups,
        }
    }

    #[instrument(skip(self, person), fields(payroll_no = %person.payroll_no))]
    pub async fn scope_for(&self, person: &Person) -> Result<VisibilityScope, AppError> {
        let scope = if person.role == ADMIN_ROLE {
            VisibilityScope::Unrestricted
        } else {
            let memberships = self
                .role_groups
                .active_memberships(&person.payroll_no)
                .await?;
            compute_scope(person, &memberships)
        };

        record_scope_computation(scope.as_str());
        debug!(scope = scope.as_str(), "Visibility scope computed");
        Ok(scope)
    }

    /// Filter for the person behind `payroll_no`. Unknown people see nothing.
    #[instrument(skip(self))]
    pub async fn filter_for(&self, payroll_no: &str) -> Result<VisibilityFilter, AppError> {
        match self.directory.person_by_id(payroll_no).await? {
            Some(person) => {
                let scope = self.scope_for(&person).await?;
                Ok(VisibilityFilter::for_person(scope, &person))
            }
            None => {
                warn!(payroll_no = %payroll_no, "Unknown person - denying all records");
                record_scope_computation("unknown_person");
                Ok(VisibilityFilter::DenyAll)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoleGroup, RoleGroupMember};

    fn membership(stations: bool, departments: bool) -> RoleGroupMembership {
        let group = RoleGroup::new("g", stations, departments);
        let member = RoleGroupMember::new(group.group_id, "100");
        RoleGroupMembership::join(&group, &member)
    }

    fn person(role: &str) -> Person {
        Person::new("100", "Ann", "ICT", "005", role)
    }

    #[test]
    fn no_membership_is_personal_only() {
        assert_eq!(compute_scope(&person("User"), &[]), VisibilityScope::PersonalOnly);
    }

    #[test]
    fn membership_without_grants_is_department_at_station() {
        assert_eq!(
            compute_scope(&person("User"), &[membership(false, false)]),
            VisibilityScope::DepartmentAtStation
        );
    }

    #[test]
    fn single_grants_map_to_their_tier() {
        assert_eq!(
            compute_scope(&person("User"), &[membership(true, false)]),
            VisibilityScope::CrossStation
        );
        assert_eq!(
            compute_scope(&person("User"), &[membership(false, true)]),
            VisibilityScope::CrossDepartment
        );
    }

    #[test]
    fn inactive_group_or_member_is_ignored() {
        let mut inactive_member = membership(true, true);
        inactive_member.member_active = false;
        let mut inactive_group = membership(true, true);
        inactive_group.group_active = false;
        assert_eq!(
            compute_scope(&person("User"), &[inactive_member, inactive_group]),
            VisibilityScope::PersonalOnly
        );
    }

    #[test]
    fn admin_role_is_case_sensitive() {
        assert_eq!(compute_scope(&person("Admin"), &[]), VisibilityScope::Unrestricted);
        assert_eq!(compute_scope(&person("admin"), &[]), VisibilityScope::PersonalOnly);
    }
}
