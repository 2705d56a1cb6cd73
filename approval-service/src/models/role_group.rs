//! Role group models - named groups granting cross-department / cross-station
//! visibility to their members.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleGroup {
    pub group_id: Uuid,
    pub name: String,
    pub can_access_across_stations: bool,
    pub can_access_across_departments: bool,
    pub active_flag: bool,
}

impl RoleGroup {
    pub fn new(
        name: impl Into<String>,
        can_access_across_stations: bool,
        can_access_across_departments: bool,
    ) -> Self {
        Self {
            group_id: Uuid::new_v4(),
            name: name.into(),
            can_access_across_stations,
            can_access_across_departments,
            active_flag: true,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.active_flag = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleGroupMember {
    pub member_id: Uuid,
    pub group_id: Uuid,
    pub payroll_no: String,
    pub active_flag: bool,
}

impl RoleGroupMember {
    pub fn new(group_id: Uuid, payroll_no: impl Into<String>) -> Self {
        Self {
            member_id: Uuid::new_v4(),
            group_id,
            payroll_no: payroll_no.into(),
            active_flag: true,
        }
    }
}

/// A member row joined to its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleGroupMembership {
    pub member_id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    pub payroll_no: String,
    pub member_active: bool,
    pub group_active: bool,
    pub can_access_across_stations: bool,
    pub can_access_across_departments: bool,
}

impl RoleGroupMembership {
    pub fn join(group: &RoleGroup, member: &RoleGroupMember) -> Self {
        Self {
            member_id: member.member_id,
            group_id: group.group_id,
            group_name: group.name.clone(),
            payroll_no: member.payroll_no.clone(),
            member_active: member.active_flag,
            group_active: group.active_flag,
            can_access_across_stations: group.can_access_across_stations,
            can_access_across_departments: group.can_access_across_departments,
        }
    }

    /// Both the membership and its group are active.
    pub fn is_effective(&self) -> bool {
        self.member_active && self.group_active
    }
}
