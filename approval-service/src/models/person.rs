//! Directory models - employees, departments and stations.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Employee record as seen through the directory.
///
/// `payroll_no` is the person identifier used everywhere else (requisition
/// owner, approver id, group membership).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub payroll_no: String,
    pub display_name: String,
    pub department_id: String,
    pub station_id: String,
    pub role: String,
    pub designation: String,
    pub supervisor_payroll_no: Option<String>,
    pub active_flag: bool,
}

impl Person {
    /// Create an active person with no designation and no supervisor link.
    pub fn new(
        payroll_no: impl Into<String>,
        display_name: impl Into<String>,
        department_id: impl Into<String>,
        station_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            payroll_no: payroll_no.into(),
            display_name: display_name.into(),
            department_id: department_id.into(),
            station_id: station_id.into(),
            role: role.into(),
            designation: String::new(),
            supervisor_payroll_no: None,
            active_flag: true,
        }
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = designation.into();
        self
    }

    pub fn with_supervisor(mut self, payroll_no: impl Into<String>) -> Self {
        self.supervisor_payroll_no = Some(payroll_no.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active_flag = false;
        self
    }

    /// Case-insensitive exact role match.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }

    /// Case-insensitive substring match on the designation.
    pub fn designation_contains(&self, fragment: &str) -> bool {
        !fragment.is_empty()
            && self
                .designation
                .to_lowercase()
                .contains(&fragment.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub department_id: String,
    pub name: String,
}

impl Department {
    pub fn new(department_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            department_id: department_id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Station {
    pub station_id: String,
    pub name: String,
}

impl Station {
    pub fn new(station_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            name: name.into(),
        }
    }
}
