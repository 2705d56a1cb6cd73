//! Requisition model - the material request that drives approval generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::visibility::{HasDepartmentAndStations, HasOwner};

/// A material/goods requisition.
///
/// `issue_location` / `delivery_location` are the display names used as the
/// location context when resolving approvers; `*_station_id` carry the raw
/// station identifiers used for visibility scoping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Requisition {
    pub requisition_id: Uuid,
    pub payroll_no: String,
    pub department_id: String,
    pub issue_category: String,
    pub delivery_category: String,
    pub issue_location: String,
    pub delivery_location: String,
    pub issue_station_id: String,
    pub delivery_station_id: String,
    pub dispatch_type: Option<String>,
    pub dispatch_payroll_no: Option<String>,
    pub vendor_id: Option<String>,
    pub ticket_no: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Requisition {
    /// Create a requisition owned by `payroll_no` with an empty route.
    pub fn new(payroll_no: impl Into<String>, department_id: impl Into<String>) -> Self {
        Self {
            requisition_id: Uuid::new_v4(),
            payroll_no: payroll_no.into(),
            department_id: department_id.into(),
            issue_category: String::new(),
            delivery_category: String::new(),
            issue_location: String::new(),
            delivery_location: String::new(),
            issue_station_id: String::new(),
            delivery_station_id: String::new(),
            dispatch_type: None,
            dispatch_payroll_no: None,
            vendor_id: None,
            ticket_no: None,
            created_utc: Utc::now(),
        }
    }

    pub fn issued_from(
        mut self,
        category: impl Into<String>,
        location: impl Into<String>,
        station_id: impl Into<String>,
    ) -> Self {
        self.issue_category = category.into();
        self.issue_location = location.into();
        self.issue_station_id = station_id.into();
        self
    }

    pub fn delivered_to(
        mut self,
        category: impl Into<String>,
        location: impl Into<String>,
        station_id: impl Into<String>,
    ) -> Self {
        self.delivery_category = category.into();
        self.delivery_location = location.into();
        self.delivery_station_id = station_id.into();
        self
    }

    pub fn dispatched_by(mut self, dispatch_type: impl Into<String>) -> Self {
        self.dispatch_type = Some(dispatch_type.into());
        self
    }

    pub fn with_dispatcher(mut self, payroll_no: impl Into<String>) -> Self {
        self.dispatch_payroll_no = Some(payroll_no.into());
        self
    }

    pub fn with_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }

    pub fn with_ticket(mut self, ticket_no: impl Into<String>) -> Self {
        self.ticket_no = Some(ticket_no.into());
        self
    }

    /// True when the dispatch type equals `kind`, ignoring case.
    pub fn is_dispatched_by(&self, kind: &str) -> bool {
        self.dispatch_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(kind))
    }
}

impl HasOwner for Requisition {
    fn owner_id(&self) -> &str {
        &self.payroll_no
    }
}

impl HasDepartmentAndStations for Requisition {
    fn department_id(&self) -> &str {
        &self.department_id
    }

    fn station_ids(&self) -> Vec<&str> {
        vec![&self.issue_station_id, &self.delivery_station_id]
    }
}
