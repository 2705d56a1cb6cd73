//! Step conditions: a closed table of requisition fields a step may be gated on.

use tracing::warn;

use crate::models::{Requisition, StepConditions};
use crate::services::metrics::record_generation_gap;

/// Requisition fields a condition may name.
///
/// Names are matched ignoring case and underscores, so `DispatchType`,
/// `dispatchType` and `dispatch_type` all select [`ConditionField::DispatchType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionField {
    PayrollNo,
    DepartmentId,
    IssueCategory,
    DeliveryCategory,
    IssueLocation,
    DeliveryLocation,
    IssueStationId,
    DeliveryStationId,
    DispatchType,
    DispatchPayrollNo,
    VendorId,
    TicketNo,
}

impl ConditionField {
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        let field = match key.as_str() {
            "payrollno" => Self::PayrollNo,
            "departmentid" => Self::DepartmentId,
            "issuecategory" => Self::IssueCategory,
            "deliverycategory" => Self::DeliveryCategory,
            "issuelocation" => Self::IssueLocation,
            "deliverylocation" => Self::DeliveryLocation,
            "issuestationid" => Self::IssueStationId,
            "deliverystationid" => Self::DeliveryStationId,
            "dispatchtype" => Self::DispatchType,
            "dispatchpayrollno" => Self::DispatchPayrollNo,
            "vendorid" => Self::VendorId,
            "ticketno" => Self::TicketNo,
            _ => return None,
        };
        Some(field)
    }

    /// Current value of the field. Unset optional fields read as "".
    pub fn read<'a>(&self, requisition: &'a Requisition) -> &'a str {
        match self {
            Self::PayrollNo => &requisition.payroll_no,
            Self::DepartmentId => &requisition.department_id,
            Self::IssueCategory => &requisition.issue_category,
            Self::DeliveryCategory => &requisition.delivery_category,
            Self::IssueLocation => &requisition.issue_location,
            Self::DeliveryLocation => &requisition.delivery_location,
            Self::IssueStationId => &requisition.issue_station_id,
            Self::DeliveryStationId => &requisition.delivery_station_id,
            Self::DispatchType => requisition.dispatch_type.as_deref().unwrap_or(""),
            Self::DispatchPayrollNo => requisition.dispatch_payroll_no.as_deref().unwrap_or(""),
            Self::VendorId => requisition.vendor_id.as_deref().unwrap_or(""),
            Self::TicketNo => requisition.ticket_no.as_deref().unwrap_or(""),
        }
    }
}

/// True when every condition matches `requisition`.
///
/// Values compare as exact strings. A condition naming an unknown field is
/// logged and skipped; the rest of the step's conditions still apply.
pub fn evaluate(step_name: &str, conditions: &StepConditions, requisition: &Requisition) -> bool {
    for (name, expected) in conditions.iter() {
        let Some(field) = ConditionField::parse(name) else {
            warn!(
                step = %step_name,
                field = %name,
                "Condition names an unknown requisition field - skipping condition"
            );
            record_generation_gap("malformed_condition");
            continue;
        };
        if field.read(requisition) != expected {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepDefinition;

    fn requisition() -> Requisition {
        Requisition::new("100", "ICT")
            .issued_from("factory", "Main Factory", "005")
            .delivered_to("headoffice", "HQ", "HQ")
            .dispatched_by("vendor")
            .with_vendor("V-9")
    }

    #[test]
    fn field_names_ignore_case_and_underscores() {
        assert_eq!(ConditionField::parse("DispatchType"), Some(ConditionField::DispatchType));
        assert_eq!(ConditionField::parse("dispatch_type"), Some(ConditionField::DispatchType));
        assert_eq!(ConditionField::parse("colour"), None);
    }

    #[test]
    fn both_conditions_must_match() {
        let req = requisition();
        let step = StepDefinition::new(1, "s", "hod")
            .with_condition("DispatchType", "vendor")
            .with_condition("VendorId", "V-9");
        assert!(evaluate("s", &step.conditions, &req));

        let wrong_vendor = StepDefinition::new(1, "s", "hod")
            .with_condition("DispatchType", "vendor")
            .with_condition("VendorId", "V-1");
        assert!(!evaluate("s", &wrong_vendor.conditions, &req));

        let wrong_dispatch = StepDefinition::new(1, "s", "hod")
            .with_condition("DispatchType", "admin")
            .with_condition("VendorId", "V-9");
        assert!(!evaluate("s", &wrong_dispatch.conditions, &req));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let step = StepDefinition::new(1, "s", "hod").with_condition("DispatchType", "Vendor");
        assert!(!evaluate("s", &step.conditions, &requisition()));
    }

    #[test]
    fn unknown_field_skips_only_that_condition() {
        let req = requisition();
        let passing = StepDefinition::new(1, "s", "hod")
            .with_condition("Colour", "red")
            .with_condition("DispatchType", "vendor");
        assert!(evaluate("s", &passing.conditions, &req));

        let failing = StepDefinition::new(1, "s", "hod")
            .with_condition("Colour", "red")
            .with_condition("DispatchType", "admin");
        assert!(!evaluate("s", &failing.conditions, &req));
    }

    #[test]
    fn unset_optional_field_reads_empty() {
        let req = Requisition::new("100", "ICT");
        assert_eq!(ConditionField::TicketNo.read(&req), "");
    }
}
