//! Workflow configuration models - definitions, step definitions, conditions and
//! per-step resolution parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::visibility::trim_id;

/// Roles consulted by the supervisor/HOD department fallback when a step does
/// not configure its own list.
pub const DEFAULT_FALLBACK_ROLES: [&str; 3] = ["Admin", "Hod", "Supervisor"];

/// Lookup key of a workflow: (issue category, delivery category), both trimmed
/// and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowKey {
    pub issue_category: String,
    pub delivery_category: String,
}

impl WorkflowKey {
    pub fn new(issue_category: &str, delivery_category: &str) -> Self {
        Self {
            issue_category: normalize_category(issue_category),
            delivery_category: normalize_category(delivery_category),
        }
    }
}

pub fn normalize_category(category: &str) -> String {
    trim_id(category).to_lowercase()
}

/// A named workflow for one (issue, delivery) category pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub workflow_id: Uuid,
    pub name: String,
    pub issue_category: String,
    pub delivery_category: String,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, issue_category: &str, delivery_category: &str) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            name: name.into(),
            issue_category: normalize_category(issue_category),
            delivery_category: normalize_category(delivery_category),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn key(&self) -> WorkflowKey {
        WorkflowKey::new(&self.issue_category, &self.delivery_category)
    }

    /// Steps in ascending `order`. Ties keep their configured position.
    pub fn ordered_steps(&self) -> Vec<&StepDefinition> {
        let mut steps: Vec<&StepDefinition> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }
}

/// One configured stage of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub order: i32,
    pub step_name: String,
    pub approver_role: String,
    #[serde(default)]
    pub parameters: ResolutionParams,
    #[serde(default)]
    pub conditions: StepConditions,
}

impl StepDefinition {
    pub fn new(order: i32, step_name: impl Into<String>, approver_role: impl Into<String>) -> Self {
        Self {
            order,
            step_name: step_name.into(),
            approver_role: approver_role.into(),
            parameters: ResolutionParams::default(),
            conditions: StepConditions::default(),
        }
    }

    pub fn with_condition(mut self, field: impl Into<String>, expected: impl Into<String>) -> Self {
        self.conditions.insert(field, expected);
        self
    }

    pub fn with_parameters(mut self, parameters: ResolutionParams) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Field-equality conditions gating a step. All entries must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepConditions(BTreeMap<String, String>);

impl StepConditions {
    pub fn insert(&mut self, field: impl Into<String>, expected: impl Into<String>) {
        self.0.insert(field.into(), expected.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for StepConditions {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Typed view of a step's resolution parameters.
///
/// Stored as a flat string map. Known keys are lifted into typed fields;
/// anything else is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ResolutionParams {
    /// `roles`: comma-separated roles for the supervisor/HOD department fallback.
    pub fallback_roles: Option<Vec<String>>,
    /// `payrollNo` (or `payroll_no`, `PayrollNo`): a fixed approver.
    pub payroll_no: Option<String>,
    pub extra: BTreeMap<String, String>,
}

const ROLES_KEY: &str = "roles";
const PAYROLL_KEY: &str = "payrollNo";

fn is_payroll_key(key: &str) -> bool {
    key.replace('_', "").eq_ignore_ascii_case("payrollno")
}

impl ResolutionParams {
    pub fn with_fallback_roles(mut self, roles: &[&str]) -> Self {
        self.fallback_roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_payroll_no(mut self, payroll_no: impl Into<String>) -> Self {
        self.payroll_no = Some(payroll_no.into());
        self
    }

    /// Configured fallback roles, or [`DEFAULT_FALLBACK_ROLES`].
    pub fn fallback_roles(&self) -> Vec<&str> {
        match &self.fallback_roles {
            Some(roles) if !roles.is_empty() => roles.iter().map(String::as_str).collect(),
            _ => DEFAULT_FALLBACK_ROLES.to_vec(),
        }
    }
}

impl From<BTreeMap<String, String>> for ResolutionParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut params = ResolutionParams::default();
        for (key, value) in map {
            let trimmed = value.trim();
            if key.eq_ignore_ascii_case(ROLES_KEY) {
                let roles: Vec<String> = trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect();
                if !roles.is_empty() {
                    params.fallback_roles = Some(roles);
                }
            } else if is_payroll_key(&key) {
                if !trimmed.is_empty() {
                    params.payroll_no = Some(trimmed.to_string());
                }
            } else {
                params.extra.insert(key, value);
            }
        }
        params
    }
}

impl From<ResolutionParams> for BTreeMap<String, String> {
    fn from(params: ResolutionParams) -> Self {
        let mut map = params.extra;
        if let Some(roles) = params.fallback_roles {
            map.insert(ROLES_KEY.to_string(), roles.join(","));
        }
        if let Some(payroll_no) = params.payroll_no {
            map.insert(PAYROLL_KEY.to_string(), payroll_no);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_lift_known_keys() {
        let params: ResolutionParams =
            serde_json::from_str(r#"{"roles": "Admin, Hod ,Supervisor", "PayrollNo": "2001", "note": "x"}"#)
                .unwrap();
        assert_eq!(params.fallback_roles(), vec!["Admin", "Hod", "Supervisor"]);
        assert_eq!(params.payroll_no.as_deref(), Some("2001"));
        assert_eq!(params.extra.get("note").map(String::as_str), Some("x"));
    }

    #[test]
    fn params_default_fallback_roles_when_absent_or_blank() {
        let params: ResolutionParams = serde_json::from_str(r#"{"roles": " , "}"#).unwrap();
        assert_eq!(params.fallback_roles(), DEFAULT_FALLBACK_ROLES.to_vec());
        assert!(params.payroll_no.is_none());
    }

    #[test]
    fn params_serialize_back_to_string_map() {
        let params = ResolutionParams::default()
            .with_fallback_roles(&["Hod"])
            .with_payroll_no("77");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"roles": "Hod", "payrollNo": "77"}));
    }

    #[test]
    fn ordered_steps_sort_by_order() {
        let wf = WorkflowDefinition::new("wf", " Factory ", "HeadOffice")
            .with_step(StepDefinition::new(2, "second", "hod"))
            .with_step(StepDefinition::new(1, "first", "supervisor"));
        let names: Vec<&str> = wf.ordered_steps().iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(wf.key(), WorkflowKey::new("factory", "headoffice"));
    }
}
