//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::metrics::DB_QUERY_DURATION;
use super::stores::{ApprovalStore, Directory, RoleGroupStore, WorkflowStore};
use crate::models::{
    Approval, Department, Person, Requisition, ResolutionParams, RoleGroupMembership, Station,
    StepConditions, StepDefinition, WorkflowDefinition, WorkflowKey,
};
use crate::visibility::{department_sql, station_sql, trim_sql, ScopeColumns, VisibilityFilter};

const PERSON_COLUMNS: &str = "payroll_no, display_name, department_id, station_id, role, \
     designation, supervisor_payroll_no, active_flag";

const REQUISITION_COLUMNS: &str = "requisition_id, payroll_no, department_id, issue_category, \
     delivery_category, issue_location, delivery_location, issue_station_id, delivery_station_id, \
     dispatch_type, dispatch_payroll_no, vendor_id, ticket_no, created_utc";

const APPROVAL_COLUMNS: &str = "approval_id, requisition_id, step_name, step_number, approver_id, \
     department_id, station_id, status_code, created_utc, updated_utc";

pub const REQUISITION_SCOPE: ScopeColumns = ScopeColumns {
    owner: "payroll_no",
    department: "department_id",
    stations: &["issue_station_id", "delivery_station_id"],
};

pub const APPROVAL_SCOPE: ScopeColumns = ScopeColumns {
    owner: "approver_id",
    department: "department_id",
    stations: &["station_id"],
};

/// Trimmed, lowercased `expr`; the SQL side of [`WorkflowKey::new`] and name lookups.
fn folded_sql(expr: &str) -> String {
    format!("lower({})", trim_sql(expr))
}

#[derive(FromRow)]
struct WorkflowRow {
    workflow_id: Uuid,
    name: String,
    issue_category: String,
    delivery_category: String,
}

#[derive(FromRow)]
struct StepRow {
    step_order: i32,
    step_name: String,
    approver_role: String,
    parameters: Json<BTreeMap<String, String>>,
    conditions: Json<BTreeMap<String, String>>,
}

impl From<StepRow> for StepDefinition {
    fn from(row: StepRow) -> Self {
        StepDefinition {
            order: row.step_order,
            step_name: row.step_name,
            approver_role: row.approver_role,
            parameters: ResolutionParams::from(row.parameters.0),
            conditions: StepConditions::from(row.conditions.0),
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "approval-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database("health_check", e))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn persons_where(
        &self,
        operation: &str,
        predicate: &str,
        value: &str,
    ) -> Result<Vec<Person>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM employees WHERE active_flag AND {} ORDER BY display_name, payroll_no",
            PERSON_COLUMNS, predicate
        );
        let persons = sqlx::query_as::<_, Person>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(operation, e))?;

        timer.observe_duration();
        Ok(persons)
    }

    /// Requisitions visible through `filter`, newest first.
    #[instrument(skip(self))]
    pub async fn list_requisitions_scoped(
        &self,
        filter: &VisibilityFilter,
    ) -> Result<Vec<Requisition>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_requisitions_scoped"])
            .start_timer();

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM requisitions",
            REQUISITION_COLUMNS
        ));
        filter.push_where(&mut qb, &REQUISITION_SCOPE);
        qb.push(" ORDER BY created_utc DESC");

        let rows = qb
            .build_query_as::<Requisition>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_requisitions_scoped", e))?;

        timer.observe_duration();
        Ok(rows)
    }

    /// Approvals visible through `filter`, ordered by requisition and step.
    #[instrument(skip(self))]
    pub async fn list_approvals_scoped(
        &self,
        filter: &VisibilityFilter,
    ) -> Result<Vec<Approval>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_approvals_scoped"])
            .start_timer();

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM approvals", APPROVAL_COLUMNS));
        filter.push_where(&mut qb, &APPROVAL_SCOPE);
        qb.push(" ORDER BY requisition_id, step_number");

        let rows = qb
            .build_query_as::<Approval>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("list_approvals_scoped", e))?;

        timer.observe_duration();
        Ok(rows)
    }

    #[instrument(skip(self, requisition), fields(requisition_id = %requisition.requisition_id))]
    pub async fn insert_requisition(&self, requisition: &Requisition) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_requisition"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO requisitions (requisition_id, payroll_no, department_id, issue_category,
                delivery_category, issue_location, delivery_location, issue_station_id,
                delivery_station_id, dispatch_type, dispatch_payroll_no, vendor_id, ticket_no, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(requisition.requisition_id)
        .bind(&requisition.payroll_no)
        .bind(&requisition.department_id)
        .bind(&requisition.issue_category)
        .bind(&requisition.delivery_category)
        .bind(&requisition.issue_location)
        .bind(&requisition.delivery_location)
        .bind(&requisition.issue_station_id)
        .bind(&requisition.delivery_station_id)
        .bind(&requisition.dispatch_type)
        .bind(&requisition.dispatch_payroll_no)
        .bind(&requisition.vendor_id)
        .bind(&requisition.ticket_no)
        .bind(requisition.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database("insert_requisition", e))?;

        timer.observe_duration();
        Ok(())
    }
}

#[async_trait]
impl Directory for Database {
    #[instrument(skip(self))]
    async fn person_by_id(&self, payroll_no: &str) -> Result<Option<Person>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["person_by_id"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM employees WHERE payroll_no = {}",
            PERSON_COLUMNS,
            trim_sql("$1")
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(payroll_no)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("person_by_id", e))?;

        timer.observe_duration();
        Ok(person)
    }

    #[instrument(skip(self))]
    async fn persons_by_department(&self, department_id: &str) -> Result<Vec<Person>, AppError> {
        let predicate = format!(
            "{} = {}",
            department_sql("department_id"),
            department_sql("$1")
        );
        self.persons_where("persons_by_department", &predicate, department_id)
            .await
    }

    #[instrument(skip(self))]
    async fn persons_by_station(&self, station_id: &str) -> Result<Vec<Person>, AppError> {
        let predicate = format!("{} = {}", station_sql("station_id"), station_sql("$1"));
        self.persons_where("persons_by_station", &predicate, station_id)
            .await
    }

    #[instrument(skip(self))]
    async fn persons_by_designation(&self, fragment: &str) -> Result<Vec<Person>, AppError> {
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        self.persons_where(
            "persons_by_designation",
            "strpos(lower(designation), lower($1)) > 0",
            fragment,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["department_by_name"])
            .start_timer();

        let sql = format!(
            "SELECT department_id, name FROM departments WHERE {} = {} LIMIT 1",
            folded_sql("name"),
            folded_sql("$1")
        );
        let department = sqlx::query_as::<_, Department>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("department_by_name", e))?;

        timer.observe_duration();
        Ok(department)
    }

    #[instrument(skip(self))]
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["station_by_name"])
            .start_timer();

        let sql = format!(
            "SELECT station_id, name FROM stations WHERE {} = {} LIMIT 1",
            folded_sql("name"),
            folded_sql("$1")
        );
        let station = sqlx::query_as::<_, Station>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("station_by_name", e))?;

        timer.observe_duration();
        Ok(station)
    }
}

#[async_trait]
impl WorkflowStore for Database {
    #[instrument(skip(self), fields(issue = %key.issue_category, delivery = %key.delivery_category))]
    async fn workflow_definition(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<WorkflowDefinition>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["workflow_definition"])
            .start_timer();

        let sql = format!(
            "SELECT workflow_id, name, issue_category, delivery_category \
             FROM workflow_definitions WHERE {} = $1 AND {} = $2",
            folded_sql("issue_category"),
            folded_sql("delivery_category")
        );
        let workflow = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(&key.issue_category)
            .bind(&key.delivery_category)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database("workflow_definition", e))?;

        let Some(workflow) = workflow else {
            timer.observe_duration();
            return Ok(None);
        };

        let steps = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT step_order, step_name, approver_role, parameters, conditions
            FROM workflow_steps
            WHERE workflow_id = $1
            ORDER BY step_order, position
            "#,
        )
        .bind(workflow.workflow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database("workflow_steps", e))?;

        timer.observe_duration();

        Ok(Some(WorkflowDefinition {
            workflow_id: workflow.workflow_id,
            name: workflow.name,
            issue_category: workflow.issue_category,
            delivery_category: workflow.delivery_category,
            steps: steps.into_iter().map(StepDefinition::from).collect(),
        }))
    }

    #[instrument(skip(self, definition), fields(workflow = %definition.name))]
    async fn upsert_workflow_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_workflow_definition"])
            .start_timer();
        let key = definition.key();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("upsert_workflow_definition", e))?;

        let delete = format!(
            "DELETE FROM workflow_definitions WHERE {} = $1 AND {} = $2",
            folded_sql("issue_category"),
            folded_sql("delivery_category")
        );
        sqlx::query(&delete)
            .bind(&key.issue_category)
            .bind(&key.delivery_category)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("upsert_workflow_definition", e))?;

        sqlx::query(
            r#"
            INSERT INTO workflow_definitions (workflow_id, name, issue_category, delivery_category)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(definition.workflow_id)
        .bind(&definition.name)
        .bind(&key.issue_category)
        .bind(&key.delivery_category)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("upsert_workflow_definition", e))?;

        for (position, step) in definition.steps.iter().enumerate() {
            let parameters: BTreeMap<String, String> = step.parameters.clone().into();
            sqlx::query(
                r#"
                INSERT INTO workflow_steps (workflow_id, position, step_order, step_name, approver_role, parameters, conditions)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(definition.workflow_id)
            .bind(position as i32)
            .bind(step.order)
            .bind(&step.step_name)
            .bind(&step.approver_role)
            .bind(Json(parameters))
            .bind(Json(step.conditions.as_map().clone()))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("upsert_workflow_step", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database("upsert_workflow_definition", e))?;

        timer.observe_duration();
        info!(steps = definition.steps.len(), "Workflow definition stored");
        Ok(())
    }
}

#[async_trait]
impl RoleGroupStore for Database {
    #[instrument(skip(self))]
    async fn active_memberships(
        &self,
        payroll_no: &str,
    ) -> Result<Vec<RoleGroupMembership>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["active_memberships"])
            .start_timer();

        let memberships = sqlx::query_as::<_, RoleGroupMembership>(
            r#"
            SELECT m.member_id, g.group_id, g.name AS group_name, m.payroll_no,
                   m.active_flag AS member_active, g.active_flag AS group_active,
                   g.can_access_across_stations, g.can_access_across_departments
            FROM role_group_members m
            JOIN role_groups g ON g.group_id = m.group_id
            WHERE m.payroll_no = $1 AND m.active_flag AND g.active_flag
            "#,
        )
        .bind(payroll_no)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database("active_memberships", e))?;

        timer.observe_duration();
        Ok(memberships)
    }

    #[instrument(skip(self))]
    async fn set_membership_active(
        &self,
        member_id: Uuid,
        active: bool,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_membership_active"])
            .start_timer();

        let result = sqlx::query("UPDATE role_group_members SET active_flag = $2 WHERE member_id = $1")
            .bind(member_id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database("set_membership_active", e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ApprovalStore for Database {
    #[instrument(skip(self, approvals), fields(count = approvals.len()))]
    async fn save_approvals(
        &self,
        requisition_id: Uuid,
        approvals: &[Approval],
    ) -> Result<(), AppError> {
        if approvals.iter().any(|a| a.requisition_id != requisition_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Approval batch mixes requisitions"
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_approvals"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("save_approvals", e))?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM approvals WHERE requisition_id = $1")
                .bind(requisition_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::database("save_approvals", e))?;
        if existing > 0 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Approvals already exist for requisition {}",
                requisition_id
            )));
        }

        for approval in approvals {
            sqlx::query(
                r#"
                INSERT INTO approvals (approval_id, requisition_id, step_name, step_number, approver_id,
                    department_id, station_id, status_code, created_utc, updated_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(approval.approval_id)
            .bind(approval.requisition_id)
            .bind(&approval.step_name)
            .bind(approval.step_number)
            .bind(&approval.approver_id)
            .bind(&approval.department_id)
            .bind(&approval.station_id)
            .bind(&approval.status_code)
            .bind(approval.created_utc)
            .bind(approval.updated_utc)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database("save_approvals", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database("save_approvals", e))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn approvals_for(&self, requisition_id: Uuid) -> Result<Vec<Approval>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["approvals_for"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM approvals WHERE requisition_id = $1 ORDER BY step_number",
            APPROVAL_COLUMNS
        );
        let approvals = sqlx::query_as::<_, Approval>(&sql)
            .bind(requisition_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("approvals_for", e))?;

        timer.observe_duration();
        Ok(approvals)
    }
}
