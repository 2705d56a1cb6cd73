//! Common test utilities for approval-service integration tests.

#![allow(dead_code)]

use approval_service::models::{
    Department, Person, Requisition, RoleGroup, RoleGroupMember, Station, WorkflowDefinition,
};
use approval_service::services::InMemoryStore;
use approval_service::workflow::ResolverSettings;
use approval_service::ApprovalService;
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,approval_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const REQUESTER: &str = "1001";
pub const SUPERVISOR: &str = "1002";
pub const HOD: &str = "1003";
pub const ADMIN: &str = "1004";
pub const FIELD_ADMIN: &str = "1005";
pub const REGIONAL: &str = "1006";
pub const REGIONAL_ICT: &str = "1007";
pub const DISPATCHER: &str = "1008";
pub const RECEIVER: &str = "1009";

/// In-memory organisation plus a service over it.
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub service: ApprovalService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(300))
    }

    pub fn with_cache_ttl(ttl: Duration) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::new());
        seed_directory(&store);
        let service = ApprovalService::from_store(store.clone(), ResolverSettings::default(), ttl);
        Self { store, service }
    }

    pub fn with_workflow(self, definition: WorkflowDefinition) -> Self {
        self.store.add_workflow(definition);
        self
    }

    /// Put `payroll_no` into a new active group with the given grants.
    pub fn grant(&self, payroll_no: &str, across_stations: bool, across_departments: bool) -> Uuid {
        let group = RoleGroup::new(
            format!("group-{}", Uuid::new_v4()),
            across_stations,
            across_departments,
        );
        let member = RoleGroupMember::new(group.group_id, payroll_no);
        let member_id = member.member_id;
        self.store.add_role_group(group);
        self.store.add_member(member);
        member_id
    }
}

fn seed_directory(store: &InMemoryStore) {
    store.add_department(Department::new("ICT", "ICT Department"));
    store.add_department(Department::new("FIN", "Finance Department"));
    store.add_station(Station::new("0", "Head Office"));
    store.add_station(Station::new("005", "Main Factory"));
    store.add_station(Station::new("007", "North Region"));

    store.add_person(
        Person::new(REQUESTER, "Alice Requester", "ICT", "005", "User").with_supervisor(SUPERVISOR),
    );
    store.add_person(Person::new(SUPERVISOR, "Bob Supervisor", "ICT", "005", "Supervisor"));
    store.add_person(Person::new(HOD, "Carol Hod", "ICT", "HQ", "Hod"));
    store.add_person(Person::new(ADMIN, "Dan Admin", "FIN", "0", "Admin"));
    store.add_person(
        Person::new(FIELD_ADMIN, "Eve Field", "OPS", "5", "User")
            .with_designation("Field Systems Administrator"),
    );
    store.add_person(
        Person::new(REGIONAL, "Frank Regional", "OPS", "007", "Manager")
            .with_designation("Regional Manager"),
    );
    store.add_person(
        Person::new(REGIONAL_ICT, "Gina Ict", "ICT", "0", "Officer")
            .with_designation("Regional ICT Officer"),
    );
    store.add_person(Person::new(DISPATCHER, "Hugo Dispatch", "ICT", "0", "Dispatcher"));
    store.add_person(Person::new(RECEIVER, "Ida Receiver", "FIN", "0", "Employee"));
}

/// Factory-to-head-office requisition raised by [`REQUESTER`].
pub fn factory_requisition() -> Requisition {
    Requisition::new(REQUESTER, "ICT")
        .issued_from("Factory", "Main Factory", "005")
        .delivered_to("HeadOffice", "Finance Department", "HQ")
}
