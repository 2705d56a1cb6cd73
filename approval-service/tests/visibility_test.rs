//! Visibility scoping of requisitions and approvals.

mod common;

use approval_service::models::{Approval, Person, Requisition, RoleGroup, RoleGroupMember};
use approval_service::visibility::VisibilityFilter;
use common::*;
use uuid::Uuid;

/// Labelled requisitions around REQUESTER's home (ICT at station 005).
fn requisitions() -> Vec<Requisition> {
    vec![
        Requisition::new("2001", "ICT ")
            .issued_from("factory", "Main Factory", "HQ")
            .delivered_to("factory", "Main Factory", "05")
            .with_ticket("home"),
        Requisition::new("2002", "ICT")
            .issued_from("region", "North Region", "007")
            .delivered_to("region", "North Region", "7")
            .with_ticket("own-department"),
        Requisition::new("2003", "FIN")
            .issued_from("factory", "Main Factory", "5")
            .delivered_to("headoffice", "Head Office", "0")
            .with_ticket("own-station"),
        Requisition::new(REQUESTER, "FIN")
            .issued_from("region", "North Region", "007")
            .delivered_to("headoffice", "Head Office", "HQ")
            .with_ticket("mine"),
    ]
}

async fn visible(app: &TestApp, payroll_no: &str) -> Vec<String> {
    app.service
        .apply_visibility_scope(requisitions(), payroll_no)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| r.ticket_no)
        .collect()
}

#[tokio::test]
async fn personal_only_sees_own_records() {
    let app = TestApp::new();
    assert_eq!(visible(&app, REQUESTER).await, vec!["mine"]);
}

#[tokio::test]
async fn group_without_grants_sees_department_at_station() {
    let app = TestApp::new();
    app.grant(REQUESTER, false, false);
    assert_eq!(visible(&app, REQUESTER).await, vec!["home"]);
}

#[tokio::test]
async fn cross_station_sees_whole_department() {
    let app = TestApp::new();
    app.grant(REQUESTER, true, false);
    assert_eq!(visible(&app, REQUESTER).await, vec!["home", "own-department"]);
}

#[tokio::test]
async fn cross_department_sees_whole_station() {
    let app = TestApp::new();
    app.grant(REQUESTER, false, true);
    assert_eq!(visible(&app, REQUESTER).await, vec!["home", "own-station"]);
}

#[tokio::test]
async fn both_grants_see_everything() {
    let app = TestApp::new();
    app.grant(REQUESTER, true, true);
    assert_eq!(
        visible(&app, REQUESTER).await,
        vec!["home", "own-department", "own-station", "mine"]
    );
}

#[tokio::test]
async fn grants_are_combined_across_groups() {
    let app = TestApp::new();
    app.grant(REQUESTER, true, false);
    app.grant(REQUESTER, false, true);

    let filter = app.service.visibility_filter(REQUESTER).await.unwrap();
    assert_eq!(filter, VisibilityFilter::Unrestricted);
}

#[tokio::test]
async fn inactive_groups_grant_nothing() {
    let app = TestApp::new();
    let group = RoleGroup::new("retired", true, true).deactivated();
    app.store.add_member(RoleGroupMember::new(group.group_id, REQUESTER));
    app.store.add_role_group(group);

    assert_eq!(visible(&app, REQUESTER).await, vec!["mine"]);
}

#[tokio::test]
async fn person_without_groups_is_filtered_by_owner() {
    let app = TestApp::new();

    let filter = app.service.visibility_filter(REQUESTER).await.unwrap();
    assert_eq!(filter, VisibilityFilter::Owner(REQUESTER.to_string()));

    let rows = app
        .service
        .apply_visibility_scope(requisitions(), REQUESTER)
        .await
        .unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r.payroll_no == REQUESTER));
}

#[tokio::test]
async fn admin_role_is_unrestricted_without_groups() {
    let app = TestApp::new();
    assert_eq!(visible(&app, ADMIN).await.len(), 4);

    app.store
        .add_person(Person::new("3001", "Lower Admin", "ICT", "005", "admin"));
    assert!(visible(&app, "3001").await.is_empty());
}

#[tokio::test]
async fn unknown_person_sees_nothing() {
    let app = TestApp::new();

    let filter = app.service.visibility_filter("9999").await.unwrap();
    assert_eq!(filter, VisibilityFilter::DenyAll);
    assert!(visible(&app, "9999").await.is_empty());

    let mine = requisitions().pop().unwrap();
    assert!(!app.service.can_access_entity(&mine, "9999").await.unwrap());
}

#[tokio::test]
async fn approvals_are_scoped_by_approver_and_context_station() {
    let app = TestApp::new();
    let requisition_id = Uuid::new_v4();
    let assigned = Approval::new(requisition_id, "Supervisor Approval", REQUESTER, "FIN", "007");
    let colleague = Approval::new(requisition_id, "HO Receipt", SUPERVISOR, "ICT", "5");

    assert!(app.service.can_access_entity(&assigned, REQUESTER).await.unwrap());
    assert!(!app.service.can_access_entity(&colleague, REQUESTER).await.unwrap());

    app.grant(REQUESTER, false, false);
    app.service.invalidate_caches();
    assert!(!app.service.can_access_entity(&assigned, REQUESTER).await.unwrap());
    assert!(app.service.can_access_entity(&colleague, REQUESTER).await.unwrap());
}

#[tokio::test]
async fn stored_listing_agrees_with_in_process_filter() {
    let app = TestApp::new();
    app.grant(REQUESTER, false, true);
    for requisition in requisitions() {
        app.store.add_requisition(requisition);
    }

    let filter = app.service.visibility_filter(REQUESTER).await.unwrap();
    let listed = app.store.list_requisitions_scoped(&filter).unwrap();
    let applied = filter.apply(app.store.requisitions());
    assert_eq!(listed, applied);
    assert_eq!(listed.len(), 2);
}
