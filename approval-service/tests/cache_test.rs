//! Read-through configuration cache behaviour seen through the service.

mod common;

use approval_service::models::{StepDefinition, WorkflowDefinition};
use approval_service::visibility::VisibilityFilter;
use common::*;
use std::time::Duration;

fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::new("wf", "factory", "headoffice")
        .with_step(StepDefinition::new(1, "Supervisor Approval", "supervisor"))
}

#[tokio::test]
async fn workflow_reads_are_cached() {
    let app = TestApp::new().with_workflow(workflow());

    for _ in 0..3 {
        app.service
            .generate_approval_steps(&factory_requisition(), REQUESTER)
            .await
            .unwrap();
    }
    assert_eq!(app.store.workflow_reads(), 1);
}

#[tokio::test]
async fn missing_workflow_is_cached_until_upsert() {
    let app = TestApp::new();

    for _ in 0..2 {
        let approvals = app
            .service
            .generate_approval_steps(&factory_requisition(), REQUESTER)
            .await
            .unwrap();
        assert!(approvals.is_empty());
    }
    assert_eq!(app.store.workflow_reads(), 1);

    app.service.upsert_workflow_definition(&workflow()).await.unwrap();
    let approvals = app
        .service
        .generate_approval_steps(&factory_requisition(), REQUESTER)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(app.store.workflow_reads(), 2);
}

#[tokio::test]
async fn direct_store_writes_need_explicit_invalidation() {
    let app = TestApp::new().with_workflow(workflow());
    app.service
        .generate_approval_steps(&factory_requisition(), REQUESTER)
        .await
        .unwrap();

    app.store.add_workflow(
        workflow().with_step(StepDefinition::new(2, "HO Receipt", "Employee")),
    );
    let stale = app
        .service
        .generate_approval_steps(&factory_requisition(), REQUESTER)
        .await
        .unwrap();
    assert_eq!(stale.len(), 1);

    app.service.invalidate_caches();
    let fresh = app
        .service
        .generate_approval_steps(&factory_requisition(), REQUESTER)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
async fn membership_changes_through_service_take_effect() {
    let app = TestApp::new();
    let member_id = app.grant(REQUESTER, true, true);

    assert_eq!(
        app.service.visibility_filter(REQUESTER).await.unwrap(),
        VisibilityFilter::Unrestricted
    );
    app.service.visibility_filter(REQUESTER).await.unwrap();
    assert_eq!(app.store.membership_reads(), 1);

    assert!(app.service.set_membership_active(member_id, false).await.unwrap());
    assert_eq!(
        app.service.visibility_filter(REQUESTER).await.unwrap(),
        VisibilityFilter::Owner(REQUESTER.to_string())
    );
    assert_eq!(app.store.membership_reads(), 2);
}

#[tokio::test]
async fn unknown_member_is_reported() {
    let app = TestApp::new();
    assert!(!app
        .service
        .set_membership_active(uuid::Uuid::new_v4(), false)
        .await
        .unwrap());
}

#[tokio::test]
async fn zero_ttl_disables_caching() {
    let app = TestApp::with_cache_ttl(Duration::ZERO).with_workflow(workflow());

    for _ in 0..2 {
        app.service
            .generate_approval_steps(&factory_requisition(), REQUESTER)
            .await
            .unwrap();
    }
    assert_eq!(app.store.workflow_reads(), 2);
}
