//! Unit tests for the member reconciler

use crate::error::ControllerError;
use crate::policy::PolicyVector;
use crate::reconciler::members::*;
use crate::test_utils::{member_with_id, member_with_name, mock_with_alpha};

fn create_allowed() -> PolicyVector {
    PolicyVector {
        allow_create: true,
        allow_delete: false,
        allow_observe: false,
        allow_ns_create: true,
        allow_ns_update: true,
        allow_ns_delete: false,
    }
}

#[tokio::test]
async fn missing_member_is_added() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    let step = reconciler
        .reconcile_member(&project.id, &member_with_id("local://user-1", "project-owner"))
        .await
        .unwrap();

    assert_eq!(
        step,
        MemberStep::Added {
            principal_id: "local://user-1".to_string()
        }
    );
    let members = mock.members_of(&project.id);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role_template_id, "project-owner");
    assert_eq!(members[0].user_principal_id.as_deref(), Some("local://user-1"));
}

#[tokio::test]
async fn existing_binding_is_not_duplicated() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_member(&project.id, "local://user-1", "project-owner");
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    let step = reconciler
        .reconcile_member(&project.id, &member_with_id("local://user-1", "project-owner"))
        .await
        .unwrap();

    assert_eq!(
        step,
        MemberStep::AlreadyBound {
            principal_id: "local://user-1".to_string()
        }
    );
    assert_eq!(mock.members_of(&project.id).len(), 1);
}

#[tokio::test]
async fn same_principal_with_new_role_gets_second_binding() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_member(&project.id, "local://user-1", "project-member");
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    let step = reconciler
        .reconcile_member(&project.id, &member_with_id("local://user-1", "project-owner"))
        .await
        .unwrap();

    assert!(matches!(step, MemberStep::Added { .. }));
    assert_eq!(mock.members_of(&project.id).len(), 2);
}

#[tokio::test]
async fn principal_name_is_resolved_before_binding() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_principal("local://user-jane", "Jane Doe");
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    let step = reconciler
        .reconcile_member(&project.id, &member_with_name("jane doe", "project-member"))
        .await
        .unwrap();

    assert_eq!(
        step,
        MemberStep::Added {
            principal_id: "local://user-jane".to_string()
        }
    );
}

#[tokio::test]
async fn unresolvable_principal_fails_the_member() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    let result = reconciler
        .reconcile_member(&project.id, &member_with_name("nobody", "project-member"))
        .await;

    assert!(matches!(result, Err(ControllerError::Reconciliation(_))));
    assert!(mock.members_of(&project.id).is_empty());
}

#[tokio::test]
async fn member_without_id_or_name_is_invalid() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let policies = create_allowed();
    let reconciler = MemberReconciler::new(&mock, &policies);

    // An empty principalId does not count as an identity
    let member = member_with_id("", "project-member");
    let result = reconciler.reconcile_member(&project.id, &member).await;

    assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
}

#[tokio::test]
async fn create_policy_gate_skips_missing_binding() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let mut policies = create_allowed();
    policies.allow_create = false;
    let reconciler = MemberReconciler::new(&mock, &policies);

    let step = reconciler
        .reconcile_member(&project.id, &member_with_id("local://user-1", "project-owner"))
        .await
        .unwrap();

    assert_eq!(
        step,
        MemberStep::SkippedPolicy {
            principal_id: "local://user-1".to_string()
        }
    );
    assert!(mock.members_of(&project.id).is_empty());
    assert!(!mock
        .calls()
        .iter()
        .any(|c| c.starts_with("create_project_member")));
}
