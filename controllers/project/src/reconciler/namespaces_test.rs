//! Unit tests for the namespace reconciler

use std::collections::BTreeSet;

use rancher_client::RancherClientTrait;

use crate::policy::PolicyVector;
use crate::reconciler::namespaces::*;
use crate::test_utils::{mock_with_alpha, test_project};

fn all_allowed() -> PolicyVector {
    PolicyVector {
        allow_create: true,
        allow_delete: true,
        allow_observe: false,
        allow_ns_create: true,
        allow_ns_update: true,
        allow_ns_delete: true,
    }
}

fn no_tombstones() -> BTreeSet<String> {
    BTreeSet::new()
}

#[tokio::test]
async fn absent_namespace_is_created_with_marker() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::Created);
    let ns = mock.namespace("c-1", "ns-a").unwrap();
    assert!(ns.is_managed_by_operator());
    assert_eq!(ns.project_id.as_deref(), Some(project.id.as_str()));
}

#[tokio::test]
async fn tombstoned_namespace_is_never_created() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let tombstones: BTreeSet<String> = ["ns-a".to_string()].into_iter().collect();
    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &tombstones)
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::SkippedTombstone);
    assert!(mock.namespace("c-1", "ns-a").is_none());
    assert!(!mock
        .calls()
        .iter()
        .any(|c| c.starts_with("create_namespace")));
}

#[tokio::test]
async fn create_policy_gate_skips_absent_namespace() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    let mut policies = all_allowed();
    policies.allow_ns_create = false;
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::SkippedPolicy);
    assert!(mock.namespace("c-1", "ns-a").is_none());
}

#[tokio::test]
async fn bound_namespace_is_a_noop() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "ns-a", Some(&project.id), true);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::AlreadyBound);
    let mutating = mock.calls().into_iter().filter(|c| {
        c.starts_with("create_") || c.starts_with("update_") || c.starts_with("delete_")
    });
    assert_eq!(mutating.count(), 0);
}

#[tokio::test]
async fn unassigned_namespace_is_assigned_when_update_allowed() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "ns-a", None, false);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::Assigned);
    assert_eq!(
        mock.namespace("c-1", "ns-a").unwrap().project_id.as_deref(),
        Some(project.id.as_str())
    );
}

#[tokio::test]
async fn unassigned_namespace_is_left_without_update_policy() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "ns-a", None, false);
    let mut policies = all_allowed();
    policies.allow_ns_update = false;
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &project.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::SkippedPolicy);
    assert_eq!(mock.namespace("c-1", "ns-a").unwrap().project_id, None);
}

#[tokio::test]
async fn foreign_unclaimed_namespace_is_moved() {
    let mock = mock_with_alpha();
    let ours = mock.add_project("c-1", "P1", true);
    let theirs = mock.add_project("c-1", "Legacy", false);
    mock.add_namespace("c-1", "ns-a", Some(&theirs.id), false);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let step = reconciler
        .reconcile_namespace("c-1", &ours.id, "ns-a", "p1", &[], &no_tombstones())
        .await
        .unwrap();

    assert_eq!(step, NamespaceStep::Moved);
    assert_eq!(
        mock.namespace("c-1", "ns-a").unwrap().project_id.as_deref(),
        Some(ours.id.as_str())
    );
}

#[tokio::test]
async fn claimed_namespace_yields_conflict_and_is_not_moved() {
    let mock = mock_with_alpha();
    let ours = mock.add_project("c-1", "P2", true);
    let theirs = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "ns-shared", Some(&theirs.id), true);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let peers = vec![test_project("p1", "alpha", &["ns-shared"])];
    let step = reconciler
        .reconcile_namespace("c-1", &ours.id, "ns-shared", "p2", &peers, &no_tombstones())
        .await
        .unwrap();

    assert_eq!(
        step,
        NamespaceStep::Conflict {
            claimed_by: "p1".to_string()
        }
    );
    // The namespace stays with the claiming project
    assert_eq!(
        mock.namespace("c-1", "ns-shared").unwrap().project_id.as_deref(),
        Some(theirs.id.as_str())
    );
    assert!(!mock
        .calls()
        .iter()
        .any(|c| c.starts_with("update_namespace_project")));
}

#[tokio::test]
async fn sweep_deletes_managed_namespace_when_cleanup_armed() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "stale", Some(&project.id), true);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, true);

    let current = mock.get_project_namespaces(&project.id).await.unwrap();
    let actions = reconciler.sweep("c-1", &current, &BTreeSet::new()).await;

    assert_eq!(actions, vec![SweepAction::Deleted("stale".to_string())]);
    assert!(mock.namespace("c-1", "stale").is_none());
}

#[tokio::test]
async fn sweep_detaches_without_cleanup_flag() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "stale", Some(&project.id), true);
    // Delete policy granted but CleanupNamespaces not armed
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, false);

    let current = mock.get_project_namespaces(&project.id).await.unwrap();
    let actions = reconciler.sweep("c-1", &current, &BTreeSet::new()).await;

    assert_eq!(actions, vec![SweepAction::Detached("stale".to_string())]);
    let ns = mock.namespace("c-1", "stale").unwrap();
    assert_eq!(ns.project_id, None);
}

#[tokio::test]
async fn sweep_refuses_unmanaged_namespace() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "handmade", Some(&project.id), false);
    let policies = all_allowed();
    let reconciler = NamespaceReconciler::new(&mock, &policies, true);

    let current = mock.get_project_namespaces(&project.id).await.unwrap();
    let actions = reconciler.sweep("c-1", &current, &BTreeSet::new()).await;

    assert_eq!(actions, vec![SweepAction::Refused("handmade".to_string())]);
    assert!(mock.namespace("c-1", "handmade").is_some());
    assert!(!mock.calls().iter().any(|c| c.starts_with("delete_namespace")));
}

#[tokio::test]
async fn sweep_leaves_namespace_without_policies() {
    let mock = mock_with_alpha();
    let project = mock.add_project("c-1", "P1", true);
    mock.add_namespace("c-1", "stale", Some(&project.id), true);
    let mut policies = all_allowed();
    policies.allow_ns_update = false;
    policies.allow_ns_delete = false;
    let reconciler = NamespaceReconciler::new(&mock, &policies, true);

    let current = mock.get_project_namespaces(&project.id).await.unwrap();
    let actions = reconciler.sweep("c-1", &current, &BTreeSet::new()).await;

    assert_eq!(actions, vec![SweepAction::Left("stale".to_string())]);
    assert!(mock.namespace("c-1", "stale").is_some());
}

#[test]
fn normalization_lowercases_and_deduplicates() {
    let input = vec![
        "Ns-A".to_string(),
        "ns-b".to_string(),
        "NS-A".to_string(),
        "ns-b".to_string(),
    ];
    assert_eq!(
        normalize_namespaces(&input),
        vec!["ns-a".to_string(), "ns-b".to_string()]
    );
}

#[test]
fn manual_removals_require_prior_creation() {
    let spec = vec!["ns-a".to_string(), "ns-new".to_string()];
    let current = BTreeSet::new();
    let tombstones = BTreeSet::new();
    let previously_created: BTreeSet<String> = ["ns-a".to_string()].into_iter().collect();

    // ns-a was created by us and vanished; ns-new was never satisfied
    assert_eq!(
        manual_removals(&spec, &current, &tombstones, &previously_created),
        vec!["ns-a".to_string()]
    );
}

#[test]
fn manual_removals_skip_present_and_tombstoned_names() {
    let spec = vec!["ns-a".to_string(), "ns-b".to_string()];
    let current: BTreeSet<String> = ["ns-a".to_string()].into_iter().collect();
    let tombstones: BTreeSet<String> = ["ns-b".to_string()].into_iter().collect();
    let previously_created: BTreeSet<String> =
        ["ns-a".to_string(), "ns-b".to_string()].into_iter().collect();

    assert!(manual_removals(&spec, &current, &tombstones, &previously_created).is_empty());
}
