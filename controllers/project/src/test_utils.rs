//! Test utilities for unit testing reconcilers
//!
//! Helpers for building Project CRs and reconcile settings, plus a seeded
//! mock platform for the common one-cluster setups.

use crds::{
    ManagementPolicy, NamespaceManagementPolicy, Project, ProjectMemberSpec, ProjectSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use rancher_client::MockRancherClient;

use crate::reconciler::ReconcileSettings;

/// Build a Project CR with the given spec namespaces and default policies
pub fn test_project(name: &str, cluster_name: &str, namespaces: &[&str]) -> Project {
    Project {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: ProjectSpec {
            cluster_name: cluster_name.to_string(),
            display_name: None,
            description: None,
            namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
            members: Vec::new(),
            resource_quota: None,
            management_policies: Vec::new(),
            namespace_management_policies: Vec::new(),
        },
        status: None,
    }
}

/// Replace both policy lists on a CR
pub fn with_policies(
    mut cr: Project,
    management: &[ManagementPolicy],
    namespace_management: &[NamespaceManagementPolicy],
) -> Project {
    cr.spec.management_policies = management.to_vec();
    cr.spec.namespace_management_policies = namespace_management.to_vec();
    cr
}

/// A member identified by principal id
pub fn member_with_id(principal_id: &str, role: &str) -> ProjectMemberSpec {
    ProjectMemberSpec {
        principal_id: Some(principal_id.to_string()),
        principal_name: None,
        role: role.to_string(),
    }
}

/// A member identified by display name only
pub fn member_with_name(principal_name: &str, role: &str) -> ProjectMemberSpec {
    ProjectMemberSpec {
        principal_id: None,
        principal_name: Some(principal_name.to_string()),
        role: role.to_string(),
    }
}

/// Reconcile settings with the namespace-cleanup switch
pub fn settings(cleanup_namespaces: bool) -> ReconcileSettings {
    ReconcileSettings { cleanup_namespaces }
}

/// A mock platform with cluster `alpha` registered as `c-1`
pub fn mock_with_alpha() -> MockRancherClient {
    let mock = MockRancherClient::new("http://rancher.test");
    mock.add_cluster("alpha", "c-1");
    mock
}
