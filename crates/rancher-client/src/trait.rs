//! RancherClient trait for mocking
//!
//! This trait abstracts the RancherClient to enable mocking in unit tests.
//! The concrete RancherClient implements this trait, and tests use the
//! in-memory `MockRancherClient` implementation.

use std::collections::BTreeMap;

use crate::error::RancherError;
use crate::models::*;

/// Trait for Rancher API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime. Destructive methods (`delete_project`, `delete_namespace`,
/// `remove_namespace_from_project`) precheck the operator's managed-by
/// marker and return `Ok(false)` instead of acting on foreign objects.
#[async_trait::async_trait]
pub trait RancherClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the credentials and connectivity
    async fn validate_token(&self) -> Result<(), RancherError>;

    // Cluster operations

    /// Resolve a cluster name to its id; `None` when no cluster matches
    async fn get_cluster_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError>;

    /// Downstream-cluster kubeconfig for the observe loop; `None` when the
    /// cluster is unknown
    async fn get_cluster_kubeconfig(&self, cluster_id: &str) -> Result<Option<String>, RancherError>;

    // Project operations

    /// Find a project by exact (case-sensitive) name within a cluster
    async fn get_project_by_name(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Project>, RancherError>;

    /// Create a project; the caller supplies the annotations to stamp
    /// (the operator passes its managed-by marker here)
    async fn create_project(
        &self,
        cluster_id: &str,
        name: &str,
        description: &str,
        annotations: BTreeMap<String, String>,
        resource_quota: Option<serde_json::Value>,
    ) -> Result<Project, RancherError>;

    /// Delete a project. Refuses (returns `false`) when the project does
    /// not carry the operator's managed-by annotation.
    async fn delete_project(&self, project_id: &str) -> Result<bool, RancherError>;

    // Namespace operations

    /// Fetch a namespace by name; `None` when absent
    async fn get_namespace(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Namespace>, RancherError>;

    /// Create a namespace bound to `project_id`. The name must already be
    /// lowercased by the caller; the namespace is stamped with the
    /// managed-by label and annotation.
    async fn create_namespace(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Namespace, RancherError>;

    /// Move or assign a namespace to `new_project_id`, preserving labels
    /// and stamping the managed-by marker when missing
    async fn update_namespace_project(
        &self,
        cluster_id: &str,
        name: &str,
        new_project_id: &str,
    ) -> Result<(), RancherError>;

    /// Clear a namespace's project binding, keeping the namespace itself.
    /// Refuses (returns `false`) when the namespace does not carry the
    /// operator's managed-by label.
    async fn remove_namespace_from_project(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<bool, RancherError>;

    /// Delete a namespace. Refuses (returns `false`) when the namespace
    /// does not carry the operator's managed-by label.
    async fn delete_namespace(&self, cluster_id: &str, name: &str) -> Result<bool, RancherError>;

    /// All namespaces currently bound to a project
    async fn get_project_namespaces(&self, project_id: &str) -> Result<Vec<Namespace>, RancherError>;

    // Membership operations

    /// All role bindings on a project
    async fn get_project_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, RancherError>;

    /// Create a role binding for a principal on a project
    async fn create_project_member(
        &self,
        project_id: &str,
        principal_id: &str,
        role: &str,
    ) -> Result<ProjectMember, RancherError>;

    /// Resolve a principal display name to its id (case-insensitive);
    /// `None` when nothing matches
    async fn get_principal_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError>;
}
