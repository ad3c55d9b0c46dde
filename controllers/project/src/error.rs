//! Controller-specific error types.
//!
//! Defines error types for the project operator that are not covered by
//! upstream library errors, plus the mapping onto the error-metric labels.

use rancher_client::RancherError;
use thiserror::Error;

/// Errors that can occur in the project operator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Rancher API error
    #[error("Rancher error: {0}")]
    Rancher(#[from] RancherError),

    /// The cluster named by the CR is not registered in the platform
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    /// A spec namespace is claimed by another Project CR
    #[error("Namespace conflict: {0}")]
    NamespaceConflict(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// CR write still conflicting after the bounded retries
    #[error("Conflict persisted after retries: {0}")]
    Conflict(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Finalizer error
    #[error("Finalizer error: {0}")]
    // NB: awkward type because finalizer::Error embeds the reconciler error
    // (which is this), so boxing this error to break cycles
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<ControllerError>>),
}

impl ControllerError {
    /// Label for the error counter, per the operator's error taxonomy.
    /// Site-specific labels (`project_creation_failed`,
    /// `namespace_processing_failed`, ...) are recorded where they occur;
    /// this covers errors surfacing at the top of a reconcile.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::ClusterNotFound(_) => "cluster_not_found",
            Self::NamespaceConflict(_) => "namespace_conflict",
            _ => "reconciliation_failed",
        }
    }
}
