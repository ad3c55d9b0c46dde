//! Namespace reconciliation
//!
//! Drives a single spec namespace to its desired state against the
//! platform (create / assign / move), sweeps namespaces that left the
//! spec (delete / detach / leave), and computes manual-removal tombstones.
//!
//! Everything here depends only on the platform client and plain data, so
//! the mock client exercises it end to end.

use std::collections::BTreeSet;

use crds::Project;
use rancher_client::{Namespace, RancherClientTrait, RancherError};
use tracing::{debug, info, warn};

use crate::ownership::claimed_by_another;
use crate::policy::PolicyVector;

/// Outcome of driving one spec namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceStep {
    /// Created on the platform and bound to the project
    Created,
    /// Existing unassigned namespace was assigned to the project
    Assigned,
    /// Existing namespace was moved out of an unclaimed foreign project
    Moved,
    /// Already bound to this project
    AlreadyBound,
    /// Tombstoned by a manual removal; left alone
    SkippedTombstone,
    /// Policy does not permit the required operation
    SkippedPolicy,
    /// Claimed by another Project CR; the reconcile must abort
    Conflict { claimed_by: String },
}

/// Failure of one namespace step, tagged by operation for the error
/// counter
#[derive(Debug, thiserror::Error)]
pub enum NamespaceStepError {
    #[error("failed to create namespace: {0}")]
    Create(#[source] RancherError),
    #[error("{0}")]
    Platform(#[from] RancherError),
}

impl NamespaceStepError {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Create(_) => "namespace_creation_failed",
            Self::Platform(_) => "namespace_processing_failed",
        }
    }
}

/// Outcome of sweeping one namespace that is no longer in the spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepAction {
    Deleted(String),
    Detached(String),
    /// Destructive op refused: the namespace does not carry our marker
    Refused(String),
    Left(String),
    Failed { name: String, error: String },
}

pub struct NamespaceReconciler<'a> {
    platform: &'a dyn RancherClientTrait,
    policies: &'a PolicyVector,
    cleanup_namespaces: bool,
}

impl<'a> NamespaceReconciler<'a> {
    pub fn new(
        platform: &'a dyn RancherClientTrait,
        policies: &'a PolicyVector,
        cleanup_namespaces: bool,
    ) -> Self {
        Self {
            platform,
            policies,
            cleanup_namespaces,
        }
    }

    /// Drives one lowercased spec namespace toward `project_id`.
    ///
    /// Dispatch on the observed platform state:
    /// - absent: create when permitted
    /// - bound to this project: no-op
    /// - bound to a foreign project: conflict when another CR claims the
    ///   name, move when permitted, otherwise leave
    /// - unassigned: assign when permitted
    pub async fn reconcile_namespace(
        &self,
        cluster_id: &str,
        project_id: &str,
        name: &str,
        cr_name: &str,
        peers: &[Project],
        tombstones: &BTreeSet<String>,
    ) -> Result<NamespaceStep, NamespaceStepError> {
        if tombstones.contains(name) {
            debug!(
                "Namespace {} was manually removed from the project, skipping (tombstone)",
                name
            );
            return Ok(NamespaceStep::SkippedTombstone);
        }

        let existing = self.platform.get_namespace(cluster_id, name).await?;

        let Some(ns) = existing else {
            if !self.policies.allow_ns_create {
                info!(
                    "Namespace {} absent but namespace creation is not permitted, skipping",
                    name
                );
                return Ok(NamespaceStep::SkippedPolicy);
            }
            self.platform
                .create_namespace(project_id, name)
                .await
                .map_err(NamespaceStepError::Create)?;
            info!("Created namespace {} in project {}", name, project_id);
            return Ok(NamespaceStep::Created);
        };

        match ns.project_id.as_deref() {
            Some(current) if current == project_id => {
                debug!("Namespace {} already bound to project {}", name, project_id);
                Ok(NamespaceStep::AlreadyBound)
            }
            Some(foreign) => {
                if let Some(owner) = claimed_by_another(peers, name, cr_name) {
                    warn!(
                        "Namespace {} is claimed by Project CR {} (bound to {}), refusing to move",
                        name, owner, foreign
                    );
                    return Ok(NamespaceStep::Conflict { claimed_by: owner });
                }
                if !self.policies.allow_ns_update {
                    info!(
                        "Namespace {} bound to foreign project {} and updates are not permitted, skipping",
                        name, foreign
                    );
                    return Ok(NamespaceStep::SkippedPolicy);
                }
                self.platform
                    .update_namespace_project(cluster_id, name, project_id)
                    .await?;
                info!("Moved namespace {} from {} to {}", name, foreign, project_id);
                Ok(NamespaceStep::Moved)
            }
            None => {
                if !self.policies.allow_ns_update {
                    info!(
                        "Namespace {} is unassigned and updates are not permitted, skipping",
                        name
                    );
                    return Ok(NamespaceStep::SkippedPolicy);
                }
                self.platform
                    .update_namespace_project(cluster_id, name, project_id)
                    .await?;
                info!("Assigned namespace {} to project {}", name, project_id);
                Ok(NamespaceStep::Assigned)
            }
        }
    }

    /// Sweeps project namespaces that are no longer desired: delete when
    /// the Delete policy is granted and `CleanupNamespaces` is armed,
    /// otherwise detach when the Update policy is granted, otherwise leave.
    /// Destructive calls are gated on the managed-by marker; the client
    /// rechecks before acting.
    pub async fn sweep(
        &self,
        cluster_id: &str,
        current: &[Namespace],
        desired: &BTreeSet<String>,
    ) -> Vec<SweepAction> {
        let mut actions = Vec::new();

        for ns in current {
            if desired.contains(&ns.name.to_lowercase()) {
                continue;
            }
            let name = ns.name.clone();

            if self.policies.allow_ns_delete && self.cleanup_namespaces {
                if !ns.is_managed_by_operator() {
                    warn!("Namespace {} left the spec but is not managed by us, refusing to delete", name);
                    actions.push(SweepAction::Refused(name));
                    continue;
                }
                match self.platform.delete_namespace(cluster_id, &name).await {
                    Ok(true) => {
                        info!("Deleted namespace {} (no longer in spec)", name);
                        actions.push(SweepAction::Deleted(name));
                    }
                    Ok(false) => actions.push(SweepAction::Refused(name)),
                    Err(e) => actions.push(SweepAction::Failed {
                        name,
                        error: e.to_string(),
                    }),
                }
            } else if self.policies.allow_ns_update {
                if !ns.is_managed_by_operator() {
                    warn!("Namespace {} left the spec but is not managed by us, refusing to detach", name);
                    actions.push(SweepAction::Refused(name));
                    continue;
                }
                match self
                    .platform
                    .remove_namespace_from_project(cluster_id, &name)
                    .await
                {
                    Ok(true) => {
                        info!("Removed namespace {} from the project (namespace preserved)", name);
                        actions.push(SweepAction::Detached(name));
                    }
                    Ok(false) => actions.push(SweepAction::Refused(name)),
                    Err(e) => actions.push(SweepAction::Failed {
                        name,
                        error: e.to_string(),
                    }),
                }
            } else {
                debug!("Namespace {} left the spec but no policy permits acting on it", name);
                actions.push(SweepAction::Left(name));
            }
        }

        actions
    }
}

/// Lowercases and deduplicates the spec namespace list, preserving order.
pub fn normalize_namespaces(namespaces: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    namespaces
        .iter()
        .map(|n| n.to_lowercase())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Spec namespaces that disappeared from the platform project out-of-band:
/// in the (lowercased) spec, created by this operator on an earlier pass,
/// absent from the project now, and not already tombstoned.
///
/// The prior-creation witness keeps first-time spec entries (never
/// satisfied yet) out of the tombstone list; they go through the create
/// path instead.
pub fn manual_removals(
    spec_namespaces: &[String],
    current: &BTreeSet<String>,
    tombstones: &BTreeSet<String>,
    previously_created: &BTreeSet<String>,
) -> Vec<String> {
    spec_namespaces
        .iter()
        .map(|n| n.to_lowercase())
        .filter(|n| {
            previously_created.contains(n) && !current.contains(n) && !tombstones.contains(n)
        })
        .collect()
}
