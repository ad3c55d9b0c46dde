//! Project reconciliation
//!
//! Orchestrates one Project CR: policy evaluation, cluster resolution,
//! project upsert (with unconditional take-over of an existing same-name
//! project), the namespace pass, the disappearance sweep with
//! manual-removal tombstoning, the member pass, and the cleanup pass on CR
//! deletion.
//!
//! The algorithm lives in `reconcile_inner` / `delete_inner`, which touch
//! only the platform client and in-memory CR state and collect the events
//! to emit. The `Reconciler` wrapper supplies the Kubernetes side: peer
//! listing for the ownership guard, event publishing, and spec/status
//! writes through the conflict-retrying `StatusWriter`.

pub mod members;
pub mod namespaces;
#[cfg(test)]
mod namespaces_test;
#[cfg(test)]
mod members_test;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crds::{Project, ProjectMemberSpec, ProjectPhase, ProjectStatus};
use kube::runtime::controller::Action;
use kube::runtime::events::{Event, EventType, Recorder};
use kube::{Api, Client, Resource, ResourceExt};
use rancher_client::{RancherClientTrait, MANAGED_BY_KEY, MANAGED_BY_VALUE};
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::metrics;
use crate::ownership::OwnershipGuard;
use crate::policy::PolicyVector;
use crate::status::StatusWriter;
use members::{MemberReconciler, MemberStep};
use namespaces::{manual_removals, normalize_namespaces, NamespaceReconciler, NamespaceStep, SweepAction};

/// Successful reconciles are redelivered on this interval so out-of-band
/// edits (manual removals, drift) are eventually observed.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Operator settings the reconcile algorithm needs beyond the policies.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    /// Arms Delete-policy namespace deletion
    pub cleanup_namespaces: bool,
}

/// A Kubernetes event to publish on the CR once the pass finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorEvent {
    pub warning: bool,
    pub reason: &'static str,
    pub action: &'static str,
    pub note: String,
}

/// Side effects collected while reconciling, applied by the wrapper.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub events: Vec<OperatorEvent>,
    /// The in-memory spec was mutated (observe import, normalization) and
    /// must be written back
    pub spec_changed: bool,
}

impl ReconcileOutcome {
    fn normal(&mut self, reason: &'static str, action: &'static str, note: String) {
        self.events.push(OperatorEvent {
            warning: false,
            reason,
            action,
            note,
        });
    }

    fn warning(&mut self, reason: &'static str, action: &'static str, note: String) {
        self.events.push(OperatorEvent {
            warning: true,
            reason,
            action,
            note,
        });
    }
}

fn status_mut(cr: &mut Project) -> &mut ProjectStatus {
    cr.status.get_or_insert_with(ProjectStatus::default)
}

fn fail_status(cr: &mut Project, message: String, now: DateTime<Utc>) {
    let status = status_mut(cr);
    status.phase = ProjectPhase::Error;
    status.error_message = Some(message);
    status.last_reconcile_time = Some(now);
    status.last_updated_timestamp = Some(now);
}

/// The reconcile algorithm for one CR (spec upsert direction).
///
/// Mutates `cr` in place; the caller persists spec/status and publishes
/// the collected events. `peers` is the CR listing backing the ownership
/// guard for this pass.
pub(crate) async fn reconcile_inner(
    platform: &dyn RancherClientTrait,
    settings: &ReconcileSettings,
    peers: &[Project],
    cr: &mut Project,
    now: DateTime<Utc>,
    out: &mut ReconcileOutcome,
) -> Result<(), ControllerError> {
    let cr_name = cr.metadata.name.clone().ok_or_else(|| {
        ControllerError::InvalidConfig("Project missing metadata.name".to_string())
    })?;
    let policies = PolicyVector::evaluate(&cr.spec);

    out.normal(
        "ReconcileStarted",
        "Reconcile",
        format!("Reconciling Project {cr_name}"),
    );

    // A stale failure summary must not survive into this pass
    status_mut(cr).error_message = None;

    // Resolve the cluster name to its platform id
    let cluster_id = match platform.get_cluster_id_by_name(&cr.spec.cluster_name).await? {
        Some(id) => id,
        None => {
            let message = format!("Cluster '{}' not found in the platform", cr.spec.cluster_name);
            fail_status(cr, message.clone(), now);
            out.warning("ClusterNotFound", "Reconcile", message);
            metrics::RECONCILIATION_ERRORS_TOTAL
                .with_label_values(&["cluster_not_found"])
                .inc();
            return Err(ControllerError::ClusterNotFound(cr.spec.cluster_name.clone()));
        }
    };
    status_mut(cr).cluster_id = Some(cluster_id.clone());
    out.normal(
        "ClusterResolved",
        "Reconcile",
        format!("Cluster '{}' resolved to {}", cr.spec.cluster_name, cluster_id),
    );

    // Project upsert; an existing same-name project is taken over
    let project_name = cr.project_name();
    let existing = platform.get_project_by_name(&cluster_id, &project_name).await?;

    let project_id = match existing {
        None => {
            if !policies.allow_create {
                info!(
                    "Project {} does not exist and Create is not permitted, staying Pending",
                    project_name
                );
                let status = status_mut(cr);
                status.phase = ProjectPhase::Pending;
                status.last_reconcile_time = Some(now);
                status.last_updated_timestamp = Some(now);
                return Ok(());
            }

            out.normal(
                "CreatingProject",
                "Reconcile",
                format!("Creating project {project_name} in cluster {cluster_id}"),
            );

            let mut annotations = BTreeMap::new();
            annotations.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());

            match platform
                .create_project(
                    &cluster_id,
                    &project_name,
                    cr.spec.description.as_deref().unwrap_or(""),
                    annotations,
                    cr.spec.resource_quota.clone(),
                )
                .await
            {
                Ok(project) => {
                    out.normal(
                        "ProjectCreated",
                        "Reconcile",
                        format!("Created project {} ({})", project_name, project.id),
                    );
                    project.id
                }
                Err(e) => {
                    let message = format!("Failed to create project {project_name}: {e}");
                    fail_status(cr, message.clone(), now);
                    out.warning("ProjectCreationFailed", "Reconcile", message);
                    metrics::RECONCILIATION_ERRORS_TOTAL
                        .with_label_values(&["project_creation_failed"])
                        .inc();
                    return Err(ControllerError::Rancher(e));
                }
            }
        }
        Some(project) => {
            let first_bind = status_mut(cr).project_id.is_none();
            if first_bind {
                out.normal(
                    "ProjectTakenOver",
                    "Reconcile",
                    format!("Bound to existing project {} ({})", project_name, project.id),
                );
            }

            if policies.allow_observe {
                observe_import(platform, cr, &cluster_id, &project.id, out).await?;
            }

            project.id
        }
    };
    status_mut(cr).project_id = Some(project_id.clone());

    // Namespaces in spec order, lowercased and deduplicated
    let normalized = normalize_namespaces(&cr.spec.namespaces);
    if normalized != cr.spec.namespaces {
        cr.spec.namespaces = normalized.clone();
        out.spec_changed = true;
    }

    let mut tombstones: BTreeSet<String> = status_mut(cr)
        .manually_removed_namespaces
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

    // This operator's creations from earlier passes: the witness for
    // manual-removal detection and the seed for the rebuilt audit trail
    let previously_created: BTreeSet<String> = status_mut(cr)
        .created_namespaces
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

    // Manual-removal detection runs before the per-namespace loop so a
    // name deleted out-of-band is tombstoned instead of recreated
    let observed = platform.get_project_namespaces(&project_id).await?;
    let observed_names: BTreeSet<String> =
        observed.iter().map(|ns| ns.name.to_lowercase()).collect();

    for removed in manual_removals(&normalized, &observed_names, &tombstones, &previously_created) {
        warn!(
            "Namespace {} disappeared from project {} outside the operator, tombstoning",
            removed, project_id
        );
        status_mut(cr).manually_removed_namespaces.push(removed.clone());
        tombstones.insert(removed.clone());
        out.normal(
            "NamespaceManuallyRemoved",
            "Reconcile",
            format!("Namespace {removed} was removed out-of-band and will not be recreated"),
        );
    }

    // Audit trail of this operator's creations, rebuilt from scratch:
    // creations of this pass plus earlier creations still in the project
    status_mut(cr).created_namespaces.clear();

    let namespace_reconciler =
        NamespaceReconciler::new(platform, &policies, settings.cleanup_namespaces);
    let mut step_failures: Vec<String> = Vec::new();

    for name in &normalized {
        match namespace_reconciler
            .reconcile_namespace(&cluster_id, &project_id, name, &cr_name, peers, &tombstones)
            .await
        {
            Ok(NamespaceStep::Created) => {
                status_mut(cr).created_namespaces.push(name.clone());
                metrics::NAMESPACES_CREATED_TOTAL.inc();
                out.normal(
                    "NamespaceCreated",
                    "Reconcile",
                    format!("Created namespace {name}"),
                );
            }
            Ok(NamespaceStep::Assigned) => out.normal(
                "NamespaceAssigned",
                "Reconcile",
                format!("Assigned namespace {name} to the project"),
            ),
            Ok(NamespaceStep::Moved) => out.normal(
                "NamespaceMoved",
                "Reconcile",
                format!("Moved namespace {name} into the project"),
            ),
            Ok(NamespaceStep::AlreadyBound) => {
                // Still present and created by us on an earlier pass: the
                // lifetime audit trail keeps it for the delete-path cleanup
                if previously_created.contains(name) {
                    status_mut(cr).created_namespaces.push(name.clone());
                }
            }
            Ok(NamespaceStep::SkippedTombstone) | Ok(NamespaceStep::SkippedPolicy) => {}
            Ok(NamespaceStep::Conflict { claimed_by }) => {
                let message = format!(
                    "Namespace '{name}' is already claimed by another Project CR and cannot be moved."
                );
                fail_status(cr, message.clone(), now);
                out.warning(
                    "NamespaceConflict",
                    "Reconcile",
                    format!("{message} (claimed by '{claimed_by}')"),
                );
                metrics::RECONCILIATION_ERRORS_TOTAL
                    .with_label_values(&["namespace_conflict"])
                    .inc();
                return Err(ControllerError::NamespaceConflict(name.clone()));
            }
            Err(e) => {
                // One bad namespace does not abort the pass
                error!("Failed to process namespace {}: {}", name, e);
                metrics::RECONCILIATION_ERRORS_TOTAL
                    .with_label_values(&[e.metric_label()])
                    .inc();
                let message = format!("Failed to process namespace '{name}': {e}");
                let status = status_mut(cr);
                status.phase = ProjectPhase::Error;
                status.error_message = Some(message.clone());
                out.warning("NamespaceProcessingFailed", "Reconcile", message);
                step_failures.push(name.clone());
            }
        }
    }

    // Sweep namespaces that left the spec, against a fresh listing
    let current_namespaces = platform.get_project_namespaces(&project_id).await?;
    let desired: BTreeSet<String> = normalized.iter().cloned().collect();
    for action in namespace_reconciler
        .sweep(&cluster_id, &current_namespaces, &desired)
        .await
    {
        match action {
            SweepAction::Deleted(name) => out.normal(
                "NamespaceDeleted",
                "Reconcile",
                format!("Deleted namespace {name} (no longer in spec)"),
            ),
            SweepAction::Detached(name) => out.normal(
                "NamespaceRemoved",
                "Reconcile",
                format!("Removed namespace {name} from the project"),
            ),
            SweepAction::Refused(name) => out.warning(
                "NamespaceRemovalFailed",
                "Reconcile",
                format!("Namespace {name} is not managed by this operator, left untouched"),
            ),
            SweepAction::Failed { name, error: e } => {
                metrics::RECONCILIATION_ERRORS_TOTAL
                    .with_label_values(&["namespace_removal_failed"])
                    .inc();
                let message = format!("Failed to remove namespace '{name}': {e}");
                let status = status_mut(cr);
                status.phase = ProjectPhase::Error;
                status.error_message = Some(message.clone());
                out.warning("NamespaceRemovalFailed", "Reconcile", message);
                step_failures.push(name);
            }
            SweepAction::Left(_) => {}
        }
    }

    // Members in spec order; failures are isolated
    let member_reconciler = MemberReconciler::new(platform, &policies);
    let members: Vec<ProjectMemberSpec> = cr.spec.members.clone();
    status_mut(cr).configured_members.clear();

    for member in &members {
        match member_reconciler.reconcile_member(&project_id, member).await {
            Ok(MemberStep::Added { principal_id }) => {
                status_mut(cr)
                    .configured_members
                    .push(format!("{}:{}", principal_id, member.role));
                out.normal(
                    "MemberAdded",
                    "Reconcile",
                    format!("Added {} as {}", principal_id, member.role),
                );
            }
            Ok(MemberStep::AlreadyBound { principal_id }) => {
                status_mut(cr)
                    .configured_members
                    .push(format!("{}:{}", principal_id, member.role));
            }
            Ok(MemberStep::SkippedPolicy { .. }) => {}
            Err(e) => {
                warn!("Failed to add member to project {}: {}", project_id, e);
                metrics::RECONCILIATION_ERRORS_TOTAL
                    .with_label_values(&["member_add_failed"])
                    .inc();
                out.warning(
                    "MemberAddFailed",
                    "Reconcile",
                    format!("Failed to add member: {e}"),
                );
            }
        }
    }

    // Finalize
    if !step_failures.is_empty() {
        let status = status_mut(cr);
        status.last_reconcile_time = Some(now);
        status.last_updated_timestamp = Some(now);
        return Err(ControllerError::Reconciliation(format!(
            "{} namespace(s) failed to reconcile: {}",
            step_failures.len(),
            step_failures.join(", ")
        )));
    }

    let status = status_mut(cr);
    // A clean pass recovers from a previous Error phase
    if status.phase == ProjectPhase::Error {
        status.phase = ProjectPhase::Pending;
    }
    if status.project_id.is_some() && policies.allow_create {
        status.phase = ProjectPhase::Active;
    }
    status.last_reconcile_time = Some(now);
    if status.created_timestamp.is_none() && status.project_id.is_some() {
        status.created_timestamp = Some(now);
    }
    status.last_updated_timestamp = Some(now);
    status.error_message = None;

    out.normal(
        "ReconcileCompleted",
        "Reconcile",
        format!("Project {cr_name} reconciled"),
    );
    Ok(())
}

/// Observe import: fold platform state into the CR spec, one-shot per
/// empty field, and stamp the managed-by marker onto any untagged
/// namespace the project already holds.
async fn observe_import(
    platform: &dyn RancherClientTrait,
    cr: &mut Project,
    cluster_id: &str,
    project_id: &str,
    out: &mut ReconcileOutcome,
) -> Result<(), ControllerError> {
    let discovered = platform.get_project_namespaces(project_id).await?;

    let mut imported_namespaces = 0;
    if cr.spec.namespaces.is_empty() {
        for ns in &discovered {
            cr.spec.namespaces.push(ns.name.to_lowercase());
            imported_namespaces += 1;
        }
    }

    let mut imported_members = 0;
    if cr.spec.members.is_empty() {
        for member in platform.get_project_members(project_id).await? {
            if let Some(principal_id) = member.principal_id() {
                cr.spec.members.push(ProjectMemberSpec {
                    principal_id: Some(principal_id.to_string()),
                    principal_name: None,
                    role: member.role_template_id.clone(),
                });
                imported_members += 1;
            }
        }
    }

    if imported_namespaces > 0 || imported_members > 0 {
        out.spec_changed = true;
    }

    // Non-empty spec fields stay authoritative; the marker stamping below
    // still runs so observed namespaces become eligible for managed ops
    for ns in &discovered {
        if !ns.is_managed_by_operator() {
            platform
                .update_namespace_project(cluster_id, &ns.name, project_id)
                .await?;
        }
    }

    out.normal(
        "ProjectObserved",
        "Reconcile",
        format!(
            "Observed project {project_id}: imported {imported_namespaces} namespace(s), {imported_members} member(s)"
        ),
    );
    Ok(())
}

/// The cleanup algorithm for CR deletion.
///
/// Without the Delete policy the platform project is abandoned by design.
/// Otherwise the operator's own namespace creations are deleted or
/// detached per policy, and project deletion is attempted behind the
/// client's managed-by precheck.
pub(crate) async fn delete_inner(
    platform: &dyn RancherClientTrait,
    settings: &ReconcileSettings,
    cr: &Project,
    out: &mut ReconcileOutcome,
) -> Result<(), ControllerError> {
    let cr_name = cr.metadata.name.clone().ok_or_else(|| {
        ControllerError::InvalidConfig("Project missing metadata.name".to_string())
    })?;
    let policies = PolicyVector::evaluate(&cr.spec);

    out.normal(
        "DeletionStarted",
        "Delete",
        format!("Deleting Project {cr_name}"),
    );

    if !policies.allow_delete {
        info!(
            "Delete policy not granted for {}, leaving the platform project in place",
            cr_name
        );
        return Ok(());
    }

    let Some(project_id) = cr
        .status
        .as_ref()
        .and_then(|s| s.project_id.clone())
        .filter(|p| !p.is_empty())
    else {
        warn!("Project {} never bound a platform project, nothing to clean up", cr_name);
        return Ok(());
    };

    let cluster_id = cr
        .status
        .as_ref()
        .and_then(|s| s.cluster_id.clone())
        .or_else(|| rancher_client::cluster_id_of_project(&project_id).map(String::from))
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "cannot derive cluster id from project id '{project_id}'"
            ))
        })?;

    let created: Vec<String> = cr
        .status
        .as_ref()
        .map(|s| s.created_namespaces.clone())
        .unwrap_or_default();

    for name in &created {
        if policies.allow_ns_delete && settings.cleanup_namespaces {
            match platform.delete_namespace(&cluster_id, name).await {
                Ok(true) => out.normal(
                    "NamespaceDeleted",
                    "Delete",
                    format!("Deleted namespace {name}"),
                ),
                Ok(false) => out.warning(
                    "NamespaceRemovalFailed",
                    "Delete",
                    format!("Namespace {name} is not managed by this operator, left in place"),
                ),
                Err(e) => {
                    error!("Failed to delete namespace {}: {}", name, e);
                    metrics::RECONCILIATION_ERRORS_TOTAL
                        .with_label_values(&["deletion_failed"])
                        .inc();
                    out.warning(
                        "DeletionFailed",
                        "Delete",
                        format!("Failed to delete namespace {name}: {e}"),
                    );
                }
            }
        } else if policies.allow_ns_update {
            match platform.remove_namespace_from_project(&cluster_id, name).await {
                Ok(true) => out.normal(
                    "NamespaceRemoved",
                    "Delete",
                    format!("Removed namespace {name} from the project"),
                ),
                Ok(false) => out.warning(
                    "NamespaceRemovalFailed",
                    "Delete",
                    format!("Namespace {name} is not managed by this operator, left in place"),
                ),
                Err(e) => {
                    error!("Failed to detach namespace {}: {}", name, e);
                    metrics::RECONCILIATION_ERRORS_TOTAL
                        .with_label_values(&["deletion_failed"])
                        .inc();
                    out.warning(
                        "DeletionFailed",
                        "Delete",
                        format!("Failed to detach namespace {name}: {e}"),
                    );
                }
            }
        } else {
            debug!("No namespace policy permits cleaning up {}, leaving it", name);
        }
    }

    // The client's managed-by precheck decides whether the project goes
    match platform.delete_project(&project_id).await {
        Ok(true) => out.normal(
            "ProjectDeleted",
            "Delete",
            format!("Deleted project {project_id}"),
        ),
        Ok(false) => info!(
            "Project {} preserved (not created by this operator)",
            project_id
        ),
        Err(e) => {
            error!("Failed to delete project {}: {}", project_id, e);
            metrics::RECONCILIATION_ERRORS_TOTAL
                .with_label_values(&["deletion_failed"])
                .inc();
            out.warning(
                "DeletionFailed",
                "Delete",
                format!("Failed to delete project {project_id}: {e}"),
            );
        }
    }

    Ok(())
}

/// Reconciles Project CRs against the platform.
pub struct Reconciler {
    pub(crate) platform: Arc<dyn RancherClientTrait>,
    pub(crate) projects_api: Api<Project>,
    guard: OwnershipGuard,
    status_writer: StatusWriter,
    recorder: Recorder,
    settings: ReconcileSettings,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        platform: Arc<dyn RancherClientTrait>,
        client: Client,
        settings: ReconcileSettings,
    ) -> Self {
        let projects_api: Api<Project> = Api::all(client.clone());
        Self {
            platform,
            guard: OwnershipGuard::new(projects_api.clone()),
            status_writer: StatusWriter::new(projects_api.clone()),
            recorder: Recorder::new(client, "rancher-devops-operator".into()),
            projects_api,
            settings,
        }
    }

    /// Reconciles one Project CR delivery.
    pub async fn reconcile_project(&self, cr: &Project) -> Result<Action, ControllerError> {
        let name = cr.name_any();
        info!("Reconciling Project {}", name);

        metrics::RECONCILIATIONS_TOTAL.inc();
        let timer = metrics::RECONCILE_DURATION_SECONDS.start_timer();

        let peers = self.guard.list_peers().await;
        let mut working = cr.clone();
        let mut out = ReconcileOutcome::default();
        let now = Utc::now();

        let result = reconcile_inner(
            self.platform.as_ref(),
            &self.settings,
            &peers,
            &mut working,
            now,
            &mut out,
        )
        .await;
        timer.observe_duration();

        // Spec mutations (observe import, lowercase normalization) flush
        // first so the CR reflects what the rest of the pass acted on
        if out.spec_changed {
            match self.status_writer.update_spec(&working).await {
                Ok(updated) => {
                    working.metadata.resource_version = updated.metadata.resource_version;
                }
                Err(e) => warn!("Failed to update Project {} spec: {}", name, e),
            }
        }

        match &result {
            Ok(()) => {
                self.status_writer.update_status(&working).await?;
            }
            Err(e) => {
                // Top-level catch: force the Error phase, keep the most
                // specific message already recorded, write best-effort
                let status = working.status.get_or_insert_with(ProjectStatus::default);
                status.phase = ProjectPhase::Error;
                if status.error_message.is_none() {
                    status.error_message = Some(e.to_string());
                }
                status.last_reconcile_time = Some(now);
                status.last_updated_timestamp = Some(now);

                if !matches!(
                    e,
                    ControllerError::ClusterNotFound(_) | ControllerError::NamespaceConflict(_)
                ) {
                    metrics::RECONCILIATION_ERRORS_TOTAL
                        .with_label_values(&[e.metric_label()])
                        .inc();
                    out.warning("ReconcileFailed", "Reconcile", e.to_string());
                }

                if let Err(write_err) = self.status_writer.update_status(&working).await {
                    warn!(
                        "Failed to record error status for Project {}: {}",
                        name, write_err
                    );
                }
            }
        }

        self.publish_events(&working, out.events).await;

        match result {
            Ok(()) => Ok(Action::requeue(RECONCILE_INTERVAL)),
            // The conflict waits for a user edit instead of hot-requeuing
            Err(ControllerError::NamespaceConflict(_)) => Ok(Action::await_change()),
            Err(e) => Err(e),
        }
    }

    /// Cleanup pass driven by the framework finalizer on CR deletion.
    pub async fn delete_project(&self, cr: &Project) -> Result<Action, ControllerError> {
        let name = cr.name_any();
        info!("Deleting Project {}", name);

        let mut out = ReconcileOutcome::default();
        let result = delete_inner(self.platform.as_ref(), &self.settings, cr, &mut out).await;
        self.publish_events(cr, out.events).await;

        result.map(|()| Action::await_change())
    }

    async fn publish_events(&self, cr: &Project, events: Vec<OperatorEvent>) {
        let oref = cr.object_ref(&());
        for ev in events {
            let event = Event {
                type_: if ev.warning {
                    EventType::Warning
                } else {
                    EventType::Normal
                },
                reason: ev.reason.to_string(),
                note: Some(ev.note),
                action: ev.action.to_string(),
                secondary: None,
            };
            if let Err(e) = self.recorder.publish(&event, &oref).await {
                debug!("Failed to publish event {}: {}", ev.reason, e);
            }
        }
    }
}
