//! Kubernetes resource watcher.
//!
//! Wires the Project CRD into kube-runtime's Controller. A finalizer
//! routes deliveries: Apply runs the reconcile pass, Cleanup runs the
//! deletion pass before the CR is released. The controller handles
//! reconnection and retry; errors requeue with a flat backoff.

use std::sync::Arc;
use std::time::Duration;

use crds::Project;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::runtime::{watcher, Controller};
use tracing::{debug, error, info};

use crate::error::ControllerError;
use crate::reconciler::Reconciler;

/// Finalizer that keeps the CR around until the cleanup pass has run
pub const PROJECT_FINALIZER: &str = "projects.rancher.devops.io/cleanup";

async fn reconcile(cr: Arc<Project>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let api: Api<Project> = ctx.projects_api.clone();
    finalizer(&api, PROJECT_FINALIZER, cr, |event| async {
        match event {
            Finalizer::Apply(cr) => ctx.reconcile_project(&cr).await,
            Finalizer::Cleanup(cr) => ctx.delete_project(&cr).await,
        }
    })
    .await
    .map_err(|e| ControllerError::Finalizer(Box::new(e)))
}

fn error_policy(cr: Arc<Project>, error: &ControllerError, _ctx: Arc<Reconciler>) -> Action {
    error!(
        "Reconciliation error for Project {:?}: {}",
        cr.metadata.name, error
    );
    Action::requeue(Duration::from_secs(60))
}

/// Starts watching Project resources until shutdown.
pub async fn watch_projects(
    api: Api<Project>,
    reconciler: Arc<Reconciler>,
) -> Result<(), ControllerError> {
    info!("Starting Project watcher");

    Controller::new(api, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            match result {
                Ok(obj) => debug!("Reconciled Project {:?}", obj),
                Err(e) => error!("Controller error: {}", e),
            }
        })
        .await;

    Ok(())
}
