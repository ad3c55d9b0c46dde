//! Main controller implementation.
//!
//! Builds the platform client, validates connectivity, and supervises the
//! two long-running halves of the operator: the Project watcher (CR
//! deliveries) and the observe loop (downstream-cluster discovery).

use std::collections::BTreeSet;
use std::sync::Arc;

use crds::Project;
use kube::{Api, Client};
use rancher_client::{RancherClient, RancherClientTrait};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::observe::{ObserveLoop, ObserveSettings};
use crate::reconciler::{ReconcileSettings, Reconciler};
use crate::watcher::watch_projects;

/// Main controller for Project resource management.
pub struct Controller {
    project_watcher: JoinHandle<Result<(), ControllerError>>,
    observe_loop: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing Rancher project operator");

        // Create Kubernetes client
        let kube_client = Client::try_default().await.map_err(ControllerError::Kube)?;

        // Create Rancher client
        let rancher = RancherClient::new(
            config.rancher_url.clone(),
            config.credentials.clone(),
            config.allow_insecure_ssl,
        )?;

        // Validate credentials and connectivity before proceeding
        info!("Validating Rancher credentials and connectivity...");
        rancher.validate_token().await.map_err(|e| {
            error!("Failed to validate Rancher credentials: {}", e);
            error!("Please ensure:");
            error!("  1. The token or username/password is valid in Rancher");
            error!("  2. Rancher is reachable at {}", config.rancher_url);
            ControllerError::Rancher(e)
        })?;
        info!("Rancher connectivity established");

        let platform: Arc<dyn RancherClientTrait> = Arc::new(rancher);
        let projects_api: Api<Project> = Api::all(kube_client.clone());

        // Startup inventory: log what this operator currently manages
        match projects_api.list(&Default::default()).await {
            Ok(list) => {
                let clusters: BTreeSet<&str> = list
                    .items
                    .iter()
                    .map(|cr| cr.spec.cluster_name.as_str())
                    .collect();
                info!(
                    "Managing {} Project CR(s) across {} cluster(s)",
                    list.items.len(),
                    clusters.len()
                );
            }
            Err(e) => warn!("Startup inventory failed (will continue): {}", e),
        }

        let reconciler = Arc::new(Reconciler::new(
            platform.clone(),
            kube_client.clone(),
            ReconcileSettings {
                cleanup_namespaces: config.cleanup_namespaces,
            },
        ));

        let observe = Arc::new(ObserveLoop::new(
            platform,
            kube_client,
            ObserveSettings {
                method: config.observe_method,
                cluster_check_interval: config.cluster_check_interval,
                polling_interval: config.polling_interval,
            },
        ));

        let project_watcher = tokio::spawn(watch_projects(projects_api, reconciler));
        let observe_loop = tokio::spawn(observe.run());

        Ok(Self {
            project_watcher,
            observe_loop,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Rancher project operator running");

        tokio::select! {
            result = &mut self.project_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Project watcher panicked: {e}")))?
                    .map_err(|e| ControllerError::Watch(format!("Project watcher error: {e}")))?;
            }
            result = &mut self.observe_loop => {
                result.map_err(|e| ControllerError::Watch(format!("Observe loop panicked: {e}")))?;
            }
        }

        Ok(())
    }
}
