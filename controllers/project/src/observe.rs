//! Downstream-cluster observation
//!
//! Periodically inventories the clusters referenced by Project CRs that
//! carry the Observe policy, opens a namespace watch (or poll) per
//! cluster through a platform-issued kubeconfig, and folds namespaces
//! bound to an observed project back into that CR's spec.
//!
//! Specs only ever grow here. Namespaces that vanish are surfaced as
//! tombstones by the reconciler's manual-removal pass, not by this loop.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crds::{ManagementPolicy, Project};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace as CoreNamespace;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::events::{Event, EventType, Recorder};
use kube::runtime::watcher;
use kube::{Api, Client, Config, Resource, ResourceExt};
use rancher_client::{RancherClientTrait, PROJECT_ID_ANNOTATION};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ObserveMethod;
use crate::error::ControllerError;
use crate::status::StatusWriter;

/// Backoff between reconnect attempts of a broken namespace watch stream
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Observe loop settings (from configuration)
#[derive(Debug, Clone, Copy)]
pub struct ObserveSettings {
    pub method: ObserveMethod,
    pub cluster_check_interval: Duration,
    pub polling_interval: Duration,
}

struct ClusterWatch {
    handle: JoinHandle<()>,
}

/// Watches downstream clusters and imports discovered namespaces.
pub struct ObserveLoop {
    platform: Arc<dyn RancherClientTrait>,
    projects_api: Api<Project>,
    status_writer: StatusWriter,
    recorder: Recorder,
    settings: ObserveSettings,
    /// Active per-cluster watch tasks, keyed by cluster name
    watches: Mutex<HashMap<String, ClusterWatch>>,
}

impl ObserveLoop {
    pub fn new(
        platform: Arc<dyn RancherClientTrait>,
        client: Client,
        settings: ObserveSettings,
    ) -> Self {
        let projects_api: Api<Project> = Api::all(client.clone());
        Self {
            platform,
            projects_api: projects_api.clone(),
            status_writer: StatusWriter::new(projects_api),
            recorder: Recorder::new(client, "rancher-devops-operator".into()),
            settings,
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Runs until the surrounding task is cancelled.
    pub async fn run(self: Arc<Self>) {
        if self.settings.method == ObserveMethod::None {
            info!("Observe loop disabled (method none)");
            loop {
                sleep(Duration::from_secs(3600)).await;
            }
        }

        info!("Starting observe loop ({:?} mode)", self.settings.method);
        loop {
            if let Err(e) = self.clone().refresh_clusters().await {
                warn!("Observe loop cluster refresh failed: {}", e);
            }
            sleep(self.settings.cluster_check_interval).await;
        }
    }

    /// Aligns the watched-cluster set with the clusters referenced by CRs
    /// carrying the Observe policy.
    async fn refresh_clusters(self: Arc<Self>) -> Result<(), ControllerError> {
        let crs = self.projects_api.list(&ListParams::default()).await?.items;
        let desired: BTreeSet<String> = crs
            .iter()
            .filter(|cr| cr.has_management_policy(ManagementPolicy::Observe))
            .map(|cr| cr.spec.cluster_name.clone())
            .collect();

        // Cancel watches for clusters no CR observes anymore
        {
            let mut watches = self.watches.lock().await;
            let stale: Vec<String> = watches
                .keys()
                .filter(|cluster| !desired.contains(*cluster))
                .cloned()
                .collect();
            for cluster in stale {
                if let Some(watch) = watches.remove(&cluster) {
                    info!("Stopping namespace watch for cluster {}", cluster);
                    watch.handle.abort();
                }
            }
        }

        for cluster_name in desired {
            if self.watches.lock().await.contains_key(&cluster_name) {
                continue;
            }
            match self.open_cluster(&cluster_name).await {
                Ok(client) => {
                    info!("Watching namespaces in cluster {}", cluster_name);
                    let handle = match self.settings.method {
                        ObserveMethod::Watch => {
                            tokio::spawn(self.clone().watch_cluster(cluster_name.clone(), client))
                        }
                        ObserveMethod::Poll => {
                            tokio::spawn(self.clone().poll_cluster(cluster_name.clone(), client))
                        }
                        ObserveMethod::None => continue,
                    };
                    self.watches
                        .lock()
                        .await
                        .insert(cluster_name, ClusterWatch { handle });
                }
                Err(e) => warn!("Cannot open downstream cluster {}: {}", cluster_name, e),
            }
        }

        Ok(())
    }

    /// Resolves a cluster and builds a client from its platform-issued
    /// kubeconfig.
    async fn open_cluster(&self, cluster_name: &str) -> Result<Client, ControllerError> {
        let cluster_id = self
            .platform
            .get_cluster_id_by_name(cluster_name)
            .await?
            .ok_or_else(|| ControllerError::ClusterNotFound(cluster_name.to_string()))?;

        let kubeconfig_yaml = self
            .platform
            .get_cluster_kubeconfig(&cluster_id)
            .await?
            .ok_or_else(|| {
                ControllerError::Watch(format!("no kubeconfig available for cluster {cluster_name}"))
            })?;

        let kubeconfig = Kubeconfig::from_yaml(&kubeconfig_yaml).map_err(|e| {
            ControllerError::Watch(format!("invalid kubeconfig for {cluster_name}: {e}"))
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                ControllerError::Watch(format!("kubeconfig for {cluster_name} not usable: {e}"))
            })?;
        Client::try_from(config).map_err(ControllerError::Kube)
    }

    /// Watch mode: streaming namespace watch with reconnect backoff.
    async fn watch_cluster(self: Arc<Self>, cluster_name: String, client: Client) {
        let api: Api<CoreNamespace> = Api::all(client);
        loop {
            let mut stream = watcher(api.clone(), watcher::Config::default()).boxed();
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::Apply(ns)) | Ok(watcher::Event::InitApply(ns)) => {
                        if let Err(e) = self.process_namespace(&cluster_name, &ns).await {
                            warn!(
                                "Failed to process namespace event in {}: {}",
                                cluster_name, e
                            );
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            "Namespace watch for {} terminated: {}, reconnecting in {:?}",
                            cluster_name, e, RECONNECT_BACKOFF
                        );
                        break;
                    }
                }
            }
            sleep(RECONNECT_BACKOFF).await;
        }
    }

    /// Poll mode: full namespace listing per polling interval.
    async fn poll_cluster(self: Arc<Self>, cluster_name: String, client: Client) {
        let api: Api<CoreNamespace> = Api::all(client);
        loop {
            match api.list(&ListParams::default()).await {
                Ok(namespaces) => {
                    for ns in namespaces {
                        if let Err(e) = self.process_namespace(&cluster_name, &ns).await {
                            warn!(
                                "Failed to process namespace {} in {}: {}",
                                ns.name_any(),
                                cluster_name,
                                e
                            );
                        }
                    }
                }
                Err(e) => warn!("Namespace poll for {} failed: {}", cluster_name, e),
            }
            sleep(self.settings.polling_interval).await;
        }
    }

    /// Imports one observed namespace into the first observing CR bound to
    /// its project, if the spec does not already carry it.
    async fn process_namespace(
        &self,
        cluster_name: &str,
        ns: &CoreNamespace,
    ) -> Result<(), ControllerError> {
        let Some(project_id) = ns.annotations().get(PROJECT_ID_ANNOTATION) else {
            return Ok(());
        };
        let ns_name = ns.name_any();

        let crs = self.projects_api.list(&ListParams::default()).await?.items;
        let observers: Vec<&Project> = crs
            .iter()
            .filter(|cr| cr.has_management_policy(ManagementPolicy::Observe))
            .collect();
        let Some(target) = find_import_target(&observers, cluster_name, project_id, &ns_name)
        else {
            return Ok(());
        };

        let mut updated = target.clone();
        updated.spec.namespaces.push(ns_name.to_lowercase());
        self.status_writer.update_spec(&updated).await?;

        info!(
            "Discovered namespace {} for Project {}",
            ns_name,
            updated.name_any()
        );
        let event = Event {
            type_: EventType::Normal,
            reason: "NamespaceDiscovered".to_string(),
            note: Some(format!(
                "Imported namespace {ns_name} discovered in cluster {cluster_name}"
            )),
            action: "Observe".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &updated.object_ref(&())).await {
            debug!("Failed to publish NamespaceDiscovered event: {}", e);
        }
        Ok(())
    }
}

/// First observing CR on `cluster_name` whose bound project matches
/// `project_id` and whose spec does not already carry `ns_name`
/// (case-insensitive).
pub(crate) fn find_import_target<'a>(
    observers: &[&'a Project],
    cluster_name: &str,
    project_id: &str,
    ns_name: &str,
) -> Option<&'a Project> {
    observers.iter().copied().find(|cr| {
        cr.spec.cluster_name == cluster_name
            && cr.status.as_ref().and_then(|s| s.project_id.as_deref()) == Some(project_id)
            && !cr
                .spec
                .namespaces
                .iter()
                .any(|n| n.eq_ignore_ascii_case(ns_name))
    })
}

#[cfg(test)]
mod tests {
    use crds::ProjectStatus;

    use super::*;
    use crate::test_utils::test_project;

    fn observer(name: &str, cluster: &str, project_id: &str, namespaces: &[&str]) -> Project {
        let mut cr = test_project(name, cluster, namespaces);
        cr.status = Some(ProjectStatus {
            project_id: Some(project_id.to_string()),
            ..Default::default()
        });
        cr
    }

    #[test]
    fn target_matches_cluster_project_and_missing_name() {
        let p1 = observer("p1", "alpha", "c-1:p-1", &["ns-a"]);
        let p2 = observer("p2", "alpha", "c-1:p-2", &[]);
        let observers = vec![&p1, &p2];

        let target = find_import_target(&observers, "alpha", "c-1:p-2", "ns-new").unwrap();
        assert_eq!(target.metadata.name.as_deref(), Some("p2"));
    }

    #[test]
    fn namespace_already_in_spec_is_not_reimported() {
        let p1 = observer("p1", "alpha", "c-1:p-1", &["Ns-A"]);
        let observers = vec![&p1];

        // case-insensitive: ns-a is already present as Ns-A
        assert!(find_import_target(&observers, "alpha", "c-1:p-1", "ns-a").is_none());
    }

    #[test]
    fn cluster_and_project_must_both_match() {
        let p1 = observer("p1", "alpha", "c-1:p-1", &[]);
        let observers = vec![&p1];

        assert!(find_import_target(&observers, "beta", "c-1:p-1", "ns-a").is_none());
        assert!(find_import_target(&observers, "alpha", "c-1:p-9", "ns-a").is_none());
    }

    #[test]
    fn unbound_cr_is_skipped() {
        let mut p1 = test_project("p1", "alpha", &[]);
        p1.status = None;
        let observers = vec![&p1];

        assert!(find_import_target(&observers, "alpha", "c-1:p-1", "ns-a").is_none());
    }

    #[test]
    fn first_matching_cr_wins() {
        let p1 = observer("p1", "alpha", "c-1:p-1", &[]);
        let p2 = observer("p2", "alpha", "c-1:p-1", &[]);
        let observers = vec![&p1, &p2];

        let target = find_import_target(&observers, "alpha", "c-1:p-1", "ns-a").unwrap();
        assert_eq!(target.metadata.name.as_deref(), Some("p1"));
    }
}
