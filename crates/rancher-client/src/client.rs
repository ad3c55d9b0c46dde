//! Rancher API client
//!
//! Implements the management API client used by the project operator.
//! Endpoints follow the Rancher v3 API layout: `/v3/clusters`,
//! `/v3/projects`, `/v3/clusters/{id}/namespaces` and
//! `/v3/projectroletemplatebindings`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::{Credentials, TokenProvider};
use crate::common::{CollectionResponse, HttpClient};
use crate::error::RancherError;
use crate::models::*;
use crate::rancher_trait::RancherClientTrait;

/// Rancher API client
pub struct RancherClient {
    http: HttpClient,
}

/// Namespace as it appears on the wire. Rancher keys cluster namespaces by
/// `id` (the namespace name) and reports an empty `projectId` for
/// unassigned namespaces; both are normalized into the typed model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNamespace {
    id: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl WireNamespace {
    fn into_model(self) -> Namespace {
        Namespace {
            name: self.id,
            project_id: self.project_id.filter(|p| !p.is_empty()),
            annotations: self.annotations,
            labels: self.labels,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedKubeconfig {
    config: String,
}

impl RancherClient {
    /// Create a new Rancher client
    ///
    /// # Arguments
    /// * `base_url` - Rancher base URL (e.g. "https://rancher.example.com")
    /// * `credentials` - API token or username/password login
    /// * `allow_insecure_ssl` - disable TLS certificate verification
    pub fn new(
        base_url: String,
        credentials: Credentials,
        allow_insecure_ssl: bool,
    ) -> Result<Self, RancherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(allow_insecure_ssl)
            .build()
            .map_err(RancherError::Http)?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http: HttpClient::new(client, base_url, TokenProvider::new(credentials)),
        })
    }

    fn namespace_path(&self, cluster_id: &str, name: &str) -> String {
        format!("/v3/clusters/{cluster_id}/namespaces/{name}")
    }

    async fn get_wire_namespace(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<WireNamespace>, RancherError> {
        match self
            .http
            .get::<WireNamespace>(&self.namespace_path(cluster_id, name))
            .await
        {
            Ok(ns) => Ok(Some(ns)),
            Err(RancherError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl RancherClientTrait for RancherClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn validate_token(&self) -> Result<(), RancherError> {
        debug!("Validating Rancher credentials and connectivity");
        let _: serde_json::Value = self.http.get("/v3").await?;
        debug!("Credentials validated successfully");
        Ok(())
    }

    async fn get_cluster_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError> {
        let query = self.http.build_query_string(&[("name", name)]);
        let clusters: CollectionResponse<Cluster> =
            self.http.get(&format!("/v3/clusters?{query}")).await?;
        Ok(clusters
            .data
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id))
    }

    async fn get_cluster_kubeconfig(
        &self,
        cluster_id: &str,
    ) -> Result<Option<String>, RancherError> {
        // Verify existence first so an unknown cluster maps to None rather
        // than a generic action failure.
        match self
            .http
            .get::<serde_json::Value>(&format!("/v3/clusters/{cluster_id}"))
            .await
        {
            Ok(_) => {}
            Err(RancherError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        let generated: GeneratedKubeconfig = self
            .http
            .post(
                &format!("/v3/clusters/{cluster_id}?action=generateKubeconfig"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(Some(generated.config))
    }

    async fn get_project_by_name(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Project>, RancherError> {
        let query = self
            .http
            .build_query_string(&[("clusterId", cluster_id), ("name", name)]);
        let projects: CollectionResponse<Project> =
            self.http.get(&format!("/v3/projects?{query}")).await?;
        // Server-side name filters are not guaranteed exact; match strictly
        Ok(projects
            .data
            .into_iter()
            .find(|p| p.cluster_id == cluster_id && p.name == name))
    }

    async fn create_project(
        &self,
        cluster_id: &str,
        name: &str,
        description: &str,
        annotations: BTreeMap<String, String>,
        resource_quota: Option<serde_json::Value>,
    ) -> Result<Project, RancherError> {
        debug!("Creating project {} in cluster {}", name, cluster_id);

        let mut body = serde_json::json!({
            "type": "project",
            "name": name,
            "description": description,
            "clusterId": cluster_id,
            "annotations": annotations,
        });
        if let Some(quota) = resource_quota {
            body["resourceQuota"] = quota;
        }

        self.http.post("/v3/projects", &body).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool, RancherError> {
        let project: Project = match self
            .http
            .get(&format!("/v3/projects/{project_id}"))
            .await
        {
            Ok(p) => p,
            Err(RancherError::NotFound(_)) => {
                warn!("Project {} no longer exists, nothing to delete", project_id);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if !project.is_managed_by_operator() {
            warn!(
                "Refusing to delete project {}: missing managed-by marker",
                project_id
            );
            return Ok(false);
        }

        self.http
            .delete(&format!("/v3/projects/{project_id}"))
            .await?;
        Ok(true)
    }

    async fn get_namespace(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Namespace>, RancherError> {
        Ok(self
            .get_wire_namespace(cluster_id, name)
            .await?
            .map(WireNamespace::into_model))
    }

    async fn create_namespace(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Namespace, RancherError> {
        let cluster_id = cluster_id_of_project(project_id).ok_or_else(|| {
            RancherError::InvalidRequest(format!("malformed project id '{project_id}'"))
        })?;

        debug!("Creating namespace {} in project {}", name, project_id);

        let body = serde_json::json!({
            "type": "namespace",
            "name": name,
            "projectId": project_id,
            "annotations": {
                MANAGED_BY_KEY: MANAGED_BY_VALUE,
                PROJECT_ID_ANNOTATION: project_id,
            },
            "labels": {
                MANAGED_BY_KEY: MANAGED_BY_VALUE,
            },
        });

        let created: WireNamespace = self
            .http
            .post(&format!("/v3/clusters/{cluster_id}/namespaces"), &body)
            .await?;
        Ok(created.into_model())
    }

    async fn update_namespace_project(
        &self,
        cluster_id: &str,
        name: &str,
        new_project_id: &str,
    ) -> Result<(), RancherError> {
        let mut ns = self
            .get_wire_namespace(cluster_id, name)
            .await?
            .ok_or_else(|| {
                RancherError::NotFound(format!("namespace {name} not found in {cluster_id}"))
            })?;

        // Labels are preserved; the managed-by marker is stamped if missing
        ns.labels
            .entry(MANAGED_BY_KEY.to_string())
            .or_insert_with(|| MANAGED_BY_VALUE.to_string());
        ns.annotations
            .entry(MANAGED_BY_KEY.to_string())
            .or_insert_with(|| MANAGED_BY_VALUE.to_string());
        ns.annotations
            .insert(PROJECT_ID_ANNOTATION.to_string(), new_project_id.to_string());

        let body = serde_json::json!({
            "type": "namespace",
            "name": name,
            "projectId": new_project_id,
            "annotations": ns.annotations,
            "labels": ns.labels,
        });

        let _: WireNamespace = self
            .http
            .put(&self.namespace_path(cluster_id, name), &body)
            .await?;
        Ok(())
    }

    async fn remove_namespace_from_project(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<bool, RancherError> {
        let mut ns = match self.get_wire_namespace(cluster_id, name).await? {
            Some(ns) => ns,
            None => {
                warn!("Namespace {} not found in {}, nothing to detach", name, cluster_id);
                return Ok(false);
            }
        };

        if !has_managed_by_marker(&ns.labels) {
            warn!(
                "Refusing to detach namespace {}: missing managed-by label",
                name
            );
            return Ok(false);
        }

        ns.annotations.remove(PROJECT_ID_ANNOTATION);
        let body = serde_json::json!({
            "type": "namespace",
            "name": name,
            "projectId": serde_json::Value::Null,
            "annotations": ns.annotations,
            "labels": ns.labels,
        });

        let _: WireNamespace = self
            .http
            .put(&self.namespace_path(cluster_id, name), &body)
            .await?;
        Ok(true)
    }

    async fn delete_namespace(&self, cluster_id: &str, name: &str) -> Result<bool, RancherError> {
        let ns = match self.get_wire_namespace(cluster_id, name).await? {
            Some(ns) => ns,
            None => {
                warn!("Namespace {} not found in {}, nothing to delete", name, cluster_id);
                return Ok(false);
            }
        };

        if !has_managed_by_marker(&ns.labels) {
            warn!(
                "Refusing to delete namespace {}: missing managed-by label",
                name
            );
            return Ok(false);
        }

        self.http
            .delete(&self.namespace_path(cluster_id, name))
            .await?;
        Ok(true)
    }

    async fn get_project_namespaces(
        &self,
        project_id: &str,
    ) -> Result<Vec<Namespace>, RancherError> {
        let cluster_id = cluster_id_of_project(project_id).ok_or_else(|| {
            RancherError::InvalidRequest(format!("malformed project id '{project_id}'"))
        })?;

        let query = self.http.build_query_string(&[("projectId", project_id)]);
        let namespaces: Vec<WireNamespace> = self
            .http
            .fetch_all_pages(&format!("/v3/clusters/{cluster_id}/namespaces?{query}"))
            .await?;

        Ok(namespaces
            .into_iter()
            .map(WireNamespace::into_model)
            .filter(|ns| ns.project_id.as_deref() == Some(project_id))
            .collect())
    }

    async fn get_project_members(
        &self,
        project_id: &str,
    ) -> Result<Vec<ProjectMember>, RancherError> {
        let query = self.http.build_query_string(&[("projectId", project_id)]);
        self.http
            .fetch_all_pages(&format!("/v3/projectroletemplatebindings?{query}"))
            .await
    }

    async fn create_project_member(
        &self,
        project_id: &str,
        principal_id: &str,
        role: &str,
    ) -> Result<ProjectMember, RancherError> {
        debug!(
            "Creating role binding {} for {} on project {}",
            role, principal_id, project_id
        );

        let principal_field = if principal_is_user(principal_id) {
            "userPrincipalId"
        } else {
            "groupPrincipalId"
        };

        let body = serde_json::json!({
            "type": "projectRoleTemplateBinding",
            "projectId": project_id,
            "roleTemplateId": role,
            principal_field: principal_id,
        });

        self.http.post("/v3/projectroletemplatebindings", &body).await
    }

    async fn get_principal_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError> {
        let principals: CollectionResponse<Principal> = self
            .http
            .post(
                "/v3/principals?action=search",
                &serde_json::json!({ "name": name }),
            )
            .await?;

        Ok(principals
            .data
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id))
    }
}
