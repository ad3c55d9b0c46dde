//! Mock RancherClient for unit testing
//!
//! An in-memory implementation of `RancherClientTrait` used by reconciler
//! unit tests. State lives in `Arc<Mutex<..>>` maps so clones share one
//! platform. Every trait call is appended to a call log, letting tests
//! assert not only on end state but on which operations were (not) issued.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::RancherError;
use crate::models::*;
use crate::rancher_trait::RancherClientTrait;

/// Mock Rancher client for testing
#[derive(Clone)]
pub struct MockRancherClient {
    base_url: String,
    // name -> id
    clusters: Arc<Mutex<HashMap<String, String>>>,
    // project id -> project
    projects: Arc<Mutex<HashMap<String, Project>>>,
    // (cluster id, namespace name) -> namespace
    namespaces: Arc<Mutex<HashMap<(String, String), Namespace>>>,
    members: Arc<Mutex<Vec<ProjectMember>>>,
    principals: Arc<Mutex<Vec<Principal>>>,
    // cluster id -> kubeconfig yaml
    kubeconfigs: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockRancherClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            clusters: Arc::new(Mutex::new(HashMap::new())),
            projects: Arc::new(Mutex::new(HashMap::new())),
            namespaces: Arc::new(Mutex::new(HashMap::new())),
            members: Arc::new(Mutex::new(Vec::new())),
            principals: Arc::new(Mutex::new(Vec::new())),
            kubeconfigs: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    // Test setup helpers

    /// Register a cluster under a name (for test setup)
    pub fn add_cluster(&self, name: &str, id: &str) {
        self.clusters
            .lock()
            .unwrap()
            .insert(name.to_string(), id.to_string());
    }

    /// Seed a project (for test setup); `managed` stamps the operator marker
    pub fn add_project(&self, cluster_id: &str, name: &str, managed: bool) -> Project {
        let id = format!("{}:p-{}", cluster_id, self.next_id());
        let mut annotations = BTreeMap::new();
        if managed {
            annotations.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
        }
        let project = Project {
            id: id.clone(),
            cluster_id: cluster_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            annotations,
        };
        self.projects.lock().unwrap().insert(id, project.clone());
        project
    }

    /// Seed a namespace (for test setup); `managed` stamps the operator marker
    pub fn add_namespace(
        &self,
        cluster_id: &str,
        name: &str,
        project_id: Option<&str>,
        managed: bool,
    ) -> Namespace {
        let mut annotations = BTreeMap::new();
        let mut labels = BTreeMap::new();
        if managed {
            annotations.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
            labels.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
        }
        if let Some(pid) = project_id {
            annotations.insert(PROJECT_ID_ANNOTATION.to_string(), pid.to_string());
        }
        let ns = Namespace {
            name: name.to_string(),
            project_id: project_id.map(|p| p.to_string()),
            annotations,
            labels,
        };
        self.namespaces
            .lock()
            .unwrap()
            .insert((cluster_id.to_string(), name.to_string()), ns.clone());
        ns
    }

    /// Register a principal (for test setup)
    pub fn add_principal(&self, id: &str, name: &str) {
        self.principals.lock().unwrap().push(Principal {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Seed an existing role binding (for test setup)
    pub fn add_member(&self, project_id: &str, principal_id: &str, role: &str) -> ProjectMember {
        let member = build_member(
            format!("prtb-{}", self.next_id()),
            project_id,
            principal_id,
            role,
        );
        self.members.lock().unwrap().push(member.clone());
        member
    }

    /// Register a downstream kubeconfig (for test setup)
    pub fn set_kubeconfig(&self, cluster_id: &str, config: &str) {
        self.kubeconfigs
            .lock()
            .unwrap()
            .insert(cluster_id.to_string(), config.to_string());
    }

    // Inspection helpers

    /// Current state of a project, if present
    pub fn project(&self, project_id: &str) -> Option<Project> {
        self.projects.lock().unwrap().get(project_id).cloned()
    }

    /// Current state of a namespace, if present
    pub fn namespace(&self, cluster_id: &str, name: &str) -> Option<Namespace> {
        self.namespaces
            .lock()
            .unwrap()
            .get(&(cluster_id.to_string(), name.to_string()))
            .cloned()
    }

    /// All namespaces currently bound to a project
    pub fn namespaces_in_project(&self, project_id: &str) -> Vec<Namespace> {
        self.namespaces
            .lock()
            .unwrap()
            .values()
            .filter(|ns| ns.project_id.as_deref() == Some(project_id))
            .cloned()
            .collect()
    }

    /// All role bindings on a project
    pub fn members_of(&self, project_id: &str) -> Vec<ProjectMember> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect()
    }

    /// The ordered log of trait calls issued against this mock
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

fn build_member(id: String, project_id: &str, principal_id: &str, role: &str) -> ProjectMember {
    let (user, group) = if principal_is_user(principal_id) {
        (Some(principal_id.to_string()), None)
    } else {
        (None, Some(principal_id.to_string()))
    };
    ProjectMember {
        id,
        project_id: project_id.to_string(),
        role_template_id: role.to_string(),
        user_principal_id: user,
        group_principal_id: group,
    }
}

#[async_trait::async_trait]
impl RancherClientTrait for MockRancherClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), RancherError> {
        Ok(())
    }

    async fn get_cluster_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError> {
        self.record(format!("get_cluster_id_by_name {name}"));
        Ok(self.clusters.lock().unwrap().get(name).cloned())
    }

    async fn get_cluster_kubeconfig(
        &self,
        cluster_id: &str,
    ) -> Result<Option<String>, RancherError> {
        self.record(format!("get_cluster_kubeconfig {cluster_id}"));
        Ok(self.kubeconfigs.lock().unwrap().get(cluster_id).cloned())
    }

    async fn get_project_by_name(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Project>, RancherError> {
        self.record(format!("get_project_by_name {cluster_id}/{name}"));
        Ok(self
            .projects
            .lock()
            .unwrap()
            .values()
            .find(|p| p.cluster_id == cluster_id && p.name == name)
            .cloned())
    }

    async fn create_project(
        &self,
        cluster_id: &str,
        name: &str,
        description: &str,
        annotations: BTreeMap<String, String>,
        _resource_quota: Option<serde_json::Value>,
    ) -> Result<Project, RancherError> {
        self.record(format!("create_project {cluster_id}/{name}"));
        let id = format!("{}:p-{}", cluster_id, self.next_id());
        let project = Project {
            id: id.clone(),
            cluster_id: cluster_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            annotations,
        };
        self.projects.lock().unwrap().insert(id, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool, RancherError> {
        self.record(format!("delete_project {project_id}"));
        let mut projects = self.projects.lock().unwrap();
        match projects.get(project_id) {
            None => Ok(false),
            Some(p) if !p.is_managed_by_operator() => Ok(false),
            Some(_) => {
                projects.remove(project_id);
                Ok(true)
            }
        }
    }

    async fn get_namespace(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<Option<Namespace>, RancherError> {
        self.record(format!("get_namespace {cluster_id}/{name}"));
        Ok(self
            .namespaces
            .lock()
            .unwrap()
            .get(&(cluster_id.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_namespace(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Namespace, RancherError> {
        self.record(format!("create_namespace {project_id}/{name}"));
        let cluster_id = cluster_id_of_project(project_id)
            .ok_or_else(|| {
                RancherError::InvalidRequest(format!("malformed project id '{project_id}'"))
            })?
            .to_string();

        let mut namespaces = self.namespaces.lock().unwrap();
        let key = (cluster_id, name.to_string());
        if namespaces.contains_key(&key) {
            return Err(RancherError::Api(format!("namespace {name} already exists")));
        }

        let mut annotations = BTreeMap::new();
        annotations.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
        annotations.insert(PROJECT_ID_ANNOTATION.to_string(), project_id.to_string());
        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());

        let ns = Namespace {
            name: name.to_string(),
            project_id: Some(project_id.to_string()),
            annotations,
            labels,
        };
        namespaces.insert(key, ns.clone());
        Ok(ns)
    }

    async fn update_namespace_project(
        &self,
        cluster_id: &str,
        name: &str,
        new_project_id: &str,
    ) -> Result<(), RancherError> {
        self.record(format!(
            "update_namespace_project {cluster_id}/{name} -> {new_project_id}"
        ));
        let mut namespaces = self.namespaces.lock().unwrap();
        let ns = namespaces
            .get_mut(&(cluster_id.to_string(), name.to_string()))
            .ok_or_else(|| {
                RancherError::NotFound(format!("namespace {name} not found in {cluster_id}"))
            })?;

        ns.project_id = Some(new_project_id.to_string());
        ns.labels
            .entry(MANAGED_BY_KEY.to_string())
            .or_insert_with(|| MANAGED_BY_VALUE.to_string());
        ns.annotations
            .entry(MANAGED_BY_KEY.to_string())
            .or_insert_with(|| MANAGED_BY_VALUE.to_string());
        ns.annotations
            .insert(PROJECT_ID_ANNOTATION.to_string(), new_project_id.to_string());
        Ok(())
    }

    async fn remove_namespace_from_project(
        &self,
        cluster_id: &str,
        name: &str,
    ) -> Result<bool, RancherError> {
        self.record(format!("remove_namespace_from_project {cluster_id}/{name}"));
        let mut namespaces = self.namespaces.lock().unwrap();
        let ns = match namespaces.get_mut(&(cluster_id.to_string(), name.to_string())) {
            Some(ns) => ns,
            None => return Ok(false),
        };
        if !ns.is_managed_by_operator() {
            return Ok(false);
        }
        ns.project_id = None;
        ns.annotations.remove(PROJECT_ID_ANNOTATION);
        Ok(true)
    }

    async fn delete_namespace(&self, cluster_id: &str, name: &str) -> Result<bool, RancherError> {
        self.record(format!("delete_namespace {cluster_id}/{name}"));
        let mut namespaces = self.namespaces.lock().unwrap();
        let key = (cluster_id.to_string(), name.to_string());
        match namespaces.get(&key) {
            None => Ok(false),
            Some(ns) if !ns.is_managed_by_operator() => Ok(false),
            Some(_) => {
                namespaces.remove(&key);
                Ok(true)
            }
        }
    }

    async fn get_project_namespaces(
        &self,
        project_id: &str,
    ) -> Result<Vec<Namespace>, RancherError> {
        self.record(format!("get_project_namespaces {project_id}"));
        Ok(self.namespaces_in_project(project_id))
    }

    async fn get_project_members(
        &self,
        project_id: &str,
    ) -> Result<Vec<ProjectMember>, RancherError> {
        self.record(format!("get_project_members {project_id}"));
        Ok(self.members_of(project_id))
    }

    async fn create_project_member(
        &self,
        project_id: &str,
        principal_id: &str,
        role: &str,
    ) -> Result<ProjectMember, RancherError> {
        self.record(format!(
            "create_project_member {project_id}/{principal_id}:{role}"
        ));
        let member = build_member(
            format!("prtb-{}", self.next_id()),
            project_id,
            principal_id,
            role,
        );
        self.members.lock().unwrap().push(member.clone());
        Ok(member)
    }

    async fn get_principal_id_by_name(&self, name: &str) -> Result<Option<String>, RancherError> {
        self.record(format!("get_principal_id_by_name {name}"));
        Ok(self
            .principals
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id.clone()))
    }
}
