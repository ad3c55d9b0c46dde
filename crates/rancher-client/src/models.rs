//! Rancher API models
//!
//! Typed models for the management API objects the operator consumes.
//! Collection endpoints wrap these in `{"data": [...]}` envelopes which the
//! client unwraps before handing objects back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Annotation/label key marking objects created by this operator.
pub const MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";

/// Marker value identifying this operator.
pub const MANAGED_BY_VALUE: &str = "rancher-devops-operator";

/// Annotation carrying a namespace's project binding on downstream clusters.
pub const PROJECT_ID_ANNOTATION: &str = "field.cattle.io/projectId";

/// Returns true when the given marker map carries this operator's
/// managed-by marker. Projects carry it in annotations, namespaces in both
/// annotations and labels; destructive calls check before acting.
pub fn has_managed_by_marker(markers: &BTreeMap<String, String>) -> bool {
    markers.get(MANAGED_BY_KEY).map(String::as_str) == Some(MANAGED_BY_VALUE)
}

/// Platform-convention heuristic: principal ids containing `user` denote
/// user principals (`local://user-abc`), anything else is treated as a
/// group principal.
pub fn principal_is_user(principal_id: &str) -> bool {
    principal_id.contains("user")
}

/// Splits a composite project id (`<clusterId>:<projectId>`) into its
/// cluster part. Returns `None` when the id does not carry a separator.
pub fn cluster_id_of_project(project_id: &str) -> Option<&str> {
    let (cluster, rest) = project_id.split_once(':')?;
    if cluster.is_empty() || rest.is_empty() {
        return None;
    }
    Some(cluster)
}

/// A downstream cluster registered in the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,
}

/// A platform project owning namespaces in one downstream cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Composite id of the form `<clusterId>:<projectId>`
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Project {
    /// True when this project carries the operator's managed-by annotation.
    pub fn is_managed_by_operator(&self) -> bool {
        has_managed_by_marker(&self.annotations)
    }
}

/// A namespace in a downstream cluster as seen through the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    pub name: String,
    /// Owning project id; `None` when the namespace is unassigned
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Namespace {
    /// True when this namespace carries the operator's managed-by label.
    pub fn is_managed_by_operator(&self) -> bool {
        has_managed_by_marker(&self.labels)
    }
}

/// A project role binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    pub project_id: String,
    pub role_template_id: String,
    #[serde(default)]
    pub user_principal_id: Option<String>,
    #[serde(default)]
    pub group_principal_id: Option<String>,
}

impl ProjectMember {
    /// The bound principal id, whichever field carries it.
    pub fn principal_id(&self) -> Option<&str> {
        self.user_principal_id
            .as_deref()
            .or(self.group_principal_id.as_deref())
    }
}

/// A user or group principal known to the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub name: String,
}

/// A Rancher API token as returned by the login action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub token: String,
    /// Token lifetime in milliseconds; 0 or absent means non-expiring
    #[serde(default)]
    pub ttl: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_by_marker_requires_exact_value() {
        let mut markers = BTreeMap::new();
        assert!(!has_managed_by_marker(&markers));
        markers.insert(MANAGED_BY_KEY.to_string(), "helm".to_string());
        assert!(!has_managed_by_marker(&markers));
        markers.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
        assert!(has_managed_by_marker(&markers));
    }

    #[test]
    fn principal_heuristic_matches_user_substring() {
        assert!(principal_is_user("local://user-abc12"));
        assert!(principal_is_user("activedirectory_user://cn=jane"));
        assert!(!principal_is_user("local://group-dev"));
        assert!(!principal_is_user("github_team://42"));
    }

    #[test]
    fn project_id_splits_into_cluster_part() {
        assert_eq!(cluster_id_of_project("c-1:p-xyz"), Some("c-1"));
        assert_eq!(cluster_id_of_project("c-1"), None);
        assert_eq!(cluster_id_of_project(":p-xyz"), None);
        assert_eq!(cluster_id_of_project("c-1:"), None);
    }

    #[test]
    fn member_principal_id_prefers_user_field() {
        let member = ProjectMember {
            id: "prtb-1".to_string(),
            project_id: "c-1:p-1".to_string(),
            role_template_id: "project-owner".to_string(),
            user_principal_id: Some("local://user-1".to_string()),
            group_principal_id: None,
        };
        assert_eq!(member.principal_id(), Some("local://user-1"));
    }
}
