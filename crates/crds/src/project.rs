//! Project Custom Resource Definition
//!
//! Declares a project in the cluster-management platform: the target
//! downstream cluster, the namespaces that should belong to the project,
//! the members that should hold roles on it, and the policy lists that
//! gate which mutations the operator is allowed to perform.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProjectSpec defines the desired state of a platform project
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "rancher.devops.io",
    version = "v1",
    kind = "Project",
    plural = "projects",
    status = "ProjectStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Name (not id) of a downstream cluster registered in the platform
    pub cluster_name: String,

    /// Display name for the platform project (falls back to the CR name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Description of the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Namespaces that should belong to the project.
    /// Compared case-insensitively; stored lowercase on reconcile output.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Members that should hold a role on the project
    #[serde(default)]
    pub members: Vec<ProjectMemberSpec>,

    /// Opaque resource quota passed through to the platform on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_quota: Option<serde_json::Value>,

    /// Project-level policies; empty means `[Create]`
    #[serde(default)]
    pub management_policies: Vec<ManagementPolicy>,

    /// Namespace-level policies; empty means `[Create, Update]`
    #[serde(default)]
    pub namespace_management_policies: Vec<NamespaceManagementPolicy>,
}

/// A desired project member: a principal bound to a role template.
///
/// At least one of `principal_id` / `principal_name` must be set; a name
/// without an id is resolved through the platform's principal search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMemberSpec {
    /// Platform principal id (e.g. `local://user-abc12`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,

    /// Principal display name, resolved to an id when no id is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_name: Option<String>,

    /// Role template id (e.g. `project-owner`, `project-member`)
    pub role: String,
}

/// Project-level management policy vocabulary.
///
/// Serialized PascalCase; parsed case-insensitively at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum ManagementPolicy {
    Create,
    Delete,
    Observe,
}

impl FromStr for ManagementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "observe" => Ok(Self::Observe),
            other => Err(format!("unknown management policy '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for ManagementPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Namespace-level management policy vocabulary.
///
/// Serialized PascalCase; parsed case-insensitively at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum NamespaceManagementPolicy {
    Create,
    Update,
    Delete,
}

impl FromStr for NamespaceManagementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown namespace management policy '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for NamespaceManagementPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reconciliation phase of a Project CR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum ProjectPhase {
    #[default]
    Pending,
    Active,
    Error,
}

/// ProjectStatus defines the observed state of a Project CR
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    /// Platform project id of the form `<clusterId>:<projectId>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Resolved platform cluster id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    /// Current reconciliation phase
    #[serde(default)]
    pub phase: ProjectPhase,

    /// Namespaces this operator itself created, rebuilt every reconcile.
    /// Consulted on CR deletion to decide what to clean up.
    #[serde(default)]
    pub created_namespaces: Vec<String>,

    /// Tombstones: spec namespaces that disappeared from the platform
    /// out-of-band. Never recreated while still listed in the spec.
    #[serde(default)]
    pub manually_removed_namespaces: Vec<String>,

    /// `"principalId:role"` pairs observed after a successful member pass
    #[serde(default)]
    pub configured_members: Vec<String>,

    /// Timestamp of the last reconcile attempt that ran to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<DateTime<Utc>>,

    /// Timestamp of the first reconcile that bound a platform project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<DateTime<Utc>>,

    /// Timestamp of the last status mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_timestamp: Option<DateTime<Utc>>,

    /// Failure summary of the last reconcile; cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Project {
    /// Platform-facing project name: the display name, or the CR name when
    /// the display name is unset or empty.
    pub fn project_name(&self) -> String {
        match self.spec.display_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.metadata.name.clone().unwrap_or_default(),
        }
    }

    /// True when the project-level policy list grants `policy`, honoring
    /// the empty-list default of `[Create]`.
    pub fn has_management_policy(&self, policy: ManagementPolicy) -> bool {
        if self.spec.management_policies.is_empty() {
            return policy == ManagementPolicy::Create;
        }
        self.spec.management_policies.contains(&policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_policy_parses_case_insensitively() {
        assert_eq!("create".parse::<ManagementPolicy>().unwrap(), ManagementPolicy::Create);
        assert_eq!("OBSERVE".parse::<ManagementPolicy>().unwrap(), ManagementPolicy::Observe);
        assert_eq!("Delete".parse::<ManagementPolicy>().unwrap(), ManagementPolicy::Delete);
        assert!("destroy".parse::<ManagementPolicy>().is_err());
    }

    #[test]
    fn namespace_policy_parses_case_insensitively() {
        let parsed: NamespaceManagementPolicy = serde_json::from_str("\"uPdAtE\"").unwrap();
        assert_eq!(parsed, NamespaceManagementPolicy::Update);
    }

    #[test]
    fn spec_defaults_are_empty() {
        let spec: ProjectSpec = serde_json::from_str(r#"{"clusterName": "alpha"}"#).unwrap();
        assert_eq!(spec.cluster_name, "alpha");
        assert!(spec.namespaces.is_empty());
        assert!(spec.members.is_empty());
        assert!(spec.management_policies.is_empty());
        assert!(spec.namespace_management_policies.is_empty());
    }

    #[test]
    fn status_defaults_to_pending() {
        let status = ProjectStatus::default();
        assert_eq!(status.phase, ProjectPhase::Pending);
        assert!(status.project_id.is_none());
        assert!(status.manually_removed_namespaces.is_empty());
    }

    #[test]
    fn member_spec_uses_camel_case() {
        let member: ProjectMemberSpec = serde_json::from_str(
            r#"{"principalId": "local://user-1", "role": "project-owner"}"#,
        )
        .unwrap();
        assert_eq!(member.principal_id.as_deref(), Some("local://user-1"));
        assert!(member.principal_name.is_none());
        assert_eq!(member.role, "project-owner");
    }
}
