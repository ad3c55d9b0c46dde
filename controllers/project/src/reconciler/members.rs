//! Member reconciliation
//!
//! Drives desired member bindings on a platform project. A member with a
//! principal name but no id is resolved through the platform's principal
//! search. Stale bindings that disappear from the spec are deliberately
//! left in place in this revision.

use crds::ProjectMemberSpec;
use rancher_client::RancherClientTrait;
use tracing::{debug, info};

use crate::error::ControllerError;
use crate::policy::PolicyVector;

/// Outcome of driving one spec member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberStep {
    /// A new role binding was created
    Added { principal_id: String },
    /// A binding with the same (principal, role) already exists
    AlreadyBound { principal_id: String },
    /// The binding is missing but the Create policy is not granted
    SkippedPolicy { principal_id: String },
}

pub struct MemberReconciler<'a> {
    platform: &'a dyn RancherClientTrait,
    policies: &'a PolicyVector,
}

impl<'a> MemberReconciler<'a> {
    pub fn new(platform: &'a dyn RancherClientTrait, policies: &'a PolicyVector) -> Self {
        Self { platform, policies }
    }

    /// Upserts one member binding. `(resolved principal id, role)` is the
    /// uniqueness key against the project's existing bindings.
    pub async fn reconcile_member(
        &self,
        project_id: &str,
        member: &ProjectMemberSpec,
    ) -> Result<MemberStep, ControllerError> {
        let principal_id = self.resolve_principal(member).await?;

        let existing = self.platform.get_project_members(project_id).await?;
        let bound = existing.iter().any(|m| {
            m.principal_id() == Some(principal_id.as_str()) && m.role_template_id == member.role
        });
        if bound {
            debug!(
                "Member {} already bound to project {} as {}",
                principal_id, project_id, member.role
            );
            return Ok(MemberStep::AlreadyBound { principal_id });
        }

        if !self.policies.allow_create {
            info!(
                "Member {} missing on project {} but Create is not permitted, skipping",
                principal_id, project_id
            );
            return Ok(MemberStep::SkippedPolicy { principal_id });
        }

        self.platform
            .create_project_member(project_id, &principal_id, &member.role)
            .await?;
        info!(
            "Added member {} to project {} as {}",
            principal_id, project_id, member.role
        );
        Ok(MemberStep::Added { principal_id })
    }

    async fn resolve_principal(
        &self,
        member: &ProjectMemberSpec,
    ) -> Result<String, ControllerError> {
        if let Some(id) = member.principal_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }

        let name = member
            .principal_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(
                    "member needs a principalId or a principalName".to_string(),
                )
            })?;

        self.platform
            .get_principal_id_by_name(name)
            .await?
            .ok_or_else(|| {
                ControllerError::Reconciliation(format!("principal '{name}' not found"))
            })
    }
}
