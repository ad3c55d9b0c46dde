//! Policy evaluation
//!
//! Interprets the CR's two policy lists into the compact decision vector
//! the reconcilers consult. Policy strings are parsed case-insensitively
//! at the CRD boundary; here only the typed enums remain.

use crds::{ManagementPolicy, NamespaceManagementPolicy, ProjectSpec};

/// Evaluated permission vector derived from a Project spec.
///
/// `allow_ns_delete` alone does not arm namespace deletion: the sweep and
/// the CR delete path additionally require `CleanupNamespaces` to be set
/// in the operator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyVector {
    pub allow_create: bool,
    pub allow_delete: bool,
    pub allow_observe: bool,
    pub allow_ns_create: bool,
    pub allow_ns_update: bool,
    pub allow_ns_delete: bool,
}

impl PolicyVector {
    /// Derives the decision vector. Empty lists fall back to the defaults:
    /// `[Create]` project-level, `[Create, Update]` namespace-level.
    pub fn evaluate(spec: &ProjectSpec) -> Self {
        let mgmt = &spec.management_policies;
        let (allow_create, allow_delete, allow_observe) = if mgmt.is_empty() {
            (true, false, false)
        } else {
            (
                mgmt.contains(&ManagementPolicy::Create),
                mgmt.contains(&ManagementPolicy::Delete),
                mgmt.contains(&ManagementPolicy::Observe),
            )
        };

        let ns = &spec.namespace_management_policies;
        let (allow_ns_create, allow_ns_update, allow_ns_delete) = if ns.is_empty() {
            (true, true, false)
        } else {
            (
                ns.contains(&NamespaceManagementPolicy::Create),
                ns.contains(&NamespaceManagementPolicy::Update),
                ns.contains(&NamespaceManagementPolicy::Delete),
            )
        };

        Self {
            allow_create,
            allow_delete,
            allow_observe,
            allow_ns_create,
            allow_ns_update,
            allow_ns_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(
        mgmt: Vec<ManagementPolicy>,
        ns: Vec<NamespaceManagementPolicy>,
    ) -> ProjectSpec {
        let mut spec: ProjectSpec =
            serde_json::from_str(r#"{"clusterName": "alpha"}"#).unwrap();
        spec.management_policies = mgmt;
        spec.namespace_management_policies = ns;
        spec
    }

    #[test]
    fn empty_lists_use_defaults() {
        let vector = PolicyVector::evaluate(&spec_with(vec![], vec![]));
        assert!(vector.allow_create);
        assert!(!vector.allow_delete);
        assert!(!vector.allow_observe);
        assert!(vector.allow_ns_create);
        assert!(vector.allow_ns_update);
        assert!(!vector.allow_ns_delete);
    }

    #[test]
    fn explicit_lists_replace_defaults() {
        let vector = PolicyVector::evaluate(&spec_with(
            vec![ManagementPolicy::Observe],
            vec![NamespaceManagementPolicy::Delete],
        ));
        // Observe alone revokes the Create default
        assert!(!vector.allow_create);
        assert!(vector.allow_observe);
        assert!(!vector.allow_ns_create);
        assert!(!vector.allow_ns_update);
        assert!(vector.allow_ns_delete);
    }

    #[test]
    fn full_grants() {
        let vector = PolicyVector::evaluate(&spec_with(
            vec![
                ManagementPolicy::Create,
                ManagementPolicy::Delete,
                ManagementPolicy::Observe,
            ],
            vec![
                NamespaceManagementPolicy::Create,
                NamespaceManagementPolicy::Update,
                NamespaceManagementPolicy::Delete,
            ],
        ));
        assert!(vector.allow_create && vector.allow_delete && vector.allow_observe);
        assert!(vector.allow_ns_create && vector.allow_ns_update && vector.allow_ns_delete);
    }

    #[test]
    fn case_insensitive_policies_reach_the_vector() {
        let spec: ProjectSpec = serde_json::from_str(
            r#"{"clusterName": "alpha", "managementPolicies": ["create", "OBSERVE"]}"#,
        )
        .unwrap();
        let vector = PolicyVector::evaluate(&spec);
        assert!(vector.allow_create);
        assert!(vector.allow_observe);
        assert!(!vector.allow_delete);
    }
}
