//! Cross-CR namespace ownership guard
//!
//! At most one Project CR may list a given namespace name at a time. The
//! claim check runs against the operator's own CR list and therefore fails
//! open on list errors: blocking every reconcile on a transient list
//! failure would stall the operator over its own source of truth.

use crds::Project;
use kube::api::ListParams;
use kube::Api;
use tracing::warn;

/// Returns the name of another Project CR whose spec claims `ns_name`
/// (case-insensitive), if any. The CR identified by `current_cr` is
/// excluded from the scan.
pub fn claimed_by_another(peers: &[Project], ns_name: &str, current_cr: &str) -> Option<String> {
    peers.iter().find_map(|cr| {
        let name = cr.metadata.name.as_deref()?;
        if name == current_cr {
            return None;
        }
        cr.spec
            .namespaces
            .iter()
            .any(|n| n.eq_ignore_ascii_case(ns_name))
            .then(|| name.to_string())
    })
}

/// Lists Project CRs for the claim check.
pub struct OwnershipGuard {
    api: Api<Project>,
}

impl OwnershipGuard {
    pub fn new(api: Api<Project>) -> Self {
        Self { api }
    }

    /// All Project CRs, or an empty list when the listing fails. The
    /// failure surfaces as a warning only; namespaces are then treated as
    /// unclaimed for this pass.
    pub async fn list_peers(&self) -> Vec<Project> {
        match self.api.list(&ListParams::default()).await {
            Ok(list) => list.items,
            Err(e) => {
                warn!(
                    "Failed to list Project CRs for ownership check: {} (treating namespaces as unclaimed)",
                    e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_project;

    #[test]
    fn claim_by_other_cr_is_detected() {
        let peers = vec![
            test_project("p1", "alpha", &["ns-shared", "ns-a"]),
            test_project("p2", "alpha", &["ns-b"]),
        ];
        assert_eq!(
            claimed_by_another(&peers, "ns-shared", "p2"),
            Some("p1".to_string())
        );
        assert_eq!(claimed_by_another(&peers, "ns-b", "p1"), Some("p2".to_string()));
    }

    #[test]
    fn own_claims_are_ignored() {
        let peers = vec![test_project("p1", "alpha", &["ns-a"])];
        assert_eq!(claimed_by_another(&peers, "ns-a", "p1"), None);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let peers = vec![test_project("p1", "alpha", &["Ns-Shared"])];
        assert_eq!(
            claimed_by_another(&peers, "ns-shared", "p2"),
            Some("p1".to_string())
        );
        assert_eq!(
            claimed_by_another(&peers, "NS-SHARED", "p2"),
            Some("p1".to_string())
        );
    }

    #[test]
    fn unclaimed_namespace_returns_none() {
        let peers = vec![test_project("p1", "alpha", &["ns-a"])];
        assert_eq!(claimed_by_another(&peers, "ns-z", "p2"), None);
    }
}
