//! Custom Resource Definitions for the Rancher DevOps project operator.
//!
//! Defines the cluster-scoped `Project` CRD (`rancher.devops.io/v1`) that
//! declares a platform project, its namespaces, its members and the
//! management policies gating what the operator may do on its behalf.

mod project;

pub use project::*;
