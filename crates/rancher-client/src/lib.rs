//! Rancher REST API Client
//!
//! A Rust client library for the subset of the Rancher management API the
//! project operator consumes: clusters, projects, cluster namespaces,
//! project role bindings and principals.
//!
//! # Example
//!
//! ```no_run
//! use rancher_client::{Credentials, RancherClient, RancherClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client with a long-lived API token
//! let client = RancherClient::new(
//!     "https://rancher.example.com".to_string(),
//!     Credentials::Token("token-abc:secret".to_string()),
//!     false,
//! )?;
//!
//! // Resolve a cluster by name
//! let cluster_id = client.get_cluster_id_by_name("alpha").await?;
//!
//! // Look up a project inside that cluster
//! if let Some(cluster_id) = cluster_id {
//!     let project = client.get_project_by_name(&cluster_id, "P1").await?;
//!     println!("{project:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Cluster / project lookup**: name-to-id resolution, project upsert
//! - **Namespace operations**: create, move, detach and delete with a
//!   managed-by precheck guarding every destructive call
//! - **Membership**: role bindings and principal search
//! - **Pagination**: transparent fetching of multi-page collections

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod rancher_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use auth::{Credentials, TokenProvider};
pub use client::RancherClient;
pub use common::{CollectionResponse, HttpClient};
pub use error::RancherError;
pub use models::*;
pub use rancher_trait::RancherClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockRancherClient;
