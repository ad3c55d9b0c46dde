//! Rancher Project Operator
//!
//! Reconciles `Project` custom resources against a Rancher-style
//! cluster-management platform: project upsert, namespace binding with a
//! cross-CR ownership guard and manual-removal tombstones, member
//! bindings, and an observe loop that imports out-of-band platform state
//! back into CR specs.

mod config;
mod controller;
mod error;
mod metrics;
mod observe;
mod ownership;
mod policy;
mod reconciler;
mod status;
#[cfg(test)]
mod test_utils;
mod watcher;

use controller::Controller;
use tracing::info;

use crate::config::OperatorConfig;
use crate::error::ControllerError;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Rancher project operator");

    let config = OperatorConfig::from_env()?;
    info!("Configuration:");
    info!("  Rancher URL: {}", config.rancher_url);
    info!("  Observe method: {:?}", config.observe_method);
    info!("  Cleanup namespaces: {}", config.cleanup_namespaces);

    let _registry = metrics::create_and_register_metrics()
        .map_err(|e| ControllerError::InvalidConfig(format!("metrics registration failed: {e}")))?;

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
