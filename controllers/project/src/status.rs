//! CR spec and status writes with conflict retry
//!
//! Both the reconciler and the observe loop write to the same CRs, so
//! every write goes through refetch-and-merge: on a version conflict the
//! CR is refetched by name, the in-memory spec (or status) is carried onto
//! the fresh object, and the write is retried with a short linear backoff.
//! A conflict that survives the final attempt propagates up.

use std::time::Duration;

use crds::Project;
use kube::api::PostParams;
use kube::Api;
use tokio::time::sleep;
use tracing::debug;

use crate::error::ControllerError;

const MAX_ATTEMPTS: u64 = 3;

/// True when a kube error is an optimistic-concurrency conflict (HTTP 409).
pub(crate) fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// Delay before retry `attempt` (1-based): 100 ms, 200 ms, ...
pub(crate) fn retry_delay(attempt: u64) -> Duration {
    Duration::from_millis(100 * attempt)
}

/// Applies spec and status updates to Project CRs.
pub struct StatusWriter {
    api: Api<Project>,
}

impl StatusWriter {
    pub fn new(api: Api<Project>) -> Self {
        Self { api }
    }

    /// Replaces the CR spec, carrying `cr.spec` onto a refetched object on
    /// every version conflict.
    pub async fn update_spec(&self, cr: &Project) -> Result<Project, ControllerError> {
        let name = object_name(cr)?;
        let mut desired = cr.clone();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.api.replace(&name, &PostParams::default(), &desired).await {
                Ok(updated) => return Ok(updated),
                Err(e) if is_conflict(&e) && attempt < MAX_ATTEMPTS => {
                    debug!(
                        "Spec update for Project {} conflicted (attempt {}), refetching",
                        name, attempt
                    );
                    sleep(retry_delay(attempt)).await;
                    let fresh = self.api.get(&name).await.map_err(ControllerError::Kube)?;
                    desired = fresh;
                    desired.spec = cr.spec.clone();
                }
                Err(e) if is_conflict(&e) => {
                    return Err(ControllerError::Conflict(format!(
                        "spec update for Project {name} still conflicting after {MAX_ATTEMPTS} attempts"
                    )));
                }
                Err(e) => return Err(ControllerError::Kube(e)),
            }
        }

        // The loop always returns; the final conflict arm covers attempt == MAX_ATTEMPTS
        Err(ControllerError::Conflict(format!(
            "spec update for Project {name} exhausted retries"
        )))
    }

    /// Replaces the CR status subresource, carrying `cr.status` onto a
    /// refetched object on every version conflict.
    pub async fn update_status(&self, cr: &Project) -> Result<Project, ControllerError> {
        let name = object_name(cr)?;
        let mut desired = cr.clone();

        for attempt in 1..=MAX_ATTEMPTS {
            let payload = serde_json::to_vec(&desired)?;
            match self
                .api
                .replace_status(&name, &PostParams::default(), payload)
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(e) if is_conflict(&e) && attempt < MAX_ATTEMPTS => {
                    debug!(
                        "Status update for Project {} conflicted (attempt {}), refetching",
                        name, attempt
                    );
                    sleep(retry_delay(attempt)).await;
                    let fresh = self.api.get(&name).await.map_err(ControllerError::Kube)?;
                    desired = fresh;
                    desired.status = cr.status.clone();
                }
                Err(e) if is_conflict(&e) => {
                    return Err(ControllerError::Conflict(format!(
                        "status update for Project {name} still conflicting after {MAX_ATTEMPTS} attempts"
                    )));
                }
                Err(e) => return Err(ControllerError::Kube(e)),
            }
        }

        Err(ControllerError::Conflict(format!(
            "status update for Project {name} exhausted retries"
        )))
    }
}

fn object_name(cr: &Project) -> Result<String, ControllerError> {
    cr.metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidConfig("Project missing metadata.name".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "err".to_string(),
            reason: "Conflict".to_string(),
            code,
        })
    }

    #[test]
    fn conflict_detection_matches_409_only() {
        assert!(is_conflict(&api_error(409)));
        assert!(!is_conflict(&api_error(404)));
        assert!(!is_conflict(&api_error(500)));
    }

    #[test]
    fn retry_delay_grows_linearly() {
        assert_eq!(retry_delay(1), Duration::from_millis(100));
        assert_eq!(retry_delay(2), Duration::from_millis(200));
        assert_eq!(retry_delay(3), Duration::from_millis(300));
    }
}
