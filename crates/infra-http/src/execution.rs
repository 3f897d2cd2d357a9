// HTTP ExecutionBackend (orchestrator service)

use crate::client::ServiceClient;
use async_trait::async_trait;
use cascade_core::domain::SessionKey;
use cascade_core::error::Result;
use cascade_core::port::{BackendError, ExecutionBackend};
use std::time::Duration;

/// Orchestrator client
///
/// - `DELETE {base}/api/runs/{run_uuid}` aborts a run's workload
/// - `DELETE {base}/api/sessions/{project_uuid}/{pipeline_uuid}` stops a session
#[derive(Clone)]
pub struct HttpExecutionBackend {
    client: ServiceClient,
}

impl HttpExecutionBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn abort_run(&self, run_uuid: &str) -> std::result::Result<(), BackendError> {
        self.client
            .delete(&["api", "runs", run_uuid], run_uuid)
            .await
    }

    async fn stop_session(&self, key: &SessionKey) -> std::result::Result<(), BackendError> {
        self.client
            .delete(
                &[
                    "api",
                    "sessions",
                    key.project_uuid.as_str(),
                    key.pipeline_uuid.as_str(),
                ],
                &key.to_string(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_server;

    #[tokio::test]
    async fn test_abort_run_and_stop_session_paths() {
        let (url, requests) = test_server::spawn(200, "{}").await;
        let backend = HttpExecutionBackend::new(&url, Duration::from_secs(5)).unwrap();

        backend.abort_run("r1").await.unwrap();
        backend
            .stop_session(&SessionKey::new("p1", "pl1"))
            .await
            .unwrap();

        assert_eq!(
            requests.lock().unwrap().clone(),
            vec!["DELETE /api/runs/r1", "DELETE /api/sessions/p1/pl1"]
        );
    }

    #[tokio::test]
    async fn test_stopped_session_is_not_found() {
        let (url, _) = test_server::spawn(404, r#"{"message":"no such session"}"#).await;
        let backend = HttpExecutionBackend::new(&url, Duration::from_secs(5)).unwrap();

        let err = backend
            .stop_session(&SessionKey::new("p1", "pl1"))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound("p1/pl1".to_string()));
    }
}
