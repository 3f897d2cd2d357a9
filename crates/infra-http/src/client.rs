// Shared HTTP client and response classification

use cascade_core::error::{AppError, Result};
use cascade_core::port::BackendError;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY: usize = 512;

/// Thin wrapper around `reqwest::Client` bound to one service base URL
#[derive(Clone)]
pub(crate) struct ServiceClient {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl ServiceClient {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "Backend URL '{}' cannot be used as a base",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    /// Base URL joined with percent-encoded path segments
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue a DELETE for a teardown target
    ///
    /// 404 and 410 become `BackendError::NotFound`.
    pub(crate) async fn delete(
        &self,
        segments: &[&str],
        target: &str,
    ) -> std::result::Result<(), BackendError> {
        let url = self.endpoint(segments);
        debug!(url = %url, target = target, "DELETE");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(classify(status, &body, target))
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout.as_millis() as u64)
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }
}

/// Map a non-success response to a backend error
pub(crate) fn classify(status: StatusCode, body: &[u8], target: &str) -> BackendError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => BackendError::NotFound(target.to_string()),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            BackendError::Unavailable(format!("{} ({})", error_message(body), status))
        }
        _ => BackendError::Rejected {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

/// `message` field of a JSON error body, or the raw body
fn error_message(body: &[u8]) -> String {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).to_string());

    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &message[..end])
    } else {
        message
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client =
            ServiceClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["api", "runs", "a b/c"]).as_str(),
            "http://localhost:8080/api/runs/a%20b%2Fc"
        );

        let prefixed =
            ServiceClient::new("http://localhost:8080/orchest", Duration::from_secs(1)).unwrap();
        assert_eq!(
            prefixed.endpoint(&["api", "jobs", "j1"]).as_str(),
            "http://localhost:8080/orchest/api/jobs/j1"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ServiceClient::new("not a url", Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            ServiceClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(StatusCode::NOT_FOUND, b"", "r1"),
            BackendError::NotFound("r1".to_string())
        );
        assert_eq!(
            classify(StatusCode::GONE, b"", "r1"),
            BackendError::NotFound("r1".to_string())
        );
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, b"down", "r1"),
            BackendError::Unavailable(_)
        ));
        assert_eq!(
            classify(StatusCode::CONFLICT, br#"{"message":"run is locked"}"#, "r1"),
            BackendError::Rejected {
                status: 409,
                message: "run is locked".to_string()
            }
        );
    }

    #[test]
    fn test_error_message_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        let message = error_message(body.as_bytes());
        assert_eq!(message.len(), MAX_ERROR_BODY + 3);
        assert!(message.ends_with("..."));
    }

    #[tokio::test]
    async fn test_delete_success_and_not_found() {
        let (url, requests) = test_server::spawn(204, "").await;
        let client = ServiceClient::new(&url, Duration::from_secs(5)).unwrap();
        client.delete(&["api", "runs", "r1"], "r1").await.unwrap();
        assert_eq!(requests.lock().unwrap().clone(), vec!["DELETE /api/runs/r1"]);

        let (url, _) = test_server::spawn(404, "").await;
        let client = ServiceClient::new(&url, Duration::from_secs(5)).unwrap();
        let err = client.delete(&["api", "runs", "r1"], "r1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_client_timeout_is_applied() {
        let (url, _) = test_server::spawn_delayed(204, "", Duration::from_millis(500)).await;
        let client = ServiceClient::new(&url, Duration::from_millis(50)).unwrap();

        let err = client.delete(&["api", "runs", "r1"], "r1").await.unwrap_err();
        assert_eq!(err, BackendError::Timeout(50));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ServiceClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let err = client.delete(&["api", "runs", "r1"], "r1").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
