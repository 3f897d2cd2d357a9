// HTTP JobScheduler

use crate::client::ServiceClient;
use async_trait::async_trait;
use cascade_core::error::Result;
use cascade_core::port::{BackendError, JobScheduler};
use std::time::Duration;

/// Scheduler client: `DELETE {base}/api/jobs/{job_uuid}`
#[derive(Clone)]
pub struct HttpJobScheduler {
    client: ServiceClient,
}

impl HttpJobScheduler {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl JobScheduler for HttpJobScheduler {
    async fn cancel_job(&self, job_uuid: &str) -> std::result::Result<(), BackendError> {
        self.client
            .delete(&["api", "jobs", job_uuid], job_uuid)
            .await
    }
}
