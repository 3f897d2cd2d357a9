// HTTP ImageRegistry

use crate::client::ServiceClient;
use async_trait::async_trait;
use cascade_core::error::Result;
use cascade_core::port::{BackendError, ImageRegistry};
use std::time::Duration;

/// Registry client: `DELETE {base}/api/projects/{project_uuid}/images`
#[derive(Clone)]
pub struct HttpImageRegistry {
    client: ServiceClient,
}

impl HttpImageRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ImageRegistry for HttpImageRegistry {
    async fn delete_project_images(
        &self,
        project_uuid: &str,
    ) -> std::result::Result<(), BackendError> {
        self.client
            .delete(&["api", "projects", project_uuid, "images"], project_uuid)
            .await
    }
}
