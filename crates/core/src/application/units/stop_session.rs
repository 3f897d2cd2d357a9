// Stop-Session: remove the session record, then tear down its compute context

use crate::application::scope::TransactionScope;
use crate::application::unit::UnitOfWork;
use crate::domain::{CollateralAction, SessionKey};
use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct StopSession {
    key: SessionKey,
}

impl StopSession {
    pub fn new(project_uuid: impl Into<String>, pipeline_uuid: impl Into<String>) -> Self {
        Self {
            key: SessionKey::new(project_uuid, pipeline_uuid),
        }
    }
}

#[async_trait]
impl UnitOfWork for StopSession {
    fn name(&self) -> &'static str {
        "stop_session"
    }

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>> {
        if !scope.store().delete_session(&self.key).await? {
            debug!(session = %self.key, "Session not found, nothing to stop");
            return Ok(None);
        }

        info!(session = %self.key, "Session record removed");

        Ok(Some(CollateralAction::StopSession {
            project_uuid: self.key.project_uuid.clone(),
            pipeline_uuid: self.key.pipeline_uuid.clone(),
        }))
    }
}
