// Delete-Environment-Images: drop image metadata, then reclaim registry artifacts

use crate::application::scope::TransactionScope;
use crate::application::unit::UnitOfWork;
use crate::domain::{CollateralAction, ProjectId};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Removes every image of a project, whichever environment built it
pub struct DeleteEnvironmentImages {
    project_uuid: ProjectId,
}

impl DeleteEnvironmentImages {
    pub fn new(project_uuid: impl Into<String>) -> Self {
        Self {
            project_uuid: project_uuid.into(),
        }
    }
}

#[async_trait]
impl UnitOfWork for DeleteEnvironmentImages {
    fn name(&self) -> &'static str {
        "delete_environment_images"
    }

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>> {
        let removed = scope
            .store()
            .delete_environment_images(&self.project_uuid)
            .await?;

        let mut environments: Vec<&str> =
            removed.iter().map(|i| i.environment_uuid.as_str()).collect();
        environments.sort_unstable();
        environments.dedup();

        info!(
            project_uuid = %self.project_uuid,
            images = removed.len(),
            environments = environments.len(),
            "Image metadata removed"
        );

        // Always queued: registry artifacts can outlive their metadata rows
        Ok(Some(CollateralAction::DeleteImages {
            project_uuid: self.project_uuid.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;

    #[tokio::test]
    async fn test_deletes_only_project_images() {
        let h = Harness::new();
        h.store.add_project("p1");
        h.store.add_project("p2");
        h.store.add_image("p1", "env-a", 1);
        h.store.add_image("p1", "env-b", 3);
        h.store.add_image("p2", "env-a", 1);

        h.coordinator
            .execute(&DeleteEnvironmentImages::new("p1"))
            .await
            .unwrap();

        let images = h.store.snapshot().images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].project_uuid, "p2");
        assert_eq!(h.backend.calls(), vec!["delete_images:p1"]);
    }

    #[tokio::test]
    async fn test_no_images_still_queues_batch() {
        let h = Harness::new();
        let report = h
            .coordinator
            .execute(&DeleteEnvironmentImages::new("p1"))
            .await
            .unwrap();
        assert_eq!(report.executed, 1);
    }
}
