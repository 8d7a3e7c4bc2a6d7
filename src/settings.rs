//! Repository settings reconciler

use tracing::{error, info};

use crate::platform::{Platform, Repository};
use crate::policy::RepositorySettings;
use crate::reconcile::StepOutcome;

/// Push the policy's repository settings as a single full overwrite
///
/// A failure is logged and reported in the outcome; it never propagates.
pub async fn apply_repository_settings<P: Platform + ?Sized>(
    platform: &P,
    repository: &Repository,
    settings: &RepositorySettings,
) -> StepOutcome {
    info!("Updating repository settings for {}", repository.name);

    let result = platform
        .edit_repository(&repository.owner, &repository.name, settings)
        .await;

    if let Err(e) = &result {
        error!(
            repository = %repository.full_name(),
            step = "settings",
            "Failed to update repository settings: {:#}",
            e
        );
    }

    StepOutcome::from(result)
}
