//! Branch protection reconciler
//!
//! Three independent requests are issued for every repository: the complete
//! protection, the required status checks on their own, and (optionally) the
//! signed-commit requirement. Each one is attempted regardless of how the
//! others went.

use tracing::{error, info};

use crate::platform::{Platform, Repository};
use crate::policy::BranchProtectionRules;
use crate::reconcile::StepOutcome;

/// Outcome of each protection sub-request for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionOutcome {
    pub branch: String,
    pub protection: StepOutcome,
    pub status_checks: StepOutcome,
    pub signatures: StepOutcome,
}

impl ProtectionOutcome {
    pub fn is_success(&self) -> bool {
        !self.protection.is_failure()
            && !self.status_checks.is_failure()
            && !self.signatures.is_failure()
    }

    /// Failed sub-requests with their error messages
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        [
            ("protection", &self.protection),
            ("status_checks", &self.status_checks),
            ("signatures", &self.signatures),
        ]
        .into_iter()
        .filter_map(|(step, outcome)| outcome.error().map(|e| (step, e)))
        .collect()
    }
}

/// Apply `rules` to `branch` of `repository`
pub async fn apply_branch_protection<P: Platform + ?Sized>(
    platform: &P,
    repository: &Repository,
    rules: &BranchProtectionRules,
    branch: &str,
) -> ProtectionOutcome {
    info!("Branch protection: {}", repository.name);

    let owner = repository.owner.as_str();
    let name = repository.name.as_str();

    let protection = log_step(
        repository,
        "protection",
        platform
            .update_branch_protection(owner, name, branch, rules)
            .await,
    );

    let status_checks = log_step(
        repository,
        "status_checks",
        platform
            .update_required_status_checks(owner, name, branch, &rules.required_status_checks)
            .await,
    );

    let signatures = if rules.require_signatures {
        log_step(
            repository,
            "signatures",
            platform.require_signed_commits(owner, name, branch).await,
        )
    } else {
        StepOutcome::Skipped
    };

    ProtectionOutcome {
        branch: branch.to_string(),
        protection,
        status_checks,
        signatures,
    }
}

fn log_step(
    repository: &Repository,
    step: &'static str,
    result: anyhow::Result<()>,
) -> StepOutcome {
    if let Err(e) = &result {
        error!(
            repository = %repository.full_name(),
            step,
            "Failed to update branch protection: {:#}",
            e
        );
    }
    StepOutcome::from(result)
}
