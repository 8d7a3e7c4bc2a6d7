//! Policy runner - applies the organization policy repository by repository
//!
//! The runner enumerates the organization first and only starts reconciling
//! once the full repository set is known. Repositories are then processed one
//! at a time, in enumeration order. Per-repository failures are collected in
//! the [`RunSummary`]; only enumeration failures abort the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

use crate::enumerate::list_organization_repositories;
use crate::platform::{Platform, Repository};
use crate::policy::Policy;
use crate::protection::{apply_branch_protection, ProtectionOutcome};
use crate::settings::apply_repository_settings;

/// Result of a single remote configuration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The platform accepted the request
    Applied,
    /// The step is disabled by the policy
    Skipped,
    /// The platform rejected the request or it never arrived
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StepOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl From<Result<()>> for StepOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => StepOutcome::Applied,
            Err(e) => StepOutcome::Failed {
                error: format!("{:#}", e),
            },
        }
    }
}

/// Order in which the two reconcilers run for each repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunOrder {
    #[default]
    ProtectionFirst,
    SettingsFirst,
}

/// Which branch receives the protection rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BranchTarget {
    /// The policy's fixed default branch name
    #[default]
    Policy,
    /// The default branch the platform reports for the repository
    Repository,
}

/// Everything that happened to one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOutcome {
    pub repository: Repository,
    pub settings: StepOutcome,
    pub protection: ProtectionOutcome,
}

impl RepositoryOutcome {
    pub fn is_success(&self) -> bool {
        !self.settings.is_failure() && self.protection.is_success()
    }
}

/// Results from a complete policy run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total_repositories: usize,
    pub fully_applied: usize,
    pub with_failures: usize,
    pub duration: Duration,
    pub outcomes: Vec<RepositoryOutcome>,
}

impl RunSummary {
    fn compile(
        started_at: DateTime<Utc>,
        outcomes: Vec<RepositoryOutcome>,
        duration: Duration,
    ) -> Self {
        let fully_applied = outcomes.iter().filter(|o| o.is_success()).count();

        Self {
            started_at,
            total_repositories: outcomes.len(),
            fully_applied,
            with_failures: outcomes.len() - fully_applied,
            duration,
            outcomes,
        }
    }

    /// Outcomes of repositories where at least one step failed
    pub fn failures(&self) -> impl Iterator<Item = &RepositoryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Applies one policy to every repository of an organization
pub struct PolicyRunner<'a, P: Platform + ?Sized> {
    platform: &'a P,
    policy: &'a Policy,
    order: RunOrder,
    branch_target: BranchTarget,
}

impl<'a, P: Platform + ?Sized> PolicyRunner<'a, P> {
    pub fn new(platform: &'a P, policy: &'a Policy) -> Self {
        Self {
            platform,
            policy,
            order: RunOrder::default(),
            branch_target: BranchTarget::default(),
        }
    }

    pub fn with_order(mut self, order: RunOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_branch_target(mut self, branch_target: BranchTarget) -> Self {
        self.branch_target = branch_target;
        self
    }

    /// Enumerate `org` and apply the policy to each repository
    ///
    /// Fails without touching any repository if enumeration fails.
    pub async fn run(&self, org: &str, per_page: u8) -> Result<RunSummary> {
        info!("Enforcing policy on organization {}", org);

        let repositories = list_organization_repositories(self.platform, org, per_page)
            .await
            .context("Failed to enumerate organization repositories")?;

        Ok(self.run_repositories(repositories).await)
    }

    /// Apply the policy to an explicit list of repositories
    pub async fn run_repositories(&self, repositories: Vec<Repository>) -> RunSummary {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut outcomes = Vec::with_capacity(repositories.len());

        for repository in repositories {
            outcomes.push(self.apply(repository).await);
        }

        let summary = RunSummary::compile(started_at, outcomes, start_time.elapsed());

        info!(
            "Policy run completed in {:.2}s: {} repositories, {} fully applied, {} with failures",
            summary.duration.as_secs_f64(),
            summary.total_repositories,
            summary.fully_applied,
            summary.with_failures
        );

        summary
    }

    async fn apply(&self, repository: Repository) -> RepositoryOutcome {
        let branch = self.protected_branch(&repository).to_string();
        let rules = &self.policy.protection;
        let repo_settings = &self.policy.settings;

        let (settings, protection) = match self.order {
            RunOrder::ProtectionFirst => {
                let protection =
                    apply_branch_protection(self.platform, &repository, rules, &branch).await;
                let settings =
                    apply_repository_settings(self.platform, &repository, repo_settings).await;
                (settings, protection)
            }
            RunOrder::SettingsFirst => {
                let settings =
                    apply_repository_settings(self.platform, &repository, repo_settings).await;
                let protection =
                    apply_branch_protection(self.platform, &repository, rules, &branch).await;
                (settings, protection)
            }
        };

        RepositoryOutcome {
            repository,
            settings,
            protection,
        }
    }

    fn protected_branch<'r>(&'r self, repository: &'r Repository) -> &'r str {
        match self.branch_target {
            BranchTarget::Policy => self.policy.protected_branch(),
            BranchTarget::Repository => repository
                .default_branch
                .as_deref()
                .unwrap_or_else(|| self.policy.protected_branch()),
        }
    }
}
