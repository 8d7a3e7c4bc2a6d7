//! Remote platform abstraction layer
//!
//! Everything the policy run needs from the hosting platform goes through the
//! five operations of [`Platform`]. The production implementation is
//! [`crate::GitHubClient`]; tests substitute a double.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::policy::{BranchProtectionRules, RepositorySettings, RequiredStatusChecks};

/// Repository identity as reported by the platform
///
/// Read-only: changes are requested from the platform, never applied here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// Repository name (e.g., "orgpolicy")
    pub name: String,

    /// Owner login
    pub owner: String,

    /// Default branch currently reported by the platform
    pub default_branch: Option<String>,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            default_branch: None,
        }
    }

    /// Get display name (owner/name format)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for Repository {
    type Err = anyhow::Error;

    /// Parse `owner/name`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(anyhow::anyhow!(
                "Invalid repository '{}', expected OWNER/NAME",
                s
            )),
        }
    }
}

/// One page of an organization listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPage {
    pub repositories: Vec<Repository>,

    /// Page to request next; `None` or `Some(0)` when the listing is complete
    pub next_page: Option<u32>,
}

/// Capabilities the policy run requires from the hosting platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetch one page (1-based) of the organization's repositories
    async fn list_organization_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage>;

    /// Overwrite repository-level settings
    async fn edit_repository(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettings,
    ) -> Result<()>;

    /// Replace the complete protection of `branch`
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtectionRules,
    ) -> Result<()>;

    /// Replace only the required status checks of `branch`
    async fn update_required_status_checks(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        checks: &RequiredStatusChecks,
    ) -> Result<()>;

    /// Require signed commits on `branch`
    async fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_full_name() {
        let repo = Repository::new("acme", "widgets");
        assert_eq!(repo.full_name(), "acme/widgets");
        assert!(repo.default_branch.is_none());
    }

    #[test]
    fn test_repository_from_str() {
        let repo: Repository = "acme/widgets".parse().expect("valid repository");
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");

        assert!("widgets".parse::<Repository>().is_err());
        assert!("/widgets".parse::<Repository>().is_err());
        assert!("acme/".parse::<Repository>().is_err());
        assert!("acme/widgets/extra".parse::<Repository>().is_err());
    }
}
