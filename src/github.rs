use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::platform::{Platform, Repository, RepositoryPage};
use crate::policy::{
    BranchProtectionRules, DismissalRestrictions, PushRestrictions, RepositorySettings,
    RequiredStatusChecks,
};

/// GitHub REST client implementing the policy platform operations
pub struct GitHubClient {
    client: Octocrab,
}

#[derive(Debug, Serialize)]
struct ListParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct RemoteRepository {
    name: String,
    owner: RemoteOwner,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteOwner {
    login: String,
}

impl From<RemoteRepository> for Repository {
    fn from(remote: RemoteRepository) -> Self {
        Self {
            name: remote.name,
            owner: remote.owner.login,
            default_branch: remote.default_branch,
        }
    }
}

/// Body of `PATCH /repos/{owner}/{repo}`
#[derive(Debug, Serialize)]
struct EditRepositoryRequest<'a> {
    has_issues: bool,
    default_branch: &'a str,
    // Legacy alias still accepted by the API
    master_branch: &'a str,
    allow_rebase_merge: bool,
    allow_squash_merge: bool,
    allow_merge_commit: bool,
}

impl<'a> From<&'a RepositorySettings> for EditRepositoryRequest<'a> {
    fn from(settings: &'a RepositorySettings) -> Self {
        Self {
            has_issues: settings.has_issues,
            default_branch: &settings.default_branch,
            master_branch: &settings.default_branch,
            allow_rebase_merge: settings.allow_rebase_merge,
            allow_squash_merge: settings.allow_squash_merge,
            allow_merge_commit: settings.allow_merge_commit,
        }
    }
}

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`
#[derive(Debug, Serialize)]
struct ProtectionRequest<'a> {
    required_status_checks: &'a RequiredStatusChecks,
    required_pull_request_reviews: ReviewsRequest,
    enforce_admins: bool,
    restrictions: &'a PushRestrictions,
}

#[derive(Debug, Serialize)]
struct ReviewsRequest {
    // An empty object clears any existing dismissal restrictions
    dismissal_restrictions: DismissalRestrictions,
    dismiss_stale_reviews: bool,
    required_approving_review_count: u32,
}

impl<'a> From<&'a BranchProtectionRules> for ProtectionRequest<'a> {
    fn from(rules: &'a BranchProtectionRules) -> Self {
        let reviews = &rules.required_reviews;
        Self {
            required_status_checks: &rules.required_status_checks,
            required_pull_request_reviews: ReviewsRequest {
                dismissal_restrictions: reviews.dismissal_restrictions.clone().unwrap_or_default(),
                dismiss_stale_reviews: reviews.dismiss_stale_reviews,
                required_approving_review_count: reviews.required_approving_review_count,
            },
            enforce_admins: rules.enforce_admins,
            restrictions: &rules.push_restrictions,
        }
    }
}

impl GitHubClient {
    /// Create a client authenticated with a personal access token
    ///
    /// `api_base` points the client at a GitHub Enterprise instance or any
    /// other API-compatible server.
    pub fn new(token: &str, api_base: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(base) = api_base {
            builder = builder
                .base_uri(base)
                .with_context(|| format!("Invalid GitHub API base URI: {}", base))?;
        }

        let client = builder.build().context("Failed to create GitHub client")?;

        Ok(Self { client })
    }

    /// Branch names may contain `/`, so the branch is sent as one encoded segment
    fn protection_route(owner: &str, repo: &str, branch: &str) -> String {
        format!(
            "/repos/{}/{}/branches/{}/protection",
            owner,
            repo,
            urlencoding::encode(branch)
        )
    }
}

/// Extract the `page` query parameter from a pagination link
fn page_number(query: Option<&str>) -> Option<u32> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

#[async_trait]
impl Platform for GitHubClient {
    async fn list_organization_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage> {
        debug!("Fetching repositories for organization {} page {}", org, page);

        let response: Page<RemoteRepository> = self
            .client
            .get(
                format!("/orgs/{}/repos", org),
                Some(&ListParams { per_page, page }),
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch repositories for organization {} page {}",
                    org, page
                )
            })?;

        let next_page = match response.next.as_ref() {
            None => None,
            Some(uri) => Some(
                page_number(uri.query())
                    .ok_or_else(|| anyhow!("Next page link has no page number: {}", uri))?,
            ),
        };

        Ok(RepositoryPage {
            repositories: response.items.into_iter().map(Repository::from).collect(),
            next_page,
        })
    }

    async fn edit_repository(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettings,
    ) -> Result<()> {
        let body = EditRepositoryRequest::from(settings);

        let _: serde_json::Value = self
            .client
            .patch(format!("/repos/{}/{}", owner, repo), Some(&body))
            .await
            .with_context(|| format!("Failed to edit repository {}/{}", owner, repo))?;

        Ok(())
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtectionRules,
    ) -> Result<()> {
        let body = ProtectionRequest::from(rules);

        let _: serde_json::Value = self
            .client
            .put(Self::protection_route(owner, repo, branch), Some(&body))
            .await
            .with_context(|| {
                format!(
                    "Failed to update branch protection for {}/{} ({})",
                    owner, repo, branch
                )
            })?;

        Ok(())
    }

    async fn update_required_status_checks(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        checks: &RequiredStatusChecks,
    ) -> Result<()> {
        let route = format!(
            "{}/required_status_checks",
            Self::protection_route(owner, repo, branch)
        );

        let _: serde_json::Value = self
            .client
            .patch(route, Some(checks))
            .await
            .with_context(|| {
                format!(
                    "Failed to update required status checks for {}/{} ({})",
                    owner, repo, branch
                )
            })?;

        Ok(())
    }

    async fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<()> {
        let route = format!(
            "{}/required_signatures",
            Self::protection_route(owner, repo, branch)
        );

        let _: serde_json::Value = self
            .client
            .post(route, None::<&()>)
            .await
            .with_context(|| {
                format!(
                    "Failed to require signed commits for {}/{} ({})",
                    owner, repo, branch
                )
            })?;

        Ok(())
    }
}
