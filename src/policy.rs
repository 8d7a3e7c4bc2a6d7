//! Organization policy definition
//!
//! A [`Policy`] is applied uniformly to every repository in a run. It is
//! read-only once loaded; reconcilers only ever borrow it.
//!
//! Every field is a full overwrite on the remote side. Empty lists and `None`
//! dismissal restrictions mean "no restriction of that kind", never
//! "leave unchanged".

use serde::{Deserialize, Serialize};

/// Branch name historically enforced on every repository
pub const DEFAULT_BRANCH: &str = "master";

/// Complete policy applied to each repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct Policy {
    /// Repository-level settings (merge strategies, issues, default branch)
    #[serde(default)]
    pub settings: RepositorySettings,

    /// Rules pushed onto the protected branch
    #[serde(default)]
    pub protection: BranchProtectionRules,
}

/// Repository-level settings sent with a single edit request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositorySettings {
    /// Whether the issue tracker stays enabled
    #[serde(default)]
    pub has_issues: bool,

    /// Default branch name, also the branch protection targets
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Allow rebase merges on pull requests
    #[serde(default)]
    pub allow_rebase_merge: bool,

    /// Allow squash merges on pull requests
    #[serde(default)]
    pub allow_squash_merge: bool,

    /// Allow merge commits on pull requests
    #[serde(default = "default_true")]
    pub allow_merge_commit: bool,
}

/// Protection rules for a single branch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchProtectionRules {
    #[serde(default)]
    pub required_status_checks: RequiredStatusChecks,

    #[serde(default)]
    pub required_reviews: RequiredReviews,

    /// Apply the rules to administrators too
    #[serde(default)]
    pub enforce_admins: bool,

    /// Who may push directly to the branch
    #[serde(default)]
    pub push_restrictions: PushRestrictions,

    /// Require signed commits on the branch
    #[serde(default)]
    pub require_signatures: bool,
}

/// Status checks that must pass before merging
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequiredStatusChecks {
    /// Branch must be up to date with the base before merging
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Check contexts; empty means no specific check is required
    #[serde(default)]
    pub contexts: Vec<String>,
}

/// Pull request review requirements
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequiredReviews {
    #[serde(default = "default_review_count")]
    pub required_approving_review_count: u32,

    #[serde(default = "default_true")]
    pub dismiss_stale_reviews: bool,

    /// Who may dismiss reviews; `None` means nobody is singled out
    #[serde(default)]
    pub dismissal_restrictions: Option<DismissalRestrictions>,
}

/// Users and teams allowed to dismiss reviews
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct DismissalRestrictions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

/// Users and teams allowed to push to the protected branch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct PushRestrictions {
    #[serde(default)]
    pub users: Vec<String>,

    #[serde(default)]
    pub teams: Vec<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}
fn default_true() -> bool {
    true
}
fn default_review_count() -> u32 {
    2
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            has_issues: false,
            default_branch: default_branch(),
            allow_rebase_merge: false,
            allow_squash_merge: false,
            allow_merge_commit: default_true(),
        }
    }
}

impl Default for BranchProtectionRules {
    fn default() -> Self {
        Self {
            required_status_checks: RequiredStatusChecks::default(),
            required_reviews: RequiredReviews::default(),
            enforce_admins: false,
            push_restrictions: PushRestrictions::default(),
            require_signatures: false,
        }
    }
}

impl Default for RequiredStatusChecks {
    fn default() -> Self {
        Self {
            strict: default_true(),
            contexts: Vec::new(),
        }
    }
}

impl Default for RequiredReviews {
    fn default() -> Self {
        Self {
            required_approving_review_count: default_review_count(),
            dismiss_stale_reviews: default_true(),
            dismissal_restrictions: None,
        }
    }
}

impl Policy {
    /// Branch the policy protects unless configured otherwise
    pub fn protected_branch(&self) -> &str {
        &self.settings.default_branch
    }
}
