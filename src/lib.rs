//! orgpolicy - Organization-wide repository policy enforcement
//!
//! orgpolicy enumerates every repository of a GitHub organization and applies
//! one fixed policy to each of them: merge-strategy settings and branch
//! protection rules. Every request is a full overwrite, so re-running
//! converges on the same remote state.
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and environment credentials
//! - [`policy`]: The policy applied to every repository
//! - [`platform`]: The narrow hosting-platform interface
//! - [`github`]: GitHub implementation of the platform interface
//! - [`enumerate`]: Paginated organization enumeration
//! - [`settings`] / [`protection`]: Per-repository reconcilers
//! - [`reconcile`]: The policy runner and its run summary

pub mod config;
pub mod enumerate;
pub mod github;
pub mod platform;
pub mod policy;
pub mod protection;
pub mod reconcile;
pub mod settings;

pub use config::{Config, Credentials};
pub use enumerate::list_organization_repositories;
pub use github::GitHubClient;
pub use platform::{Platform, Repository, RepositoryPage};
pub use policy::Policy;
pub use protection::{apply_branch_protection, ProtectionOutcome};
pub use reconcile::{PolicyRunner, RepositoryOutcome, RunSummary, StepOutcome};
pub use settings::apply_repository_settings;
