//! Common test utilities and helpers for orgpolicy tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use orgpolicy::policy::{BranchProtectionRules, RepositorySettings, RequiredStatusChecks};
use orgpolicy::{Platform, Repository, RepositoryPage};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A remote call recorded by the simulated platform
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListPage { org: String, page: u32, per_page: u8 },
    EditRepository { repo: String, settings: RepositorySettings },
    UpdateProtection { repo: String, branch: String, rules: BranchProtectionRules },
    UpdateStatusChecks { repo: String, branch: String, checks: RequiredStatusChecks },
    RequireSignatures { repo: String, branch: String },
}

/// Protection state the simulated platform holds for one branch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BranchState {
    pub rules: Option<BranchProtectionRules>,
    pub status_checks: Option<RequiredStatusChecks>,
    pub signatures_required: bool,
}

/// In-memory stand-in for the hosting platform
///
/// Pages are served from `repositories` in chunks of the requested page size.
/// Every call is recorded; writes update the simulated remote state.
#[derive(Default)]
pub struct SimulatedPlatform {
    repositories: Vec<Repository>,
    failing_pages: HashSet<u32>,
    failing_protection: HashSet<String>,
    failing_settings: HashSet<String>,
    calls: Mutex<Vec<Call>>,
    settings: Mutex<HashMap<String, RepositorySettings>>,
    branches: Mutex<HashMap<(String, String), BranchState>>,
}

impl SimulatedPlatform {
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            repositories,
            ..Default::default()
        }
    }

    /// Organization `org` with repositories named `repo-0..n`
    pub fn with_repository_count(org: &str, n: usize) -> Self {
        Self::new(
            (0..n)
                .map(|i| Repository::new(org, format!("repo-{}", i)))
                .collect(),
        )
    }

    pub fn fail_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn fail_protection_for(mut self, full_name: &str) -> Self {
        self.failing_protection.insert(full_name.to_string());
        self
    }

    pub fn fail_settings_for(mut self, full_name: &str) -> Self {
        self.failing_settings.insert(full_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ListPage { page, .. } => Some(page),
                _ => None,
            })
            .collect()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::ListPage { .. }))
            .collect()
    }

    pub fn settings_of(&self, full_name: &str) -> Option<RepositorySettings> {
        self.settings.lock().unwrap().get(full_name).cloned()
    }

    pub fn branch_of(&self, full_name: &str, branch: &str) -> Option<BranchState> {
        self.branches
            .lock()
            .unwrap()
            .get(&(full_name.to_string(), branch.to_string()))
            .cloned()
    }

    /// Seed a branch with pre-existing protection
    pub fn seed_branch(&self, full_name: &str, branch: &str, state: BranchState) {
        self.branches
            .lock()
            .unwrap()
            .insert((full_name.to_string(), branch.to_string()), state);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn full_name(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

#[async_trait]
impl Platform for SimulatedPlatform {
    async fn list_organization_repositories(
        &self,
        org: &str,
        page: u32,
        per_page: u8,
    ) -> Result<RepositoryPage> {
        self.record(Call::ListPage {
            org: org.to_string(),
            page,
            per_page,
        });

        if self.failing_pages.contains(&page) {
            return Err(anyhow!("502 Bad Gateway on page {}", page));
        }

        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        let repositories: Vec<Repository> = self
            .repositories
            .iter()
            .filter(|r| r.owner == org)
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();

        let total = self.repositories.iter().filter(|r| r.owner == org).count();
        let next_page = if start + per_page < total {
            Some(page + 1)
        } else {
            None
        };

        Ok(RepositoryPage {
            repositories,
            next_page,
        })
    }

    async fn edit_repository(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettings,
    ) -> Result<()> {
        let name = full_name(owner, repo);
        self.record(Call::EditRepository {
            repo: name.clone(),
            settings: settings.clone(),
        });

        if self.failing_settings.contains(&name) {
            return Err(anyhow!("403 Forbidden: {} is archived", name));
        }

        self.settings.lock().unwrap().insert(name, settings.clone());
        Ok(())
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtectionRules,
    ) -> Result<()> {
        let name = full_name(owner, repo);
        self.record(Call::UpdateProtection {
            repo: name.clone(),
            branch: branch.to_string(),
            rules: rules.clone(),
        });

        if self.failing_protection.contains(&name) {
            return Err(anyhow!("404 Branch not found: {}", branch));
        }

        let mut branches = self.branches.lock().unwrap();
        let state = branches.entry((name, branch.to_string())).or_default();
        state.rules = Some(rules.clone());
        state.status_checks = Some(rules.required_status_checks.clone());
        Ok(())
    }

    async fn update_required_status_checks(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        checks: &RequiredStatusChecks,
    ) -> Result<()> {
        let name = full_name(owner, repo);
        self.record(Call::UpdateStatusChecks {
            repo: name.clone(),
            branch: branch.to_string(),
            checks: checks.clone(),
        });

        if self.failing_protection.contains(&name) {
            return Err(anyhow!("404 Branch not protected: {}", branch));
        }

        let mut branches = self.branches.lock().unwrap();
        let state = branches.entry((name, branch.to_string())).or_default();
        state.status_checks = Some(checks.clone());
        Ok(())
    }

    async fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<()> {
        let name = full_name(owner, repo);
        self.record(Call::RequireSignatures {
            repo: name.clone(),
            branch: branch.to_string(),
        });

        if self.failing_protection.contains(&name) {
            return Err(anyhow!("404 Branch not protected: {}", branch));
        }

        let mut branches = self.branches.lock().unwrap();
        branches
            .entry((name, branch.to_string()))
            .or_default()
            .signatures_required = true;
        Ok(())
    }
}
