use anyhow::{anyhow, bail, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::enumerate::DEFAULT_PER_PAGE;
use crate::policy::Policy;
use crate::reconcile::{BranchTarget, RunOrder};

/// Main configuration structure for orgpolicy
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// GitHub access and enumeration settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Policy applied to every repository
    #[serde(default)]
    pub policy: Policy,

    /// Run behavior
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    /// Environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Environment variable holding the organization name
    #[serde(default = "default_organization_env")]
    pub organization_env: String,

    /// Repositories requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u8,

    /// API base URI for GitHub Enterprise (defaults to api.github.com)
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Which reconciler runs first for each repository
    #[serde(default)]
    pub order: RunOrder,

    /// Which branch receives protection rules
    #[serde(default)]
    pub branch_target: BranchTarget,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Credentials and target supplied through the environment
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub organization: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("organization", &self.organization)
            .finish()
    }
}

// Default value functions
fn default_token_env() -> String {
    "ACCESS_TOKEN".to_string()
}
fn default_organization_env() -> String {
    "GITHUB_ORG".to_string()
}
fn default_per_page() -> u8 {
    DEFAULT_PER_PAGE
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            organization_env: default_organization_env(),
            per_page: default_per_page(),
            api_base: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Read a mandatory, non-empty environment variable
fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!("Missing environment variable! {}", name)),
    }
}

impl Credentials {
    /// Load the token and organization named by the GitHub configuration
    ///
    /// `organization` overrides the environment when given.
    pub fn from_env(github: &GitHubConfig, organization: Option<String>) -> Result<Self> {
        let token = required_env(&github.token_env)?;
        let organization = match organization {
            Some(org) if !org.trim().is_empty() => org,
            Some(_) => bail!("Organization name must not be empty"),
            None => required_env(&github.organization_env)?,
        };

        Ok(Self {
            token,
            organization,
        })
    }

    /// Load only the token, for runs against explicit repositories
    pub fn token_from_env(github: &GitHubConfig) -> Result<String> {
        required_env(&github.token_env)
    }
}

impl Config {
    /// Load configuration from the default location, or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using built-in policy", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let expanded = shellexpand::full(&path.to_string_lossy())
            .with_context(|| format!("Failed to expand config path: {:?}", path))?
            .into_owned();

        let content = std::fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read config file: {}", expanded))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", expanded))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("orgpolicy").join("config.yml"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.github.per_page) {
            bail!(
                "github.per_page must be between 1 and 100, got {}",
                self.github.per_page
            );
        }
        if self.policy.settings.default_branch.trim().is_empty() {
            bail!("policy.settings.default_branch must not be empty");
        }
        Ok(())
    }
}
