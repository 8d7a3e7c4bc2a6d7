use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orgpolicy::{
    list_organization_repositories, Config, Credentials, GitHubClient, PolicyRunner, Repository,
    RunSummary, StepOutcome,
};

#[derive(Parser)]
#[command(name = "orgpolicy")]
#[command(
    about = "Enforce merge-strategy and branch-protection policy across a GitHub organization"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the policy to every repository of the organization (default)
    Apply {
        /// Organization to enforce (overrides the organization environment variable)
        #[arg(long)]
        org: Option<String>,

        /// Apply only to these repositories (OWNER/NAME), skipping enumeration
        #[arg(long = "repository", value_name = "OWNER/NAME")]
        repositories: Vec<Repository>,
    },

    /// List the repositories the policy would be applied to
    List {
        /// Organization to list (overrides the organization environment variable)
        #[arg(long)]
        org: Option<String>,
    },

    /// Print the effective policy
    Policy,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        // init writes a fresh default config, so there is nothing to load yet
        Some(Commands::Init { force }) => {
            init_logging(cli.verbose, "info")?;
            cmd_init(force, config_path)
        }
        Some(Commands::Apply { org, repositories }) => {
            let config = setup(config_path, cli.verbose)?;
            cmd_apply(org, repositories, &config).await
        }
        Some(Commands::List { org }) => {
            let config = setup(config_path, cli.verbose)?;
            cmd_list(org, &config).await
        }
        Some(Commands::Policy) => {
            let config = setup(config_path, cli.verbose)?;
            cmd_policy(&config)
        }
        None => {
            let config = setup(config_path, cli.verbose)?;
            cmd_apply(None, Vec::new(), &config).await
        }
    }
}

/// Load configuration and initialize logging from it
fn setup(config_path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    init_logging(verbose, &config.logging.level)?;
    info!("Starting orgpolicy v{}", env!("CARGO_PKG_VERSION"));

    Ok(config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(level)
                .with_context(|| format!("Invalid log level in configuration: {}", level))?,
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Apply the policy to the organization or to explicit repositories
async fn cmd_apply(
    org: Option<String>,
    repositories: Vec<Repository>,
    config: &Config,
) -> Result<()> {
    let summary = if repositories.is_empty() {
        let credentials = Credentials::from_env(&config.github, org)?;
        let client = GitHubClient::new(&credentials.token, config.github.api_base.as_deref())?;

        println!("🔍 Enforcing policy on organization {}", credentials.organization);

        PolicyRunner::new(&client, &config.policy)
            .with_order(config.run.order)
            .with_branch_target(config.run.branch_target)
            .run(&credentials.organization, config.github.per_page)
            .await?
    } else {
        if org.is_some() {
            bail!("--org cannot be combined with --repository");
        }
        let token = Credentials::token_from_env(&config.github)?;
        let client = GitHubClient::new(&token, config.github.api_base.as_deref())?;

        println!("🔍 Enforcing policy on {} repositories", repositories.len());

        PolicyRunner::new(&client, &config.policy)
            .with_order(config.run.order)
            .with_branch_target(config.run.branch_target)
            .run_repositories(repositories)
            .await
    };

    print_summary(&summary);
    Ok(())
}

/// List repositories that the policy would be applied to
async fn cmd_list(org: Option<String>, config: &Config) -> Result<()> {
    let credentials = Credentials::from_env(&config.github, org)?;
    let client = GitHubClient::new(&credentials.token, config.github.api_base.as_deref())?;

    let repositories =
        list_organization_repositories(&client, &credentials.organization, config.github.per_page)
            .await?;

    println!("Repositories ({}): ", repositories.len());
    for repo in repositories {
        match &repo.default_branch {
            Some(branch) => println!("  📁 {} ({})", repo.full_name(), branch),
            None => println!("  📁 {}", repo.full_name()),
        }
    }

    Ok(())
}

/// Print the effective policy as YAML
fn cmd_policy(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(&config.policy).context("Failed to serialize policy")?;
    print!("{}", yaml);
    Ok(())
}

/// Write the default configuration
fn cmd_init(force: bool, path: Option<&Path>) -> Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists at {:?} (use --force to overwrite)",
            config_path
        );
    }

    Config::default().save(&config_path)?;

    println!("✅ Configuration written to {:?}", config_path);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n🎉 Policy run complete!");
    println!(
        "   🕒 Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("   📊 Total repositories: {}", summary.total_repositories);
    println!("   ✅ Fully applied: {}", summary.fully_applied);
    println!("   ❌ With failures: {}", summary.with_failures);
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if summary.with_failures > 0 {
        println!("\n🔍 Failed Operations:");
        for outcome in summary.failures() {
            let name = outcome.repository.full_name();
            if let StepOutcome::Failed { error } = &outcome.settings {
                println!("   ❌ {} settings: {}", name, error);
            }
            for (step, error) in outcome.protection.failures() {
                println!(
                    "   ❌ {} {} ({}): {}",
                    name, step, outcome.protection.branch, error
                );
            }
        }
    }
}
