use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use repofolio_cache::{ResponseCache, SqliteDescriptionStore, SqliteStore, SystemClock};
use repofolio_core::{CachedPortfolio, Config, PortfolioAggregator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "repofolio")]
#[command(version, about = "GitHub portfolio data: repositories, commits and profile", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GitHub account whose repositories are shown
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Ignore cached data and fetch from GitHub
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List all portfolio repositories in display order
    Repos,
    /// Show one repository with languages, collaborators, commits and README
    Repo {
        /// Repository name
        name: String,
    },
    /// Full commit history of a repository
    Commits {
        /// Repository name
        name: String,
    },
    /// Show the owner's profile
    User,
    /// Manage the local response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
enum CacheAction {
    /// Drop one cache entry ("repos", "user" or a repository name)
    Clear { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repofolio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let refresh = cli.refresh;
    let open = || -> anyhow::Result<CachedPortfolio> {
        open_portfolio(&load_config(cli.config.as_deref(), cli.owner.clone())?)
    };

    match &cli.command {
        Commands::Repos => {
            let repos = open()?.get_repos(refresh).await?;
            print_json(&repos)?;
        }
        Commands::Repo { name } => {
            tracing::info!("Fetching repository: {}", name);
            match open()?.get_repo(name, refresh).await? {
                Some(repo) => print_json(&repo)?,
                None => anyhow::bail!("Repository {} not found", name),
            }
        }
        Commands::Commits { name } => {
            match open()?.aggregator().get_commits(name).await? {
                Some(commits) => print_json(&commits)?,
                None => anyhow::bail!("Repository {} not found", name),
            }
        }
        Commands::User => {
            let user = open()?.get_user(refresh).await?;
            print_json(&user)?;
        }
        Commands::Cache {
            action: CacheAction::Clear { key },
        } => {
            open()?.clear(key)?;
            println!("Cleared cache entry {}", key);
        }
        Commands::Config {
            action: ConfigAction::Init { force },
        } => {
            init_config(cli.config.as_deref(), cli.owner.as_deref(), *force)?;
        }
    }

    Ok(())
}

fn init_config(path: Option<&Path>, owner: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }

    let mut config = Config::default();
    if let Some(owner) = owner {
        config.github.owner = owner.to_string();
    }
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// File, then environment, then flags
fn load_config(path: Option<&Path>, owner: Option<String>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };

    if let Some(owner) = owner {
        config.github.owner = owner;
    }

    config.validate()?;
    Ok(config)
}

fn open_portfolio(config: &Config) -> anyhow::Result<CachedPortfolio> {
    let cache_path = config.cache_path()?;
    let descriptions_path = config.descriptions_path()?;
    ensure_parent(&cache_path)?;
    ensure_parent(&descriptions_path)?;

    let descriptions = SqliteDescriptionStore::new(&descriptions_path)
        .with_context(|| format!("opening {}", descriptions_path.display()))?;
    let store = SqliteStore::new(&cache_path)
        .with_context(|| format!("opening {}", cache_path.display()))?;

    let aggregator = PortfolioAggregator::from_config(config, Arc::new(descriptions))?;
    let cache = ResponseCache::with_clock(Arc::new(store), Arc::new(SystemClock), config.cache.ttl_ms);

    Ok(CachedPortfolio::new(aggregator, cache))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
