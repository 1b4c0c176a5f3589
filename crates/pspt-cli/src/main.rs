mod db;
mod prices;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pspt_core::{AppConfig, PriceStore};
use pspt_db::PgPriceStore;
use pspt_pricing::Services;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pspt-cli")]
#[command(about = "PlayStation Plus price tracker command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List tracked countries, syncing newly discovered storefronts first
    Countries,
    /// Refresh subscription prices for one country or a window of countries
    Refresh {
        /// ISO code of a single country to refresh
        #[arg(long, conflicts_with = "all")]
        iso: Option<String>,
        /// Refresh a window of the country list instead of one country
        #[arg(long)]
        all: bool,
        /// Refetch even when stored prices are still fresh
        #[arg(long)]
        force: bool,
        /// First country index of the window (with --all)
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Window size (with --all)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Look up a game's price across a window of storefronts
    Game {
        /// Game title to search for
        name: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert the seed country list
    Seed {
        /// Seed file; defaults to the configured countries path
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("pspt-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = pspt_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = connect(&config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_ping(&pool).await?,
            DbCommands::Migrate => db::run_migrate(&pool).await?,
            DbCommands::Seed { path } => {
                let path = path.unwrap_or_else(|| config.countries_path.clone());
                db::run_seed(&pool, &path).await?;
            }
        },
        Commands::Countries => {
            let services = services(&config, &pool)?;
            prices::run_countries(&services).await?;
        }
        Commands::Refresh {
            iso,
            all,
            force,
            offset,
            limit,
        } => {
            let services = services(&config, &pool)?;
            if all {
                prices::run_refresh_all(&services, force, offset, limit).await?;
            } else {
                prices::run_refresh_one(&services, iso.as_deref(), force).await?;
            }
        }
        Commands::Game {
            name,
            offset,
            limit,
        } => {
            let services = services(&config, &pool)?;
            prices::run_game_search(&services, &name, offset, limit).await?;
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = pspt_db::PoolConfig::from_app_config(config);
    let pool = pspt_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

fn services(config: &AppConfig, pool: &PgPool) -> anyhow::Result<Services> {
    let store: Arc<dyn PriceStore> = Arc::new(PgPriceStore::new(pool.clone()));
    Ok(Services::from_config(config, store)?)
}
