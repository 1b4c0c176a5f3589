//! `db` subcommand handlers.

use std::path::Path;

use sqlx::PgPool;

pub(crate) async fn run_ping(pool: &PgPool) -> anyhow::Result<()> {
    pspt_db::ping(pool).await?;
    println!("database reachable");
    Ok(())
}

pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = pspt_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Loads the seed file and upserts every entry by ISO code.
pub(crate) async fn run_seed(pool: &PgPool, path: &Path) -> anyhow::Result<()> {
    let file = pspt_core::load_countries(path)?;
    let countries = file.to_new_countries();
    tracing::info!(path = %path.display(), count = countries.len(), "seeding countries");

    let seeded = pspt_db::seed_countries(pool, &countries).await?;
    println!("seeded {seeded} countries from {}", path.display());
    Ok(())
}
