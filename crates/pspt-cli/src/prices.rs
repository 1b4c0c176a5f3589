//! Price and game lookup handlers. Results are printed as pretty JSON so they
//! can be piped into other tools.

use anyhow::Context;
use pspt_pricing::{RefreshTarget, Services};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{rendered}");
    Ok(())
}

pub(crate) async fn run_countries(services: &Services) -> anyhow::Result<()> {
    let inserted = services.refresh.sync_discovered_countries().await;
    if inserted > 0 {
        tracing::info!(inserted, "discovered new countries");
    }
    let countries = services.store.list_countries().await?;
    print_json(&countries)
}

pub(crate) async fn run_refresh_one(
    services: &Services,
    iso: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let target = RefreshTarget::from_parts(None, iso)
        .context("pass --iso <CODE> or --all")?;
    let refreshed = services.refresh.refresh_one(&target, force).await?;
    print_json(&refreshed)
}

pub(crate) async fn run_refresh_all(
    services: &Services,
    force: bool,
    offset: usize,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let outcome = services.refresh.refresh_batch(force, offset, limit).await?;
    if let Some(next) = outcome.next_offset {
        tracing::info!(next_offset = next, "more countries remain; rerun with --offset {next}");
    }
    print_json(&outcome)
}

pub(crate) async fn run_game_search(
    services: &Services,
    name: &str,
    offset: usize,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let outcome = services.games.search(name, offset, limit).await?;
    tracing::info!(
        found = outcome.records.len(),
        reference_currency = services.quotes.reference_currency(),
        "game search complete"
    );
    print_json(&outcome)
}
