mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pspt_core::PriceStore;
use pspt_db::PgPriceStore;
use pspt_pricing::Services;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pspt_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting pspt-server");

    let pool_config = pspt_db::PoolConfig::from_app_config(&config);
    let pool = pspt_db::connect_pool(&config.database_url, pool_config).await?;
    pspt_db::run_migrations(&pool).await?;

    let store: Arc<dyn PriceStore> = Arc::new(PgPriceStore::new(pool.clone()));
    let services = Services::from_config(&config, store)?;

    let _scheduler = scheduler::build_scheduler(
        Arc::clone(&services.jobs),
        config.refresh_cron.as_deref(),
    )
    .await?;

    let app = build_app(
        AppState { pool, services },
        RateLimitState::per_minute(config.rate_limit_per_minute),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
