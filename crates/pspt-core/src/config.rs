use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound for `PSPT_CACHE_TTL_SECS`: one year.
pub const MAX_PRICE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let base_url = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        let trimmed = raw.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected an http(s) URL, got '{raw}'"),
            });
        }
        Ok(trimmed.to_string())
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PSPT_ENV", "development"))?;

    let bind_addr = parse("PSPT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PSPT_LOG_LEVEL", "info");
    let countries_path =
        PathBuf::from(or_default("PSPT_COUNTRIES_PATH", "./config/countries.yaml"));

    let db_max_connections = parse_u32("PSPT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PSPT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PSPT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let price_ttl_secs = parse_u64("PSPT_CACHE_TTL_SECS", "21600")?;
    if price_ttl_secs > MAX_PRICE_TTL_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "PSPT_CACHE_TTL_SECS".to_string(),
            reason: format!("must be at most {MAX_PRICE_TTL_SECS} seconds, got {price_ttl_secs}"),
        });
    }
    let fetch_retry_count = parse_u32("PSPT_FETCH_RETRY_COUNT", "3")?;
    let retry_backoff_ms = parse_u64("PSPT_RETRY_BACKOFF_MS", "500")?;
    let request_timeout_secs = parse_u64("PSPT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "PSPT_USER_AGENT",
        "PSPlusPriceTracker/1.0 (+backend fetch)",
    );

    let reference_currency = parse_currency_code(
        "PSPT_REFERENCE_CURRENCY",
        &or_default("PSPT_REFERENCE_CURRENCY", "SAR"),
    )?;

    let storefront_base_url = base_url("PSPT_STOREFRONT_BASE_URL", "https://www.playstation.com")?;
    let store_base_url = base_url("PSPT_STORE_BASE_URL", "https://store.playstation.com")?;
    let discovery_url = or_default(
        "PSPT_DISCOVERY_URL",
        "https://www.playstation.com/en-us/ps-plus/",
    );
    let currency_api_base_url =
        base_url("PSPT_CURRENCY_API_BASE_URL", "https://restcountries.com/v3.1")?;
    let fx_api_base_url = base_url("PSPT_FX_API_BASE_URL", "https://open.er-api.com/v6")?;

    let refresh_cron = lookup("PSPT_REFRESH_CRON")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    let job_retention_max = parse_usize("PSPT_JOB_RETENTION_MAX", "200")?;
    let job_retention_secs = parse_u64("PSPT_JOB_RETENTION_SECS", "86400")?;
    let rate_limit_per_minute = parse_usize("PSPT_RATE_LIMIT_PER_MINUTE", "60")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        countries_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        price_ttl_secs,
        fetch_retry_count,
        retry_backoff_ms,
        request_timeout_secs,
        user_agent,
        reference_currency,
        storefront_base_url,
        store_base_url,
        discovery_url,
        currency_api_base_url,
        fx_api_base_url,
        refresh_cron,
        job_retention_max,
        job_retention_secs,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PSPT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Upper-cases and validates a three-letter ISO 4217 code.
fn parse_currency_code(var: &str, raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a 3-letter currency code, got '{raw}'"),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
