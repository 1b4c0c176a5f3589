pub mod client;
pub mod currency;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod games;
pub mod number;
mod rate_limit;
pub mod text;
pub mod urls;

pub use client::{PageFetcher, StorefrontClient, PAGE_CACHE_TTL};
pub use discovery::parse_discovered_countries;
pub use error::ScraperError;
pub use extract::{extract, extract_prices, Extraction, ExtractionStrategy};
pub use games::{best_match, GameMatch, GameTile};
pub use number::parse_localized_number;
