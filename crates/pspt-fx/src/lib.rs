pub mod currency;
pub mod error;
mod http;
pub mod rates;
mod retry;

pub use currency::{normalize_storefront_currency, CurrencyResolver, CurrencySource};
pub use error::FxError;
pub use rates::{FxService, RateSource};
