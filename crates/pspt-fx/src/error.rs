use thiserror::Error;

/// Errors from the currency reference and exchange-rate lookups.
///
/// These never cross the public lookup methods, which degrade to an empty
/// list or `None`; they exist for logging and retry decisions.
#[derive(Debug, Error)]
pub enum FxError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate provider reported {result:?} for base {base}")]
    Unsuccessful { base: String, result: Option<String> },

    #[error("no {to} rate in table for base {from}")]
    MissingRate { from: String, to: String },

    #[error("invalid {to} rate for base {from}: {value}")]
    InvalidRate {
        from: String,
        to: String,
        value: String,
    },

    #[error("no currencies listed for country {iso_code}")]
    NoCurrencies { iso_code: String },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}
