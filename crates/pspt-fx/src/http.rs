use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::FxError;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, FxError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .default_headers(headers)
        .build()?)
}

/// Validates `base_url` and strips trailing slashes so paths can be appended.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, FxError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|_| FxError::InvalidBaseUrl(base_url.to_owned()))?;
    Ok(trimmed.to_owned())
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    context: &str,
) -> Result<T, FxError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FxError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| FxError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
