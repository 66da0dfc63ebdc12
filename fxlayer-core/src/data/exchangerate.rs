//! ExchangeRate-API (v6) data provider.
//!
//! Fetches `latest` and `history` rate tables for a base currency. The API
//! key is part of the URL path, so URLs are never logged.
//!
//! No retries: a failed day is recovered by re-running the backfill for it.

use super::provider::{FetchMode, ProviderError, RateProvider};
use chrono::Datelike;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// ExchangeRate-API client.
pub struct ExchangeRateApi {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRateApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build the endpoint URL for a base currency.
    ///
    /// History uses the documented `/history/{base}/{year}/{month}/{day}` form.
    fn endpoint_url(&self, base: &str, mode: FetchMode) -> String {
        match mode {
            FetchMode::Latest => format!("{}/{}/latest/{base}", self.base_url, self.api_key),
            FetchMode::History(day) => format!(
                "{}/{}/history/{base}/{}/{}/{}",
                self.base_url,
                self.api_key,
                day.year(),
                day.month(),
                day.day()
            ),
        }
    }

    /// Surface `{"result": "error", "error-type": ...}` bodies as errors.
    fn check_result(body: &Value) -> Result<(), ProviderError> {
        match body.get("result").and_then(Value::as_str) {
            Some("error") => {
                let kind = body
                    .get("error-type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown-error");
                Err(ProviderError::Rejected(kind.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl RateProvider for ExchangeRateApi {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    fn fetch(&self, base: &str, mode: FetchMode) -> Result<Value, ProviderError> {
        debug!(base, ?mode, "requesting rate table");
        let resp = self
            .client
            .get(self.endpoint_url(base, mode))
            .send()
            .map_err(|e| ProviderError::NetworkUnreachable(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                provider: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .map_err(|e| ProviderError::ResponseFormatChanged(e.without_url().to_string()))?;
        if !body.is_object() {
            return Err(ProviderError::ResponseFormatChanged(
                "top-level JSON value is not an object".into(),
            ));
        }
        Self::check_result(&body)?;
        Ok(body)
    }
}
