//! Rate provider trait and structured error types.
//!
//! The RateProvider trait abstracts over the upstream FX API so the pipeline
//! can be driven by the real client or by an in-memory fake in tests.
//! Providers return the payload exactly as received; turning it into a
//! [`RawSnapshot`](super::snapshot::RawSnapshot) is the adapter's job.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

/// Structured error types for upstream fetches.
///
/// These are designed to be displayable in CLI output and logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {provider}")]
    HttpStatus { provider: String, status: u16 },

    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Which upstream endpoint a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Most recent published rates.
    Latest,
    /// Historical rates for one calendar day.
    History(NaiveDate),
}

/// Trait for FX rate providers.
///
/// Implementations handle the transport. The artifact store sits above
/// this trait; providers don't know where payloads are persisted.
pub trait RateProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the rate table for `base` using the given endpoint.
    fn fetch(&self, base: &str, mode: FetchMode) -> Result<Value, ProviderError>;
}
