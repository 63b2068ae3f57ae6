//! Shared infrastructure for the ledger and RPC adapters.
//!
//! `FetchClient` wraps a blocking `reqwest` client and classifies responses:
//!
//! | Status        | Result                     |
//! |---------------|----------------------------|
//! | 2xx           | JSON body (BOM stripped)   |
//! | 401, 403      | `FetchError::Auth`         |
//! | 400           | `FetchError::Rejected`     |
//! | other non-2xx | `FetchError::Upstream`     |
//!
//! Requests are sent once. There is no retry loop.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use walletsync_recon::{LedgerError, TokenError};

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const USER_AGENT: &str = concat!("wsync/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 30;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("{source_name} auth failed ({status}): {message}")]
    Auth { source_name: &'static str, status: u16, message: String },
    #[error("{source_name} request rejected ({status}): {message}")]
    Rejected { source_name: &'static str, status: u16, message: String },
    #[error("{source_name} error ({status}): {message}")]
    Upstream { source_name: &'static str, status: u16, message: String },
    #[error("{source_name} unreachable: {message}")]
    Network { source_name: &'static str, message: String },
    #[error("failed to parse {source_name} response: {message}")]
    Decode { source_name: &'static str, message: String },
}

impl From<FetchError> for LedgerError {
    fn from(err: FetchError) -> Self {
        let text = err.to_string();
        match err {
            FetchError::Auth { .. } => LedgerError::Auth(text),
            FetchError::Rejected { .. } => LedgerError::Rejected(text),
            FetchError::Upstream { status, message, .. } => LedgerError::Upstream { status, message },
            FetchError::Network { .. } => LedgerError::Network(text),
            FetchError::Decode { .. } => LedgerError::Decode(text),
        }
    }
}

impl From<FetchError> for TokenError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Decode { message, .. } => TokenError::Decode(message),
            other => TokenError::Network(other.to_string()),
        }
    }
}

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles error classification.
///
/// Adapters own their credentials and base URL. They pass a
/// request-building closure to [`FetchClient::send`].
pub(crate) struct FetchClient {
    http: reqwest::blocking::Client,
    source_name: &'static str,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &'static str,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network { source_name, message: e.to_string() })?;

        Ok(Self { http, source_name, error_extractor })
    }

    /// Send one request and return its JSON body.
    ///
    /// An empty 2xx body yields `Value::Null`.
    pub(crate) fn send(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, FetchError> {
        let source_name = self.source_name;
        let resp = build_request(&self.http).send().map_err(|e| FetchError::Network {
            source_name,
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| FetchError::Network {
            source_name,
            message: format!("failed to read response body: {e}"),
        })?;
        let trimmed = text.trim_start_matches('\u{feff}').trim();

        if !(200..300).contains(&status) {
            let body: serde_json::Value =
                serde_json::from_str(trimmed).unwrap_or(serde_json::Value::Null);
            let message = (self.error_extractor)(&body, status);
            tracing::debug!(source = source_name, status, %message, "request failed");
            return Err(match status {
                401 | 403 => FetchError::Auth { source_name, status, message },
                400 => FetchError::Rejected { source_name, status, message },
                _ => FetchError::Upstream { source_name, status, message },
            });
        }

        if trimmed.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|e| FetchError::Decode {
            source_name,
            message: format!("{} (body: {})", e, truncate(trimmed, 200)),
        })
    }

    /// Send and deserialize into `T`.
    pub(crate) fn send_typed<T: DeserializeOwned>(
        &self,
        build_request: impl FnOnce(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<T, FetchError> {
        let body = self.send(build_request)?;
        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            source_name: self.source_name,
            message: e.to_string(),
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
