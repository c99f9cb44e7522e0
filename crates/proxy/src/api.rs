// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the reverse-proxy admin API.
//!
//! The proxy runs on this machine and accepts full-document replacement
//! over `POST /load`; configuration is regenerated from scratch on every
//! reconciliation, never patched.

use thiserror::Error;

use super::config::Config;

/// Local admin API of the reverse-proxy collaborator.
pub const ADMIN_API_ENDPOINT: &str = "http://localhost:2019";

/// Admin-API client errors.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to serialize proxy config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("admin API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("admin API error: {body}")]
    Api { status: u16, body: String },
}

pub struct Api {
    client: reqwest::Client,
    endpoint: String,
}

impl Api {
    pub fn new() -> Self {
        Self::with_endpoint(ADMIN_API_ENDPOINT)
    }

    /// Target a non-default endpoint (tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }

    /// Push a full configuration document to the proxy.
    pub async fn load(&self, config: &Config) -> Result<(), ProxyError> {
        let body = serde_json::to_vec(config).map_err(ProxyError::Serialize)?;

        let response = self
            .client
            .post(format!("{}/load", self.endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}
