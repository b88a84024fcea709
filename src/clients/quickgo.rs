use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use std::time::Duration;

use super::{TermInfo, TermLookup};
use crate::config::QuickGoConfig;

#[derive(Debug, Deserialize)]
struct TermsResponse {
    #[serde(default)]
    results: Vec<TermResult>,
}

#[derive(Debug, Deserialize)]
struct TermResult {
    name: Option<String>,
    definition: Option<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    text: Option<String>,
}

#[derive(Clone)]
pub struct QuickGoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl QuickGoClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &QuickGoConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }

    fn term_url(&self, go_id: &str) -> String {
        format!("{}/ontology/go/terms/{}", self.base_url, go_id)
    }
}

#[async_trait]
impl TermLookup for QuickGoClient {
    async fn lookup(&self, go_id: &str) -> Result<Option<TermInfo>> {
        let response = self
            .client
            .get(self.term_url(go_id))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("QuickGO request for {go_id} failed"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("QuickGO API error: {status} - {body}"));
        }

        let body: TermsResponse = response
            .json()
            .await
            .with_context(|| format!("Invalid QuickGO response for {go_id}"))?;

        Ok(body.results.into_iter().next().map(|term| TermInfo {
            name: term
                .name
                .unwrap_or_else(|| crate::parser::annotation::NAME_NOT_FOUND.to_string()),
            definition: term
                .definition
                .and_then(|d| d.text)
                .unwrap_or_else(|| crate::parser::annotation::DESCRIPTION_NOT_FOUND.to_string()),
        }))
    }
}
