use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::Duration;

use super::{RetryPolicy, StructurePredictor, retry_with_backoff};
use crate::config::EsmFoldConfig;

/// ESM Atlas folding endpoint. The request body is the bare sequence.
#[derive(Clone)]
pub struct EsmFoldClient {
    client: Client,
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl EsmFoldClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &EsmFoldConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: Duration::from_secs(config.request_timeout_seconds),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                initial_backoff: Duration::from_secs(config.initial_backoff_seconds),
            },
        }
    }

    async fn fold_once(&self, sequence: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .timeout(self.timeout)
            .body(sequence.to_string())
            .send()
            .await
            .context("ESMFold request failed")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read ESMFold response")?;

        if !status.is_success() {
            bail!("ESMFold API error: {status} - {body}");
        }

        if body.trim().is_empty() {
            bail!("ESMFold returned an empty model");
        }

        Ok(body)
    }
}

#[async_trait]
impl StructurePredictor for EsmFoldClient {
    async fn fold(&self, sequence: &str) -> Result<String> {
        retry_with_backoff(self.retry, "ESMFold prediction", |_| self.fold_once(sequence)).await
    }
}
