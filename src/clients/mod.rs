//! External collaborators of the pipeline: local command-line tools and
//! web APIs. Each sits behind a trait so the executor can be driven by
//! fakes in tests.

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub mod augustus;
pub mod deepgoplus;
pub mod esmfold;
pub mod process;
pub mod quickgo;
pub mod summarizer;

pub use process::{ToolError, ToolOutput};

/// Gene prediction over a nucleotide FASTA, writing a GFF report.
#[async_trait]
pub trait GenePredictor: Send + Sync {
    async fn predict(&self, input: &Path, output: &Path) -> Result<ToolOutput, ToolError>;
}

/// GO term prediction over a protein FASTA, writing a TSV.
#[async_trait]
pub trait FunctionAnnotator: Send + Sync {
    async fn annotate(&self, proteins: &Path, output: &Path) -> Result<ToolOutput, ToolError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermInfo {
    pub name: String,
    pub definition: String,
}

/// GO term name and definition lookup. `Ok(None)` means the service
/// answered but does not know the term.
#[async_trait]
pub trait TermLookup: Send + Sync {
    async fn lookup(&self, go_id: &str) -> Result<Option<TermInfo>>;
}

/// Protein structure prediction. Returns PDB text.
#[async_trait]
pub trait StructurePredictor: Send + Sync {
    async fn fold(&self, sequence: &str) -> Result<String>;
}

/// Shortens a GO term definition into a readable sentence.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, description: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Wait before attempt `attempt + 1`, doubling from the initial backoff.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is spent. The last
/// error is returned.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                return Err(e.context(format!("{label} failed after {attempt} attempts")));
            }
            Err(e) => {
                let wait = policy.backoff_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    wait_secs = wait.as_secs(),
                    error = %e,
                    "{label} failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.backoff_after(1), Duration::from_secs(5));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(10));
        assert_eq!(policy.backoff_after(3), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
        };

        let counter = calls.clone();
        let value = retry_with_backoff(policy, "fold", move |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    anyhow::bail!("busy");
                }
                Ok(attempt)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        };

        let counter = calls.clone();
        let result: Result<()> = retry_with_backoff(policy, "fold", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("server said no")
            }
        })
        .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("after 2 attempts"));
        assert!(message.contains("server said no"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
