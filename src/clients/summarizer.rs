use anyhow::{Result, bail};
use async_trait::async_trait;
use std::time::Duration;

use super::Summarizer;
use super::process::run_tool;
use crate::config::SummarizerConfig;

/// Summarizer backed by an external script. The description is passed as
/// the last argument and the summary is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSummarizer {
    #[must_use]
    pub fn new(config: &SummarizerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[async_trait]
impl Summarizer for CommandSummarizer {
    async fn summarize(&self, description: &str) -> Result<String> {
        let mut args = self.args.clone();
        args.push(description.to_string());

        let output = run_tool(&self.program, &args, Some(self.timeout)).await?;
        let summary = output.stdout.trim();
        if summary.is_empty() {
            bail!("{} produced no summary", self.program);
        }
        Ok(summary.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summary_from_stdout() {
        let summarizer = CommandSummarizer::new(&SummarizerConfig {
            enabled: true,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo \"short: $0\"".to_string()],
            timeout_seconds: 5,
        });
        let summary = summarizer.summarize("Binding to a protein.").await.unwrap();
        assert_eq!(summary, "short: Binding to a protein.");
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let summarizer = CommandSummarizer::new(&SummarizerConfig {
            enabled: true,
            program: "true".to_string(),
            args: Vec::new(),
            timeout_seconds: 5,
        });
        assert!(summarizer.summarize("anything").await.is_err());
    }
}
