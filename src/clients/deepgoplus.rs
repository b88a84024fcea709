use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::process::{ToolError, ToolOutput, run_tool};
use super::FunctionAnnotator;
use crate::config::DeepGoPlusConfig;

#[derive(Debug, Clone)]
pub struct DeepGoPlusClient {
    program: String,
    data_root: String,
    timeout: Option<Duration>,
}

impl DeepGoPlusClient {
    #[must_use]
    pub fn new(config: &DeepGoPlusConfig) -> Self {
        Self {
            program: config.program.clone(),
            data_root: config.data_root.clone(),
            timeout: config.timeout_seconds.map(Duration::from_secs),
        }
    }

    fn args(&self, proteins: &Path, output: &Path) -> Vec<String> {
        vec![
            "--data-root".to_string(),
            self.data_root.clone(),
            "--in-file".to_string(),
            proteins.display().to_string(),
            "--out-file".to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl FunctionAnnotator for DeepGoPlusClient {
    async fn annotate(&self, proteins: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        run_tool(&self.program, &self.args(proteins, output), self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let client = DeepGoPlusClient::new(&DeepGoPlusConfig::default());
        let args = client.args(Path::new("p.fasta"), Path::new("out.tsv"));
        assert_eq!(
            args.join(" "),
            "--data-root data/deepgoplus --in-file p.fasta --out-file out.tsv"
        );
    }
}
