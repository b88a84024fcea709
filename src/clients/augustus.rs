use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::process::{ToolError, ToolOutput, run_tool};
use super::GenePredictor;
use crate::config::AugustusConfig;

#[derive(Debug, Clone)]
pub struct AugustusClient {
    program: String,
    species: String,
    timeout: Option<Duration>,
}

impl AugustusClient {
    #[must_use]
    pub fn new(config: &AugustusConfig) -> Self {
        Self {
            program: config.program.clone(),
            species: config.species.clone(),
            timeout: config.timeout_seconds.map(Duration::from_secs),
        }
    }

    fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            format!("--species={}", self.species),
            input.display().to_string(),
            format!("--outfile={}", output.display()),
        ]
    }
}

#[async_trait]
impl GenePredictor for AugustusClient {
    async fn predict(&self, input: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        run_tool(&self.program, &self.args(input, output), self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let client = AugustusClient::new(&AugustusConfig::default());
        assert_eq!(
            client.args(Path::new("run/input.fasta"), Path::new("run/augustus.gff")),
            vec![
                "--species=human".to_string(),
                "run/input.fasta".to_string(),
                "--outfile=run/augustus.gff".to_string(),
            ]
        );
    }
}
