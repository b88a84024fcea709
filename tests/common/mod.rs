//! Fake collaborators and configuration shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use genevision::clients::{
    FunctionAnnotator, GenePredictor, StructurePredictor, TermInfo, TermLookup, ToolError,
    ToolOutput,
};
use genevision::config::{Config, SecurityConfig};
use genevision::parser::fasta;
use genevision::pipeline::Collaborators;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const INPUT: &str = "ACGTACGTAACGTACGTAACGTACGTAACGTACGTA";

pub const THREE_GENES: &str = "\
# start gene g1
input_sequence\tAUGUSTUS\tCDS\t1\t9\t1\t+\t0\tg1.t1
# protein sequence = [MK]
# end gene g1
# start gene g2
input_sequence\tAUGUSTUS\tCDS\t10\t18\t1\t+\t0\tg2.t1
# protein sequence = [MR]
# end gene g2
# start gene g3
input_sequence\tAUGUSTUS\tCDS\t19\t27\t1\t+\t0\tg3.t1
# protein sequence = [MS]
# end gene g3
";

pub struct FakeAugustus;

#[async_trait]
impl GenePredictor for FakeAugustus {
    async fn predict(&self, _input: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        tokio::fs::write(output, THREE_GENES)
            .await
            .map_err(|source| ToolError::Spawn {
                program: "augustus".to_string(),
                source,
            })?;
        Ok(ToolOutput::default())
    }
}

pub struct BrokenAugustus;

#[async_trait]
impl GenePredictor for BrokenAugustus {
    async fn predict(&self, _input: &Path, _output: &Path) -> Result<ToolOutput, ToolError> {
        Err(ToolError::Failed {
            program: "augustus".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "species human not found".to_string(),
        })
    }
}

/// Every protein gets a weak and a strong term.
pub struct FakeDeepGo;

#[async_trait]
impl FunctionAnnotator for FakeDeepGo {
    async fn annotate(&self, proteins: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        let text = tokio::fs::read_to_string(proteins).await.unwrap_or_default();
        let tsv: String = fasta::parse_records(&text)
            .unwrap_or_default()
            .iter()
            .map(|p| format!("{}\tGO:0005515|0.81\tGO:0003677|0.95\n", p.id))
            .collect();
        tokio::fs::write(output, tsv)
            .await
            .map_err(|source| ToolError::Spawn {
                program: "deepgoplus".to_string(),
                source,
            })?;
        Ok(ToolOutput::default())
    }
}

pub struct FakeQuickGo;

#[async_trait]
impl TermLookup for FakeQuickGo {
    async fn lookup(&self, go_id: &str) -> anyhow::Result<Option<TermInfo>> {
        Ok(match go_id {
            "GO:0003677" => Some(TermInfo {
                name: "DNA binding".to_string(),
                definition: "Interacting selectively with DNA.".to_string(),
            }),
            "GO:0005515" => Some(TermInfo {
                name: "protein binding".to_string(),
                definition: "Interacting selectively with any protein.".to_string(),
            }),
            _ => None,
        })
    }
}

pub struct FakeEsmFold;

#[async_trait]
impl StructurePredictor for FakeEsmFold {
    async fn fold(&self, _sequence: &str) -> anyhow::Result<String> {
        Ok("ATOM      1  N   MET A   1       1.000   2.000   3.000  1.00 90.00           N\n\
ATOM      2  CA  MET A   1       2.000   3.000   4.000  1.00 70.00           C\nEND\n"
            .to_string())
    }
}

#[must_use]
pub fn collaborators() -> Collaborators {
    collaborators_with(Arc::new(FakeAugustus))
}

#[must_use]
pub fn collaborators_with(gene_predictor: Arc<dyn GenePredictor>) -> Collaborators {
    Collaborators {
        gene_predictor,
        annotator: Arc::new(FakeDeepGo),
        terms: Arc::new(FakeQuickGo),
        structures: Arc::new(FakeEsmFold),
        summarizer: None,
    }
}

/// Config rooted in a fresh temporary directory.
#[must_use]
pub fn test_config() -> (Config, PathBuf) {
    let root = std::env::temp_dir().join(format!("genevision-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();

    let placeholder = root.join("placeholder.pdb");
    std::fs::write(&placeholder, "HEADER placeholder\nEND\n").unwrap();

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", root.join("genevision.db").display());
    config.general.max_db_connections = 2;
    config.pipeline.data_dir = root.join("runs").display().to_string();
    config.pipeline.placeholder_model_path = placeholder.display().to_string();
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    };

    (config, root)
}

pub const PASSWORD: &str = "secret12!";
