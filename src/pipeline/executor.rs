use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::{ArtifactKind, ArtifactStore, PipelineError, Step};
use crate::clients::augustus::AugustusClient;
use crate::clients::deepgoplus::DeepGoPlusClient;
use crate::clients::esmfold::EsmFoldClient;
use crate::clients::quickgo::QuickGoClient;
use crate::clients::summarizer::CommandSummarizer;
use crate::clients::{
    FunctionAnnotator, GenePredictor, StructurePredictor, Summarizer, TermInfo, TermLookup,
};
use crate::config::{Config, PipelineConfig};
use crate::domain::SequenceId;
use crate::parser::annotation::{
    self, AnnotationRow, DESCRIPTION_NOT_FOUND, NAME_NOT_FOUND, top_term,
};
use crate::parser::fasta::{self, FastaRecord};
use crate::parser::gff::{self, PositionIndex};

/// The external services a run depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub gene_predictor: Arc<dyn GenePredictor>,
    pub annotator: Arc<dyn FunctionAnnotator>,
    pub terms: Arc<dyn TermLookup>,
    pub structures: Arc<dyn StructurePredictor>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl Collaborators {
    /// Production collaborators. HTTP clients share `http`.
    #[must_use]
    pub fn from_config(config: &Config, http: &reqwest::Client) -> Self {
        let summarizer = config
            .tools
            .summarizer
            .enabled
            .then(|| Arc::new(CommandSummarizer::new(&config.tools.summarizer)) as Arc<dyn Summarizer>);

        Self {
            gene_predictor: Arc::new(AugustusClient::new(&config.tools.augustus)),
            annotator: Arc::new(DeepGoPlusClient::new(&config.tools.deepgoplus)),
            terms: Arc::new(QuickGoClient::with_shared_client(
                http.clone(),
                &config.services.quickgo,
            )),
            structures: Arc::new(EsmFoldClient::with_shared_client(
                http.clone(),
                &config.services.esmfold,
            )),
            summarizer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub organism: String,
    pub max_sequence_length: usize,
    pub placeholder_model: PathBuf,
}

impl ExecutorSettings {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            organism: config.organism.clone(),
            max_sequence_length: config.max_sequence_length,
            placeholder_model: PathBuf::from(&config.placeholder_model_path),
        }
    }
}

/// A successful step: the files it produced and the payload stored as the
/// step's analysis result.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: Step,
    pub artifacts: Vec<PathBuf>,
    pub payload: Value,
    pub message: String,
}

pub struct StepExecutor {
    artifacts: ArtifactStore,
    collaborators: Collaborators,
    settings: ExecutorSettings,
}

impl StepExecutor {
    #[must_use]
    pub const fn new(
        artifacts: ArtifactStore,
        collaborators: Collaborators,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            artifacts,
            collaborators,
            settings,
        }
    }

    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Execute one of steps 1 to 4 for `run`.
    pub async fn run(&self, run: SequenceId, step: Step) -> Result<StepOutcome, PipelineError> {
        let start = Instant::now();

        let result = match step {
            Step::GenePrediction => self.predict_genes(run).await,
            Step::GoAnnotation => self.annotate(run).await,
            Step::FunctionExtraction => self.extract_functions(run).await,
            Step::ProteinModeling => self.model_structures(run).await,
            other => Err(PipelineError::NotExecutable(other)),
        };

        let elapsed = start.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let outcome = if result.is_ok() { "success" } else { "failure" };

        metrics::counter!("pipeline_steps_total", "step" => step.slug(), "outcome" => outcome)
            .increment(1);
        metrics::histogram!("pipeline_step_duration_seconds", "step" => step.slug())
            .record(elapsed.as_secs_f64());

        match &result {
            Ok(done) => info!(
                event = "step_finished",
                sequence_id = run.value(),
                step = step.index(),
                duration_ms,
                artifacts = done.artifacts.len(),
                "{}",
                done.message
            ),
            Err(e) => warn!(
                event = "step_failed",
                sequence_id = run.value(),
                step = step.index(),
                duration_ms,
                error_kind = e.kind(),
                error = %e,
                "Step failed"
            ),
        }

        result
    }

    async fn require(&self, run: SequenceId, kind: ArtifactKind) -> Result<String, PipelineError> {
        match self.artifacts.read(run, kind).await? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(PipelineError::MissingArtifact(kind)),
        }
    }

    async fn predict_genes(&self, run: SequenceId) -> Result<StepOutcome, PipelineError> {
        let input_text = self.require(run, ArtifactKind::InputFasta).await?;
        let input = fasta::parse_records(&input_text)
            .map_err(|e| PipelineError::malformed(ArtifactKind::InputFasta, e))?;
        let Some(input) = input.into_iter().next() else {
            return Err(PipelineError::MissingArtifact(ArtifactKind::InputFasta));
        };

        let input_path = self.artifacts.path(run, ArtifactKind::InputFasta);
        let gff_path = self.artifacts.prepare(run, ArtifactKind::AugustusGff).await?;

        self.collaborators
            .gene_predictor
            .predict(&input_path, &gff_path)
            .await
            .map_err(|e| PipelineError::from_tool("AUGUSTUS", e))?;

        if !self.artifacts.is_present(run, ArtifactKind::AugustusGff).await {
            return Err(PipelineError::EmptyOutput(
                "AUGUSTUS did not write its report".to_string(),
            ));
        }
        let gff_text = self.require(run, ArtifactKind::AugustusGff).await?;

        let genes = gff::extract_genes(&gff::parse_augustus(&gff_text), &input.sequence);
        if genes.is_empty() {
            return Err(PipelineError::EmptyOutput(
                "AUGUSTUS predicted no genes in this sequence".to_string(),
            ));
        }

        let gene_fasta = fasta::write_records(&gff::gene_records(&genes, &self.settings.organism))
            .map_err(|e| PipelineError::malformed(ArtifactKind::PredictedGenes, e))?;
        let proteins = gff::protein_records(&genes);
        let protein_fasta = fasta::write_records(&proteins)
            .map_err(|e| PipelineError::malformed(ArtifactKind::ProteinSequences, e))?;

        let genes_path = self
            .artifacts
            .write(run, ArtifactKind::PredictedGenes, &gene_fasta)
            .await?;
        let proteins_path = self
            .artifacts
            .write(run, ArtifactKind::ProteinSequences, &protein_fasta)
            .await?;

        let payload = json!({
            "gene_count": genes.len(),
            "protein_count": proteins.len(),
            "genes": genes
                .iter()
                .map(|g| json!({
                    "id": g.id,
                    "start": g.start,
                    "stop": g.stop,
                    "length": g.nucleotides.len(),
                }))
                .collect::<Vec<_>>(),
        });

        Ok(StepOutcome {
            step: Step::GenePrediction,
            artifacts: vec![gff_path, genes_path, proteins_path],
            payload,
            message: format!("Predicted {} genes", genes.len()),
        })
    }

    async fn annotate(&self, run: SequenceId) -> Result<StepOutcome, PipelineError> {
        let proteins_text = self.require(run, ArtifactKind::ProteinSequences).await?;
        if fasta::parse_records(&proteins_text)
            .map_err(|e| PipelineError::malformed(ArtifactKind::ProteinSequences, e))?
            .is_empty()
        {
            return Err(PipelineError::MissingArtifact(ArtifactKind::ProteinSequences));
        }

        let proteins_path = self.artifacts.path(run, ArtifactKind::ProteinSequences);
        let tsv_path = self.artifacts.prepare(run, ArtifactKind::DeepGoPlusTsv).await?;

        self.collaborators
            .annotator
            .annotate(&proteins_path, &tsv_path)
            .await
            .map_err(|e| PipelineError::from_tool("DeepGOPlus", e))?;

        if !self.artifacts.is_present(run, ArtifactKind::DeepGoPlusTsv).await {
            return Err(PipelineError::EmptyOutput(
                "DeepGOPlus did not write its predictions".to_string(),
            ));
        }
        let tsv = self.require(run, ArtifactKind::DeepGoPlusTsv).await?;

        let gene_records = match self.artifacts.read(run, ArtifactKind::PredictedGenes).await? {
            Some(text) => fasta::parse_records(&text)
                .map_err(|e| PipelineError::malformed(ArtifactKind::PredictedGenes, e))?,
            None => Vec::new(),
        };
        let positions = PositionIndex::from_records(&gene_records);

        let rows: Vec<AnnotationRow> = annotation::parse_deepgoplus(&tsv)
            .into_iter()
            .filter_map(|prediction| {
                let top = top_term(&prediction.terms)?.clone();
                Some(AnnotationRow {
                    position: positions.position(&prediction.gene_id),
                    gene_id: prediction.gene_id,
                    top_term: top.id,
                    confidence: top.score,
                    terms: prediction.terms,
                    top_term_name: None,
                    top_term_description: None,
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(PipelineError::EmptyOutput(
                "DeepGOPlus returned no GO terms".to_string(),
            ));
        }

        let csv = annotation::write_annotations(&rows, false)
            .map_err(|e| PipelineError::malformed(ArtifactKind::Annotations, e))?;
        let csv_path = self.artifacts.write(run, ArtifactKind::Annotations, &csv).await?;

        let payload = json!({
            "annotated_genes": rows.len(),
            "annotations": rows
                .iter()
                .map(|r| json!({
                    "gene_id": r.gene_id,
                    "position": r.position,
                    "top_term": r.top_term,
                    "confidence": r.confidence,
                    "term_count": r.terms.len(),
                }))
                .collect::<Vec<_>>(),
        });

        Ok(StepOutcome {
            step: Step::GoAnnotation,
            artifacts: vec![tsv_path, csv_path],
            payload,
            message: format!("Annotated {} genes", rows.len()),
        })
    }

    async fn extract_functions(&self, run: SequenceId) -> Result<StepOutcome, PipelineError> {
        let csv = self.require(run, ArtifactKind::Annotations).await?;
        let mut rows = annotation::read_annotations(&csv)
            .map_err(|e| PipelineError::malformed(ArtifactKind::Annotations, e))?;
        if rows.is_empty() {
            return Err(PipelineError::EmptyOutput(
                "The annotation table has no rows".to_string(),
            ));
        }

        let mut cache: HashMap<String, TermInfo> = HashMap::new();
        for row in &rows {
            for term in &row.terms {
                if !cache.contains_key(&term.id) {
                    let info = self.lookup_term(&term.id).await;
                    cache.insert(term.id.clone(), info);
                }
            }
        }

        for row in &mut rows {
            for term in &mut row.terms {
                if let Some(info) = cache.get(&term.id) {
                    term.name = Some(info.name.clone());
                    term.description = Some(info.definition.clone());
                }
            }

            let info = cache.get(&row.top_term).cloned().unwrap_or_else(not_found);
            let description = if info.definition == DESCRIPTION_NOT_FOUND {
                info.definition
            } else {
                self.summarize(&info.definition).await
            };
            row.top_term_name = Some(info.name);
            row.top_term_description = Some(description);
        }

        let csv = annotation::write_annotations(&rows, true)
            .map_err(|e| PipelineError::malformed(ArtifactKind::Annotations, e))?;
        let csv_path = self.artifacts.write(run, ArtifactKind::Annotations, &csv).await?;

        let resolved = cache.values().filter(|info| info.name != NAME_NOT_FOUND).count();
        let payload = json!({
            "terms_resolved": resolved,
            "terms_total": cache.len(),
            "functions": rows
                .iter()
                .map(|r| json!({
                    "gene_id": r.gene_id,
                    "top_term": r.top_term,
                    "name": r.top_term_name,
                    "description": r.top_term_description,
                }))
                .collect::<Vec<_>>(),
        });

        Ok(StepOutcome {
            step: Step::FunctionExtraction,
            artifacts: vec![csv_path],
            payload,
            message: format!("Resolved {resolved} of {} GO terms", cache.len()),
        })
    }

    async fn lookup_term(&self, go_id: &str) -> TermInfo {
        match self.collaborators.terms.lookup(go_id).await {
            Ok(Some(info)) => info,
            Ok(None) => not_found(),
            Err(e) => {
                warn!(go_id, error = %e, "GO term lookup failed");
                not_found()
            }
        }
    }

    async fn summarize(&self, description: &str) -> String {
        let Some(summarizer) = &self.collaborators.summarizer else {
            return description.to_string();
        };
        match summarizer.summarize(description).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Summarizer failed, keeping the full definition");
                description.to_string()
            }
        }
    }

    async fn model_structures(&self, run: SequenceId) -> Result<StepOutcome, PipelineError> {
        let proteins_text = self.require(run, ArtifactKind::ProteinSequences).await?;
        let proteins = fasta::parse_records(&proteins_text)
            .map_err(|e| PipelineError::malformed(ArtifactKind::ProteinSequences, e))?;

        self.artifacts.clear_models(run).await?;

        let mut written = Vec::new();
        let mut models = Vec::new();
        let mut failed = Vec::new();

        for protein in &proteins {
            match self.model_one(run, protein).await {
                Ok((path, placeholder)) => {
                    models.push(json!({
                        "protein_id": protein.id,
                        "file": path.file_name().map(|n| n.to_string_lossy().into_owned()),
                        "length": protein.len(),
                        "placeholder": placeholder,
                    }));
                    written.push(path);
                }
                Err(e) => {
                    warn!(sequence_id = run.value(), protein_id = %protein.id, error = %e, "Structure prediction failed");
                    failed.push(json!({ "protein_id": protein.id, "error": e }));
                }
            }
        }

        if written.is_empty() {
            return Err(PipelineError::EmptyOutput(format!(
                "No protein model could be produced ({} failed)",
                failed.len()
            )));
        }

        let payload = json!({
            "model_count": written.len(),
            "models": models,
            "failed": failed,
        });

        Ok(StepOutcome {
            step: Step::ProteinModeling,
            message: format!("Produced {} protein models", written.len()),
            artifacts: written,
            payload,
        })
    }

    /// Returns the model path and whether the placeholder was used.
    async fn model_one(&self, run: SequenceId, protein: &FastaRecord) -> Result<(PathBuf, bool), String> {
        if protein.len() > self.settings.max_sequence_length {
            let path = self
                .artifacts
                .copy_model(run, &protein.id, &self.settings.placeholder_model)
                .await
                .map_err(|e| {
                    format!(
                        "placeholder model {} unavailable: {e}",
                        self.settings.placeholder_model.display()
                    )
                })?;
            return Ok((path, true));
        }

        let pdb = self
            .collaborators
            .structures
            .fold(&protein.sequence)
            .await
            .map_err(|e| format!("{e:#}"))?;
        let path = self
            .artifacts
            .write_model(run, &protein.id, &pdb)
            .await
            .map_err(|e| e.to_string())?;
        Ok((path, false))
    }
}

fn not_found() -> TermInfo {
    TermInfo {
        name: NAME_NOT_FOUND.to_string(),
        definition: DESCRIPTION_NOT_FOUND.to_string(),
    }
}
