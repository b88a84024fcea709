use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

use crate::domain::SequenceId;
use crate::parser::annotation::{self, AnnotationRow, NAME_NOT_FOUND};
use crate::parser::fasta::{self, FastaRecord, gc_content, round2};
use crate::pipeline::{ArtifactKind, ArtifactStore};

/// Everything a finished run left on disk. Any part may be missing.
#[derive(Debug, Clone, Default)]
pub struct RunContents {
    pub input: Option<Vec<FastaRecord>>,
    pub genes: Option<Vec<FastaRecord>>,
    pub proteins: Option<Vec<FastaRecord>>,
    pub annotations: Option<Vec<AnnotationRow>>,
    pub models: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneGc {
    pub gene_id: String,
    pub gc_content: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidentTerm {
    pub gene_id: String,
    pub go_id: String,
    pub name: Option<String>,
    pub score: f64,
    /// `GO:id - name`, or the bare id when the name is unknown.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub sequence_length: usize,
    pub gene_count: usize,
    pub protein_count: usize,
    pub avg_gene_length: usize,
    pub avg_protein_length: usize,
    pub avg_gc_content: f64,
    pub per_gene_gc: Vec<GeneGc>,
    pub most_confident: Option<ConfidentTerm>,
    pub go_term_counts: Vec<TermCount>,
    pub model_count: usize,
}

/// Reads the artifacts of a run and condenses them into an
/// [`AnalysisSummary`].
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    artifacts: ArtifactStore,
}

impl ResultAggregator {
    #[must_use]
    pub const fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Load whatever the run produced. Unreadable or malformed files count
    /// as missing.
    pub async fn collect(&self, run: SequenceId) -> RunContents {
        let input = self.fasta(run, ArtifactKind::InputFasta).await;
        let genes = self.fasta(run, ArtifactKind::PredictedGenes).await;
        let proteins = self.fasta(run, ArtifactKind::ProteinSequences).await;

        let annotations = match self.artifacts.read(run, ArtifactKind::Annotations).await {
            Ok(Some(text)) => annotation::read_annotations(&text)
                .inspect_err(|e| warn!(run = run.value(), error = %e, "Ignoring malformed annotation table"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(run = run.value(), error = %e, "Failed to read annotation table");
                None
            }
        };

        let models = self.artifacts.list_models(run).await.unwrap_or_else(|e| {
            warn!(run = run.value(), error = %e, "Failed to list protein models");
            Vec::new()
        });

        RunContents {
            input,
            genes,
            proteins,
            annotations,
            models,
        }
    }

    async fn fasta(&self, run: SequenceId, kind: ArtifactKind) -> Option<Vec<FastaRecord>> {
        match self.artifacts.read(run, kind).await {
            Ok(Some(text)) => fasta::parse_records(&text)
                .inspect_err(|e| warn!(run = run.value(), artifact = %kind, error = %e, "Ignoring malformed FASTA"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(run = run.value(), artifact = %kind, error = %e, "Failed to read artifact");
                None
            }
        }
    }

    pub async fn summarize_run(&self, run: SequenceId) -> (RunContents, AnalysisSummary) {
        let contents = self.collect(run).await;
        let summary = summarize(&contents);
        (contents, summary)
    }
}

fn average_length(records: &[FastaRecord]) -> usize {
    records.iter().map(FastaRecord::len).sum::<usize>() / records.len().max(1)
}

#[must_use]
pub fn summarize(contents: &RunContents) -> AnalysisSummary {
    let empty = Vec::new();
    let input = contents.input.as_ref().unwrap_or(&empty);
    let genes = contents.genes.as_ref().unwrap_or(&empty);
    let proteins = contents.proteins.as_ref().unwrap_or(&empty);
    let rows: &[AnnotationRow] = contents.annotations.as_deref().unwrap_or_default();

    let per_gene_gc: Vec<GeneGc> = genes
        .iter()
        .map(|g| GeneGc {
            gene_id: g.id.clone(),
            gc_content: gc_content(&g.sequence),
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let avg_gc_content = if per_gene_gc.is_empty() {
        0.0
    } else {
        round2(per_gene_gc.iter().map(|g| g.gc_content).sum::<f64>() / per_gene_gc.len() as f64)
    };

    AnalysisSummary {
        sequence_length: input.iter().map(FastaRecord::len).sum(),
        gene_count: genes.len(),
        protein_count: proteins.len(),
        avg_gene_length: average_length(genes),
        avg_protein_length: average_length(proteins),
        avg_gc_content,
        per_gene_gc,
        most_confident: most_confident(rows),
        go_term_counts: term_counts(rows),
        model_count: contents.models.len(),
    }
}

/// The row with the highest confidence. The first one wins ties.
fn most_confident(rows: &[AnnotationRow]) -> Option<ConfidentTerm> {
    let best = rows.iter().fold(None, |best: Option<&AnnotationRow>, row| match best {
        Some(b) if b.confidence >= row.confidence => Some(b),
        _ => Some(row),
    })?;

    let name = best
        .top_term_name
        .clone()
        .filter(|n| n != NAME_NOT_FOUND);
    let label = name
        .as_ref()
        .map_or_else(|| best.top_term.clone(), |n| format!("{} - {n}", best.top_term));

    Some(ConfidentTerm {
        gene_id: best.gene_id.clone(),
        go_id: best.top_term.clone(),
        name,
        score: best.confidence,
        label,
    })
}

/// Number of genes per top term, most frequent first.
fn term_counts(rows: &[AnnotationRow]) -> Vec<TermCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let term = row
            .top_term_name
            .clone()
            .unwrap_or_else(|| row.top_term.clone());
        *counts.entry(term).or_default() += 1;
    }

    let mut counts: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, sequence: &str) -> FastaRecord {
        FastaRecord::new(id, None, sequence)
    }

    fn row(gene_id: &str, term: &str, score: f64, name: Option<&str>) -> AnnotationRow {
        AnnotationRow {
            gene_id: gene_id.to_string(),
            position: "1 - 9".to_string(),
            top_term: term.to_string(),
            confidence: score,
            terms: Vec::new(),
            top_term_name: name.map(str::to_string),
            top_term_description: None,
        }
    }

    #[test]
    fn test_average_gene_length() {
        let contents = RunContents {
            genes: Some(vec![
                record("gene1", &"A".repeat(10)),
                record("gene2", &"A".repeat(20)),
                record("gene3", &"A".repeat(30)),
            ]),
            ..Default::default()
        };
        let summary = summarize(&contents);
        assert_eq!(summary.gene_count, 3);
        assert_eq!(summary.avg_gene_length, 20);
        assert_eq!(summary.avg_protein_length, 0);
    }

    #[test]
    fn test_gc_per_gene_and_mean() {
        let contents = RunContents {
            genes: Some(vec![
                record("gene1", "GCGC"),
                record("gene2", "ATAT"),
                record("gene3", "GCAT"),
            ]),
            ..Default::default()
        };
        let summary = summarize(&contents);
        let gc: Vec<f64> = summary.per_gene_gc.iter().map(|g| g.gc_content).collect();
        assert_eq!(gc, vec![100.0, 0.0, 50.0]);
        assert!((summary.avg_gc_content - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_most_confident_row() {
        let contents = RunContents {
            annotations: Some(vec![
                row("gene1", "GO:0005515", 0.81, Some("protein binding")),
                row("gene2", "GO:0003677", 0.95, Some("DNA binding")),
                row("gene3", "GO:0003723", 0.95, Some("RNA binding")),
            ]),
            ..Default::default()
        };
        let best = summarize(&contents).most_confident.unwrap();
        assert_eq!(best.gene_id, "gene2");
        assert_eq!(best.label, "GO:0003677 - DNA binding");
    }

    #[test]
    fn test_term_counts() {
        let rows = vec![
            row("gene1", "GO:1", 0.5, Some("binding")),
            row("gene2", "GO:2", 0.5, None),
            row("gene3", "GO:1", 0.7, Some("binding")),
        ];
        let counts = term_counts(&rows);
        assert_eq!(
            counts[0],
            TermCount {
                term: "binding".to_string(),
                count: 2
            }
        );
        assert_eq!(counts[1].term, "GO:2");
    }

    #[test]
    fn test_empty_run() {
        let summary = summarize(&RunContents::default());
        assert_eq!(summary, AnalysisSummary::default());
    }
}
