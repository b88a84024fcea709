//! Result aggregation and the analysis report.
//!
//! [`ResultAggregator`] reads the artifacts of a finished run and computes an
//! [`AnalysisSummary`]. [`ReportBuilder`] lays the same data out as a
//! paginated [`ReportDocument`], which a [`ReportRenderer`] turns into a file.

pub mod document;
pub mod render;
pub mod summary;

pub use document::{Block, NOT_AVAILABLE, Page, ReportDocument};
pub use render::{HtmlRenderer, ReportRenderer};
pub use summary::{AnalysisSummary, ResultAggregator, RunContents, summarize};

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::SequenceId;
use crate::parser::fasta::{FastaRecord, LINE_WIDTH, wrap};

pub const REPORT_TITLE: &str = "GeneVision Analysis Report";

/// Report file name for a sequence and generation time.
#[must_use]
pub fn default_file_name(run: SequenceId, generated_at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "genevision_report_{}_{}.{extension}",
        run.value(),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Who and what a report is for.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub file_name: String,
    pub generated_on: NaiveDate,
    pub user: String,
    /// `(purpose, tool)` pairs listed under "Tools used".
    pub tools: Vec<(String, String)>,
}

impl ReportContext {
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        run: SequenceId,
        generated_at: DateTime<Utc>,
        extension: &str,
    ) -> Self {
        Self {
            file_name: default_file_name(run, generated_at, extension),
            generated_on: generated_at.date_naive(),
            user: user.into(),
            tools: vec![
                ("Gene prediction".to_string(), "AUGUSTUS".to_string()),
                ("Functional annotation".to_string(), "DeepGOPlus".to_string()),
                ("Structural modeling".to_string(), "ESMFold".to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    #[must_use]
    pub fn build(
        &self,
        context: &ReportContext,
        contents: &RunContents,
        summary: &AnalysisSummary,
    ) -> ReportDocument {
        let mut document = ReportDocument::new(REPORT_TITLE, context.file_name.clone());

        let page = document.new_page();
        page.push(Block::Title(REPORT_TITLE.to_string()))
            .field("File name", context.file_name.clone())
            .field(
                "Generation date",
                context.generated_on.format("%B %d, %Y").to_string(),
            )
            .field("User", context.user.clone());

        Self::general_information(page, context, contents);
        Self::sequence_data(page, contents, summary);
        Self::results_summary(page, contents);

        let appendix = document.new_page();
        appendix.heading("Appendix - Sequence Contents");
        for (title, records) in [
            ("A1. Input Sequence", &contents.input),
            ("A2. Predicted Genes", &contents.genes),
            ("A3. Protein Sequences", &contents.proteins),
        ] {
            appendix.subheading(title);
            match records {
                Some(records) if !records.is_empty() => {
                    appendix.push(Block::Preformatted(sequence_lines(records)));
                }
                _ => {
                    appendix.unavailable();
                }
            }
        }

        document
    }

    fn general_information(page: &mut Page, context: &ReportContext, contents: &RunContents) {
        page.heading("1. General Information");

        let mut files = Vec::new();
        if contents.input.is_some() {
            files.push("Analyzed sequence".to_string());
        }
        if contents.genes.is_some() {
            files.push("Predicted genes".to_string());
        }
        if contents.proteins.is_some() {
            files.push("Protein sequences".to_string());
        }
        if !contents.models.is_empty() {
            files.push("Protein 3D Structure (.pdb Files): Available in appendix".to_string());
        }

        if files.is_empty() {
            page.unavailable();
        } else {
            page.paragraph("Available files:").push(Block::Bullets(files));
        }

        page.paragraph("Tools used:").push(Block::Bullets(
            context
                .tools
                .iter()
                .map(|(purpose, tool)| format!("{purpose}: {tool}"))
                .collect(),
        ));
    }

    fn sequence_data(page: &mut Page, contents: &RunContents, summary: &AnalysisSummary) {
        page.heading("2. Sequence Data");

        let mut items = Vec::new();
        if contents.genes.is_some() {
            items.push(format!("Number of predicted genes: {}", summary.gene_count));
        }
        if contents.proteins.is_some() {
            items.push(format!("Number of protein sequences: {}", summary.protein_count));
        }
        if contents.input.is_some() {
            items.push(format!(
                "Total input sequence length: {} bp",
                summary.sequence_length
            ));
        }

        if items.is_empty() {
            page.unavailable();
        } else {
            page.push(Block::Bullets(items));
        }
    }

    fn results_summary(page: &mut Page, contents: &RunContents) {
        page.heading("3. Results Summary");

        let rows = match contents.annotations.as_deref() {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                page.unavailable();
                return;
            }
        };

        let or_na = |value: Option<&String>| {
            value
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| "N/A".to_string())
        };

        page.push(Block::Table {
            headers: ["Gene ID", "Position", "Score", "GO Term", "Function", "Description"]
                .iter()
                .map(|h| (*h).to_string())
                .collect(),
            rows: rows
                .iter()
                .map(|row| {
                    vec![
                        row.gene_id.clone(),
                        row.position.clone(),
                        format!("{:.2}", row.confidence),
                        row.top_term.clone(),
                        or_na(row.top_term_name.as_ref()),
                        or_na(row.top_term_description.as_ref()),
                    ]
                })
                .collect(),
        });
    }
}

/// `>id` lines followed by the sequence in fixed-width lines, records
/// separated by a blank line.
fn sequence_lines(records: &[FastaRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!(">{}", record.id));
        lines.extend(wrap(&record.sequence, LINE_WIDTH));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::annotation::AnnotationRow;
    use chrono::TimeZone;

    fn contents() -> RunContents {
        RunContents {
            input: Some(vec![FastaRecord::new("input_sequence", None, "A".repeat(130))]),
            genes: Some(vec![
                FastaRecord::new("gene1", None, "ATG"),
                FastaRecord::new("gene2", None, "ATG"),
                FastaRecord::new("gene3", None, "ATG"),
            ]),
            proteins: Some(vec![FastaRecord::new("gene1", None, "M")]),
            annotations: Some(vec![AnnotationRow {
                gene_id: "gene1".to_string(),
                position: "1 - 3".to_string(),
                top_term: "GO:0003677".to_string(),
                confidence: 0.954_321,
                terms: Vec::new(),
                top_term_name: Some("DNA binding".to_string()),
                top_term_description: None,
            }]),
            models: Vec::new(),
        }
    }

    fn context() -> ReportContext {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 9).unwrap();
        ReportContext::new("alice", SequenceId::new(7), at, "html")
    }

    #[test]
    fn test_report_fields() {
        let contents = contents();
        let doc = ReportBuilder.build(&context(), &contents, &summarize(&contents));

        assert_eq!(doc.file_name, "genevision_report_7_20260309_140509.html");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.field("Generation date").as_deref(), Some("March 09, 2026"));
        assert_eq!(doc.field("Number of predicted genes").as_deref(), Some("3"));
        assert_eq!(doc.field("Total input sequence length").as_deref(), Some("130 bp"));
    }

    #[test]
    fn test_results_table_and_appendix() {
        let contents = contents();
        let doc = ReportBuilder.build(&context(), &contents, &summarize(&contents));

        let table = doc
            .blocks()
            .find_map(|b| match b {
                Block::Table { rows, .. } => Some(rows.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            table[0],
            vec!["gene1", "1 - 3", "0.95", "GO:0003677", "DNA binding", "N/A"]
        );

        let appendix = &doc.pages[1].blocks;
        let Block::Preformatted(lines) = &appendix[2] else {
            panic!("expected input sequence block");
        };
        assert_eq!(lines[0], ">input_sequence");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_missing_inputs_degrade() {
        let empty = RunContents::default();
        let doc = ReportBuilder.build(&context(), &empty, &summarize(&empty));

        let placeholders = doc
            .blocks()
            .filter(|b| matches!(b, Block::Paragraph(p) if p == NOT_AVAILABLE))
            .count();
        // general info, sequence data, results summary and three appendix sections
        assert_eq!(placeholders, 6);
        assert_eq!(doc.field("Number of predicted genes"), None);
    }
}
