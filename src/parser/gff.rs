use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::fasta::FastaRecord;

/// One gene from an AUGUSTUS GFF report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneModel {
    pub id: String,
    /// CDS segments as 1-based inclusive coordinates, in file order.
    pub cds: Vec<(usize, usize)>,
    pub protein: String,
}

impl GeneModel {
    #[must_use]
    pub fn start(&self) -> Option<usize> {
        self.cds.iter().map(|(s, _)| *s).min()
    }

    #[must_use]
    pub fn stop(&self) -> Option<usize> {
        self.cds.iter().map(|(_, e)| *e).max()
    }
}

/// A gene with its nucleotide sequence cut out of the input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedGene {
    pub id: String,
    pub start: usize,
    pub stop: usize,
    pub nucleotides: String,
    pub protein: String,
}

/// Parse the gene models of an AUGUSTUS report.
///
/// Genes are numbered `gene1`, `gene2`, ... in the order their
/// `# start gene` comment appears. CDS feature lines contribute coordinates,
/// and the `# protein sequence = [...]` comment block contributes the
/// translated protein.
#[must_use]
pub fn parse_augustus(text: &str) -> Vec<GeneModel> {
    let mut genes = Vec::new();
    let mut current: Option<GeneModel> = None;
    let mut collecting_protein = false;

    for line in text.lines() {
        if line.starts_with("# start gene") {
            if let Some(gene) = current.take() {
                genes.push(gene);
            }
            current = Some(GeneModel {
                id: format!("gene{}", genes.len() + 1),
                ..Default::default()
            });
            collecting_protein = false;
            continue;
        }

        let Some(gene) = current.as_mut() else {
            continue;
        };

        if line.starts_with("# end gene") {
            collecting_protein = false;
            if let Some(gene) = current.take() {
                genes.push(gene);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("# protein sequence = [") {
            collecting_protein = !push_protein_chunk(&mut gene.protein, rest);
            continue;
        }

        if collecting_protein {
            let chunk = line.strip_prefix('#').unwrap_or(line).trim_start();
            collecting_protein = !push_protein_chunk(&mut gene.protein, chunk);
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() > 4 && cols[2] == "CDS" {
            if let (Ok(start), Ok(end)) = (cols[3].trim().parse(), cols[4].trim().parse()) {
                gene.cds.push((start, end));
            }
        }
    }

    if let Some(gene) = current {
        genes.push(gene);
    }

    genes
}

/// Append a protein chunk, returning true when the closing `]` was seen.
fn push_protein_chunk(protein: &mut String, chunk: &str) -> bool {
    match chunk.split_once(']') {
        Some((residues, _)) => {
            protein.push_str(residues.trim());
            true
        }
        None => {
            protein.push_str(chunk.trim());
            false
        }
    }
}

/// Cut each gene's coding sequence out of `input`: its CDS segments,
/// sorted by coordinate and clamped to the input length, concatenated.
/// Genes without any usable segment are dropped.
#[must_use]
pub fn extract_genes(models: &[GeneModel], input: &str) -> Vec<ExtractedGene> {
    let bytes = input.as_bytes();

    models
        .iter()
        .filter_map(|model| {
            let mut segments = model.cds.clone();
            segments.sort_unstable();

            let mut nucleotides = String::new();
            for (start, end) in segments {
                let from = start.max(1) - 1;
                let to = end.min(bytes.len());
                if from < to {
                    nucleotides.push_str(&String::from_utf8_lossy(&bytes[from..to]));
                }
            }

            if nucleotides.is_empty() {
                return None;
            }

            Some(ExtractedGene {
                id: model.id.clone(),
                start: model.start()?,
                stop: model.stop()?,
                nucleotides,
                protein: model.protein.clone(),
            })
        })
        .collect()
}

/// Predicted-genes FASTA records carrying organism and coordinates.
#[must_use]
pub fn gene_records(genes: &[ExtractedGene], organism: &str) -> Vec<FastaRecord> {
    genes
        .iter()
        .map(|gene| {
            FastaRecord::new(
                gene.id.clone(),
                Some(format!(
                    "[organism={organism}] [start_codon={}] [stop_codon={}]",
                    gene.start, gene.stop
                )),
                gene.nucleotides.clone(),
            )
        })
        .collect()
}

/// Protein FASTA records, skipping genes without a translation.
#[must_use]
pub fn protein_records(genes: &[ExtractedGene]) -> Vec<FastaRecord> {
    genes
        .iter()
        .filter(|gene| !gene.protein.is_empty())
        .map(|gene| FastaRecord::new(gene.id.clone(), None, gene.protein.clone()))
        .collect()
}

/// Genomic position labels keyed by gene id.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    positions: HashMap<String, String>,
}

impl PositionIndex {
    #[must_use]
    pub fn from_records(records: &[FastaRecord]) -> Self {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"\[start_codon=(\d+)\] \[stop_codon=(\d+)\]").expect("Invalid regex")
        });

        let positions = records
            .iter()
            .map(|record| {
                let label = record
                    .description
                    .as_deref()
                    .and_then(|desc| re.captures(desc))
                    .map_or_else(
                        || "Unknown position".to_string(),
                        |caps| format!("{} - {}", &caps[1], &caps[2]),
                    );
                (record.id.clone(), label)
            })
            .collect();

        Self { positions }
    }

    /// `S - E`, `Unknown position` when the header has no coordinates, or
    /// `Missing FASTA header` when no record has this exact id.
    #[must_use]
    pub fn position(&self, gene_id: &str) -> String {
        self.positions
            .get(gene_id)
            .cloned()
            .unwrap_or_else(|| "Missing FASTA header".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
# This output was generated with AUGUSTUS
# start gene g1
input_sequence\tAUGUSTUS\tgene\t1\t12\t0.9\t+\t.\tg1
input_sequence\tAUGUSTUS\tCDS\t7\t12\t0.9\t+\t0\ttranscript_id \"g1.t1\"
input_sequence\tAUGUSTUS\tCDS\t1\t3\t0.9\t+\t0\ttranscript_id \"g1.t1\"
# protein sequence = [MK
# LV]
# end gene g1
# start gene g2
input_sequence\tAUGUSTUS\tCDS\t14\t16\t0.5\t-\t0\ttranscript_id \"g2.t1\"
# protein sequence = [M]
# end gene g2
";

    #[test]
    fn test_parse_augustus() {
        let genes = parse_augustus(REPORT);
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].id, "gene1");
        assert_eq!(genes[0].cds, vec![(7, 12), (1, 3)]);
        assert_eq!(genes[0].protein, "MKLV");
        assert_eq!(genes[0].start(), Some(1));
        assert_eq!(genes[0].stop(), Some(12));
        assert_eq!(genes[1].protein, "M");
    }

    #[test]
    fn test_extract_genes_concatenates_sorted_segments() {
        let input = "ATGCCCGGGTTTAAACCC";
        let genes = extract_genes(&parse_augustus(REPORT), input);
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].nucleotides, "ATGGGGTTT");
        assert_eq!(genes[1].nucleotides, "AAC");

        let records = gene_records(&genes, "Homo sapiens");
        assert_eq!(
            records[0].header(),
            "gene1 [organism=Homo sapiens] [start_codon=1] [stop_codon=12]"
        );
        assert_eq!(protein_records(&genes).len(), 2);
    }

    #[test]
    fn test_extract_genes_drops_out_of_range() {
        let models = vec![GeneModel {
            id: "gene1".to_string(),
            cds: vec![(50, 60)],
            protein: "M".to_string(),
        }];
        assert!(extract_genes(&models, "ACGT").is_empty());
    }

    #[test]
    fn test_position_lookup() {
        let records = vec![
            FastaRecord::new(
                "gene1",
                Some("[organism=Homo sapiens] [start_codon=5] [stop_codon=90]".to_string()),
                "ATG",
            ),
            FastaRecord::new("gene10", None, "ATG"),
        ];
        let index = PositionIndex::from_records(&records);
        assert_eq!(index.position("gene1"), "5 - 90");
        assert_eq!(index.position("gene10"), "Unknown position");
        assert_eq!(index.position("gene2"), "Missing FASTA header");
    }
}
