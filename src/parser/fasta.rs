use bio::io::fasta;
use thiserror::Error;

/// Header id of the single record an upload is normalized into.
pub const INPUT_RECORD_ID: &str = "input_sequence";

/// Residues per line in rendered sequence blocks.
pub const LINE_WIDTH: usize = 60;

const NUCLEOTIDES: &[u8] = b"ACGTUNRYKMSWBDHV";

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("Sequence is empty")]
    Empty,

    #[error("Invalid nucleotide '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("Malformed FASTA: {0}")]
    Malformed(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub sequence: String,
}

impl FastaRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, description: Option<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description,
            sequence: sequence.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Header line without the leading `>`.
    #[must_use]
    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!("{} {desc}", self.id),
            None => self.id.clone(),
        }
    }
}

impl From<fasta::Record> for FastaRecord {
    fn from(record: fasta::Record) -> Self {
        Self {
            id: record.id().to_string(),
            description: record.desc().map(str::to_string),
            sequence: String::from_utf8_lossy(record.seq()).into_owned(),
        }
    }
}

/// Parse every record of a FASTA document.
pub fn parse_records(text: &str) -> Result<Vec<FastaRecord>, FastaError> {
    fasta::Reader::new(text.as_bytes())
        .records()
        .map(|record| record.map(FastaRecord::from).map_err(FastaError::from))
        .collect()
}

/// Serialize records with one sequence line per record.
pub fn write_records(records: &[FastaRecord]) -> Result<String, FastaError> {
    let mut buffer = Vec::new();
    {
        let mut writer = fasta::Writer::new(&mut buffer);
        for record in records {
            writer.write(&record.id, record.description.as_deref(), record.sequence.as_bytes())?;
        }
        writer.flush()?;
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Result of normalizing an uploaded FASTA file or pasted sequence.
#[derive(Debug, Clone)]
pub struct NormalizedUpload {
    pub record: FastaRecord,
    /// Document stored as the run's input artifact.
    pub fasta: String,
    /// Header records seen in the original text.
    pub record_count: usize,
}

/// Collapse an upload into one `>input_sequence` record: headers are
/// dropped, the remaining lines are concatenated with whitespace removed and
/// upper-cased, then checked against the IUPAC nucleotide alphabet.
pub fn normalize_upload(text: &str) -> Result<NormalizedUpload, FastaError> {
    let mut sequence = String::with_capacity(text.len());
    let mut record_count = 0;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('>') {
            record_count += 1;
            continue;
        }
        sequence.extend(
            line.chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_ascii_uppercase()),
        );
    }

    if sequence.is_empty() {
        return Err(FastaError::Empty);
    }

    if let Some((position, character)) = sequence
        .char_indices()
        .find(|(_, c)| !c.is_ascii() || !NUCLEOTIDES.contains(&(*c as u8)))
    {
        return Err(FastaError::InvalidCharacter {
            character,
            position: position + 1,
        });
    }

    let record = FastaRecord::new(INPUT_RECORD_ID, None, sequence);
    let fasta = write_records(std::slice::from_ref(&record))?;

    Ok(NormalizedUpload {
        record,
        fasta,
        record_count: record_count.max(1),
    })
}

/// GC percentage of a nucleotide sequence, rounded to two decimals.
#[must_use]
pub fn gc_content(sequence: &str) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }
    let gc = sequence
        .bytes()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C'))
        .count();

    #[allow(clippy::cast_precision_loss)]
    round2(gc as f64 / sequence.len() as f64 * 100.0)
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split a sequence into fixed-width lines.
#[must_use]
pub fn wrap(sequence: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    sequence
        .as_bytes()
        .chunks(width)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_content() {
        assert!((gc_content("GCGC") - 100.0).abs() < f64::EPSILON);
        assert!(gc_content("ATAT").abs() < f64::EPSILON);
        assert!((gc_content("GCAT") - 50.0).abs() < f64::EPSILON);
        assert!((gc_content("gcat") - 50.0).abs() < f64::EPSILON);
        assert!((gc_content("GGA") - 66.67).abs() < 1e-9);
        assert!(gc_content("").abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_multi_record_upload() {
        let upload = normalize_upload(">a first\nacgt\nAC GT\n>b\nTTTT\n").unwrap();
        assert_eq!(upload.record.id, INPUT_RECORD_ID);
        assert_eq!(upload.record.sequence, "ACGTACGTTTTT");
        assert_eq!(upload.record_count, 2);
        assert_eq!(upload.fasta, ">input_sequence\nACGTACGTTTTT\n");
    }

    #[test]
    fn test_normalize_raw_sequence() {
        let upload = normalize_upload("  acgtn\r\nRYK\n").unwrap();
        assert_eq!(upload.record.sequence, "ACGTNRYK");
        assert_eq!(upload.record_count, 1);
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(matches!(normalize_upload(">only header\n"), Err(FastaError::Empty)));
        assert!(matches!(normalize_upload(""), Err(FastaError::Empty)));
        assert!(matches!(
            normalize_upload("ACGXT"),
            Err(FastaError::InvalidCharacter {
                character: 'X',
                position: 4
            })
        ));
    }

    #[test]
    fn test_parse_records_keeps_descriptions() {
        let records =
            parse_records(">gene1 [organism=Homo sapiens] [start_codon=1] [stop_codon=9]\nATGAAATAA\n>gene2\nATG\n")
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "gene1");
        assert_eq!(
            records[0].description.as_deref(),
            Some("[organism=Homo sapiens] [start_codon=1] [stop_codon=9]")
        );
        assert_eq!(records[1].description, None);
        assert_eq!(records[1].sequence, "ATG");
    }

    #[test]
    fn test_wrap() {
        let seq = "A".repeat(130);
        let lines = wrap(&seq, LINE_WIDTH);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 60);
        assert_eq!(lines[2].len(), 10);
        assert!(wrap("", LINE_WIDTH).is_empty());
    }
}
