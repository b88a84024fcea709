//! Annotation tables: the DeepGOPlus prediction TSV and the annotation CSV
//! the pipeline writes after step 2 and rewrites after step 3.
//!
//! The CSV's `All GO Terms` cell holds a bracketed list of tuples such as
//! `[('GO:0005515', 0.95), ('GO:0003677', 0.4)]`, or after function
//! extraction `[('GO:0005515', 0.95, 'protein binding', '...')]`. The
//! codec for that cell lives here.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped_transform, is_not},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, value},
    multi::separated_list0,
    number::complete::double,
    sequence::delimited,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const NAME_NOT_FOUND: &str = "Name not found";
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

const BASE_HEADER: [&str; 5] = [
    "Gene ID",
    "Position",
    "Top GO Term",
    "Confidence Score",
    "All GO Terms",
];
const EXTENDED_HEADER: [&str; 2] = ["Top GO Term Name", "Top GO Term Description"];

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid GO term list: {0}")]
    Syntax(String),

    #[error("GO term record must have 2 or 4 fields, found {0}")]
    Arity(usize),

    #[error("GO term record field {index} has the wrong type")]
    FieldType { index: usize },
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Row for {gene_id}: {source}")]
    Terms {
        gene_id: String,
        #[source]
        source: CodecError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoTerm {
    pub id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GoTerm {
    #[must_use]
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
            name: None,
            description: None,
        }
    }
}

/// Highest-scoring term. The first one wins ties.
#[must_use]
pub fn top_term(terms: &[GoTerm]) -> Option<&GoTerm> {
    terms.iter().fold(None, |best: Option<&GoTerm>, term| match best {
        Some(b) if b.score >= term.score => Some(b),
        _ => Some(term),
    })
}

/// Predictions for one protein in a DeepGOPlus TSV.
#[derive(Debug, Clone, PartialEq)]
pub struct GenePredictions {
    pub gene_id: String,
    pub terms: Vec<GoTerm>,
}

/// Parse DeepGOPlus output: `gene_id<TAB>GO:x|score<TAB>...` without a
/// header. Malformed term fields are logged and skipped.
#[must_use]
pub fn parse_deepgoplus(text: &str) -> Vec<GenePredictions> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let gene_id = fields.next()?.trim().to_string();
            if gene_id.is_empty() {
                return None;
            }

            let terms = fields
                .filter(|field| !field.trim().is_empty())
                .filter_map(|field| {
                    let parsed = field
                        .split_once('|')
                        .and_then(|(id, score)| Some((id.trim(), score.trim().parse::<f64>().ok()?)));
                    if parsed.is_none() {
                        warn!(gene_id = %gene_id, field = %field, "Skipping malformed DeepGOPlus field");
                    }
                    parsed.map(|(id, score)| GoTerm::new(id, score))
                })
                .collect();

            Some(GenePredictions { gene_id, terms })
        })
        .collect()
}

/// One row of the annotation CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub gene_id: String,
    pub position: String,
    pub top_term: String,
    pub confidence: f64,
    pub terms: Vec<GoTerm>,
    pub top_term_name: Option<String>,
    pub top_term_description: Option<String>,
}

impl AnnotationRow {
    /// Terms at or above `threshold`, highest score first.
    #[must_use]
    pub fn terms_above(&self, threshold: f64) -> Vec<GoTerm> {
        let mut terms: Vec<GoTerm> = self
            .terms
            .iter()
            .filter(|t| t.score >= threshold)
            .cloned()
            .collect();
        terms.sort_by(|a, b| b.score.total_cmp(&a.score));
        terms
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Gene ID")]
    gene_id: String,
    #[serde(rename = "Position")]
    position: String,
    #[serde(rename = "Top GO Term")]
    top_term: String,
    #[serde(rename = "Confidence Score")]
    confidence: f64,
    #[serde(rename = "All GO Terms", default)]
    terms: String,
    #[serde(rename = "Top GO Term Name", default)]
    top_term_name: Option<String>,
    #[serde(rename = "Top GO Term Description", default)]
    top_term_description: Option<String>,
}

pub fn read_annotations(text: &str) -> Result<Vec<AnnotationRow>, AnnotationError> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut rows = Vec::new();

    for raw in reader.deserialize::<RawRow>() {
        let raw = raw?;
        let terms = decode_terms(&raw.terms).map_err(|source| AnnotationError::Terms {
            gene_id: raw.gene_id.clone(),
            source,
        })?;
        rows.push(AnnotationRow {
            gene_id: raw.gene_id,
            position: raw.position,
            top_term: raw.top_term,
            confidence: raw.confidence,
            terms,
            top_term_name: raw.top_term_name.filter(|s| !s.is_empty()),
            top_term_description: raw.top_term_description.filter(|s| !s.is_empty()),
        });
    }

    Ok(rows)
}

/// Write the annotation CSV. `extended` adds the top-term name and
/// description columns.
pub fn write_annotations(rows: &[AnnotationRow], extended: bool) -> Result<String, AnnotationError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if extended {
        writer.write_record(BASE_HEADER.iter().chain(EXTENDED_HEADER.iter()))?;
    } else {
        writer.write_record(BASE_HEADER)?;
    }

    for row in rows {
        let confidence = row.confidence.to_string();
        let terms = encode_terms(&row.terms);
        let mut record = vec![
            row.gene_id.as_str(),
            row.position.as_str(),
            row.top_term.as_str(),
            confidence.as_str(),
            terms.as_str(),
        ];
        if extended {
            record.push(row.top_term_name.as_deref().unwrap_or(NAME_NOT_FOUND));
            record.push(
                row.top_term_description
                    .as_deref()
                    .unwrap_or(DESCRIPTION_NOT_FOUND),
            );
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnnotationError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Text(String),
    Number(f64),
}

fn escape_code(input: &str) -> IResult<&str, &str> {
    alt((
        value("\\", char('\\')),
        value("'", char('\'')),
        value("\"", char('"')),
        value("\n", char('n')),
        value("\t", char('t')),
    ))
    .parse(input)
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        map(
            opt(escaped_transform(is_not("\\'"), '\\', escape_code)),
            Option::unwrap_or_default,
        ),
        char('\''),
    )
    .parse(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(is_not("\\\""), '\\', escape_code)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )
    .parse(input)
}

fn field(input: &str) -> IResult<&str, Field> {
    alt((
        map(alt((single_quoted, double_quoted)), Field::Text),
        map(double, Field::Number),
    ))
    .parse(input)
}

fn separator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0).parse(input)
}

fn record(input: &str) -> IResult<&str, Vec<Field>> {
    delimited(
        (char('('), multispace0),
        separated_list0(separator, field),
        (multispace0, opt(char(',')), multispace0, char(')')),
    )
    .parse(input)
}

fn record_list(input: &str) -> IResult<&str, Vec<Vec<Field>>> {
    delimited(
        (multispace0, char('['), multispace0),
        separated_list0(separator, record),
        (multispace0, opt(char(',')), multispace0, char(']'), multispace0),
    )
    .parse(input)
}

fn text_field(index: usize, field: Field) -> Result<String, CodecError> {
    match field {
        Field::Text(text) => Ok(text),
        Field::Number(_) => Err(CodecError::FieldType { index }),
    }
}

fn number_field(index: usize, field: Field) -> Result<f64, CodecError> {
    match field {
        Field::Number(number) => Ok(number),
        Field::Text(_) => Err(CodecError::FieldType { index }),
    }
}

fn into_term(fields: Vec<Field>) -> Result<GoTerm, CodecError> {
    let arity = fields.len();
    if arity != 2 && arity != 4 {
        return Err(CodecError::Arity(arity));
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().ok_or(CodecError::Arity(arity));

    let id = text_field(0, next()?)?;
    let score = number_field(1, next()?)?;
    let (name, description) = if arity == 4 {
        (Some(text_field(2, next()?)?), Some(text_field(3, next()?)?))
    } else {
        (None, None)
    };

    Ok(GoTerm {
        id,
        score,
        name,
        description,
    })
}

/// Decode an `All GO Terms` cell. An empty cell is an empty list.
pub fn decode_terms(cell: &str) -> Result<Vec<GoTerm>, CodecError> {
    if cell.trim().is_empty() {
        return Ok(Vec::new());
    }

    let (_, records) = all_consuming(record_list)
        .parse(cell)
        .map_err(|e| CodecError::Syntax(e.to_string()))?;

    records.into_iter().map(into_term).collect()
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Encode terms as an `All GO Terms` cell. Terms carrying both a name and
/// a description are written as 4-tuples.
#[must_use]
pub fn encode_terms(terms: &[GoTerm]) -> String {
    let records: Vec<String> = terms
        .iter()
        .map(|term| match (&term.name, &term.description) {
            (Some(name), Some(description)) => format!(
                "({}, {:?}, {}, {})",
                quote(&term.id),
                term.score,
                quote(name),
                quote(description)
            ),
            _ => format!("({}, {:?})", quote(&term.id), term.score),
        })
        .collect();
    format!("[{}]", records.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(id: &str, score: f64, name: &str, description: &str) -> GoTerm {
        GoTerm {
            id: id.to_string(),
            score,
            name: Some(name.to_string()),
            description: Some(description.to_string()),
        }
    }

    #[test]
    fn test_decode_pairs() {
        let terms = decode_terms("[('GO:0005515', 0.95), (\"GO:0003677\", 0.4,)]").unwrap();
        assert_eq!(
            terms,
            vec![GoTerm::new("GO:0005515", 0.95), GoTerm::new("GO:0003677", 0.4)]
        );
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_trailing_comma() {
        let terms = decode_terms("  [ ( 'GO:1' , 1 ) ,\n ]  ").unwrap();
        assert_eq!(terms, vec![GoTerm::new("GO:1", 1.0)]);
        assert!(decode_terms("").unwrap().is_empty());
        assert!(decode_terms("[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_cells() {
        assert!(matches!(decode_terms("[('GO:1',)]"), Err(CodecError::Arity(1))));
        assert!(matches!(
            decode_terms("[('GO:1', 0.5, 'name')]"),
            Err(CodecError::Arity(3))
        ));
        assert!(matches!(
            decode_terms("[(0.5, 'GO:1')]"),
            Err(CodecError::FieldType { .. })
        ));
        assert!(matches!(decode_terms("[('GO:1', 0.5)"), Err(CodecError::Syntax(_))));
        assert!(matches!(decode_terms("not a list"), Err(CodecError::Syntax(_))));
    }

    #[test]
    fn test_terms_round_trip_with_escapes() {
        let terms = vec![
            described(
                "GO:0005515",
                0.95,
                "protein binding",
                "Binding to a protein's \"site\"\\ or\tdomain.\nSecond line.",
            ),
            GoTerm::new("GO:0003677", 1.0),
            described("GO:0000001", 0.125, "", ""),
        ];
        let cell = encode_terms(&terms);
        assert!(cell.starts_with("[('GO:0005515', 0.95, 'protein binding', "));
        assert!(cell.contains("('GO:0003677', 1.0)"));
        assert_eq!(decode_terms(&cell).unwrap(), terms);
    }

    #[test]
    fn test_top_term_first_wins_ties() {
        let terms = vec![
            GoTerm::new("GO:1", 0.81),
            GoTerm::new("GO:2", 0.95),
            GoTerm::new("GO:3", 0.95),
        ];
        assert_eq!(top_term(&terms).map(|t| t.id.as_str()), Some("GO:2"));
        assert!(top_term(&[]).is_none());
    }

    #[test]
    fn test_parse_deepgoplus() {
        let tsv = "gene1\tGO:0005515|0.95\tGO:0003677|0.4\n\ngene2\tbroken\tGO:1|x\tGO:2|0.1\ngene3\n";
        let predictions = parse_deepgoplus(tsv);
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].terms.len(), 2);
        assert_eq!(predictions[1].terms, vec![GoTerm::new("GO:2", 0.1)]);
        assert!(predictions[2].terms.is_empty());
    }

    #[test]
    fn test_csv_base_and_extended() {
        let mut row = AnnotationRow {
            gene_id: "gene1".to_string(),
            position: "1 - 90".to_string(),
            top_term: "GO:0005515".to_string(),
            confidence: 0.95,
            terms: vec![GoTerm::new("GO:0005515", 0.95), GoTerm::new("GO:0003677", 0.4)],
            top_term_name: None,
            top_term_description: None,
        };

        let base = write_annotations(std::slice::from_ref(&row), false).unwrap();
        assert!(base.starts_with("Gene ID,Position,Top GO Term,Confidence Score,All GO Terms\n"));
        assert_eq!(read_annotations(&base).unwrap(), vec![row.clone()]);

        row.terms = vec![
            described("GO:0005515", 0.95, "protein binding", "Binds, sometimes."),
            described("GO:0003677", 0.4, NAME_NOT_FOUND, DESCRIPTION_NOT_FOUND),
        ];
        row.top_term_name = Some("protein binding".to_string());
        row.top_term_description = Some("Binds a protein.".to_string());

        let extended = write_annotations(std::slice::from_ref(&row), true).unwrap();
        assert!(extended.lines().next().unwrap().ends_with("Top GO Term Name,Top GO Term Description"));
        let parsed = read_annotations(&extended).unwrap();
        assert_eq!(parsed, vec![row.clone()]);
        assert_eq!(parsed[0].terms_above(0.5).len(), 1);
    }
}
