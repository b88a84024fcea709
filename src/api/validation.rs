use chrono::NaiveDate;

use super::ApiError;
use crate::domain::{SequenceId, SequenceStatus};

pub fn validate_sequence_id(id: i32) -> Result<SequenceId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid sequence ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(SequenceId::new(id))
}

pub fn validate_record_id(id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MAX_LIMIT: u64 = 1000;
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between {} and {}",
            limit, MIN_LIMIT, MAX_LIMIT
        )));
    }
    Ok(limit)
}

pub fn validate_threshold(threshold: f64) -> Result<f64, ApiError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ApiError::validation(format!(
            "Invalid threshold: {}. Threshold must be between 0 and 1",
            threshold
        )));
    }
    Ok(threshold)
}

/// Parse an optional `YYYY-MM-DD` query value.
pub fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ApiError::validation(format!("Invalid {field}: '{text}'. Expected YYYY-MM-DD"))
            }),
    }
}

pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ApiError> {
    if let (Some(s), Some(e)) = (start, end)
        && e < s
    {
        return Err(ApiError::validation(
            "End date must be on or after start date",
        ));
    }
    Ok((start, end))
}

pub fn parse_status(value: Option<&str>) -> Result<Option<SequenceStatus>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().map_err(|e| ApiError::validation(format!("{e}"))))
        .transpose()
}

pub fn validate_gene_id(gene_id: &str) -> Result<&str, ApiError> {
    let trimmed = gene_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Gene ID cannot be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sequence_id() {
        assert!(validate_sequence_id(1).is_ok());
        assert!(validate_sequence_id(0).is_err());
        assert!(validate_sequence_id(-1).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
    }

    #[test]
    fn test_dates() {
        let start = parse_date(Some("2026-01-10"), "start_date").unwrap();
        let end = parse_date(Some("2026-01-09"), "end_date").unwrap();
        assert!(parse_date(Some("10/01/2026"), "start_date").is_err());
        assert_eq!(parse_date(Some(" "), "start_date").unwrap(), None);
        assert!(validate_date_range(start, end).is_err());
        assert!(validate_date_range(end, start).is_ok());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_status(Some("step_2_completed")).unwrap(),
            Some(SequenceStatus::StepCompleted(2))
        );
        assert!(parse_status(Some("done")).is_err());
        assert_eq!(parse_status(None).unwrap(), None);
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(1.5).is_err());
    }
}
