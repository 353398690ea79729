use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{FxError, Result};
use crate::models::{DealCandidate, RowError};

pub const EXPECTED_HEADER: &str =
    "dealUniqueId,fromCurrencyIsoCode,toCurrencyIsoCode,dealTimestamp,dealAmount";
const EXPECTED_COLUMNS: usize = 5;

/// Outcome of parsing one CSV source. `total_rows` counts every non-blank data
/// row (header excluded), including rows that failed to parse, so the caller
/// can reconcile parse errors with pipeline results.
#[derive(Debug, Default)]
pub struct CsvParseResult {
    pub candidates: Vec<DealCandidate>,
    pub errors: Vec<RowError>,
    pub total_rows: usize,
}

pub fn parse_path(path: &Path) -> Result<CsvParseResult> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file))
}

#[cfg(test)]
pub fn parse_str(raw: &str) -> Result<CsvParseResult> {
    parse_reader(raw.as_bytes())
}

/// Parse CSV deal rows. A missing or mismatched header is fatal; everything
/// past the header is recovered row by row.
pub fn parse_reader<R: Read>(reader: R) -> Result<CsvParseResult> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();

    // No first line at all is an empty import, not an error.
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(CsvParseResult::default()),
    };
    check_header(&header)?;

    let mut result = CsvParseResult::default();
    for record in records {
        let record = record?;
        // Fully empty lines never leave the reader, but a whitespace-only
        // line arrives as a single field; both are blank, neither counts.
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        result.total_rows += 1;
        let row_index = result.total_rows;
        match parse_row(&record, row_index) {
            Ok(candidate) => result.candidates.push(candidate),
            Err(error) => {
                warn!(
                    row = error.row_index,
                    deal_unique_id = error.deal_unique_id.as_deref(),
                    "skipping CSV row: {}",
                    error.message
                );
                result.errors.push(error);
            }
        }
    }

    info!(
        parsed = result.candidates.len(),
        total_rows = result.total_rows,
        parse_errors = result.errors.len(),
        "parsed CSV deal batch"
    );
    Ok(result)
}

fn check_header(record: &csv::StringRecord) -> Result<()> {
    let expected: Vec<&str> = EXPECTED_HEADER.split(',').collect();
    let matches = record.len() == expected.len()
        && record
            .iter()
            .zip(&expected)
            .all(|(field, want)| field.trim() == *want);
    if !matches {
        let found = record.iter().collect::<Vec<_>>().join(",");
        return Err(FxError::InvalidHeader {
            expected: EXPECTED_HEADER.to_string(),
            found,
        });
    }
    Ok(())
}

fn parse_row(
    record: &csv::StringRecord,
    row_index: usize,
) -> std::result::Result<DealCandidate, RowError> {
    if record.len() < EXPECTED_COLUMNS {
        return Err(RowError {
            row_index,
            deal_unique_id: None,
            message: format!(
                "wrong column count: expected {} columns but found {}",
                EXPECTED_COLUMNS,
                record.len()
            ),
        });
    }

    let deal_unique_id = record[0].trim().to_string();
    let from_currency = record[1].trim();
    let to_currency = record[2].trim();
    let timestamp_raw = record[3].trim();
    let amount_raw = record[4].trim();

    let row_error = |message: String| RowError {
        row_index,
        deal_unique_id: Some(deal_unique_id.clone()),
        message,
    };

    // Format-only currency checks here; alphabetic content is the
    // validator's business rule.
    if !is_currency_shaped(from_currency) {
        return Err(row_error(format!(
            "invalid fromCurrencyIsoCode '{from_currency}'. Expected 3-letter ISO code."
        )));
    }
    if !is_currency_shaped(to_currency) {
        return Err(row_error(format!(
            "invalid toCurrencyIsoCode '{to_currency}'. Expected 3-letter ISO code."
        )));
    }

    if timestamp_raw.is_empty() {
        return Err(row_error("missing dealTimestamp value.".to_string()));
    }
    let timestamp = DateTime::parse_from_rfc3339(timestamp_raw)
        .map_err(|e| row_error(format!("invalid dealTimestamp '{timestamp_raw}'. Error: {e}")))?;

    if amount_raw.is_empty() {
        return Err(row_error("missing dealAmount value.".to_string()));
    }
    let amount = Decimal::from_str(amount_raw)
        .map_err(|e| row_error(format!("invalid dealAmount '{amount_raw}'. Error: {e}")))?;

    Ok(DealCandidate {
        deal_unique_id,
        from_currency: from_currency.to_uppercase(),
        to_currency: to_currency.to_uppercase(),
        timestamp: Some(timestamp),
        amount: Some(amount),
    })
}

fn is_currency_shaped(code: &str) -> bool {
    !code.is_empty() && code.chars().count() == 3
}
