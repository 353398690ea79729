use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Incoming deal record before validation, from either input path (JSON batch
/// or CSV row). Timestamp and amount stay optional so a record missing either
/// is rejected per-row instead of failing the whole batch deserialize.
#[derive(Debug, Clone, Deserialize)]
pub struct DealCandidate {
    #[serde(rename = "dealUniqueId", default)]
    pub deal_unique_id: String,
    #[serde(rename = "fromCurrencyIsoCode", default)]
    pub from_currency: String,
    #[serde(rename = "toCurrencyIsoCode", default)]
    pub to_currency: String,
    #[serde(rename = "dealTimestamp")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(rename = "dealAmount")]
    pub amount: Option<Decimal>,
}

/// A candidate that passed validation; every field is known present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDeal {
    pub deal_unique_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub timestamp: DateTime<FixedOffset>,
    pub amount: Decimal,
}

/// A persisted deal as the store returns it.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct StoredDeal {
    pub id: i64,
    pub deal_unique_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub timestamp: DateTime<FixedOffset>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One failed row in the caller-facing summary. `deal_unique_id` is None when
/// the id token itself could not be extracted from the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    #[serde(rename = "rowIndex")]
    pub row_index: usize,
    #[serde(rename = "dealUniqueId")]
    pub deal_unique_id: Option<String>,
    pub message: String,
}

/// Why a row was classified as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateCause {
    /// The optimistic existence pre-check found the key before inserting.
    PreCheck,
    /// The store's uniqueness constraint fired at insert time (lost race).
    StorageConflict,
}

impl DuplicateCause {
    pub fn message(&self) -> &'static str {
        match self {
            Self::PreCheck => "Duplicate dealUniqueId (already imported)",
            Self::StorageConflict => "Duplicate dealUniqueId detected at storage level",
        }
    }
}

/// Per-row classification produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub row_index: usize,
    pub deal_unique_id: Option<String>,
    pub kind: OutcomeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeKind {
    Imported,
    Invalid(String),
    Duplicate(DuplicateCause),
}

/// Batch result: every input row is accounted for exactly once, so
/// `total_rows == imported + invalid + duplicates` and
/// `errors.len() == invalid + duplicates`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    #[serde(rename = "totalRows")]
    pub total_rows: usize,
    pub imported: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    /// Fold one row outcome into the summary, preserving input order.
    pub fn absorb(mut self, outcome: RowOutcome) -> Self {
        self.total_rows += 1;
        match outcome.kind {
            OutcomeKind::Imported => self.imported += 1,
            OutcomeKind::Invalid(message) => {
                self.invalid += 1;
                self.errors.push(RowError {
                    row_index: outcome.row_index,
                    deal_unique_id: outcome.deal_unique_id,
                    message,
                });
            }
            OutcomeKind::Duplicate(cause) => {
                self.duplicates += 1;
                self.errors.push(RowError {
                    row_index: outcome.row_index,
                    deal_unique_id: outcome.deal_unique_id,
                    message: cause.message().to_string(),
                });
            }
        }
        self
    }
}
