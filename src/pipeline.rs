use chrono::Utc;
use tracing::{info, warn};

use crate::models::{
    DealCandidate, DuplicateCause, ImportSummary, OutcomeKind, RowError, RowOutcome,
};
use crate::store::{DealStore, InsertError};
use crate::validator;

/// Import a batch of candidates, one row at a time. No failure on one row
/// ever prevents persistence of another; every condition inside the loop is
/// folded into the summary rather than propagated.
pub fn import_batch<S: DealStore>(
    store: &mut S,
    candidates: &[Option<DealCandidate>],
) -> ImportSummary {
    if candidates.is_empty() {
        info!("received empty deal batch");
        return ImportSummary::default();
    }

    info!(total_rows = candidates.len(), "starting deal import");

    let summary = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| process_row(store, index + 1, candidate.as_ref()))
        .fold(ImportSummary::default(), ImportSummary::absorb);

    info!(
        total_rows = summary.total_rows,
        imported = summary.imported,
        invalid = summary.invalid,
        duplicates = summary.duplicates,
        "finished deal import"
    );
    summary
}

fn process_row<S: DealStore>(
    store: &mut S,
    row_index: usize,
    candidate: Option<&DealCandidate>,
) -> RowOutcome {
    let deal_unique_id = candidate
        .map(|c| c.deal_unique_id.clone())
        .filter(|id| !id.is_empty());
    let outcome = |kind: OutcomeKind| RowOutcome {
        row_index,
        deal_unique_id: deal_unique_id.clone(),
        kind,
    };

    let deal = match validator::validate(candidate) {
        Ok(deal) => deal,
        Err(reason) => {
            warn!(row = row_index, "validation error: {reason}");
            return outcome(OutcomeKind::Invalid(reason.to_string()));
        }
    };

    // Optimistic pre-check; the store constraint below stays authoritative.
    match store.exists_by_key(&deal.deal_unique_id) {
        Ok(true) => {
            warn!(row = row_index, id = %deal.deal_unique_id, "duplicate (pre-check)");
            return outcome(OutcomeKind::Duplicate(DuplicateCause::PreCheck));
        }
        Ok(false) => {}
        Err(e) => {
            warn!(row = row_index, "existence check failed: {e}");
            return outcome(OutcomeKind::Invalid(format!(
                "Unexpected error during import: {e}"
            )));
        }
    }

    match store.insert(deal, Utc::now()) {
        Ok(_) => outcome(OutcomeKind::Imported),
        Err(InsertError::Duplicate) => {
            // Lost the race between pre-check and insert.
            warn!(row = row_index, "duplicate (storage constraint)");
            outcome(OutcomeKind::Duplicate(DuplicateCause::StorageConflict))
        }
        Err(InsertError::Other(e)) => {
            warn!(row = row_index, "insert failed: {e}");
            outcome(OutcomeKind::Invalid(format!(
                "Unexpected error during import: {e}"
            )))
        }
    }
}

/// Reconcile the CSV path: rows that never reached the pipeline (parse
/// errors) join the pipeline's own results under the parser's authoritative
/// row count. Parse errors come first, pipeline errors after, each group in
/// its original order.
pub fn merge_parse_errors(
    parse_errors: Vec<RowError>,
    total_rows: usize,
    pipeline: ImportSummary,
) -> ImportSummary {
    let mut errors = parse_errors;
    let parse_error_count = errors.len();
    errors.extend(pipeline.errors);
    ImportSummary {
        total_rows,
        imported: pipeline.imported,
        invalid: pipeline.invalid + parse_error_count,
        duplicates: pipeline.duplicates,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{StoredDeal, ValidatedDeal};
    use crate::store::SqliteDealStore;
    use chrono::{DateTime, Utc};
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn valid(id: &str) -> Option<DealCandidate> {
        Some(DealCandidate {
            deal_unique_id: id.to_string(),
            from_currency: "USD".to_string(),
            to_currency: "EUR".to_string(),
            timestamp: Some(DateTime::parse_from_rfc3339("2025-01-01T10:15:30+00:00").unwrap()),
            amount: Some(Decimal::from_str("100.00").unwrap()),
        })
    }

    #[test]
    fn test_single_valid_deal_imports() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        let summary = import_batch(&mut store, &[valid("D-1")]);
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.invalid, 0);
        assert_eq!(summary.duplicates, 0);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_duplicate_key_in_batch_first_wins() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        let summary = import_batch(&mut store, &[valid("D-1"), valid("D-1")]);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.errors.len(), 1);
        let err = &summary.errors[0];
        assert_eq!(err.row_index, 2);
        assert_eq!(err.deal_unique_id.as_deref(), Some("D-1"));
        assert!(err.message.contains("Duplicate"));
        assert!(err.message.contains("already imported"));
    }

    #[test]
    fn test_duplicate_across_batches() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        import_batch(&mut store, &[valid("D-1")]);
        let summary = import_batch(&mut store, &[valid("D-1")]);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.imported, 0);
    }

    #[test]
    fn test_invalid_row_does_not_block_later_rows() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        let mut same_currency = valid("D-1");
        if let Some(c) = same_currency.as_mut() {
            c.to_currency = "USD".to_string();
        }
        let summary = import_batch(&mut store, &[same_currency, valid("D-2")]);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.invalid, 1);
        assert!(summary.errors[0].message.contains("must be different"));
        assert_eq!(summary.errors[0].row_index, 1);
    }

    #[test]
    fn test_null_entry_is_invalid_row() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        let summary = import_batch(&mut store, &[None, valid("D-2")]);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.errors[0].deal_unique_id, None);
        assert!(summary.errors[0].message.contains("null"));
    }

    #[test]
    fn test_empty_batch_never_touches_store() {
        struct PanicStore;
        impl DealStore for PanicStore {
            fn exists_by_key(&self, _id: &str) -> Result<bool, String> {
                panic!("store must not be contacted for an empty batch");
            }
            fn insert(
                &mut self,
                _deal: ValidatedDeal,
                _created_at: DateTime<Utc>,
            ) -> Result<StoredDeal, InsertError> {
                panic!("store must not be contacted for an empty batch");
            }
        }
        let summary = import_batch(&mut PanicStore, &[]);
        assert_eq!(summary, ImportSummary::default());
    }

    /// Store that reports "absent" on pre-check but refuses the insert, the
    /// way a concurrent writer winning the race looks to this batch.
    struct RacingStore;
    impl DealStore for RacingStore {
        fn exists_by_key(&self, _id: &str) -> Result<bool, String> {
            Ok(false)
        }
        fn insert(
            &mut self,
            _deal: ValidatedDeal,
            _created_at: DateTime<Utc>,
        ) -> Result<StoredDeal, InsertError> {
            Err(InsertError::Duplicate)
        }
    }

    #[test]
    fn test_storage_level_duplicate_is_distinct() {
        let summary = import_batch(&mut RacingStore, &[valid("D-1")]);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.imported, 0);
        assert!(summary.errors[0].message.contains("storage level"));
    }

    struct FailingStore;
    impl DealStore for FailingStore {
        fn exists_by_key(&self, _id: &str) -> Result<bool, String> {
            Ok(false)
        }
        fn insert(
            &mut self,
            _deal: ValidatedDeal,
            _created_at: DateTime<Utc>,
        ) -> Result<StoredDeal, InsertError> {
            Err(InsertError::Other("disk full".to_string()))
        }
    }

    #[test]
    fn test_other_persistence_failure_marks_row_invalid() {
        let summary = import_batch(&mut FailingStore, &[valid("D-1"), valid("D-2")]);
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.invalid, 2);
        assert!(summary.errors[0].message.contains("disk full"));
    }

    #[test]
    fn test_summary_invariant_on_mixed_batch() {
        let (_dir, conn) = test_db();
        let mut store = SqliteDealStore::new(&conn);
        let mut bad = valid("D-3");
        if let Some(c) = bad.as_mut() {
            c.amount = Some(Decimal::ZERO);
        }
        let summary = import_batch(&mut store, &[valid("D-1"), valid("D-1"), bad, None]);
        assert_eq!(
            summary.total_rows,
            summary.imported + summary.invalid + summary.duplicates
        );
        assert_eq!(summary.errors.len(), summary.invalid + summary.duplicates);
    }

    #[test]
    fn test_merge_keeps_parse_errors_first() {
        let parse_errors = vec![RowError {
            row_index: 2,
            deal_unique_id: None,
            message: "wrong column count: expected 5 columns but found 4".to_string(),
        }];
        let pipeline = ImportSummary {
            total_rows: 2,
            imported: 1,
            invalid: 0,
            duplicates: 1,
            errors: vec![RowError {
                row_index: 1,
                deal_unique_id: Some("D-1".to_string()),
                message: "Duplicate dealUniqueId (already imported)".to_string(),
            }],
        };
        let merged = merge_parse_errors(parse_errors, 3, pipeline);
        assert_eq!(merged.total_rows, 3);
        assert_eq!(merged.imported, 1);
        assert_eq!(merged.invalid, 1);
        assert_eq!(merged.duplicates, 1);
        // Parse errors lead even though their row index is higher.
        assert_eq!(merged.errors[0].row_index, 2);
        assert_eq!(merged.errors[1].row_index, 1);
        assert_eq!(merged.errors.len(), merged.invalid + merged.duplicates);
    }

    #[test]
    fn test_merge_with_no_parse_errors_passes_through() {
        let pipeline = ImportSummary {
            total_rows: 1,
            imported: 1,
            invalid: 0,
            duplicates: 0,
            errors: vec![],
        };
        let merged = merge_parse_errors(vec![], 1, pipeline.clone());
        assert_eq!(merged, pipeline);
    }
}
