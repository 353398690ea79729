use std::path::Path;

use colored::Colorize;
use comfy_table::Table;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::cli::InputFormat;
use crate::db::get_connection;
use crate::error::{FxError, Result};
use crate::models::{DealCandidate, ImportSummary};
use crate::parser;
use crate::pipeline::{import_batch, merge_parse_errors};
use crate::settings::db_path;
use crate::store::SqliteDealStore;

pub fn run(file: &str, format: Option<InputFormat>, as_json: bool) -> Result<()> {
    let file_path = Path::new(file);
    let conn = get_connection(&db_path())?;

    let format = match format {
        Some(f) => f,
        None => infer_format(file_path)?,
    };

    let checksum = compute_checksum(file_path)?;
    if already_imported(&conn, &checksum)? {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    let summary = match format {
        InputFormat::Csv => import_csv(&conn, file_path)?,
        InputFormat::Json => import_json(&conn, file_path)?,
    };

    record_import(&conn, file_path, &summary, &checksum)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary).map_err(FxError::Json)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn infer_format(path: &Path) -> Result<InputFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(InputFormat::Csv),
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(InputFormat::Json),
        _ => Err(FxError::Other(format!(
            "cannot infer input format of '{}'; pass --format",
            path.display()
        ))),
    }
}

fn import_csv(conn: &Connection, path: &Path) -> Result<ImportSummary> {
    let parsed = parser::parse_path(path)?;
    let candidates: Vec<Option<DealCandidate>> =
        parsed.candidates.into_iter().map(Some).collect();
    let mut store = SqliteDealStore::new(conn);
    let pipeline_summary = import_batch(&mut store, &candidates);
    Ok(merge_parse_errors(parsed.errors, parsed.total_rows, pipeline_summary))
}

fn import_json(conn: &Connection, path: &Path) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)?;
    let candidates: Vec<Option<DealCandidate>> = serde_json::from_str(&content)?;
    let mut store = SqliteDealStore::new(conn);
    Ok(import_batch(&mut store, &candidates))
}

fn compute_checksum(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn already_imported(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

fn record_import(
    conn: &Connection,
    path: &Path,
    summary: &ImportSummary,
    checksum: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO imports (filename, total_rows, imported, invalid, duplicates, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            summary.total_rows as i64,
            summary.imported as i64,
            summary.invalid as i64,
            summary.duplicates as i64,
            checksum,
        ],
    )?;
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!(
        "{} rows: {} imported, {} invalid, {} duplicates",
        summary.total_rows,
        summary.imported.to_string().green(),
        summary.invalid.to_string().red(),
        summary.duplicates.to_string().yellow(),
    );
    if summary.errors.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(["Row", "Deal ID", "Error"]);
    for error in &summary.errors {
        table.add_row([
            error.row_index.to_string(),
            error.deal_unique_id.clone().unwrap_or_default(),
            error.message.clone(),
        ]);
    }
    println!("{table}");
}
