use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn run() -> Result<()> {
    let conn = get_connection(&db_path())?;

    let deal_count: i64 = conn.query_row("SELECT count(*) FROM deals", [], |r| r.get(0))?;
    println!("{deal_count} deals stored in {}", db_path().display());

    let mut stmt = conn.prepare(
        "SELECT filename, import_date, total_rows, imported, invalid, duplicates \
         FROM imports ORDER BY id DESC LIMIT 10",
    )?;
    let rows: Vec<(String, String, i64, i64, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(["File", "Date", "Rows", "Imported", "Invalid", "Duplicates"]);
    for (filename, date, total, imported, invalid, duplicates) in rows {
        table.add_row([
            filename,
            date,
            total.to_string(),
            imported.to_string(),
            invalid.to_string(),
            duplicates.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
