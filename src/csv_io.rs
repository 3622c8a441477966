//! CSV files in and out of the job database
//!
//! Reference data the script depends on is loaded from CSV when a fresh
//! database is provisioned. Result tables are written back out to CSV
//! after the job has finished.

use std::path::{Path, PathBuf};
use rusqlite::types::ValueRef;
use crate::config::CsvLoadConfig;
use crate::session::{schema, SqliteSession};
use crate::{Error, Result};

/// Replace the contents of the configured table with the rows of `file`.
///
/// Runs as one transaction: either every row lands or none does.
/// Returns the number of rows inserted.
pub fn load_table(session: &mut SqliteSession, file: &Path, config: &CsvLoadConfig) -> Result<usize> {
    let fields = config.field_indices()?;
    if fields.is_empty() {
        return Err(Error::Config(format!("csv load into {} names no columns", config.table)));
    }

    tracing::info!("Reading {} into {} ...", file.display(), config.table);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(config.has_header)
        .flexible(true)
        .from_path(file)?;

    let table = schema::quote_qualified(&config.table);
    let columns = config
        .columns
        .iter()
        .map(|c| schema::quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; fields.len()].join(", ");
    let insert = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders);

    let tx = session.connection_mut().transaction()?;
    tracing::info!("Deleting all entries from {} ...", config.table);
    tx.execute(&format!("DELETE FROM {}", table), [])?;

    let mut rows = 0;
    {
        let mut stmt = tx.prepare(&insert)?;
        for record in reader.records() {
            let record = record?;
            let values = fields
                .iter()
                .map(|&i| {
                    record.get(i).ok_or_else(|| {
                        Error::Import(format!(
                            "{} line {}: no field {}",
                            file.display(),
                            record.position().map(|p| p.line()).unwrap_or(0),
                            i
                        ))
                    })
                })
                .collect::<Result<Vec<&str>>>()?;
            stmt.execute(rusqlite::params_from_iter(values))?;
            rows += 1;
        }
    }
    tx.commit()?;

    tracing::info!("Loaded {} rows into {}", rows, config.table);
    Ok(rows)
}

/// Write every row of `table` to `path`, header line first.
/// NULL becomes an empty field. Returns the number of rows written.
pub fn export_table(session: &SqliteSession, table: &str, path: &Path) -> Result<usize> {
    let mut stmt = session
        .connection()
        .prepare(&format!("SELECT * FROM {}", schema::quote_qualified(table)))?;
    let header: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&header)?;

    let mut rows = stmt.query([])?;
    let mut count = 0;
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(header.len());
        for i in 0..header.len() {
            record.push(field_text(row.get_ref(i)?));
        }
        writer.write_record(&record)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Export each table to `<dir>/<table>.csv`, creating `dir` if needed.
pub fn export_tables(session: &SqliteSession, tables: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let file_name = table.rsplit('.').next().unwrap_or(table);
        let path = dir.join(format!("{}.csv", file_name));
        tracing::info!("Writing contents of table {} to {} ...", table, path.display());
        let rows = export_table(session, table, &path)?;
        tracing::debug!("{} rows written", rows);
        written.push(path);
    }
    tracing::info!("All tables written");
    Ok(written)
}

fn field_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn transfer_busses(fields: Option<Vec<usize>>) -> CsvLoadConfig {
        CsvLoadConfig {
            file: PathBuf::from("transfer_busses.csv"),
            table: "transfer_busses".to_string(),
            columns: vec!["osm_id".to_string(), "center_geom".to_string()],
            fields,
            has_header: true,
        }
    }

    fn session_with_table() -> SqliteSession {
        let mut session = SqliteSession::open_in_memory().unwrap();
        session
            .execute_batch("CREATE TABLE transfer_busses (osm_id TEXT, center_geom TEXT);")
            .unwrap();
        session
    }

    #[test]
    fn test_load_replaces_rows_and_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("transfer_busses.csv");
        std::fs::write(&file, "name,geom,osm\nnorth,POINT(1 2),w17\nsouth,\"POINT(3 4)\",n5\n").unwrap();

        let mut session = session_with_table();
        session.execute_unit("INSERT INTO transfer_busses VALUES ('stale', NULL)").unwrap();

        let rows = load_table(&mut session, &file, &transfer_busses(Some(vec![2, 1]))).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(session.count_rows("transfer_busses").unwrap(), 2);
        assert_eq!(
            session
                .query_i64("SELECT count(*) FROM transfer_busses WHERE osm_id = 'n5' AND center_geom = 'POINT(3 4)'")
                .unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_short_record_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("transfer_busses.csv");
        std::fs::write(&file, "osm,geom\nw1,POINT(0 0)\nw2\n").unwrap();

        let mut session = session_with_table();
        session.execute_unit("INSERT INTO transfer_busses VALUES ('kept', NULL)").unwrap();

        let err = load_table(&mut session, &file, &transfer_busses(None)).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
        assert_eq!(session.query_i64("SELECT count(*) FROM transfer_busses WHERE osm_id = 'kept'").unwrap(), Some(1));
    }

    #[test]
    fn test_missing_file_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_table();
        let err = load_table(&mut session, &dir.path().join("absent.csv"), &transfer_busses(None)).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SqliteSession::open_in_memory().unwrap();
        session
            .execute_batch(
                "CREATE TABLE bus_data (id INTEGER, voltage REAL, note TEXT);\n\
                 INSERT INTO bus_data VALUES (1, 110000.5, 'north, main');\n\
                 INSERT INTO bus_data VALUES (2, NULL, NULL);",
            )
            .unwrap();

        let written = export_tables(&session, &["bus_data".to_string()], &dir.path().join("results")).unwrap();
        assert_eq!(written, vec![dir.path().join("results").join("bus_data.csv")]);

        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(contents, "id,voltage,note\n1,110000.5,\"north, main\"\n2,,\n");
    }

    #[test]
    fn test_export_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = SqliteSession::open_in_memory().unwrap();
        let err = export_table(&session, "results_metadata", &dir.path().join("x.csv")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
