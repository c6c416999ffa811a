//! CSV discovery, reading and writing for session exports.
//!
//! Turns one CSV file, or every `*.csv` under a directory, into a single
//! [`RawTable`] of optional string cells for the loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cohort_core::error::{InsightError, Result};
use cohort_core::models::RawTable;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read one CSV file. The first record is the header; empty cells become
/// `None`. Short rows are padded with `None`.
pub fn read_csv(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| InsightError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut table = RawTable::new(columns);

    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        table.push_row(row);
    }

    debug!(
        "File {}: {} columns, {} rows",
        path.display(),
        table.columns.len(),
        table.len()
    );
    Ok(table)
}

/// Load a raw table from a CSV file or a directory of CSV files.
///
/// Multiple files are concatenated in path order and matched by column name:
/// the result carries every column seen in any file (first-seen order) and
/// rows from files lacking a column read it as `None`.
pub fn load_raw_table(data_path: &Path) -> Result<RawTable> {
    if !data_path.exists() {
        return Err(InsightError::DataPathNotFound(data_path.to_path_buf()));
    }
    if data_path.is_file() {
        return read_csv(data_path);
    }

    let files = find_csv_files(data_path);
    if files.is_empty() {
        return Err(InsightError::NoDataFiles(data_path.to_path_buf()));
    }

    let mut tables = Vec::with_capacity(files.len());
    for file in &files {
        tables.push(read_csv(file)?);
    }
    let merged = concat_tables(tables);

    debug!(
        "Loaded {} rows from {} files under {}",
        merged.len(),
        files.len(),
        data_path.display()
    );
    Ok(merged)
}

/// Write `table` as CSV with a header row; `None` cells are written empty.
pub fn write_csv(table: &RawTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Concatenate tables by column name.
fn concat_tables(tables: Vec<RawTable>) -> RawTable {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for table in &tables {
        for column in &table.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let mut merged = RawTable::new(columns);
    for table in tables {
        let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
        for row in table.rows {
            let mut out = vec![None; merged.columns.len()];
            for (cell, &target) in row.into_iter().zip(&targets) {
                out[target] = cell;
            }
            merged.push_row(out);
        }
    }
    merged
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    // ── find_csv_files ────────────────────────────────────────────────────────

    #[test]
    fn test_find_csv_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("2024");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(dir.path(), "b.csv", &["a"]);
        write_file(dir.path(), "a.CSV", &["a"]);
        write_file(dir.path(), "notes.txt", &["a"]);
        write_file(&sub, "c.csv", &["a"]);

        let files = find_csv_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["c.csv", "a.CSV", "b.csv"]);
    }

    #[test]
    fn test_find_csv_files_nonexistent_path() {
        let files = find_csv_files(Path::new("/tmp/does-not-exist-cohort-test-xyz"));
        assert!(files.is_empty());
    }

    // ── read_csv ──────────────────────────────────────────────────────────────

    #[test]
    fn test_read_csv_empty_cells_are_none() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "s.csv",
            &["user_key,group_code,logins", "u1,,3", "u2, 7.0 ,"],
        );
        let table = read_csv(&path).unwrap();
        assert_eq!(table.columns, vec!["user_key", "group_code", "logins"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], None);
        assert_eq!(table.rows[1][1].as_deref(), Some("7.0"));
        assert_eq!(table.rows[1][2], None);
    }

    #[test]
    fn test_read_csv_pads_short_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "s.csv", &["a,b,c", "1"]);
        let table = read_csv(&path).unwrap();
        assert_eq!(table.rows[0], vec![Some("1".to_string()), None, None]);
    }

    #[test]
    fn test_read_csv_header_only() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "s.csv", &["a,b"]);
        let table = read_csv(&path).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/tmp/does-not-exist-cohort.csv")).unwrap_err();
        assert!(matches!(err, InsightError::FileRead { .. }));
    }

    // ── load_raw_table ────────────────────────────────────────────────────────

    #[test]
    fn test_load_raw_table_merges_by_column_name() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", &["user_key,group_code", "u1,A"]);
        write_file(dir.path(), "b.csv", &["group_code,user_key,extra", "B,u2,x"]);

        let table = load_raw_table(dir.path()).unwrap();
        assert_eq!(table.columns, vec!["user_key", "group_code", "extra"]);
        assert_eq!(
            table.rows[0],
            vec![Some("u1".to_string()), Some("A".to_string()), None]
        );
        assert_eq!(
            table.rows[1],
            vec![
                Some("u2".to_string()),
                Some("B".to_string()),
                Some("x".to_string())
            ]
        );
    }

    #[test]
    fn test_load_raw_table_missing_path() {
        let err = load_raw_table(Path::new("/tmp/does-not-exist-cohort-dir")).unwrap_err();
        assert!(matches!(err, InsightError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_raw_table_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = load_raw_table(dir.path()).unwrap_err();
        assert!(matches!(err, InsightError::NoDataFiles(_)));
    }

    // ── write_csv ─────────────────────────────────────────────────────────────

    #[test]
    fn test_write_csv_then_read_back() {
        let dir = TempDir::new().unwrap();
        let mut table = RawTable::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![Some("1".into()), None]);
        table.push_row(vec![Some("x, y".into()), Some("2".into())]);
        let path = dir.path().join("out").join("t.csv");

        write_csv(&table, &path).unwrap();
        let back = read_csv(&path).unwrap();
        assert_eq!(back, table);
    }
}
