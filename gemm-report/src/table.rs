//! A small column-named text table backed by the `csv` crate.
//!
//! Cells are kept as the exact text the benchmark printed, so a table that is
//! written out and read back is identical, digit for digit.

use crate::error::{ReportError, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Header plus rows of text cells. Every row has as many cells as the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// Build a table, checking that every row matches the header width.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != header.len())
        {
            return Err(ReportError::corrupt(format!(
                "row {idx} has {} fields, header has {}",
                row.len(),
                header.len()
            )));
        }
        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column called `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Like [`ReportTable::column`], but a missing column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| ReportError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Parse CSV text with a header line.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::read_csv(text.as_bytes())
    }

    /// Parse CSV with a header line from any reader.
    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::new(header, rows)
    }

    pub fn read_csv_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_csv_str(&text)
    }

    /// Write header and rows as CSV. No index column is added.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            ReportError::from(csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
        })
    }

    /// Write the table to `path`, creating parent directories as needed.
    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let text = self.to_csv_string()?;
        write_file(path, &text)
    }
}

/// Write `contents` to `path`, creating the parent directory first.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = ReportTable::new(strings(&["a", "b"]), vec![strings(&["1"])]).unwrap_err();
        assert!(matches!(err, ReportError::Corrupt { .. }));
    }

    #[test]
    fn test_csv_roundtrip_preserves_text_and_order() {
        let table = ReportTable::new(
            strings(&["m", "us", "name"]),
            vec![
                strings(&["4096", "12.500", "first, with comma"]),
                strings(&["1", "0.1", "second"]),
                strings(&["8192", "1e-3", "third"]),
            ],
        )
        .unwrap();

        let text = table.to_csv_string().unwrap();
        assert!(text.starts_with("m,us,name\n"));

        let back = ReportTable::from_csv_str(&text).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.rows()[0][1], "12.500");
        assert_eq!(back.rows()[2][0], "8192");
    }

    #[test]
    fn test_non_ascii_cells_roundtrip() {
        let table = ReportTable::new(
            strings(&["name", "us"]),
            vec![strings(&["größe µs", "3.5"])],
        )
        .unwrap();
        let text = table.to_csv_string().unwrap();
        assert_eq!(text, "name,us\ngröße µs,3.5\n");
        assert_eq!(ReportTable::from_csv_str(&text).unwrap(), table);
    }

    #[test]
    fn test_file_roundtrip_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let table = ReportTable::new(strings(&["x"]), vec![strings(&["1"])]).unwrap();
        table.write_csv_file(&path).unwrap();
        assert_eq!(ReportTable::read_csv_file(&path).unwrap(), table);
    }

    #[test]
    fn test_require_column() {
        let table = ReportTable::new(strings(&["m", "n"]), vec![]).unwrap();
        assert_eq!(table.require_column("n").unwrap(), 1);
        assert!(matches!(
            table.require_column("k"),
            Err(ReportError::MissingColumn { .. })
        ));
    }
}
