//! Parse the raw text printed by the GEMM benchmark into a [`ReportTable`].
//!
//! The benchmark prints one block per shape. Each block starts with the
//! device marker `[0]:`, followed by the CSV header on the same line and the
//! CSV data row on the next line:
//!
//! ```text
//! [0]:transA,transB,batch_count,m,n,k,...,us
//!     N,T,1,4096,4096,4096,...,812.5
//! ```

use crate::error::{ReportError, Result};
use crate::table::ReportTable;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Marker that opens every result block for device 0.
pub const DEVICE_MARKER: &str = "[0]:";

/// Parse benchmark output text.
///
/// The header is taken from the first block only; every block contributes
/// its second line as one data row.
pub fn parse_report(text: &str) -> Result<ReportTable> {
    let blocks: Vec<&str> = text.split(DEVICE_MARKER).skip(1).collect();
    if blocks.is_empty() {
        return Err(ReportError::NoMarkers);
    }

    let header = blocks[0].lines().next().unwrap_or_default().trim();
    if header.is_empty() {
        return Err(ReportError::corrupt("the first block has an empty header line"));
    }

    let mut csv_text = String::with_capacity(text.len());
    csv_text.push_str(header);
    csv_text.push('\n');

    for (idx, block) in blocks.iter().enumerate() {
        let row = block
            .lines()
            .nth(1)
            .map(str::trim)
            .ok_or_else(|| ReportError::corrupt(format!("block {idx} has no data line")))?;
        if row.is_empty() {
            return Err(ReportError::corrupt(format!("block {idx} has an empty data line")));
        }
        csv_text.push_str(row);
        csv_text.push('\n');
    }

    let table = ReportTable::from_csv_str(&csv_text).map_err(|e| match e {
        ReportError::Csv(e) => ReportError::corrupt(e.to_string()),
        other => other,
    })?;

    if table.is_empty() {
        return Err(ReportError::corrupt("no data rows"));
    }

    debug!(
        blocks = blocks.len(),
        columns = table.header().len(),
        "parsed benchmark report"
    );
    Ok(table)
}

/// Parse the benchmark output stored at `path`.
///
/// When `output` is given, the parsed table is also written there as CSV.
pub fn parse_report_file(path: &Path, output: Option<&Path>) -> Result<ReportTable> {
    let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let table = parse_report(&text)?;
    if let Some(output) = output {
        table.write_csv_file(output)?;
    }
    Ok(table)
}
