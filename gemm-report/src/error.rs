//! Error types for report parsing, shape logs and ranking.

use core::fmt;
use miette::Diagnostic;
use std::path::PathBuf;

/// Everything that can go wrong while turning a shape log and a benchmark
/// report into ranked tuning groups.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReportError {
    /// The benchmark output contains no `[0]:` device marker at all.
    NoMarkers,

    /// Markers were found but the blocks around them are malformed.
    Corrupt {
        /// What exactly was wrong.
        reason: String,
    },

    /// The report holds a different number of rows than the shape log.
    RowCountMismatch {
        /// Number of shape records submitted to the benchmark.
        expected: usize,
        /// Number of rows found in the report.
        found: usize,
    },

    /// A report row does not describe the shape it is aligned with.
    ShapeMismatch {
        /// Position of the row in the report and of the record in the log.
        shape_id: usize,
        /// Name of the disagreeing column.
        column: &'static str,
        /// Value in the shape log.
        expected: String,
        /// Value in the report.
        found: String,
    },

    /// A column required by the ranking pipeline is absent.
    MissingColumn {
        /// The column that was looked up.
        column: String,
    },

    /// A cell could not be read as a number.
    InvalidNumber {
        /// Column of the offending cell.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// A data type tag with no entry in the tuning code table.
    UnknownDataType {
        /// The tag as it appeared in the report.
        tag: String,
    },

    /// The shape log is not a list of mappings with the expected fields.
    InvalidLog {
        /// Index of the record, when the problem is local to one record.
        index: Option<usize>,
        /// What exactly was wrong.
        reason: String,
    },

    /// The CSV reader or writer failed.
    Csv(csv::Error),

    /// Reading or writing a file failed.
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the report itself is malformed or belongs to a different log.
    pub fn is_stale_report(&self) -> bool {
        matches!(
            self,
            Self::NoMarkers
                | Self::Corrupt { .. }
                | Self::RowCountMismatch { .. }
                | Self::ShapeMismatch { .. }
                | Self::MissingColumn { .. }
                | Self::InvalidNumber { .. }
        )
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::NoMarkers => {
                write!(f, "the benchmark output does not have the correct format: no benchmark markers found")
            }
            ReportError::Corrupt { reason } => {
                write!(f, "the benchmark output may be corrupted: {reason}")
            }
            ReportError::RowCountMismatch { expected, found } => {
                write!(f, "report has {found} rows but the shape log has {expected} records")
            }
            ReportError::ShapeMismatch {
                shape_id,
                column,
                expected,
                found,
            } => write!(
                f,
                "report row {shape_id} does not match its shape: {column} is {found}, expected {expected}"
            ),
            ReportError::MissingColumn { column } => {
                write!(f, "column `{column}` is missing from the report")
            }
            ReportError::InvalidNumber { column, value } => {
                write!(f, "invalid number `{value}` in column `{column}`")
            }
            ReportError::UnknownDataType { tag } => write!(f, "unknown data type `{tag}`"),
            ReportError::InvalidLog { index, reason } => match index {
                Some(index) => write!(f, "invalid shape log record {index}: {reason}"),
                None => write!(f, "invalid shape log: {reason}"),
            },
            ReportError::Csv(e) => write!(f, "CSV error: {e}"),
            ReportError::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl core::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ReportError::Csv(e) => Some(e),
            ReportError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Diagnostic for ReportError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self {
            ReportError::NoMarkers => "gemm_report::format",
            ReportError::Corrupt { .. } => "gemm_report::corrupt",
            ReportError::RowCountMismatch { .. } => "gemm_report::stale",
            ReportError::ShapeMismatch { .. } => "gemm_report::shape_mismatch",
            ReportError::MissingColumn { .. } => "gemm_report::missing_column",
            ReportError::InvalidNumber { .. } => "gemm_report::invalid_number",
            ReportError::UnknownDataType { .. } => "gemm_report::unknown_dtype",
            ReportError::InvalidLog { .. } => "gemm_report::invalid_log",
            ReportError::Csv(_) => "gemm_report::csv",
            ReportError::Io { .. } => "gemm_report::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            ReportError::NoMarkers | ReportError::Corrupt { .. } => Some(Box::new(
                "delete the report in the working directory to re-run the benchmark",
            )),
            ReportError::ShapeMismatch { .. } => Some(Box::new(
                "the benchmark emitted rows in a different order than the shape log",
            )),
            ReportError::UnknownDataType { .. } => Some(Box::new(
                "known types: bf16_r, f16_r, f32_r, f64_r, f8_r, bf8_r, xf32",
            )),
            _ => None,
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReportError> = core::result::Result<T, E>;
