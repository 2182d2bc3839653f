//! Turn GEMM benchmark output into ranked, grouped shape lists.
//!
//! The flow is:
//!
//! 1. [`ShapeLog`] loads and normalizes the YAML log of GEMM shapes,
//! 2. [`parse_report`] turns the benchmark's raw text into a [`ReportTable`],
//! 3. [`Ranking`] joins call counts with latencies and ranks every shape,
//! 4. [`Ranking::significant`] keeps the shapes worth tuning, and
//!    [`UniqueShapes::groups`] splits them into [`TuningGroup`]s.

#![forbid(unsafe_code)]

mod dtype;
mod error;
mod parser;
mod rank;
mod shape;
mod table;

pub use dtype::{
    COMPUTE_PREFIX, ComputeTag, DataType, canonicalize_compute_type, strip_compute_prefix,
};
pub use error::{ReportError, Result};
pub use parser::{DEVICE_MARKER, parse_report, parse_report_file};
pub use rank::{
    BenchmarkRow, CALL_COUNT_COLUMN, COLUMNS, GroupKey, GroupTypes, LATENCY_COLUMN,
    PERCENT_COLUMN, RankedRow, Ranking, TOTAL_COLUMN, TuningGroup, UniqueShapes, benchmark_rows,
};
pub use shape::{
    COLD_ITERS, GemmShape, ITERS, ROTATING, SOLVER_KEYS, ShapeId, ShapeLog, ShapeRecord,
};
pub use table::ReportTable;
