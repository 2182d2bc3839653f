//! Join call counts with measured latencies, rank shapes by their share of
//! total time, and group the significant ones for tuning.

use crate::dtype::{DataType, strip_compute_prefix};
use crate::error::{ReportError, Result};
use crate::shape::{GemmShape, ShapeId, ShapeLog};
use crate::table::ReportTable;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Columns identifying a shape, in the order they are written.
pub const COLUMNS: [&str; 11] = [
    "transA",
    "transB",
    "batch_count",
    "m",
    "n",
    "k",
    "a_type",
    "b_type",
    "c_type",
    "d_type",
    "compute_type",
];

/// Measured latency column, in microseconds.
pub const LATENCY_COLUMN: &str = "us";
pub const CALL_COUNT_COLUMN: &str = "call_count";
pub const TOTAL_COLUMN: &str = "total (us)";
pub const PERCENT_COLUMN: &str = "% of total";

/// Typed view of one report row.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRow {
    pub id: ShapeId,
    pub shape: GemmShape,
    pub us: f64,
}

/// Read the fixed schema out of a parsed report. Row `i` gets `ShapeId(i)`.
pub fn benchmark_rows(table: &ReportTable) -> Result<Vec<BenchmarkRow>> {
    let col = |name: &str| table.require_column(name);
    let [ta, tb, batch, m, n, k, a, b, c, d, compute] = [
        col(COLUMNS[0])?,
        col(COLUMNS[1])?,
        col(COLUMNS[2])?,
        col(COLUMNS[3])?,
        col(COLUMNS[4])?,
        col(COLUMNS[5])?,
        col(COLUMNS[6])?,
        col(COLUMNS[7])?,
        col(COLUMNS[8])?,
        col(COLUMNS[9])?,
        col(COLUMNS[10])?,
    ];
    let us = col(LATENCY_COLUMN)?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| -> Result<BenchmarkRow> {
            let uint = |i: usize| parse_cell::<u64>(table, row, i);
            Ok(BenchmarkRow {
                id: ShapeId(idx),
                shape: GemmShape {
                    trans_a: row[ta].clone(),
                    trans_b: row[tb].clone(),
                    batch_count: uint(batch)?,
                    m: uint(m)?,
                    n: uint(n)?,
                    k: uint(k)?,
                    a_type: row[a].clone(),
                    b_type: row[b].clone(),
                    c_type: row[c].clone(),
                    d_type: row[d].clone(),
                    compute_type: row[compute].clone(),
                },
                us: parse_cell::<f64>(table, row, us)?,
            })
        })
        .collect()
}

fn parse_cell<T: core::str::FromStr>(table: &ReportTable, row: &[String], idx: usize) -> Result<T> {
    row[idx]
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidNumber {
            column: table.header()[idx].clone(),
            value: row[idx].clone(),
        })
}

/// A report row weighted by how often the shape is called.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub id: ShapeId,
    pub shape: GemmShape,
    pub us: f64,
    pub call_count: u64,
    /// `call_count * us`
    pub total_us: f64,
    /// Share of the summed `total_us` of all rows, in percent.
    pub percent: f64,
}

/// Every report row, ranked, together with the report it came from.
#[derive(Debug, Clone)]
pub struct Ranking {
    report: ReportTable,
    rows: Vec<RankedRow>,
}

impl Ranking {
    /// Join `log` and `report` by [`ShapeId`] and compute each row's share.
    ///
    /// Fails with [`ReportError::RowCountMismatch`] when the two disagree in
    /// length, and with [`ReportError::ShapeMismatch`] when a row's
    /// dimensions or transpose flags differ from the record it is joined to.
    pub fn build(log: &ShapeLog, report: ReportTable) -> Result<Self> {
        if report.len() != log.len() {
            return Err(ReportError::RowCountMismatch {
                expected: log.len(),
                found: report.len(),
            });
        }

        let measured = benchmark_rows(&report)?;
        let mut rows = Vec::with_capacity(measured.len());
        for row in measured {
            let record = log.get(row.id).ok_or(ReportError::RowCountMismatch {
                expected: log.len(),
                found: report.len(),
            })?;
            verify_alignment(row.id, &record.shape, &row.shape)?;

            let total_us = record.call_count as f64 * row.us;
            rows.push(RankedRow {
                id: row.id,
                shape: row.shape,
                us: row.us,
                call_count: record.call_count,
                total_us,
                percent: 0.0,
            });
        }

        let grand_total: f64 = rows.iter().map(|r| r.total_us).sum();
        if grand_total > 0.0 {
            for row in &mut rows {
                row.percent = 100.0 * row.total_us / grand_total;
            }
        }
        debug!(rows = rows.len(), grand_total, "ranked report");

        Ok(Self { report, rows })
    }

    /// Rows in report order.
    pub fn rows(&self) -> &[RankedRow] {
        &self.rows
    }

    /// Sum of every row's `total_us`.
    pub fn grand_total_us(&self) -> f64 {
        self.rows.iter().map(|r| r.total_us).sum()
    }

    /// Rows ordered by `total_us`, largest first. Ties keep report order.
    pub fn by_total_desc(&self) -> Vec<&RankedRow> {
        let mut sorted: Vec<&RankedRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| b.total_us.total_cmp(&a.total_us));
        sorted
    }

    /// All report columns plus call count, total and percentage, sorted by
    /// total time descending.
    pub fn to_table(&self) -> Result<ReportTable> {
        let mut header = self.report.header().to_vec();
        header.extend(
            [CALL_COUNT_COLUMN, TOTAL_COLUMN, PERCENT_COLUMN]
                .iter()
                .map(|s| s.to_string()),
        );

        let rows = self
            .by_total_desc()
            .into_iter()
            .map(|ranked| {
                let mut row = self.report.rows()[ranked.id.0].clone();
                row.push(ranked.call_count.to_string());
                row.push(ranked.total_us.to_string());
                row.push(ranked.percent.to_string());
                row
            })
            .collect();

        ReportTable::new(header, rows)
    }

    /// Shapes whose share is at least `threshold` percent, deduplicated.
    pub fn significant(&self, threshold: f64) -> UniqueShapes {
        UniqueShapes::new(
            self.rows
                .iter()
                .filter(|r| r.percent >= threshold)
                .map(|r| r.shape.clone()),
        )
    }
}

fn verify_alignment(id: ShapeId, logged: &GemmShape, reported: &GemmShape) -> Result<()> {
    let checks: [(&'static str, String, String); 6] = [
        ("transA", logged.trans_a.clone(), reported.trans_a.clone()),
        ("transB", logged.trans_b.clone(), reported.trans_b.clone()),
        (
            "batch_count",
            logged.batch_count.to_string(),
            reported.batch_count.to_string(),
        ),
        ("m", logged.m.to_string(), reported.m.to_string()),
        ("n", logged.n.to_string(), reported.n.to_string()),
        ("k", logged.k.to_string(), reported.k.to_string()),
    ];
    for (column, expected, found) in checks {
        if expected != found {
            return Err(ReportError::ShapeMismatch {
                shape_id: id.0,
                column,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Distinct shapes in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniqueShapes {
    shapes: Vec<GemmShape>,
}

impl UniqueShapes {
    /// Drop exact duplicates, keeping the first occurrence.
    pub fn new(shapes: impl IntoIterator<Item = GemmShape>) -> Self {
        let mut seen = HashSet::new();
        let shapes = shapes
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self { shapes }
    }

    pub fn shapes(&self) -> &[GemmShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// The shapes as a table with [`COLUMNS`] as header.
    pub fn to_table(&self) -> Result<ReportTable> {
        let header = COLUMNS.iter().map(|s| s.to_string()).collect();
        let rows = self
            .shapes
            .iter()
            .map(|s| {
                vec![
                    s.trans_a.clone(),
                    s.trans_b.clone(),
                    s.batch_count.to_string(),
                    s.m.to_string(),
                    s.n.to_string(),
                    s.k.to_string(),
                    s.a_type.clone(),
                    s.b_type.clone(),
                    s.c_type.clone(),
                    s.d_type.clone(),
                    s.compute_type.clone(),
                ]
            })
            .collect();
        ReportTable::new(header, rows)
    }

    /// Split into tuning groups, ordered by group key.
    pub fn groups(&self) -> Vec<TuningGroup> {
        let mut by_key: BTreeMap<GroupKey, Vec<GemmShape>> = BTreeMap::new();
        for shape in &self.shapes {
            by_key
                .entry(GroupKey::of(shape))
                .or_default()
                .push(shape.clone());
        }
        by_key
            .into_iter()
            .map(|(key, shapes)| TuningGroup { key, shapes })
            .collect()
    }
}

/// Shapes that can be tuned together share these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub trans_a: String,
    pub trans_b: String,
    pub a_type: String,
    pub c_type: String,
    pub compute_type: String,
}

impl GroupKey {
    pub fn of(shape: &GemmShape) -> Self {
        Self {
            trans_a: shape.trans_a.clone(),
            trans_b: shape.trans_b.clone(),
            a_type: shape.a_type.clone(),
            c_type: shape.c_type.clone(),
            compute_type: shape.compute_type.clone(),
        }
    }
}

/// Driver type codes of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTypes {
    pub data: DataType,
    pub dest: DataType,
    pub compute: DataType,
}

/// A group of shapes handed to one tuning driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningGroup {
    pub key: GroupKey,
    /// Member shapes, in unique-shape order.
    pub shapes: Vec<GemmShape>,
}

impl TuningGroup {
    /// Distinct `[m, n, batch_count, k]` tuples, first-seen order.
    pub fn sizes(&self) -> Vec<[u64; 4]> {
        let mut seen = HashSet::new();
        self.shapes
            .iter()
            .map(|s| [s.m, s.n, s.batch_count, s.k])
            .filter(|size| seen.insert(*size))
            .collect()
    }

    pub fn types(&self) -> Result<GroupTypes> {
        Ok(GroupTypes {
            data: DataType::from_tag(&self.key.a_type)?,
            dest: DataType::from_tag(&self.key.c_type)?,
            compute: DataType::from_tag(strip_compute_prefix(&self.key.compute_type))?,
        })
    }

    /// `<A><C><Compute>_<transA><transB>`, e.g. `HHS_NT`.
    pub fn name(&self) -> Result<String> {
        let types = self.types()?;
        Ok(format!(
            "{}{}{}_{}{}",
            types.data.code(),
            types.dest.code(),
            types.compute.code(),
            self.key.trans_a,
            self.key.trans_b
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DEVICE_MARKER, parse_report};
    use facet_testhelpers::test;

    const HEADER: &str =
        "transA,transB,grouped_gemm,batch_count,m,n,k,a_type,b_type,c_type,d_type,compute_type,hipblaslt-Gflops,us";

    fn record(ta: &str, tb: &str, m: u64, n: u64, k: u64, ty: &str, calls: u64) -> String {
        format!(
            "- {{transA: {ta}, transB: {tb}, batch_count: 1, m: {m}, n: {n}, k: {k}, a_type: {ty}, b_type: {ty}, c_type: {ty}, d_type: {ty}, compute_type: c_f32_r, call_count: {calls}}}\n"
        )
    }

    fn report_line(ta: &str, tb: &str, m: u64, n: u64, k: u64, ty: &str, us: f64) -> String {
        format!(
            "{DEVICE_MARKER}{HEADER}\n{ta},{tb},0,1,{m},{n},{k},{ty},{ty},{ty},{ty},c_f32_r,100.5,{us}\n"
        )
    }

    fn fixture(entries: &[(&str, &str, u64, u64, u64, &str, u64, f64)]) -> (ShapeLog, ReportTable) {
        let mut yaml = String::new();
        let mut text = String::new();
        for &(ta, tb, m, n, k, ty, calls, us) in entries {
            yaml.push_str(&record(ta, tb, m, n, k, ty, calls));
            text.push_str(&report_line(ta, tb, m, n, k, ty, us));
        }
        (
            ShapeLog::from_yaml_str(&yaml).unwrap(),
            parse_report(&text).unwrap(),
        )
    }

    #[test]
    fn test_two_rows_tie() {
        let (log, report) = fixture(&[
            ("N", "T", 128, 128, 128, "f16_r", 2, 5.0),
            ("N", "T", 256, 256, 256, "f16_r", 1, 10.0),
        ]);
        let ranking = Ranking::build(&log, report).unwrap();

        let totals: Vec<f64> = ranking.rows().iter().map(|r| r.total_us).collect();
        assert_eq!(totals, [10.0, 10.0]);
        let percents: Vec<f64> = ranking.rows().iter().map(|r| r.percent).collect();
        assert_eq!(percents, [50.0, 50.0]);

        // stable on ties
        let order: Vec<ShapeId> = ranking.by_total_desc().iter().map(|r| r.id).collect();
        assert_eq!(order, [ShapeId(0), ShapeId(1)]);

        assert_eq!(ranking.significant(0.1).len(), 2);
    }

    #[test]
    fn test_percent_sums_to_100() {
        let (log, report) = fixture(&[
            ("N", "N", 1, 2, 3, "f16_r", 3, 1.25),
            ("N", "T", 4, 5, 6, "f16_r", 17, 0.3),
            ("T", "N", 7, 8, 9, "bf16_r", 1, 1000.0),
            ("T", "T", 10, 11, 12, "f32_r", 250, 7.77),
        ]);
        let ranking = Ranking::build(&log, report).unwrap();
        let sum: f64 = ranking.rows().iter().map(|r| r.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_zero_total_gives_zero_percent() {
        let (log, report) = fixture(&[("N", "N", 1, 1, 1, "f16_r", 0, 5.0)]);
        let ranking = Ranking::build(&log, report).unwrap();
        assert_eq!(ranking.rows()[0].percent, 0.0);
    }

    #[test]
    fn test_ranked_table_sorted_desc_with_extra_columns() {
        let (log, report) = fixture(&[
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
            ("N", "N", 2, 2, 2, "f16_r", 1, 3.0),
            ("N", "N", 3, 3, 3, "f16_r", 1, 2.0),
        ]);
        let table = Ranking::build(&log, report).unwrap().to_table().unwrap();

        let header = table.header();
        assert_eq!(&header[header.len() - 3..], [CALL_COUNT_COLUMN, TOTAL_COLUMN, PERCENT_COLUMN]);
        let m = table.column("m").unwrap();
        let ms: Vec<&str> = table.rows().iter().map(|r| r[m].as_str()).collect();
        assert_eq!(ms, ["2", "3", "1"]);
        let total = table.column(TOTAL_COLUMN).unwrap();
        assert_eq!(table.rows()[0][total], "3");
    }

    #[test]
    fn test_row_count_mismatch() {
        let (log, _) = fixture(&[("N", "N", 1, 1, 1, "f16_r", 1, 1.0)]);
        let (_, report) = fixture(&[
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
            ("N", "N", 2, 2, 2, "f16_r", 1, 1.0),
        ]);
        let err = Ranking::build(&log, report).unwrap_err();
        assert!(matches!(
            err,
            ReportError::RowCountMismatch {
                expected: 1,
                found: 2
            }
        ));
        assert!(err.is_stale_report());
    }

    #[test]
    fn test_reordered_report_is_rejected() {
        let (log, _) = fixture(&[
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
            ("N", "N", 2, 2, 2, "f16_r", 1, 1.0),
        ]);
        let (_, swapped) = fixture(&[
            ("N", "N", 2, 2, 2, "f16_r", 1, 1.0),
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
        ]);
        let err = Ranking::build(&log, swapped).unwrap_err();
        assert!(
            matches!(err, ReportError::ShapeMismatch { shape_id: 0, column: "m", .. }),
            "{err}"
        );
        assert!(err.is_stale_report());
    }

    #[test]
    fn test_missing_latency_column() {
        let (log, _) = fixture(&[("N", "N", 1, 1, 1, "f16_r", 1, 1.0)]);
        let text = format!("{DEVICE_MARKER}transA,transB\nN,N\n");
        let err = Ranking::build(&log, parse_report(&text).unwrap()).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { .. }));
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let (log, report) = fixture(&[
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
            ("N", "N", 2, 2, 2, "f16_r", 1, 9.0),
            ("N", "N", 3, 3, 3, "f16_r", 1, 40.0),
            ("N", "N", 4, 4, 4, "f16_r", 1, 50.0),
        ]);
        let ranking = Ranking::build(&log, report).unwrap();
        let mut previous = usize::MAX;
        for thr in [0.0, 0.1, 1.0, 5.0, 9.0, 10.0, 45.0, 50.0, 60.0] {
            let count = ranking.significant(thr).len();
            assert!(count <= previous, "threshold {thr} grew the set");
            previous = count;
        }
        assert_eq!(ranking.significant(9.0).len(), 3);
        assert_eq!(ranking.significant(60.0).len(), 0);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let (log, report) = fixture(&[
            ("N", "N", 1, 1, 1, "f16_r", 1, 1.0),
            ("N", "N", 1, 1, 1, "f16_r", 2, 1.0),
            ("N", "N", 2, 2, 2, "f16_r", 1, 1.0),
        ]);
        let once = Ranking::build(&log, report).unwrap().significant(0.0);
        assert_eq!(once.len(), 2);
        let twice = UniqueShapes::new(once.shapes().iter().cloned());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_unique_table_columns() {
        let (log, report) = fixture(&[("T", "N", 8, 16, 32, "bf16_r", 1, 1.0)]);
        let table = Ranking::build(&log, report)
            .unwrap()
            .significant(0.0)
            .to_table()
            .unwrap();
        assert_eq!(table.header(), COLUMNS);
        assert_eq!(
            table.rows()[0],
            ["T", "N", "1", "8", "16", "32", "bf16_r", "bf16_r", "bf16_r", "bf16_r", "c_f32_r"]
        );
    }

    #[test]
    fn test_groups_are_complete_and_disjoint() {
        let (log, report) = fixture(&[
            ("N", "T", 1, 1, 1, "f16_r", 1, 1.0),
            ("T", "N", 2, 2, 2, "f16_r", 1, 1.0),
            ("N", "T", 3, 3, 3, "f16_r", 1, 1.0),
            ("N", "T", 4, 4, 4, "bf16_r", 1, 1.0),
            ("N", "T", 5, 5, 5, "f16_r", 1, 1.0),
        ]);
        let unique = Ranking::build(&log, report).unwrap().significant(0.0);
        let groups = unique.groups();
        assert_eq!(groups.len(), 3);

        let members: usize = groups.iter().map(|g| g.shapes.len()).sum();
        assert_eq!(members, unique.len());
        for shape in unique.shapes() {
            let owners = groups.iter().filter(|g| g.shapes.contains(shape)).count();
            assert_eq!(owners, 1);
        }

        let nt_half = groups
            .iter()
            .find(|g| g.key.trans_a == "N" && g.key.a_type == "f16_r")
            .unwrap();
        assert_eq!(nt_half.sizes(), [[1, 1, 1, 1], [3, 3, 1, 3], [5, 5, 1, 5]]);
        assert_eq!(nt_half.name().unwrap(), "HHS_NT");
    }

    #[test]
    fn test_group_sizes_dedupe_across_b_type() {
        let base = GemmShape {
            trans_a: "N".into(),
            trans_b: "N".into(),
            batch_count: 2,
            m: 64,
            n: 32,
            k: 16,
            a_type: "f8_r".into(),
            b_type: "f8_r".into(),
            c_type: "f16_r".into(),
            d_type: "f16_r".into(),
            compute_type: "c_f32_r".into(),
        };
        let other_b = GemmShape {
            b_type: "bf8_r".into(),
            ..base.clone()
        };
        let groups = UniqueShapes::new([base, other_b]).groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].shapes.len(), 2);
        assert_eq!(groups[0].sizes(), [[64, 32, 2, 16]]);
        assert_eq!(groups[0].name().unwrap(), "F8HS_NN");
    }

    #[test]
    fn test_group_name_unknown_type() {
        let group = TuningGroup {
            key: GroupKey {
                trans_a: "N".into(),
                trans_b: "N".into(),
                a_type: "i8_r".into(),
                c_type: "f16_r".into(),
                compute_type: "c_f32_r".into(),
            },
            shapes: vec![],
        };
        assert!(matches!(
            group.name(),
            Err(ReportError::UnknownDataType { .. })
        ));
    }
}
