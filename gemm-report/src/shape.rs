//! The GEMM shape log: a YAML list of mappings, one per logged GEMM call site.
//!
//! Records are open mappings. Only the fields the pipeline needs are read into
//! a typed [`GemmShape`]; every other key is carried through untouched so the
//! normalized log still drives the benchmark the same way.

use crate::dtype::{ComputeTag, canonicalize_compute_type};
use crate::error::{ReportError, Result};
use crate::table::write_file;
use core::fmt;
use facet_value::{VArray, VObject, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Keys describing a previously selected solution; dropped before benchmarking.
pub const SOLVER_KEYS: [&str; 3] = ["aux_type", "solution_index", "algo_method"];

/// Warm-up iterations run by the benchmark before timing.
pub const COLD_ITERS: u64 = 20;
/// Timed iterations per shape.
pub const ITERS: u64 = 100;
/// Rotating buffer size in MiB, so timings are not served from cache.
pub const ROTATING: u64 = 512;

/// Explicit identity of a shape: its 0-based position in the log.
///
/// The benchmark reports rows in request order, so row `i` of a report
/// belongs to the record with `ShapeId(i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub usize);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The columns that identify a GEMM independently of how often it runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GemmShape {
    pub trans_a: String,
    pub trans_b: String,
    pub batch_count: u64,
    pub m: u64,
    pub n: u64,
    pub k: u64,
    pub a_type: String,
    pub b_type: String,
    pub c_type: String,
    pub d_type: String,
    pub compute_type: String,
}

/// One record of the shape log.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub shape: GemmShape,
    /// How many times the application issued this GEMM.
    pub call_count: u64,
    fields: VObject,
}

impl ShapeRecord {
    fn from_object(id: ShapeId, mut fields: VObject) -> Result<Self> {
        let index = Some(id.0);
        let trans_a = transpose_field(&fields, "transA", index)?;
        let trans_b = transpose_field(&fields, "transB", index)?;
        fields.insert("transA", trans_a.as_str());
        fields.insert("transB", trans_b.as_str());
        let shape = GemmShape {
            trans_a,
            trans_b,
            batch_count: optional_uint_field(&fields, "batch_count", index)?.unwrap_or(1),
            m: uint_field(&fields, "m", index)?,
            n: uint_field(&fields, "n", index)?,
            k: uint_field(&fields, "k", index)?,
            a_type: text_field(&fields, "a_type", index)?,
            b_type: text_field(&fields, "b_type", index)?,
            c_type: text_field(&fields, "c_type", index)?,
            d_type: text_field(&fields, "d_type", index)?,
            compute_type: text_field(&fields, "compute_type", index)?,
        };
        let call_count = match optional_uint_field(&fields, "call_count", index)? {
            Some(count) => count,
            None => {
                debug!(%id, "record has no call_count, counting it once");
                1
            }
        };
        Ok(Self {
            id,
            shape,
            call_count,
            fields,
        })
    }

    /// Raw value of any key of the record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Strip solver metadata, pin the scheduling knobs and canonicalize the
    /// compute type. Returns the compute type outcome.
    pub fn normalize(&mut self) -> ComputeTag {
        for key in SOLVER_KEYS {
            self.fields.remove(key);
        }
        self.fields.insert("cold_iters", COLD_ITERS);
        self.fields.insert("iters", ITERS);
        self.fields.insert("rotating", ROTATING);

        let tag = canonicalize_compute_type(&self.shape.compute_type);
        match &tag {
            ComputeTag::Canonical(canonical) => {
                self.shape.compute_type = canonical.clone();
                self.fields.insert("compute_type", canonical.as_str());
            }
            ComputeTag::Unrecognized(raw) => {
                warn!(id = %self.id, compute_type = %raw, "compute type left as is");
            }
        }
        tag
    }
}

/// The whole shape log, in file order.
#[derive(Debug, Clone, Default)]
pub struct ShapeLog {
    records: Vec<ShapeRecord>,
}

impl ShapeLog {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = facet_yaml::from_str(yaml).map_err(|e| ReportError::InvalidLog {
            index: None,
            reason: e.to_string(),
        })?;
        let items = value.as_array().ok_or_else(|| ReportError::InvalidLog {
            index: None,
            reason: "expected a list of records".to_string(),
        })?;

        let records = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let object = item.as_object().ok_or_else(|| ReportError::InvalidLog {
                    index: Some(idx),
                    reason: "expected a mapping".to_string(),
                })?;
                ShapeRecord::from_object(ShapeId(idx), object.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn records(&self) -> &[ShapeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.records.get(id.0)
    }

    /// Normalize every record, see [`ShapeRecord::normalize`].
    ///
    /// Returns the ids of records whose compute type was not recognized.
    pub fn normalize(&mut self) -> Vec<ShapeId> {
        self.records
            .iter_mut()
            .filter_map(|r| (!r.normalize().is_canonical()).then_some(r.id))
            .collect()
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let items: VArray = self
            .records
            .iter()
            .map(|r| Value::from(r.fields.clone()))
            .collect();
        facet_yaml::to_string(&Value::from(items)).map_err(|e| ReportError::InvalidLog {
            index: None,
            reason: e.to_string(),
        })
    }

    /// Write the log as YAML to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        write_file(path, &yaml)
    }
}

fn missing(key: &str, index: Option<usize>) -> ReportError {
    ReportError::InvalidLog {
        index,
        reason: format!("missing field `{key}`"),
    }
}

fn text_field(fields: &VObject, key: &str, index: Option<usize>) -> Result<String> {
    let value = fields.get(key).ok_or_else(|| missing(key, index))?;
    if let Some(s) = value.as_string() {
        return Ok(s.as_str().to_string());
    }
    if let Some(n) = value.as_number() {
        if let Some(i) = n.to_i64() {
            return Ok(i.to_string());
        }
        return Ok(n.to_f64_lossy().to_string());
    }
    Err(ReportError::InvalidLog {
        index,
        reason: format!("field `{key}` is not text"),
    })
}

/// A transpose flag. YAML 1.1 resolves a bare `N` to `false`, so that reads back as `N`.
fn transpose_field(fields: &VObject, key: &str, index: Option<usize>) -> Result<String> {
    match fields.get(key).and_then(|v| v.as_bool()) {
        Some(false) => Ok("N".to_string()),
        Some(true) => Err(ReportError::InvalidLog {
            index,
            reason: format!("field `{key}` is a boolean, expected N, T or C"),
        }),
        None => text_field(fields, key, index),
    }
}

fn optional_uint_field(fields: &VObject, key: &str, index: Option<usize>) -> Result<Option<u64>> {
    let Some(value) = fields.get(key) else {
        return Ok(None);
    };
    let parsed = value
        .as_number()
        .and_then(|n| n.to_u64())
        .or_else(|| value.as_string().and_then(|s| s.as_str().trim().parse().ok()));
    parsed.map(Some).ok_or_else(|| ReportError::InvalidLog {
        index,
        reason: format!("field `{key}` is not a non-negative integer"),
    })
}

fn uint_field(fields: &VObject, key: &str, index: Option<usize>) -> Result<u64> {
    optional_uint_field(fields, key, index)?.ok_or_else(|| missing(key, index))
}
