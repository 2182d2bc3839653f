//! Data type tags and the codes the tuning driver expects for them.

use crate::error::{ReportError, Result};
use core::fmt;

/// Prefix marking a compute type tag as canonical, e.g. `c_f32_r`.
pub const COMPUTE_PREFIX: &str = "c_";

/// Element types understood by the tuning driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    BF16,
    F16,
    F32,
    F64,
    F8,
    BF8,
    XF32,
}

impl DataType {
    const TABLE: [(&'static str, DataType); 7] = [
        ("bf16_r", DataType::BF16),
        ("f16_r", DataType::F16),
        ("f32_r", DataType::F32),
        ("f64_r", DataType::F64),
        ("f8_r", DataType::F8),
        ("bf8_r", DataType::BF8),
        ("xf32", DataType::XF32),
    ];

    /// Look up a benchmark type tag such as `f16_r`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::TABLE
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, dt)| *dt)
            .ok_or_else(|| ReportError::UnknownDataType {
                tag: tag.to_string(),
            })
    }

    /// The benchmark's spelling of this type.
    pub fn tag(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, dt)| *dt == self)
            .map(|(t, _)| *t)
            .unwrap_or_default()
    }

    /// The tuning driver's code for this type.
    pub fn code(self) -> &'static str {
        match self {
            DataType::BF16 => "B",
            DataType::F16 => "H",
            DataType::F32 => "S",
            DataType::F64 => "D",
            DataType::F8 => "F8",
            DataType::BF8 => "B8",
            DataType::XF32 => "X",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of canonicalizing a compute type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeTag {
    /// The tag is (now) prefixed with [`COMPUTE_PREFIX`].
    Canonical(String),
    /// The tag has no 32/64-bit width and no prefix; left as given.
    Unrecognized(String),
}

impl ComputeTag {
    pub fn is_canonical(&self) -> bool {
        matches!(self, ComputeTag::Canonical(_))
    }

    /// The tag text, canonical or not.
    pub fn as_str(&self) -> &str {
        match self {
            ComputeTag::Canonical(s) | ComputeTag::Unrecognized(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            ComputeTag::Canonical(s) | ComputeTag::Unrecognized(s) => s,
        }
    }
}

/// Canonicalize a compute type tag: `f32_r` becomes `c_f32_r`, an already
/// prefixed tag is kept, anything without a 32/64 width is unrecognized.
pub fn canonicalize_compute_type(tag: &str) -> ComputeTag {
    if tag.starts_with(COMPUTE_PREFIX) {
        ComputeTag::Canonical(tag.to_string())
    } else if tag.contains("32") || tag.contains("64") {
        ComputeTag::Canonical(format!("{COMPUTE_PREFIX}{tag}"))
    } else {
        ComputeTag::Unrecognized(tag.to_string())
    }
}

/// Drop one leading [`COMPUTE_PREFIX`], if present.
pub fn strip_compute_prefix(tag: &str) -> &str {
    tag.strip_prefix(COMPUTE_PREFIX).unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_codes() {
        assert_eq!(DataType::from_tag("bf16_r").unwrap().code(), "B");
        assert_eq!(DataType::from_tag("f16_r").unwrap().code(), "H");
        assert_eq!(DataType::from_tag("f32_r").unwrap().code(), "S");
        assert_eq!(DataType::from_tag("f64_r").unwrap().code(), "D");
        assert_eq!(DataType::from_tag("f8_r").unwrap().code(), "F8");
        assert_eq!(DataType::from_tag("bf8_r").unwrap().code(), "B8");
        assert_eq!(DataType::from_tag("xf32").unwrap().code(), "X");
        assert!(matches!(
            DataType::from_tag("i8_r"),
            Err(ReportError::UnknownDataType { .. })
        ));
    }

    #[test]
    fn test_tag_roundtrip() {
        for (tag, dt) in DataType::TABLE {
            assert_eq!(dt.tag(), tag);
            assert_eq!(dt.to_string(), tag);
        }
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(
            canonicalize_compute_type("c_f32_r"),
            ComputeTag::Canonical("c_f32_r".into())
        );
        assert_eq!(
            canonicalize_compute_type("f32_r"),
            ComputeTag::Canonical("c_f32_r".into())
        );
        assert_eq!(
            canonicalize_compute_type("f64_r"),
            ComputeTag::Canonical("c_f64_r".into())
        );
        assert_eq!(
            canonicalize_compute_type("xf32"),
            ComputeTag::Canonical("c_xf32".into())
        );
        let unknown = canonicalize_compute_type("f16_r");
        assert!(!unknown.is_canonical());
        assert_eq!(unknown.as_str(), "f16_r");
    }

    #[test]
    fn test_strip_prefix_once() {
        assert_eq!(strip_compute_prefix("c_f32_r"), "f32_r");
        assert_eq!(strip_compute_prefix("f32_r"), "f32_r");
        assert_eq!(strip_compute_prefix("c_c_x"), "c_x");
    }
}
