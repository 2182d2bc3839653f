//! Tuning driver configs: an architecture template with one group's shapes
//! and types filled in.

use crate::error::{Result, TuneError};
use facet_value::{VArray, VObject, Value};
use gemm_report::TuningGroup;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Base tuning config for one architecture.
#[derive(Debug, Clone)]
pub struct TuningTemplate {
    path: PathBuf,
    base: VObject,
}

impl TuningTemplate {
    /// Load `path`. A missing file is [`TuneError::MissingTemplate`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TuneError::MissingTemplate {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| TuneError::io(path, e))?;
        Self::from_yaml_str(path, &text)
    }

    pub fn from_yaml_str(path: &Path, yaml: &str) -> Result<Self> {
        let invalid = |reason: String| TuneError::InvalidTemplate {
            path: path.to_path_buf(),
            reason,
        };
        let value: Value = facet_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?;
        let base = value
            .as_object()
            .cloned()
            .ok_or_else(|| invalid("expected a mapping at the top level".to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            base,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The template with `Sizes`, the three type codes and both transpose
    /// flags set for `group`.
    pub fn render(&self, group: &TuningGroup) -> Result<Value> {
        let types = group.types()?;
        let sizes: VArray = group
            .sizes()
            .into_iter()
            .map(|size| size.into_iter().collect::<VArray>())
            .collect();

        let mut config = self.base.clone();
        config.insert("Sizes", sizes);
        config.insert("DataType", types.data.code());
        config.insert("DestDataType", types.dest.code());
        config.insert("ComputeDataType", types.compute.code());
        config.insert("TRANSA", group.key.trans_a.as_str());
        config.insert("TRANSB", group.key.trans_b.as_str());
        Ok(config.into())
    }
}

/// File name of a group's config, e.g. `config_HHS_NT.yaml`.
pub fn config_file_name(group: &TuningGroup) -> Result<String> {
    Ok(format!("config_{}.yaml", group.name()?))
}

/// Write a rendered config into `dir` and return its path.
pub fn write_config(dir: &Path, group: &TuningGroup, config: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| TuneError::io(dir, e))?;
    let path = dir.join(config_file_name(group)?);
    let yaml = facet_yaml::to_string(config).map_err(|e| TuneError::InvalidTemplate {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&path, yaml).map_err(|e| TuneError::io(&path, e))?;
    debug!(path = %path.display(), sizes = group.sizes().len(), "wrote tuning config");
    Ok(path)
}
