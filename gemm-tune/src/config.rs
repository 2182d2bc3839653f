//! Run configuration, built once from the command line and read-only after.

use crate::args::Args;
use std::path::{Path, PathBuf};

/// Benchmark binary, relative to the toolkit checkout.
pub const DEFAULT_BENCH_BIN: &str = "build/release/clients/staging/hipblaslt-bench";
/// Tuning driver, relative to the toolkit checkout.
pub const DEFAULT_DRIVER: &str = "utilities/tuning/run_tuning.sh";
/// Name of the file holding the filtered, deduplicated shapes.
pub const UNIQUE_SHAPES_FILE: &str = "unique_gemms.csv";
/// Subdirectory of the working directory receiving tuning configs.
pub const TUNINGS_DIR: &str = "tunings";

#[derive(Debug, Clone, PartialEq)]
pub struct TuneConfig {
    pub toolkit_path: PathBuf,
    pub gemm_log: PathBuf,
    pub device: u32,
    /// Minimum share of total time, in percent, for a shape to be tuned.
    pub threshold: f64,
    pub architecture: String,
    pub workdir: PathBuf,
    pub template_dir: PathBuf,
    pub bench_bin: PathBuf,
    pub driver: PathBuf,
    /// Run the tuning driver on every generated config.
    pub tune: bool,
}

impl TuneConfig {
    /// Config with every optional path derived from `toolkit_path`.
    pub fn new(
        toolkit_path: impl Into<PathBuf>,
        gemm_log: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
    ) -> Self {
        let toolkit_path = toolkit_path.into();
        Self {
            bench_bin: toolkit_path.join(DEFAULT_BENCH_BIN),
            driver: toolkit_path.join(DEFAULT_DRIVER),
            toolkit_path,
            gemm_log: gemm_log.into(),
            device: 0,
            threshold: 0.1,
            architecture: "gfx950".to_string(),
            workdir: workdir.into(),
            template_dir: template_dir.into(),
            tune: true,
        }
    }

    pub fn from_args(args: Args) -> Self {
        let template_dir = args
            .templates
            .map(PathBuf::from)
            .unwrap_or_else(executable_dir);
        let mut config = Self::new(args.toolkit_path, args.gemm_log, args.workdir, template_dir);
        if let Some(bench_bin) = args.bench_bin {
            config.bench_bin = bench_bin.into();
        }
        if let Some(driver) = args.driver {
            config.driver = driver.into();
        }
        config.device = args.device;
        config.threshold = args.thr;
        config.architecture = args.architecture;
        config.tune = !args.no_tune;
        config
    }

    fn log_file_name(&self) -> String {
        self.gemm_log
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gemms".to_string())
    }

    fn log_stem(&self) -> String {
        self.gemm_log
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gemms".to_string())
    }

    /// Where the normalized copy of the shape log is written.
    pub fn normalized_log(&self) -> PathBuf {
        self.workdir.join(self.log_file_name())
    }

    /// Raw benchmark output, e.g. `workdir/gemms.yaml.out`.
    pub fn report_path(&self) -> PathBuf {
        self.workdir.join(format!("{}.out", self.log_file_name()))
    }

    /// Full ranked table, e.g. `workdir/gemms.csv`.
    pub fn ranked_csv_path(&self) -> PathBuf {
        self.workdir.join(format!("{}.csv", self.log_stem()))
    }

    pub fn unique_csv_path(&self) -> PathBuf {
        self.workdir.join(UNIQUE_SHAPES_FILE)
    }

    pub fn tunings_dir(&self) -> PathBuf {
        self.workdir.join(TUNINGS_DIR)
    }

    /// Base tuning config for the target architecture.
    pub fn template_path(&self) -> PathBuf {
        self.template_dir
            .join(format!("config_{}.yaml", self.architecture))
    }
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
