//! One tuning run, start to finish.

use crate::config::TuneConfig;
use crate::error::{Result, TuneError};
use crate::toolchain::Toolchain;
use crate::tuning::{TuningTemplate, write_config};
use gemm_report::{Ranking, ShapeLog, parse_report_file};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Records in the shape log.
    pub shapes: usize,
    /// True when the cached report was missing or stale and the benchmark ran.
    pub benchmarked: bool,
    /// Shapes at or above the threshold, after deduplication.
    pub unique_shapes: usize,
    pub ranked_csv: PathBuf,
    pub unique_csv: PathBuf,
    /// One tuning config per group, in group order.
    pub tuning_configs: Vec<PathBuf>,
}

/// Run the whole workflow described by `config`.
pub fn run(config: &TuneConfig, toolchain: &mut dyn Toolchain) -> Result<Outcome> {
    fs::create_dir_all(&config.workdir).map_err(|e| TuneError::io(&config.workdir, e))?;

    info!("Working on {}", config.gemm_log.display());
    let mut log = ShapeLog::load(&config.gemm_log)?;
    let unrecognized = log.normalize();
    if !unrecognized.is_empty() {
        warn!(
            count = unrecognized.len(),
            "some compute types have no 32/64-bit width and were left as is"
        );
    }
    let normalized_log = config.normalized_log();
    log.write(&normalized_log)?;

    let report_path = config.report_path();
    let (ranking, benchmarked) = match cached_ranking(&report_path, &log) {
        Some(ranking) => {
            info!("Reusing benchmark output in {}", report_path.display());
            (ranking, false)
        }
        None => {
            info!(
                "Running benchmark, output will be saved in {}",
                report_path.display()
            );
            toolchain.run_benchmark(config, &normalized_log, &report_path)?;
            let report = parse_report_file(&report_path, None)?;
            (Ranking::build(&log, report)?, true)
        }
    };

    let ranked_csv = config.ranked_csv_path();
    info!("Saving csv to... {}", ranked_csv.display());
    ranking.to_table()?.write_csv_file(&ranked_csv)?;

    let unique = ranking.significant(config.threshold);
    let unique_csv = config.unique_csv_path();
    unique.to_table()?.write_csv_file(&unique_csv)?;
    info!(
        unique = unique.len(),
        threshold = config.threshold,
        "filtered significant shapes"
    );

    let groups = unique.groups();
    let mut tuning_configs = Vec::with_capacity(groups.len());
    if !groups.is_empty() {
        info!("Generating kernel optimization configs...");
        let template = TuningTemplate::load(&config.template_path())?;
        let tunings_dir = config.tunings_dir();

        for group in &groups {
            let rendered = template.render(group)?;
            let path = write_config(&tunings_dir, group, &rendered)?;
            info!("config saved in : {}", path.display());
            if config.tune {
                toolchain.run_tuning_driver(config, &path, &tunings_dir)?;
            }
            tuning_configs.push(path);
        }
    }

    Ok(Outcome {
        shapes: log.len(),
        benchmarked,
        unique_shapes: unique.len(),
        ranked_csv,
        unique_csv,
        tuning_configs,
    })
}

/// The ranking built from the report cached at `path`, if that report exists,
/// parses and lines up with every record of `log`.
fn cached_ranking(path: &Path, log: &ShapeLog) -> Option<Ranking> {
    if !path.is_file() {
        return None;
    }
    match parse_report_file(path, None).and_then(|report| Ranking::build(log, report)) {
        Ok(ranking) => Some(ranking),
        Err(e) if e.is_stale_report() => {
            warn!(error = %e, "cached benchmark output is stale, running again");
            None
        }
        Err(e) => {
            warn!(error = %e, "cached benchmark output is unusable, running again");
            None
        }
    }
}
