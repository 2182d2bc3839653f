//! The two external programs a run depends on.

use crate::config::TuneConfig;
use crate::error::{Result, TuneError};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Runs the benchmark and the tuning driver. Calls block until the tool exits.
pub trait Toolchain {
    /// Benchmark every shape in `log`, leaving the raw output in `report`.
    fn run_benchmark(&mut self, config: &TuneConfig, log: &Path, report: &Path) -> Result<()>;

    /// Tune the kernels described by `tuning_config`, writing into `output_dir`.
    fn run_tuning_driver(
        &mut self,
        config: &TuneConfig,
        tuning_config: &Path,
        output_dir: &Path,
    ) -> Result<()>;
}

/// [`Toolchain`] backed by real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessToolchain;

impl Toolchain for ProcessToolchain {
    fn run_benchmark(&mut self, config: &TuneConfig, log: &Path, report: &Path) -> Result<()> {
        let mut cmd = Command::new(&config.bench_bin);
        cmd.arg("--yaml")
            .arg(log)
            .arg("--device")
            .arg(config.device.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        info!(program = %config.bench_bin.display(), "running benchmark");

        if let Some(parent) = report.parent() {
            fs::create_dir_all(parent).map_err(|e| TuneError::io(parent, e))?;
        }
        let file = File::create(report).map_err(|e| TuneError::io(report, e))?;
        let mut out = BufWriter::new(file);

        let mut child = cmd.spawn().map_err(|source| TuneError::Spawn {
            program: config.bench_bin.clone(),
            source,
        })?;

        let copied = match child.stdout.take() {
            Some(stdout) => tee_lines(stdout, &mut out),
            None => Ok(()),
        }
        .and_then(|()| out.flush());
        if let Err(e) = copied {
            child.kill().ok();
            child.wait().ok();
            return Err(TuneError::io(report, e));
        }

        let status = child.wait().map_err(|source| TuneError::Spawn {
            program: config.bench_bin.clone(),
            source,
        })?;
        if !status.success() {
            return Err(TuneError::ToolFailed {
                program: config.bench_bin.clone(),
                code: status.code(),
            });
        }
        Ok(())
    }

    fn run_tuning_driver(
        &mut self,
        config: &TuneConfig,
        tuning_config: &Path,
        output_dir: &Path,
    ) -> Result<()> {
        info!(
            program = %config.driver.display(),
            config = %tuning_config.display(),
            "running tuning driver"
        );
        let status = Command::new(&config.driver)
            .arg(tuning_config)
            .arg(&config.toolkit_path)
            .arg(output_dir)
            .status()
            .map_err(|source| TuneError::Spawn {
                program: config.driver.clone(),
                source,
            })?;
        if !status.success() {
            return Err(TuneError::ToolFailed {
                program: config.driver.clone(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Copy `input` to `out` byte for byte, logging each line as it passes.
fn tee_lines(input: impl Read, out: &mut impl Write) -> io::Result<()> {
    let mut reader = BufReader::new(input);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        out.write_all(&line)?;
        debug!(target: "bench", line = %String::from_utf8_lossy(&line).trim_end());
    }
}
