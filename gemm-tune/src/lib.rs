//! Benchmark the GEMM shapes an application logged, find the ones that
//! dominate its run time, and hand them to the kernel tuning driver.
//!
//! See [`pipeline::run`] for the sequence of steps, and [`TuneConfig`] for
//! where every artifact lands.

#![forbid(unsafe_code)]

pub mod args;
pub mod config;
mod error;
pub mod pipeline;
pub mod toolchain;
pub mod tuning;

pub use args::Args;
pub use config::TuneConfig;
pub use error::{Result, TuneError};
pub use pipeline::{Outcome, run};
pub use toolchain::{ProcessToolchain, Toolchain};
