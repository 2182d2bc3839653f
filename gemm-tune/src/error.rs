use core::fmt;
use gemm_report::ReportError;
use miette::Diagnostic;
use std::path::PathBuf;

/// Errors surfaced by a tuning run.
#[derive(Debug)]
#[non_exhaustive]
pub enum TuneError {
    /// Parsing, joining or ranking failed.
    Report(ReportError),

    /// No base tuning config exists for the requested architecture.
    MissingTemplate {
        /// Where the template was expected.
        path: PathBuf,
    },

    /// The base tuning config is not a YAML mapping.
    InvalidTemplate {
        /// The template file.
        path: PathBuf,
        /// What exactly was wrong.
        reason: String,
    },

    /// An external tool could not be started.
    Spawn {
        /// The program that was run.
        program: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    ToolFailed {
        /// The program that was run.
        program: PathBuf,
        /// Its exit code, if it exited normally.
        code: Option<i32>,
    },

    /// Reading or writing a file failed.
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl TuneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for TuneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuneError::Report(e) => write!(f, "{e}"),
            TuneError::MissingTemplate { path } => {
                write!(f, "config file not found: {}", path.display())
            }
            TuneError::InvalidTemplate { path, reason } => {
                write!(f, "invalid tuning config {}: {reason}", path.display())
            }
            TuneError::Spawn { program, source } => {
                write!(f, "could not run {}: {source}", program.display())
            }
            TuneError::ToolFailed { program, code } => match code {
                Some(code) => write!(f, "{} exited with code {code}", program.display()),
                None => write!(f, "{} was terminated by a signal", program.display()),
            },
            TuneError::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl core::error::Error for TuneError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            TuneError::Report(e) => Some(e),
            TuneError::Spawn { source, .. } | TuneError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Diagnostic for TuneError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            TuneError::Report(e) => e.code(),
            TuneError::MissingTemplate { .. } => Some(Box::new("gemm_tune::missing_template")),
            TuneError::InvalidTemplate { .. } => Some(Box::new("gemm_tune::invalid_template")),
            TuneError::Spawn { .. } => Some(Box::new("gemm_tune::spawn")),
            TuneError::ToolFailed { .. } => Some(Box::new("gemm_tune::tool_failed")),
            TuneError::Io { .. } => Some(Box::new("gemm_tune::io")),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            TuneError::Report(e) => e.help(),
            TuneError::MissingTemplate { .. } => Some(Box::new(
                "pass --templates <dir> pointing at a directory with config_<arch>.yaml",
            )),
            TuneError::Spawn { .. } => Some(Box::new(
                "check the toolkit path, or pass --bench-bin / --driver explicitly",
            )),
            _ => None,
        }
    }
}

impl From<ReportError> for TuneError {
    fn from(e: ReportError) -> Self {
        Self::Report(e)
    }
}

pub type Result<T, E = TuneError> = core::result::Result<T, E>;
