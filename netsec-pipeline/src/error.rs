//! Error types for the netsec-pipeline crate.
//!
//! Every fault, whatever its origin, travels as a single [`PipelineError`]. The
//! envelope owns the original [`Fault`] (whose own `source()` chain is left
//! untouched) and a trail of [`Breadcrumb`]s, one per boundary the fault
//! crossed on its way out of the pipeline.

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

/// The underlying cause of a pipeline failure.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    #[error("Model quality: {0}")]
    ModelQuality(String),
}

impl Fault {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::Numeric(msg.into())
    }

    pub fn invalid_setting(msg: impl Into<String>) -> Self {
        Self::InvalidSetting(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

/// One catch point a fault passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub operation: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.operation, self.file, self.line)
    }
}

/// Uniform failure envelope used at every component boundary.
#[derive(Debug)]
pub struct PipelineError {
    fault: Fault,
    trail: Vec<Breadcrumb>,
}

impl PipelineError {
    /// Wrap a fault, recording the caller as the first catch point.
    #[track_caller]
    pub fn new(fault: impl Into<Fault>, operation: &'static str) -> Self {
        Self {
            fault: fault.into(),
            trail: Vec::new(),
        }
        .annotate(operation)
    }

    /// Push one more breadcrumb; the fault itself is never altered.
    #[track_caller]
    pub fn annotate(mut self, operation: &'static str) -> Self {
        let location = Location::caller();
        self.trail.push(Breadcrumb {
            operation,
            file: location.file(),
            line: location.line(),
        });
        self
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }

    /// Breadcrumbs in the order they were added, innermost first.
    pub fn trail(&self) -> &[Breadcrumb] {
        &self.trail
    }

    pub fn into_fault(self) -> Fault {
        self.fault
    }

    pub fn is_io(&self) -> bool {
        matches!(self.fault, Fault::Io(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fault)?;
        for crumb in &self.trail {
            write!(f, "\n    at {crumb}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.fault)
    }
}

impl From<Fault> for PipelineError {
    fn from(fault: Fault) -> Self {
        Self {
            fault,
            trail: Vec::new(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Fault::from(err).into()
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Fault::from(err).into()
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        Fault::from(err).into()
    }
}

impl From<figment::Error> for PipelineError {
    fn from(err: figment::Error) -> Self {
        Fault::from(Box::new(err)).into()
    }
}

/// Annotate a result with the current boundary.
pub trait ResultExt<T> {
    fn at(self, operation: &'static str) -> Result<T, PipelineError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<PipelineError>,
{
    #[track_caller]
    fn at(self, operation: &'static str) -> Result<T, PipelineError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.into().annotate(operation)),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn inner() -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).at("inner")
    }

    fn outer() -> Result<()> {
        inner().at("outer")
    }

    #[test]
    fn test_trail_is_layered_innermost_first() {
        let err = outer().unwrap_err();
        let ops: Vec<_> = err.trail().iter().map(|c| c.operation).collect();
        assert_eq!(ops, vec!["inner", "outer"]);
        assert!(err.trail().iter().all(|c| c.file.ends_with("error.rs")));
        assert!(err.trail()[0].line != err.trail()[1].line);
    }

    #[test]
    fn test_cause_chain_is_preserved() {
        let err = outer().unwrap_err();
        assert!(err.is_io());
        let fault = err.source().unwrap();
        let io = fault.source().unwrap();
        assert_eq!(io.to_string(), "gone");
        let Fault::Io(original) = err.into_fault() else {
            panic!("expected io fault");
        };
        assert_eq!(original.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_display_lists_breadcrumbs() {
        let err = PipelineError::new(Fault::schema("missing column"), "check").annotate("run");
        let text = err.to_string();
        assert!(text.starts_with("Schema error: missing column"));
        assert!(text.contains("at check ("));
        assert!(text.contains("at run ("));
    }

    #[test]
    fn test_ok_passes_through_untouched() {
        let value: Result<u8> = Ok::<u8, Fault>(7).at("noop");
        assert_eq!(value.unwrap(), 7);
    }
}
