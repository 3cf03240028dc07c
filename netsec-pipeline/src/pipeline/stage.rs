//! The contract every stage executor follows.

use tracing::Span;

use crate::error::Result;
use crate::pipeline::artifact::Artifact;

/// One unit of the pipeline.
///
/// An executor is built from its configuration and a reference to the artifact
/// it consumes, then `initiate` consumes the executor and yields the next
/// artifact. `span` is the logging handle for the stage; executors record
/// their events inside it.
pub trait Stage {
    type Artifact: Artifact;

    /// Short name used in log fields and state transitions.
    const NAME: &'static str;

    fn initiate(self, span: &Span) -> Result<Self::Artifact>;
}
