//! Pipeline assembly and the stage driver loop.

use portico_core::{Flow, HandlerError, RegistryError, RequestContext, ServiceRegistry};
use portico_router::{HandlerRef, StageSpec};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while driving a pipeline. Both variants indicate a
/// failed request, to be surfaced through the error-reporting collaborator
/// where one is installed.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage's handler could not be resolved from the registry.
    #[error("cannot resolve stage handler `{handler}`")]
    Resolve {
        /// The handler reference of the failing stage.
        handler: String,
        /// The underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// A stage's handler returned an error.
    #[error("stage handler `{handler}` failed")]
    Stage {
        /// The handler reference of the failing stage.
        handler: String,
        /// The underlying handler error.
        #[source]
        source: HandlerError,
    },
}

/// The outcome of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// How many stages executed, the halting stage included.
    pub executed: usize,
    /// True when a stage halted the pipeline before the end.
    pub halted: bool,
}

/// An ordered sequence of handler stages executed against one request.
///
/// Stages are appended in execution order (global stages, route stages,
/// terminal controller) and cannot be skipped or reordered once the
/// pipeline is assembled. One pipeline is built per request and driven
/// exactly once.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<StageSpec>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn add(&mut self, handler: HandlerRef, data: Value) -> &mut Self {
        self.stages.push(StageSpec::new(handler, data));
        self
    }

    /// Appends a pre-built stage spec (route stages are cloned in whole).
    pub fn add_spec(&mut self, spec: StageSpec) -> &mut Self {
        self.stages.push(spec);
        self
    }

    /// The assembled stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// The number of assembled stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when no stages are assembled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Executes the stages in order against the shared request context.
    ///
    /// Each stage's handler is resolved from `registry` by service name
    /// and invoked with the stage's entry-point name and attached data. A
    /// [`Flow::Halt`] answer ends the run successfully with
    /// [`PipelineReport::halted`] set; context mutations made up to and
    /// including the halting stage are preserved.
    pub fn run(
        &self,
        registry: &ServiceRegistry,
        ctx: &mut RequestContext,
    ) -> Result<PipelineReport, PipelineError> {
        for (index, stage) in self.stages.iter().enumerate() {
            let handler = registry
                .resolve_handler(stage.handler.service())
                .map_err(|source| PipelineError::Resolve {
                    handler: stage.handler.to_string(),
                    source,
                })?;

            debug!(stage = %stage.handler, index, "pipeline stage executing");
            let flow = handler
                .invoke(stage.handler.action(), ctx, &stage.data)
                .map_err(|source| PipelineError::Stage {
                    handler: stage.handler.to_string(),
                    source,
                })?;

            if flow == Flow::Halt {
                debug!(stage = %stage.handler, index, "pipeline halted");
                return Ok(PipelineReport {
                    executed: index + 1,
                    halted: true,
                });
            }
        }

        Ok(PipelineReport {
            executed: self.stages.len(),
            halted: false,
        })
    }
}
