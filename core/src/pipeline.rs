//! The full translate-execute-reconcile pipeline.
//!
//! One [`DisplayPipeline::process`] call is one reconciliation pass:
//! synthesize the script, run it, reconcile the records against the caller's
//! previous cache, and when the scene references step files, overlay the
//! step pass on top. The caller owns the cache between passes; the pipeline
//! itself keeps no per-scene state and can serve different scenes
//! concurrently.

use thiserror::Error;

use crate::geometry::Color;
use crate::kernel::{Kernel, KernelError};
use crate::reconcile::{build_response, build_step_response};
use crate::repository::{RepositoryError, StepRepository};
use crate::response::{DisplayCache, DisplayResponse};
use crate::runner::{RunEnv, RunError, ScriptRunner};
use crate::scene::SceneGraph;
use crate::script::synthesize;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Step processing failed: {0}")]
    Step(#[from] KernelError),
}

#[derive(Debug, Clone)]
pub struct DisplayPipeline<K, R> {
    kernel: K,
    runner: R,
    repository: Option<StepRepository>,
}

impl<K, R> DisplayPipeline<K, R>
where
    K: Kernel,
    R: ScriptRunner<K>,
{
    pub fn new(kernel: K, runner: R) -> Self {
        Self {
            kernel,
            runner,
            repository: None,
        }
    }

    /// Use a fixed repository root instead of probing at request time.
    pub fn with_repository(mut self, repository: StepRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Run one reconciliation pass over a scene graph.
    ///
    /// Inline geometry always yields a response, even when individual items
    /// fail. A fatal script error, a missing repository, or a step file
    /// failure aborts the pass instead.
    pub async fn process(
        &self,
        graph: &SceneGraph,
        previous: &DisplayCache,
    ) -> Result<DisplayResponse, PipelineError> {
        let script = synthesize(graph);
        let mut env = RunEnv::new();
        self.runner.run(&self.kernel, &script.source, &mut env)?;
        let RunEnv { mut data, logs } = env;

        let mut response = build_response(&self.kernel, previous, &mut data, logs);
        if script.has_steps() {
            let repository = match &self.repository {
                Some(repository) => repository.clone(),
                None => StepRepository::locate()?,
            };
            // one color per pass, shared by every step import in the batch
            let color: Color = [rand::random(), rand::random(), rand::random()];
            let overlay = build_step_response(
                &self.kernel,
                &repository,
                previous,
                &script.steps,
                &data,
                color,
            )
            .await?;
            response.overlay(overlay);
        }
        Ok(response)
    }
}
