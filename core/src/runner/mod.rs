//! Execution contract for synthesized scripts.
//!
//! A [`ScriptRunner`] evaluates a script against a kernel and registers
//! results through the three callbacks of a [`RunEnv`]: `display`,
//! `display_fillet`, and `report_error`. The environment owns the raw
//! per-shape records the reconciler consumes afterwards.

pub mod mock;

pub use mock::MockRunner;

use thiserror::Error;

use crate::kernel::{Kernel, KernelResult};
use crate::scene::ItemId;

/// Fatal script failures. Per-item evaluation errors never surface here;
/// they are reported through [`RunEnv::report_error`] instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RunError {
    #[error("Script error at line {line}: {message}")]
    Script { line: usize, message: String },
}

/// What one registration produced: a solid, or the error that replaced it.
#[derive(Debug, Clone)]
pub enum ShapeOutcome<S> {
    Built(S),
    Failed(String),
}

/// One raw result, keyed by the id supplied at registration time.
#[derive(Debug, Clone)]
pub struct ShapeRecord<S> {
    pub id: ItemId,
    pub outcome: ShapeOutcome<S>,
}

impl<S> ShapeRecord<S> {
    pub fn built(id: impl Into<ItemId>, solid: S) -> Self {
        Self {
            id: id.into(),
            outcome: ShapeOutcome::Built(solid),
        }
    }

    pub fn failed(id: impl Into<ItemId>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: ShapeOutcome::Failed(message.into()),
        }
    }

    pub fn solid(&self) -> Option<&S> {
        match &self.outcome {
            ShapeOutcome::Built(solid) => Some(solid),
            ShapeOutcome::Failed(_) => None,
        }
    }

    pub fn solid_mut(&mut self) -> Option<&mut S> {
        match &mut self.outcome {
            ShapeOutcome::Built(solid) => Some(solid),
            ShapeOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ShapeOutcome::Built(_) => None,
            ShapeOutcome::Failed(message) => Some(message),
        }
    }
}

/// Registration callbacks and their collected output.
///
/// Registration ids come from the synthesizer and are never empty; the
/// callbacks assert on that.
#[derive(Debug, Default)]
pub struct RunEnv<S> {
    pub data: Vec<ShapeRecord<S>>,
    pub logs: Vec<String>,
}

impl<S> RunEnv<S> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// Register a built solid under a registration id.
    pub fn display(&mut self, solid: S, id: &str) {
        assert!(!id.is_empty(), "registration id must not be empty");
        self.data.push(ShapeRecord::built(id, solid));
    }

    /// Fillet all edges of the solid, then register the result. The factor
    /// is a tenth-of-radius convention carried by the script format.
    pub fn display_fillet<K>(
        &mut self,
        kernel: &K,
        solid: K::Solid,
        id: &str,
        factor: f64,
    ) -> KernelResult<()>
    where
        K: Kernel<Solid = S>,
    {
        assert!(!id.is_empty(), "registration id must not be empty");
        let edges = kernel.solid_edges(&solid);
        let filleted = kernel.make_fillet(&solid, &edges, factor / 10.0)?;
        self.data.push(ShapeRecord::built(id, filleted));
        Ok(())
    }

    /// Register a per-item evaluation failure under a registration id.
    pub fn report_error(&mut self, id: &str, message: &str) {
        assert!(!id.is_empty(), "registration id must not be empty");
        self.data.push(ShapeRecord::failed(id, message));
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(message.into());
    }
}

/// Evaluates a synthesized script against a kernel.
pub trait ScriptRunner<K: Kernel> {
    fn run(&self, kernel: &K, source: &str, env: &mut RunEnv<K::Solid>) -> Result<(), RunError>;
}
