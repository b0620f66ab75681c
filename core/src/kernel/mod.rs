//! Kernel abstraction layer for solid-modeling operations.
//!
//! This module provides a trait-based abstraction over the underlying CAD
//! kernel, allowing for swapping implementations without changing the
//! pipeline that consumes it.

pub mod mock;

pub use mock::{MockKernel, MockSolid};

use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point3, Vector3};
use crate::response::MeshPayload;

/// Errors that can occur during kernel operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("Construction failed: {0}")]
    Construction(String),

    #[error("Meshing failed: {0}")]
    Meshing(String),

    #[error("Fillet failed: {0}")]
    Fillet(String),

    #[error("Compound failed: {0}")]
    Compound(String),

    #[error("Reading step file {path} failed: {message}")]
    ExternalFile { path: String, message: String },
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Opaque identity the kernel assigns to a computed shape. Stable across
/// runs iff the shape's construction is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A computed shape held by a kernel.
///
/// Transforms return a new solid rather than mutating in place; only the
/// display name is mutable, since renaming must not change the content hash.
pub trait Solid: Clone + Send + Sync {
    fn content_hash(&self) -> ContentHash;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    fn area(&self) -> f64;

    fn volume(&self) -> f64;

    /// Rotate around an axis through `center` by `angle` degrees.
    fn rotate(&self, center: Point3, axis: Vector3, angle: f64) -> Self;

    fn translate(&self, vector: Vector3) -> Self;
}

/// Abstract interface for CAD kernel operations.
///
/// This trait defines the operations needed by the display pipeline,
/// abstracting over the specific kernel implementation.
pub trait Kernel: Send + Sync {
    /// The kernel's internal solid representation.
    type Solid: Solid;

    /// Handle for an edge of a solid, consumed by fillet selection.
    type Edge;

    /// Evaluate a construction expression into a solid.
    fn solid_from_expression(&self, expression: &str) -> KernelResult<Self::Solid>;

    /// Convert a solid to a renderable triangle mesh.
    fn build_mesh(&self, solid: &Self::Solid) -> KernelResult<MeshPayload>;

    /// Merge several solids into one compound solid.
    fn build_compound(&self, solids: Vec<Self::Solid>) -> KernelResult<Self::Solid>;

    /// All edges of a solid, in kernel order.
    fn solid_edges(&self, solid: &Self::Solid) -> Vec<Self::Edge>;

    /// Round the given edges with the given radius.
    fn make_fillet(
        &self,
        solid: &Self::Solid,
        edges: &[Self::Edge],
        radius: f64,
    ) -> KernelResult<Self::Solid>;

    /// Load every solid stored in an external step file.
    fn read_external_file(
        &self,
        path: &Path,
    ) -> impl Future<Output = KernelResult<Vec<Self::Solid>>> + Send;
}

/// Get the default kernel implementation.
pub fn default_kernel() -> MockKernel {
    MockKernel::new()
}
