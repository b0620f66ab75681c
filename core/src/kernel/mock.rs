//! Expression-recording kernel used by the pipeline tests and as the default
//! backend until a real kernel is wired in.
//!
//! A [`MockSolid`] keeps the construction expression it was built from and
//! hashes it into a stable content hash, so two runs over an unchanged scene
//! produce identical hashes and exercise the reuse path for real. Failure
//! injection is marker-based: any expression or solid name containing a
//! registered marker fails the corresponding operation.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use uuid::Uuid;

use crate::geometry::{Point3, Vector3};
use crate::kernel::{ContentHash, Kernel, KernelError, KernelResult, Solid};
use crate::response::MeshPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct MockSolid {
    expression: String,
    hash: ContentHash,
    name: String,
}

impl MockSolid {
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let hash = hash_expression(&expression);
        Self {
            expression,
            hash,
            name: String::new(),
        }
    }

    /// A new solid derived from this one, rehashed for the new expression.
    fn derived(&self, expression: String) -> Self {
        let hash = hash_expression(&expression);
        Self {
            expression,
            hash,
            name: self.name.clone(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

fn hash_expression(expression: &str) -> ContentHash {
    ContentHash::new(Uuid::new_v5(&Uuid::NAMESPACE_OID, expression.as_bytes()).to_string())
}

impl Solid for MockSolid {
    fn content_hash(&self) -> ContentHash {
        self.hash.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn area(&self) -> f64 {
        self.expression.len() as f64
    }

    fn volume(&self) -> f64 {
        self.expression.len() as f64 / 2.0
    }

    fn rotate(&self, center: Point3, axis: Vector3, angle: f64) -> Self {
        self.derived(format!(
            "{}.rotate([{},{},{}],[{},{},{}],{})",
            self.expression, center.x, center.y, center.z, axis.x, axis.y, axis.z, angle
        ))
    }

    fn translate(&self, vector: Vector3) -> Self {
        self.derived(format!(
            "{}.translate([{},{},{}])",
            self.expression, vector.x, vector.y, vector.z
        ))
    }
}

/// A kernel that records expressions instead of evaluating them.
#[derive(Debug, Clone, Default)]
pub struct MockKernel {
    fail_constructions: HashSet<String>,
    fail_meshing: HashSet<String>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every construction whose expression contains `marker`.
    pub fn fail_construction(mut self, marker: impl Into<String>) -> Self {
        self.fail_constructions.insert(marker.into());
        self
    }

    /// Fail meshing of every solid whose name or expression contains `marker`.
    pub fn fail_meshing(mut self, marker: impl Into<String>) -> Self {
        self.fail_meshing.insert(marker.into());
        self
    }
}

impl Kernel for MockKernel {
    type Solid = MockSolid;
    type Edge = u32;

    fn solid_from_expression(&self, expression: &str) -> KernelResult<MockSolid> {
        if self
            .fail_constructions
            .iter()
            .any(|marker| expression.contains(marker))
        {
            return Err(KernelError::Construction(format!(
                "cannot evaluate {}",
                expression
            )));
        }
        Ok(MockSolid::new(expression))
    }

    fn build_mesh(&self, solid: &MockSolid) -> KernelResult<MeshPayload> {
        if self
            .fail_meshing
            .iter()
            .any(|marker| solid.name.contains(marker) || solid.expression.contains(marker))
        {
            return Err(KernelError::Meshing(format!(
                "cannot mesh {}",
                solid.expression
            )));
        }
        Ok(MeshPayload {
            uuid: solid.content_hash(),
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            triangles: vec![0, 1, 2],
            edge_indices: vec![0, 1, 1, 2, 2, 0],
            color: None,
        })
    }

    fn build_compound(&self, solids: Vec<MockSolid>) -> KernelResult<MockSolid> {
        if solids.is_empty() {
            return Err(KernelError::Compound("no solids to merge".to_string()));
        }
        let expressions: Vec<&str> = solids.iter().map(|solid| solid.expression()).collect();
        Ok(MockSolid::new(format!("compound({})", expressions.join(","))))
    }

    fn solid_edges(&self, _solid: &MockSolid) -> Vec<u32> {
        vec![0, 1, 2]
    }

    fn make_fillet(
        &self,
        solid: &MockSolid,
        edges: &[u32],
        radius: f64,
    ) -> KernelResult<MockSolid> {
        if edges.is_empty() {
            return Err(KernelError::Fillet("no edges selected".to_string()));
        }
        Ok(solid.derived(format!("{}.fillet({},{})", solid.expression, edges.len(), radius)))
    }

    fn read_external_file(
        &self,
        path: &Path,
    ) -> impl Future<Output = KernelResult<Vec<MockSolid>>> + Send {
        let result = read_expressions(path);
        async move { result }
    }
}

/// One solid per non-empty line of the file.
fn read_expressions(path: &Path) -> KernelResult<Vec<MockSolid>> {
    let text = std::fs::read_to_string(path).map_err(|err| KernelError::ExternalFile {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    let solids: Vec<MockSolid> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(MockSolid::new)
        .collect();
    if solids.is_empty() {
        return Err(KernelError::ExternalFile {
            path: path.display().to_string(),
            message: "file holds no solids".to_string(),
        });
    }
    Ok(solids)
}
