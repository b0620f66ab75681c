//! Typed descriptors of STEP imports referenced by a synthesized script.
//!
//! The synthesizer records one of these per registered STEP item instead of
//! re-parsing the generated text later. The runner leaves the placeholder
//! expression result in place; the pipeline swaps it for the real file
//! contents in a second pass.

use serde::{Deserialize, Serialize};

use crate::scene::{ItemId, StepRotation, StepTranslation};

/// A STEP import captured during synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReference {
    /// Script symbol the import was bound to.
    pub symbol: String,
    /// Registration id of the item that owns the import.
    pub id: ItemId,
    /// File identifier inside the step repository.
    pub guid: String,
    pub rotation: Option<StepRotation>,
    pub translation: Option<StepTranslation>,
}
