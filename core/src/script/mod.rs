//! Script synthesis: linearizing the scene graph into a build script.

pub mod naming;
pub mod steps;
pub mod synthesize;

pub use steps::StepReference;
pub use synthesize::{synthesize, SynthesizedScript};
