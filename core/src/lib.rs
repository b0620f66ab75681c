pub mod geometry;
pub mod kernel;
pub mod pipeline;
pub mod reconcile;
pub mod repository;
pub mod response;
pub mod runner;
pub mod scene;
pub mod script;

pub fn version() -> &'static str {
    "0.1.0"
}
