//! Scene graph data model: items, parameters, connector links.

pub mod graph;
pub mod item;

pub use graph::SceneGraph;
pub use item::{
    Connector, GeometryItem, ItemId, ItemKind, Origin, Parameter, StepImport, StepRotation,
    StepTranslation,
};
