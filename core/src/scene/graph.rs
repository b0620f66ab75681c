//! Arena of scene items with a stable top-level order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::item::{GeometryItem, ItemId, Parameter};

/// The editable design: items addressed by id, the editor's top-level
/// ordering, and the editor-level parameters.
///
/// Items reachable only through connectors or sub-geometry lists live in
/// the arena without appearing in `order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneGraph {
    pub items: HashMap<ItemId, GeometryItem>,
    pub order: Vec<ItemId>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a top-level item, keeping insertion order.
    pub fn add_item(&mut self, item: GeometryItem) -> ItemId {
        let id = item.id.clone();
        if !self.order.contains(&id) {
            self.order.push(id.clone());
        }
        self.items.insert(id.clone(), item);
        id
    }

    /// Insert an item that is only reachable through links, not listed at
    /// the top level.
    pub fn add_dependency(&mut self, item: GeometryItem) -> ItemId {
        let id = item.id.clone();
        self.items.insert(id.clone(), item);
        id
    }

    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn item(&self, id: &ItemId) -> Option<&GeometryItem> {
        self.items.get(id)
    }

    /// Top-level items in editor order. Ids without a backing item are
    /// skipped.
    pub fn top_level(&self) -> impl Iterator<Item = &GeometryItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// True when exactly one top-level slot carries this id.
    pub fn is_top_level(&self, id: &ItemId) -> bool {
        self.order.iter().filter(|ordered| *ordered == id).count() == 1
    }

    /// Items linked through the connectors of `item`. Dangling links are
    /// skipped.
    pub fn connector_targets(&self, item: &GeometryItem) -> Vec<&GeometryItem> {
        item.connectors
            .iter()
            .filter_map(|connector| connector.linked.as_ref())
            .filter_map(|id| self.items.get(id))
            .collect()
    }
}
