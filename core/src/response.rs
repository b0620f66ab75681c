//! Wire types for the display pipeline's outward-facing response.
//!
//! The response is diffable: `display_cache` carries one entry per registered
//! item keyed by registration id, and a client that sends the cache back on
//! the next request gets `"reuse"` markers instead of mesh payloads for every
//! item whose content hash is unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Color;
use crate::kernel::ContentHash;
use crate::scene::ItemId;

/// Marker stored in a mesh slot when the client already holds the mesh.
pub const REUSE_MARKER: &str = "reuse";

/// Last-known state of one registered item.
///
/// A failed construction carries only `err`; the hash key is absent so a
/// stale hash can never be mistaken for a live one. A meshing failure keeps
/// the solid's hash next to the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
    #[serde(default)]
    pub err: Option<String>,
}

impl CacheEntry {
    pub fn fresh(hash: ContentHash) -> Self {
        Self {
            hash: Some(hash),
            err: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            hash: None,
            err: Some(message.into()),
        }
    }

    pub fn meshing_failed(hash: ContentHash, message: impl Into<String>) -> Self {
        Self {
            hash: Some(hash),
            err: Some(message.into()),
        }
    }
}

/// Per-item cache carried between reconciliation passes.
pub type DisplayCache = HashMap<ItemId, CacheEntry>;

/// Triangle mesh in the shape the viewer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshPayload {
    pub uuid: ContentHash,
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub triangles: Vec<u32>,
    #[serde(default)]
    pub edge_indices: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// What a mesh slot holds: a computed payload, the `"reuse"` marker, or
/// `null` after a meshing failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshSlot {
    Computed(MeshPayload),
    Marker(String),
    Missing,
}

impl MeshSlot {
    pub fn reuse() -> Self {
        Self::Marker(REUSE_MARKER.to_string())
    }

    pub fn is_reuse(&self) -> bool {
        matches!(self, Self::Marker(marker) if marker == REUSE_MARKER)
    }

    pub fn payload(&self) -> Option<&MeshPayload> {
        match self {
            Self::Computed(payload) => Some(payload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEntry {
    pub mesh: MeshSlot,
}

/// Metadata row for one computed solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidInfo {
    #[serde(rename = "_id")]
    pub id: ItemId,
    pub uuid: ContentHash,
    pub name: String,
    pub area: f64,
    pub volume: f64,
}

/// The full pipeline output for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayResponse {
    pub solids: Vec<SolidInfo>,
    pub logs: Vec<String>,
    pub display_cache: DisplayCache,
    pub meshes: HashMap<ItemId, MeshEntry>,
}

impl DisplayResponse {
    /// Merge a step-pass response into this one. Step results win per item;
    /// items without step imports keep their primary-pass result.
    pub fn overlay(&mut self, other: DisplayResponse) {
        for solid in other.solids {
            match self.solids.iter_mut().find(|existing| existing.id == solid.id) {
                Some(existing) => *existing = solid,
                None => self.solids.push(solid),
            }
        }
        self.logs.extend(other.logs);
        self.display_cache.extend(other.display_cache);
        self.meshes.extend(other.meshes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_failed_entry_serializes_without_hash_key() {
        let value = serde_json::to_value(CacheEntry::failed("boom")).expect("Should serialize");
        assert_eq!(value, json!({ "err": "boom" }));
    }

    #[test]
    fn test_fresh_entry_keeps_an_explicit_null_err() {
        let value = serde_json::to_value(CacheEntry::fresh(ContentHash::new("h1")))
            .expect("Should serialize");
        assert_eq!(value, json!({ "hash": "h1", "err": null }));
    }

    #[test]
    fn test_meshing_failure_keeps_the_hash() {
        let entry = CacheEntry::meshing_failed(ContentHash::new("h1"), "boom");
        let value = serde_json::to_value(entry).expect("Should serialize");
        assert_eq!(value, json!({ "hash": "h1", "err": "boom" }));
    }

    #[test]
    fn test_reuse_slot_serializes_as_the_marker_string() {
        let value = serde_json::to_value(MeshEntry {
            mesh: MeshSlot::reuse(),
        })
        .expect("Should serialize");
        assert_eq!(value, json!({ "mesh": "reuse" }));
        assert!(MeshSlot::reuse().is_reuse());
    }

    #[test]
    fn test_missing_slot_serializes_as_null() {
        let value = serde_json::to_value(MeshEntry {
            mesh: MeshSlot::Missing,
        })
        .expect("Should serialize");
        assert_eq!(value, json!({ "mesh": null }));
    }

    #[test]
    fn test_mesh_slot_deserializes_every_shape() {
        let reuse: MeshSlot = serde_json::from_value(json!("reuse")).expect("Should deserialize");
        assert!(reuse.is_reuse());
        let missing: MeshSlot = serde_json::from_value(json!(null)).expect("Should deserialize");
        assert_eq!(missing, MeshSlot::Missing);
        let computed: MeshSlot = serde_json::from_value(json!({
            "uuid": "h1",
            "vertices": [0.0, 0.0, 0.0],
            "normals": [0.0, 0.0, 1.0],
            "triangles": [0]
        }))
        .expect("Should deserialize");
        assert_eq!(
            computed.payload().map(|payload| payload.uuid.as_str()),
            Some("h1")
        );
    }

    #[test]
    fn test_solid_info_wire_shape() {
        let info = SolidInfo {
            id: ItemId::new("a1"),
            uuid: ContentHash::new("h1"),
            name: "id_a1".to_string(),
            area: 18.0,
            volume: 9.0,
        };
        let value = serde_json::to_value(info).expect("Should serialize");
        assert_eq!(
            value,
            json!({ "_id": "a1", "uuid": "h1", "name": "id_a1", "area": 18.0, "volume": 9.0 })
        );
    }

    #[test]
    fn test_mesh_payload_uses_camel_case_keys() {
        let payload = MeshPayload {
            uuid: ContentHash::new("h1"),
            vertices: vec![0.0],
            normals: vec![0.0],
            triangles: vec![0],
            edge_indices: vec![0, 1],
            color: Some([0.5, 0.5, 0.5]),
        };
        let value = serde_json::to_value(payload).expect("Should serialize");
        assert_eq!(value["edgeIndices"], json!([0, 1]));
        assert_eq!(value["color"], json!([0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_empty_response_wire_shape() {
        let value = serde_json::to_value(DisplayResponse::default()).expect("Should serialize");
        assert_eq!(
            value,
            json!({ "solids": [], "logs": [], "displayCache": {}, "meshes": {} })
        );
    }

    #[test]
    fn test_overlay_replaces_matching_solids_and_extends_maps() {
        let mut primary = DisplayResponse::default();
        primary.solids.push(SolidInfo {
            id: ItemId::new("a1"),
            uuid: ContentHash::new("h1"),
            name: "placeholder".to_string(),
            area: 1.0,
            volume: 1.0,
        });
        primary
            .display_cache
            .insert(ItemId::new("a1"), CacheEntry::fresh(ContentHash::new("h1")));
        primary
            .display_cache
            .insert(ItemId::new("b2"), CacheEntry::fresh(ContentHash::new("h2")));

        let mut step_pass = DisplayResponse::default();
        step_pass.solids.push(SolidInfo {
            id: ItemId::new("a1"),
            uuid: ContentHash::new("h9"),
            name: "part".to_string(),
            area: 2.0,
            volume: 2.0,
        });
        step_pass
            .display_cache
            .insert(ItemId::new("a1"), CacheEntry::fresh(ContentHash::new("h9")));

        primary.overlay(step_pass);
        assert_eq!(primary.solids.len(), 1);
        assert_eq!(primary.solids[0].uuid, ContentHash::new("h9"));
        assert_eq!(
            primary.display_cache[&ItemId::new("a1")].hash,
            Some(ContentHash::new("h9"))
        );
        assert_eq!(
            primary.display_cache[&ItemId::new("b2")].hash,
            Some(ContentHash::new("h2"))
        );
    }
}
