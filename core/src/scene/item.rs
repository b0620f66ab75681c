//! Items of the scene graph and their wire representation.
//!
//! The editor sends the scene as JSON; field names follow its conventions
//! (`_id`, `_linked`, camelCase keys).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{Point3, Vector3};

/// Identity of a scene item, assigned by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Editor parameter. The effective value is `value` when set, falling back
/// to `default_value`; a parameter with neither produces no declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub default_value: Option<f64>,
}

impl Parameter {
    pub fn new(id: impl Into<String>, default_value: f64) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            value: None,
            default_value: Some(default_value),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn effective_value(&self) -> Option<f64> {
        self.value.or(self.default_value)
    }
}

/// Library origin of a leaf instantiated from a shared geometry library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub geometry_name: String,
    pub lib_name: String,
    /// GUID of the library entry, used in collision-free renaming.
    #[serde(default)]
    pub guid: String,
}

impl Origin {
    pub fn new(
        geometry_name: impl Into<String>,
        lib_name: impl Into<String>,
        guid: impl Into<String>,
    ) -> Self {
        Self {
            geometry_name: geometry_name.into(),
            lib_name: lib_name.into(),
            guid: guid.into(),
        }
    }

    /// A real library reference needs both names filled in.
    pub fn is_library(&self) -> bool {
        !self.geometry_name.is_empty() && !self.lib_name.is_empty()
    }
}

/// Rotation applied to imported step solids: axis through `center`, angle
/// in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRotation {
    pub center: Point3,
    pub axis: Vector3,
    pub angle: f64,
}

/// Translation applied to imported step solids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTranslation {
    pub vector: Vector3,
}

/// Reference to an externally stored CAD file, imported by GUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepImport {
    pub guid: String,
    #[serde(default)]
    pub rotation: Option<StepRotation>,
    #[serde(default)]
    pub translation: Option<StepTranslation>,
}

impl StepImport {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            rotation: None,
            translation: None,
        }
    }

    pub fn rotated(mut self, center: [f64; 3], axis: [f64; 3], angle: f64) -> Self {
        self.rotation = Some(StepRotation {
            center: Point3::from(center),
            axis: Vector3::from(axis),
            angle,
        });
        self
    }

    pub fn translated(mut self, vector: [f64; 3]) -> Self {
        self.translation = Some(StepTranslation {
            vector: Vector3::from(vector),
        });
        self
    }

    /// Construction expression for this import, without trailing semicolon.
    pub fn to_expression(&self) -> String {
        let mut expr = format!("csg.makeStep(\"{}\")", self.guid);
        if let Some(rotation) = &self.rotation {
            expr.push_str(&format!(
                ".rotate([{},{},{}],[{},{},{}],{})",
                rotation.center.x,
                rotation.center.y,
                rotation.center.z,
                rotation.axis.x,
                rotation.axis.y,
                rotation.axis.z,
                rotation.angle
            ));
        }
        if let Some(translation) = &self.translation {
            expr.push_str(&format!(
                ".translate([{},{},{}])",
                translation.vector.x, translation.vector.y, translation.vector.z
            ));
        }
        expr
    }
}

/// Link slot on an item; a linked slot points at another item, forming the
/// dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "_linked", default)]
    pub linked: Option<ItemId>,
}

impl Connector {
    pub fn linked_to(name: impl Into<String>, target: ItemId) -> Self {
        Self {
            name: name.into(),
            linked: Some(target),
        }
    }
}

/// Structural variant of a scene item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemKind {
    /// Plain primitive, possibly instantiated from a library or imported
    /// from an external step file.
    Leaf {
        #[serde(default)]
        origin: Option<Origin>,
        #[serde(default)]
        step: Option<StepImport>,
    },
    /// Item built from sub-geometries linked through their connectors.
    Composite { geometries: Vec<ItemId> },
    /// Library object wrapping the sub-geometries it instantiates.
    ObjectWrapper { geometries: Vec<ItemId> },
}

/// Node of the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryItem {
    #[serde(rename = "_id")]
    pub id: ItemId,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Fillet factor; when set the item is registered with `displayFillet`.
    #[serde(default)]
    pub fillet: Option<f64>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    /// Construction expression, without trailing semicolon.
    pub source: String,
    #[serde(flatten)]
    pub kind: ItemKind,
}

fn default_visible() -> bool {
    true
}

impl GeometryItem {
    pub fn leaf(id: impl Into<ItemId>, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visible: true,
            fillet: None,
            parameters: Vec::new(),
            connectors: Vec::new(),
            source: source.into(),
            kind: ItemKind::Leaf {
                origin: None,
                step: None,
            },
        }
    }

    pub fn library_leaf(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        source: impl Into<String>,
        origin: Origin,
    ) -> Self {
        let mut item = Self::leaf(id, name, source);
        item.kind = ItemKind::Leaf {
            origin: Some(origin),
            step: None,
        };
        item
    }

    /// Leaf importing an external step file; the source is rendered from
    /// the import descriptor.
    pub fn step_leaf(id: impl Into<ItemId>, name: impl Into<String>, step: StepImport) -> Self {
        let source = step.to_expression();
        let mut item = Self::leaf(id, name, source);
        item.kind = ItemKind::Leaf {
            origin: None,
            step: Some(step),
        };
        item
    }

    pub fn composite(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        source: impl Into<String>,
        geometries: Vec<ItemId>,
    ) -> Self {
        let mut item = Self::leaf(id, name, source);
        item.kind = ItemKind::Composite { geometries };
        item
    }

    pub fn object_wrapper(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        source: impl Into<String>,
        geometries: Vec<ItemId>,
    ) -> Self {
        let mut item = Self::leaf(id, name, source);
        item.kind = ItemKind::ObjectWrapper { geometries };
        item
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_fillet(mut self, factor: f64) -> Self {
        self.fillet = Some(factor);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_connector(mut self, name: &str, target: ItemId) -> Self {
        self.connectors.push(Connector::linked_to(name, target));
        self
    }

    /// Sub-geometry ids for composite-like items, empty for leaves.
    pub fn sub_geometries(&self) -> &[ItemId] {
        match &self.kind {
            ItemKind::Composite { geometries } | ItemKind::ObjectWrapper { geometries } => {
                geometries
            }
            ItemKind::Leaf { .. } => &[],
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match &self.kind {
            ItemKind::Leaf { origin, .. } => origin.as_ref(),
            _ => None,
        }
    }

    /// The origin when it points at a real library entry.
    pub fn library_origin(&self) -> Option<&Origin> {
        self.origin().filter(|origin| origin.is_library())
    }

    pub fn step_import(&self) -> Option<&StepImport> {
        match &self.kind {
            ItemKind::Leaf { step, .. } => step.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_value_prefers_value() {
        let parameter = Parameter::new("width", 10.0).with_value(25.0);
        assert_eq!(parameter.effective_value(), Some(25.0));
    }

    #[test]
    fn test_effective_value_falls_back_to_default() {
        let parameter = Parameter::new("width", 10.0);
        assert_eq!(parameter.effective_value(), Some(10.0));
    }

    #[test]
    fn test_step_expression_plain() {
        let step = StepImport::new("dde94078");
        assert_eq!(step.to_expression(), "csg.makeStep(\"dde94078\")");
    }

    #[test]
    fn test_step_expression_with_transforms() {
        let step = StepImport::new("dde94078")
            .rotated([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], 45.0)
            .translated([10.0, 0.0, 5.5]);
        assert_eq!(
            step.to_expression(),
            "csg.makeStep(\"dde94078\").rotate([0,0,0],[0,0,1],45).translate([10,0,5.5])"
        );
    }

    #[test]
    fn test_item_wire_shape() {
        let item = GeometryItem::leaf("a1", "Box1", "csg.makeBox(10,10,10)");
        let value = serde_json::to_value(&item).expect("Should serialize item");
        assert_eq!(value["_id"], "a1");
        assert_eq!(value["name"], "Box1");
        assert_eq!(value["visible"], true);
        assert_eq!(value["kind"], "leaf");
    }

    #[test]
    fn test_item_roundtrip_with_connectors() {
        let item = GeometryItem::composite("c1", "Union1", "csg.fuse(a, b)", vec!["s1".into()])
            .with_connector("base", "a1".into());
        let json = serde_json::to_string(&item).expect("Should serialize item");
        let back: GeometryItem = serde_json::from_str(&json).expect("Should deserialize item");
        assert_eq!(back, item);
        assert_eq!(back.sub_geometries(), &["s1".into()]);
    }

    #[test]
    fn test_visible_defaults_to_true() {
        let item: GeometryItem = serde_json::from_str(
            r#"{"_id":"a1","name":"Box1","source":"csg.makeBox(1,1,1)","kind":"leaf"}"#,
        )
        .expect("Should deserialize item");
        assert!(item.visible);
        assert!(item.step_import().is_none());
    }

    #[test]
    fn test_library_origin_requires_both_names() {
        let partial = Origin::new("", "lib", "GUID1");
        assert!(!partial.is_library());
        let full = Origin::new("bracket", "lib", "GUID1");
        assert!(full.is_library());
    }
}
