//! Scene graph to script linearization.
//!
//! The synthesizer walks the top-level items of a [`SceneGraph`] and emits a
//! textual build program: parameter declarations first, then one guarded
//! construction block per item. Connector-linked dependencies of a composite
//! are emitted before the composite itself, once per distinct dependency, and
//! their symbols are suffixed with the composite's name so two composites can
//! share a dependency without colliding.
//!
//! Synthesis is pure text generation. Malformed item data produces malformed
//! script text and surfaces when the script runs, never here.

use std::collections::HashSet;

use crate::scene::{GeometryItem, ItemId, ItemKind, Parameter, SceneGraph};
use crate::script::naming;
use crate::script::steps::StepReference;

/// Output of a synthesis pass: the script text plus one typed descriptor per
/// registered item that imports a step file.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedScript {
    pub source: String,
    pub steps: Vec<StepReference>,
}

impl SynthesizedScript {
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Linearize a scene graph into an executable script.
pub fn synthesize(graph: &SceneGraph) -> SynthesizedScript {
    let mut steps = Vec::new();
    let mut entries: Vec<String> = Vec::new();

    for parameter in &graph.parameters {
        if let Some(declaration) = parameter_declaration(parameter, "") {
            entries.push(declaration);
        }
    }
    for item in graph.top_level() {
        entries.extend(item_parameter_declarations(graph, item));
    }
    for item in graph.top_level() {
        entries.push(item_unit(graph, item, &mut steps));
    }

    let mut seen = HashSet::new();
    let source = entries
        .into_iter()
        .filter(|entry| !entry.is_empty() && seen.insert(entry.clone()))
        .collect::<Vec<_>>()
        .join("\n");

    SynthesizedScript { source, steps }
}

fn parameter_declaration(parameter: &Parameter, suffix: &str) -> Option<String> {
    let value = parameter.effective_value()?;
    Some(format!("var ${}{} = {};", parameter.id, suffix, value))
}

/// Declarations for an item's own parameters. Items bound to a library
/// instantiation declare the suffixed ids their rewritten references use.
fn item_parameter_declarations(graph: &SceneGraph, item: &GeometryItem) -> Vec<String> {
    match library_binding(graph, item) {
        Some(binding) => {
            let suffix = naming::library_suffix(binding.parent_name, binding.guid);
            binding
                .parameters
                .iter()
                .filter_map(|parameter| parameter_declaration(parameter, &suffix))
                .collect()
        }
        None => item
            .parameters
            .iter()
            .filter_map(|parameter| parameter_declaration(parameter, ""))
            .collect(),
    }
}

/// The naming context of an item instantiated from a shared library.
struct LibraryBinding<'a> {
    parent_name: &'a str,
    guid: &'a str,
    parameters: &'a [Parameter],
}

fn library_binding<'a>(
    graph: &'a SceneGraph,
    item: &'a GeometryItem,
) -> Option<LibraryBinding<'a>> {
    match &item.kind {
        ItemKind::Leaf { .. } => item.library_origin().map(|origin| LibraryBinding {
            parent_name: &item.name,
            guid: &origin.guid,
            parameters: &item.parameters,
        }),
        ItemKind::ObjectWrapper { geometries } => {
            let first = geometries.first().and_then(|id| graph.item(id))?;
            let origin = first.origin()?;
            Some(LibraryBinding {
                parent_name: &item.name,
                guid: &origin.guid,
                parameters: &first.parameters,
            })
        }
        ItemKind::Composite { .. } => None,
    }
}

/// Emit one top-level item: dependency blocks for every sub-geometry's
/// connector closure, then the item's own block, then the name rewrites that
/// bind references inside the unit to the suffixed dependency symbols.
fn item_unit(graph: &SceneGraph, item: &GeometryItem, steps: &mut Vec<StepReference>) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut visited: HashSet<ItemId> = HashSet::new();

    for sub_id in item.sub_geometries() {
        if let Some(sub) = graph.item(sub_id) {
            emit_dependency_blocks(graph, sub, item, &mut blocks, steps, &mut visited);
        }
    }
    push_block(display_block(graph, item, None), &mut blocks, steps);

    let mut unit = blocks.concat();

    let mut renamed: HashSet<ItemId> = HashSet::new();
    for sub_id in item.sub_geometries() {
        if let Some(sub) = graph.item(sub_id) {
            unit = suffix_dependency_names(graph, sub, &item.name, unit, &mut renamed);
        }
    }
    if let Some(binding) = library_binding(graph, item) {
        unit = naming::suffix_parameters(&unit, binding.parameters, binding.parent_name, binding.guid);
    }
    unit
}

/// Postorder over an item's connector targets: a target's own dependencies
/// are emitted before the target. The visited set keeps shared subtrees from
/// being walked twice and terminates reference cycles.
fn emit_dependency_blocks(
    graph: &SceneGraph,
    item: &GeometryItem,
    parent: &GeometryItem,
    blocks: &mut Vec<String>,
    steps: &mut Vec<StepReference>,
    visited: &mut HashSet<ItemId>,
) {
    for target in graph.connector_targets(item) {
        if !visited.insert(target.id.clone()) {
            continue;
        }
        emit_dependency_blocks(graph, target, parent, blocks, steps, visited);
        push_block(display_block(graph, target, Some(parent)), blocks, steps);
    }
}

/// Rewrite bare references to every connector target in the closure so they
/// match the suffixed symbols declared by [`emit_dependency_blocks`].
fn suffix_dependency_names(
    graph: &SceneGraph,
    item: &GeometryItem,
    parent_name: &str,
    text: String,
    visited: &mut HashSet<ItemId>,
) -> String {
    let mut text = text;
    for target in graph.connector_targets(item) {
        if !visited.insert(target.id.clone()) {
            continue;
        }
        text = suffix_dependency_names(graph, target, parent_name, text, visited);
        text = naming::suffix_geometry_name(&text, &target.name, parent_name);
    }
    text
}

fn push_block(
    (text, step): (String, Option<StepReference>),
    blocks: &mut Vec<String>,
    steps: &mut Vec<StepReference>,
) {
    if blocks.contains(&text) {
        return;
    }
    blocks.push(text);
    if let Some(step) = step {
        if steps.iter().all(|existing| existing.id != step.id) {
            steps.push(step);
        }
    }
}

/// One guarded construction block. The catch arm is always present so a
/// failing expression reports against the item's id instead of aborting the
/// run; the registration call is only present for visible top-level items.
fn display_block(
    graph: &SceneGraph,
    item: &GeometryItem,
    parent: Option<&GeometryItem>,
) -> (String, Option<StepReference>) {
    let mut symbol = script_name(graph, item);
    if let Some(parent) = parent {
        symbol = format!("{}_{}", symbol, parent.name);
    }
    let registered = item.visible && graph.is_top_level(&item.id);

    let mut text = format!("var {};\n", symbol);
    text.push_str("try {\n");
    text.push_str(&format!("    {} = {};\n", symbol, item.source));
    if registered {
        match item.fillet {
            Some(factor) => text.push_str(&format!(
                "    displayFillet({},\"{}\",{});\n",
                symbol, item.id, factor
            )),
            None => text.push_str(&format!("    display({},\"{}\");\n", symbol, item.id)),
        }
    }
    text.push_str("} catch(err) {\n");
    text.push_str(&format!(
        "   console.log(\"building {} with id {} has failed\");\n",
        symbol, item.id
    ));
    text.push_str("   console.log(\" err = \" + err.message);\n");
    text.push_str(&format!("   reportError(err,\"{}\");\n", item.id));
    text.push_str("}\n");

    let step = if registered {
        item.step_import()
            .filter(|import| !import.guid.is_empty())
            .map(|import| StepReference {
                symbol: symbol.clone(),
                id: item.id.clone(),
                guid: import.guid.clone(),
                rotation: import.rotation.clone(),
                translation: import.translation.clone(),
            })
    } else {
        None
    };
    (text, step)
}

/// Composite symbols are derived from their sub-geometry names.
fn script_name(graph: &SceneGraph, item: &GeometryItem) -> String {
    let subs = item.sub_geometries();
    if subs.is_empty() {
        return item.name.clone();
    }
    let names: Vec<&str> = subs
        .iter()
        .filter_map(|id| graph.item(id))
        .map(|sub| sub.name.as_str())
        .collect();
    names.join("U")
}
