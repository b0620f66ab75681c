//! Cache-aware reconciliation of raw execution results.
//!
//! [`build_response`] is the primary pass: it walks the records registered
//! during script execution, reuses the previous pass's mesh for every solid
//! whose content hash is unchanged, and meshes the rest. Per-item failures
//! are recorded and the batch continues.
//!
//! [`build_step_response`] is the second pass for step imports. It replaces
//! each import's placeholder result with the real file contents: load,
//! rotate, translate, merge into a compound, mesh. Unlike the primary pass,
//! any failure here aborts the whole pass.

use std::collections::HashMap;

use futures::future;

use crate::geometry::Color;
use crate::kernel::{ContentHash, Kernel, KernelResult, Solid};
use crate::repository::StepRepository;
use crate::response::{CacheEntry, DisplayCache, DisplayResponse, MeshEntry, MeshSlot, SolidInfo};
use crate::runner::{ShapeOutcome, ShapeRecord};
use crate::scene::ItemId;
use crate::script::StepReference;

/// Reconcile raw records against the previous cache.
pub fn build_response<K: Kernel>(
    kernel: &K,
    previous: &DisplayCache,
    records: &mut [ShapeRecord<K::Solid>],
    logs: Vec<String>,
) -> DisplayResponse {
    let mut display_cache = DisplayCache::new();
    let mut meshes = HashMap::new();

    for record in records.iter_mut() {
        let id = record.id.clone();
        match &mut record.outcome {
            ShapeOutcome::Failed(message) => {
                display_cache.insert(id, CacheEntry::failed(message.clone()));
            }
            ShapeOutcome::Built(solid) => {
                let hash = solid.content_hash();
                if cached_hash_matches(previous, &id, &hash) {
                    display_cache.insert(id.clone(), CacheEntry::fresh(hash));
                    meshes.insert(
                        id,
                        MeshEntry {
                            mesh: MeshSlot::reuse(),
                        },
                    );
                    continue;
                }
                solid.set_name(&format!("id_{}", id));
                match kernel.build_mesh(solid) {
                    Ok(mesh) => {
                        display_cache.insert(id.clone(), CacheEntry::fresh(mesh.uuid.clone()));
                        meshes.insert(
                            id,
                            MeshEntry {
                                mesh: MeshSlot::Computed(mesh),
                            },
                        );
                    }
                    Err(err) => {
                        display_cache
                            .insert(id.clone(), CacheEntry::meshing_failed(hash, err.to_string()));
                        meshes.insert(
                            id,
                            MeshEntry {
                                mesh: MeshSlot::Missing,
                            },
                        );
                    }
                }
            }
        }
    }

    DisplayResponse {
        solids: solid_summaries(records),
        logs,
        display_cache,
        meshes,
    }
}

/// Replace step-import placeholders with results built from the real files.
///
/// Returns a sparse response meant to be overlaid onto the primary one:
/// cache and mesh entries for the processed imports only, no solids rows and
/// no logs. Imports are independent of each other and processed concurrently.
pub async fn build_step_response<K: Kernel>(
    kernel: &K,
    repository: &StepRepository,
    previous: &DisplayCache,
    steps: &[StepReference],
    records: &[ShapeRecord<K::Solid>],
    color: Color,
) -> KernelResult<DisplayResponse> {
    let work = records.iter().filter_map(|record| {
        let solid = record.solid()?;
        let step = steps.iter().find(|step| step.id == record.id)?;
        Some(process_step(kernel, repository, previous, step, solid, color))
    });
    let outcomes = future::try_join_all(work).await?;

    let mut response = DisplayResponse::default();
    for (id, entry, slot) in outcomes {
        response.display_cache.insert(id.clone(), entry);
        response.meshes.insert(id, MeshEntry { mesh: slot });
    }
    Ok(response)
}

async fn process_step<K: Kernel>(
    kernel: &K,
    repository: &StepRepository,
    previous: &DisplayCache,
    step: &StepReference,
    solid: &K::Solid,
    color: Color,
) -> KernelResult<(ItemId, CacheEntry, MeshSlot)> {
    let hash = solid.content_hash();
    if cached_hash_matches(previous, &step.id, &hash) {
        return Ok((step.id.clone(), CacheEntry::fresh(hash), MeshSlot::reuse()));
    }

    let path = repository.step_path(&step.guid);
    let mut solids = kernel.read_external_file(&path).await?;
    if let Some(rotation) = &step.rotation {
        solids = solids
            .iter()
            .map(|solid| solid.rotate(rotation.center, rotation.axis, rotation.angle))
            .collect();
    }
    if let Some(translation) = &step.translation {
        solids = solids
            .iter()
            .map(|solid| solid.translate(translation.vector))
            .collect();
    }
    let mut compound = kernel.build_compound(solids)?;
    if compound.name().is_empty() {
        compound.set_name(&step.guid);
    }
    let mut mesh = kernel.build_mesh(&compound)?;
    mesh.color = Some(color);
    Ok((
        step.id.clone(),
        CacheEntry::fresh(mesh.uuid.clone()),
        MeshSlot::Computed(mesh),
    ))
}

fn cached_hash_matches(previous: &DisplayCache, id: &ItemId, hash: &ContentHash) -> bool {
    previous
        .get(id)
        .and_then(|entry| entry.hash.as_ref())
        .map_or(false, |cached| cached == hash)
}

fn solid_summaries<S: Solid>(records: &[ShapeRecord<S>]) -> Vec<SolidInfo> {
    records
        .iter()
        .filter_map(|record| {
            record.solid().map(|solid| SolidInfo {
                id: record.id.clone(),
                uuid: solid.content_hash(),
                name: solid.name().to_string(),
                area: solid.area(),
                volume: solid.volume(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point3, Vector3};
    use crate::kernel::{KernelError, MockKernel, MockSolid};
    use crate::scene::{StepRotation, StepTranslation};

    use futures::executor::block_on;

    fn step(id: &str, guid: &str) -> StepReference {
        StepReference {
            symbol: "imported".to_string(),
            id: ItemId::new(id),
            guid: guid.to_string(),
            rotation: None,
            translation: None,
        }
    }

    #[test]
    fn test_unchanged_hash_is_marked_reuse() {
        // meshing the box would fail, proving the reuse path never meshes
        let kernel = MockKernel::new().fail_meshing("makeBox");
        let solid = MockSolid::new("csg.makeBox(1,1,1)");
        let hash = solid.content_hash();
        let mut previous = DisplayCache::new();
        previous.insert(ItemId::new("a1"), CacheEntry::fresh(hash.clone()));

        let mut records = vec![ShapeRecord::built("a1", solid)];
        let response = build_response(&kernel, &previous, &mut records, Vec::new());

        assert!(response.meshes[&ItemId::new("a1")].mesh.is_reuse());
        assert_eq!(
            response.display_cache[&ItemId::new("a1")],
            CacheEntry::fresh(hash)
        );
        assert_eq!(response.solids[0].name, "");
    }

    #[test]
    fn test_changed_hash_is_remeshed_and_recached() {
        let kernel = MockKernel::new();
        let solid = MockSolid::new("csg.makeBox(2,1,1)");
        let hash = solid.content_hash();
        let mut previous = DisplayCache::new();
        previous.insert(ItemId::new("a1"), CacheEntry::fresh(ContentHash::new("stale")));

        let mut records = vec![ShapeRecord::built("a1", solid)];
        let response = build_response(&kernel, &previous, &mut records, Vec::new());

        let entry = &response.display_cache[&ItemId::new("a1")];
        assert_eq!(entry.hash, Some(hash.clone()));
        assert_eq!(entry.err, None);
        let payload = response.meshes[&ItemId::new("a1")]
            .mesh
            .payload()
            .expect("Should hold a computed mesh");
        assert_eq!(payload.uuid, hash);
        assert_eq!(response.solids[0].name, "id_a1");
    }

    #[test]
    fn test_error_record_updates_cache_without_a_mesh() {
        let kernel = MockKernel::new();
        let mut records: Vec<ShapeRecord<MockSolid>> = vec![ShapeRecord::failed("X", "boom")];
        let response = build_response(&kernel, &DisplayCache::new(), &mut records, Vec::new());

        assert_eq!(
            response.display_cache[&ItemId::new("X")],
            CacheEntry::failed("boom")
        );
        assert!(!response.meshes.contains_key(&ItemId::new("X")));
        assert!(response.solids.is_empty());
    }

    #[test]
    fn test_meshing_failure_does_not_abort_the_batch() {
        let kernel = MockKernel::new().fail_meshing("badbox");
        let cursed = MockSolid::new("csg.badbox()");
        let cursed_hash = cursed.content_hash();
        let mut records = vec![
            ShapeRecord::built("a1", cursed),
            ShapeRecord::built("b2", MockSolid::new("csg.makeBox(1,1,1)")),
        ];
        let response = build_response(&kernel, &DisplayCache::new(), &mut records, Vec::new());

        let entry = &response.display_cache[&ItemId::new("a1")];
        assert_eq!(entry.hash, Some(cursed_hash));
        assert!(entry.err.as_deref().unwrap().contains("cannot mesh"));
        assert_eq!(response.meshes[&ItemId::new("a1")].mesh, MeshSlot::Missing);
        assert!(response.meshes[&ItemId::new("b2")].mesh.payload().is_some());
    }

    #[test]
    fn test_step_pass_loads_rotates_translates_and_merges() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(dir.path().join("part-9.stp"), "a()\nb()\n").expect("Should write");
        let repository = StepRepository::from_root(dir.path());
        let kernel = MockKernel::new();

        let mut reference = step("s1", "part-9");
        reference.rotation = Some(StepRotation {
            center: Point3::origin(),
            axis: Vector3::z(),
            angle: 90.0,
        });
        reference.translation = Some(StepTranslation {
            vector: Vector3::new(1.0, 0.0, 0.0),
        });
        let records = vec![ShapeRecord::built(
            "s1",
            MockSolid::new("csg.makeStep(\"part-9\")"),
        )];
        let color = [0.1, 0.2, 0.3];

        let response = block_on(build_step_response(
            &kernel,
            &repository,
            &DisplayCache::new(),
            &[reference],
            &records,
            color,
        ))
        .expect("Should build the step response");

        let expected = MockSolid::new(
            "compound(a().rotate([0,0,0],[0,0,1],90).translate([1,0,0]),\
             b().rotate([0,0,0],[0,0,1],90).translate([1,0,0]))",
        );
        let entry = &response.display_cache[&ItemId::new("s1")];
        assert_eq!(entry.hash, Some(expected.content_hash()));
        let payload = response.meshes[&ItemId::new("s1")]
            .mesh
            .payload()
            .expect("Should hold a computed mesh");
        assert_eq!(payload.color, Some(color));
        assert!(response.solids.is_empty());
    }

    #[test]
    fn test_unchanged_step_skips_the_file_read() {
        // a bogus repository root fails loudly if the reuse path ever reads
        let repository = StepRepository::from_root("/definitely/not/here");
        let kernel = MockKernel::new();

        let placeholder = MockSolid::new("csg.makeStep(\"part-9\")");
        let hash = placeholder.content_hash();
        let mut previous = DisplayCache::new();
        previous.insert(ItemId::new("s1"), CacheEntry::fresh(hash.clone()));
        let records = vec![ShapeRecord::built("s1", placeholder)];

        let response = block_on(build_step_response(
            &kernel,
            &repository,
            &previous,
            &[step("s1", "part-9")],
            &records,
            [0.5, 0.5, 0.5],
        ))
        .expect("Should reuse without touching the repository");

        assert!(response.meshes[&ItemId::new("s1")].mesh.is_reuse());
        assert_eq!(
            response.display_cache[&ItemId::new("s1")],
            CacheEntry::fresh(hash)
        );
    }

    #[test]
    fn test_missing_step_file_is_fatal() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let repository = StepRepository::from_root(dir.path());
        let kernel = MockKernel::new();
        let records = vec![ShapeRecord::built(
            "s1",
            MockSolid::new("csg.makeStep(\"ghost\")"),
        )];

        let err = block_on(build_step_response(
            &kernel,
            &repository,
            &DisplayCache::new(),
            &[step("s1", "ghost")],
            &records,
            [0.5, 0.5, 0.5],
        ))
        .expect_err("Should propagate the read failure");

        assert!(matches!(err, KernelError::ExternalFile { .. }));
    }

    #[test]
    fn test_compound_is_named_after_the_guid() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(dir.path().join("part-9.stp"), "a()\n").expect("Should write");
        let repository = StepRepository::from_root(dir.path());
        // the marker only matches the compound's name, which comes from the guid
        let kernel = MockKernel::new().fail_meshing("part-9");
        let records = vec![ShapeRecord::built(
            "s1",
            MockSolid::new("csg.makeStep(\"x\")"),
        )];

        let err = block_on(build_step_response(
            &kernel,
            &repository,
            &DisplayCache::new(),
            &[step("s1", "part-9")],
            &records,
            [0.5, 0.5, 0.5],
        ))
        .expect_err("Should fail meshing the renamed compound");

        assert!(matches!(err, KernelError::Meshing(_)));
    }
}
