//! Cross-module determinism: the same seed and location always produce the
//! same content, whatever the generation order, threading, or cache state.

use std::sync::Arc;

use skyisle_config::Config;
use skyisle_coords::{BlockPos, ChunkPos, SystemCoord, SystemPartitioner};
use skyisle_gen::{
    ChunkGenerator, GenerationSettings, SpheroidInstance, SystemGenerator, TemplateCatalog,
    default_catalog, load_catalog_file,
};
use skyisle_voxel::{ChunkColumn, LootTableSet, MaterialRegistry, MaterialState};

fn catalog(materials: &MaterialRegistry) -> Arc<TemplateCatalog> {
    Arc::new(default_catalog(materials, &LootTableSet::with_defaults()).unwrap())
}

fn settings(seed: u64) -> GenerationSettings {
    GenerationSettings {
        seed,
        objects_min: 30,
        objects_max: 45,
        height_min: 40,
        height_max: 200,
        min_spacing: 2.0,
        placement_attempts: 8,
    }
}

fn chunk_generator(seed: u64) -> ChunkGenerator {
    let materials = MaterialRegistry::with_defaults();
    let systems = SystemGenerator::new(
        SystemPartitioner::new(4).unwrap(),
        catalog(&materials),
        settings(seed),
    );
    ChunkGenerator::new(Arc::new(systems), Arc::new(materials))
}

fn voxels(column: &ChunkColumn) -> Vec<(BlockPos, MaterialState)> {
    column.iter_non_air().collect()
}

fn chunks() -> Vec<ChunkPos> {
    (-3..3)
        .flat_map(|x| (-3..3).map(move |z| ChunkPos::new(x, z)))
        .collect()
}

#[test]
fn system_lists_match_across_generators() {
    let materials = MaterialRegistry::with_defaults();
    let a = SystemGenerator::new(
        SystemPartitioner::new(50).unwrap(),
        catalog(&materials),
        settings(77),
    );
    let b = SystemGenerator::new(
        SystemPartitioner::new(50).unwrap(),
        catalog(&materials),
        settings(77),
    );
    for coord in [SystemCoord::new(0, 0), SystemCoord::new(-1, -1), SystemCoord::new(12, -40)] {
        let left = a.get_system(coord);
        let right = b.get_system(coord);
        assert_eq!(left.len(), right.len());
        for (x, y) in left.iter().zip(right.iter()) {
            assert_eq!(x.template_id(), y.template_id());
            assert_eq!(x.center(), y.center());
            assert_eq!(x.radius(), y.radius());
            assert_eq!(x.shape(), y.shape());
            assert_eq!(x.spawns(), y.spawns());
            let ids = |i: &SpheroidInstance| -> Vec<String> {
                i.decorators().iter().map(|d| d.id.clone()).collect()
            };
            assert_eq!(ids(x), ids(y));
        }
    }
}

#[test]
fn different_seeds_produce_different_worlds() {
    let materials = MaterialRegistry::with_defaults();
    let a = SystemGenerator::new(
        SystemPartitioner::new(8).unwrap(),
        catalog(&materials),
        settings(1),
    );
    let b = SystemGenerator::new(
        SystemPartitioner::new(8).unwrap(),
        catalog(&materials),
        settings(2),
    );
    let centers = |g: &SystemGenerator| {
        g.get_system(SystemCoord::new(0, 0))
            .iter()
            .map(|i| i.center())
            .collect::<Vec<_>>()
    };
    assert_ne!(centers(&a), centers(&b));
}

#[test]
fn chunk_content_is_independent_of_order() {
    let forward = chunk_generator(2024);
    let backward = chunk_generator(2024);

    let expected: Vec<_> = chunks()
        .into_iter()
        .map(|chunk| voxels(&forward.generate_column(chunk).unwrap().0))
        .collect();
    let mut reversed: Vec<_> = chunks()
        .into_iter()
        .rev()
        .map(|chunk| voxels(&backward.generate_column(chunk).unwrap().0))
        .collect();
    reversed.reverse();
    assert_eq!(expected, reversed);
}

#[test]
fn chunk_content_is_independent_of_threading() {
    let sequential = chunk_generator(31337);
    let expected: Vec<_> = chunks()
        .into_iter()
        .map(|chunk| voxels(&sequential.generate_column(chunk).unwrap().0))
        .collect();

    let shared = chunk_generator(31337);
    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunks()
            .into_iter()
            .map(|chunk| {
                let generator = &shared;
                scope.spawn(move || voxels(&generator.generate_column(chunk).unwrap().0))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(expected, parallel);
}

#[test]
fn straddling_spheroids_render_on_both_sides_of_a_system_border() {
    let generator = chunk_generator(8);
    let partitioner = *generator.systems().partitioner();
    let system = generator.systems().get_system(SystemCoord::new(0, 0));
    let Some(instance) = system.iter().find(|i| {
        let c = i.center();
        c.x - i.ceil_radius() < 0 && c.y - i.ceil_radius() > -64
    }) else {
        return;
    };
    let inside = ChunkPos::from_block(instance.center());
    let outside = ChunkPos::new(-1, inside.z);
    assert_eq!(partitioner.chunk_to_system(outside).x, -1);

    let spheroids = generator.spheroids_in_chunk(outside);
    assert!(
        spheroids
            .iter()
            .any(|s| s.center() == instance.center() && s.template_id() == instance.template_id())
    );
}

#[test]
fn catalog_file_matches_built_in_catalog() {
    let materials = MaterialRegistry::with_defaults();
    let loot = LootTableSet::with_defaults();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.ron");
    std::fs::write(&path, include_str!("../data/default_catalog.ron")).unwrap();

    let from_file = load_catalog_file(&path, &materials, &loot).unwrap();
    let built_in = default_catalog(&materials, &loot).unwrap();
    assert_eq!(from_file.template_ids(), built_in.template_ids());
}

#[test]
fn config_drives_generation() {
    let mut config = Config::default();
    config.world.seed = 5;
    config.world.system_size_chunks = 6;
    config.generation.objects_min = 10;
    config.generation.objects_max = 10;

    let materials = Arc::new(MaterialRegistry::with_defaults());
    let generator = ChunkGenerator::from_config(&config, catalog(&materials), materials).unwrap();
    assert_eq!(generator.systems().partitioner().size_chunks(), 6);
    assert_eq!(generator.systems().settings().seed, 5);

    let (column, _) = generator.generate_column(ChunkPos::new(0, 0)).unwrap();
    assert_eq!(column.min_y(), config.world.min_y);
    assert_eq!(column.height(), config.world.height as usize);
}
