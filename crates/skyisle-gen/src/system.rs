//! Per-system content: which spheroids exist in a system cell and where.
//!
//! A system's content depends only on the world seed, the system coordinate,
//! the catalog, and the placement settings. It is computed at most once per
//! coordinate and shared read-only afterwards.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use skyisle_config::{Config, MAX_OBJECTS_PER_SYSTEM};
use skyisle_coords::{BlockPos, ChunkPos, PartitionError, SystemCoord, SystemPartitioner};

use crate::catalog::TemplateCatalog;
use crate::seed::{RandomSource, derive_system_seed};
use crate::spheroid::SpheroidInstance;

/// Placement parameters shared by every system of a world.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub seed: u64,
    pub objects_min: u32,
    pub objects_max: u32,
    /// Lowest center Y.
    pub height_min: i32,
    /// Highest center Y.
    pub height_max: i32,
    /// Minimum gap between two spheres of the same system, in blocks.
    pub min_spacing: f64,
    /// Positions tried per slot before the slot stays empty.
    pub placement_attempts: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        let generation = &config.generation;
        Self {
            seed: config.world.seed,
            objects_min: generation.objects_min,
            objects_max: generation.objects_max,
            height_min: generation.spawn_height_min,
            height_max: generation.spawn_height_max,
            min_spacing: generation.min_spacing,
            placement_attempts: generation.placement_attempts,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

type SystemCell = Arc<OnceLock<Arc<[SpheroidInstance]>>>;

/// Computes and caches the spheroid list of each system.
pub struct SystemGenerator {
    partitioner: SystemPartitioner,
    catalog: Arc<TemplateCatalog>,
    settings: GenerationSettings,
    cache: DashMap<SystemCoord, SystemCell>,
}

impl SystemGenerator {
    pub fn new(
        partitioner: SystemPartitioner,
        catalog: Arc<TemplateCatalog>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            partitioner,
            catalog,
            settings,
            cache: DashMap::new(),
        }
    }

    /// Builds a generator from the world and generation sections of `config`.
    ///
    /// # Errors
    ///
    /// Fails when the configured system size is not positive.
    pub fn from_config(
        config: &Config,
        catalog: Arc<TemplateCatalog>,
    ) -> Result<Self, PartitionError> {
        let partitioner = SystemPartitioner::new(config.world.system_size_chunks)?;
        Ok(Self::new(
            partitioner,
            catalog,
            GenerationSettings::from_config(config),
        ))
    }

    /// The spheroids of `coord`, computed on first access.
    ///
    /// Concurrent first callers for the same coordinate block on one
    /// computation and all observe its result.
    pub fn get_system(&self, coord: SystemCoord) -> Arc<[SpheroidInstance]> {
        // Clone the cell out so the shard lock is released before generating.
        let cell = Arc::clone(&self.cache.entry(coord).or_default());
        Arc::clone(cell.get_or_init(|| self.generate_system(coord)))
    }

    /// The spheroids of the system owning `chunk`.
    pub fn get_system_at_chunk(&self, chunk: ChunkPos) -> Arc<[SpheroidInstance]> {
        self.get_system(self.partitioner.chunk_to_system(chunk))
    }

    /// Computes the spheroids of `coord` without touching the cache.
    pub fn generate_system(&self, coord: SystemCoord) -> Arc<[SpheroidInstance]> {
        let settings = &self.settings;
        let mut rng = RandomSource::new(derive_system_seed(settings.seed, coord));

        let slots = rng.range_u32(settings.objects_min, settings.objects_max);

        let (origin_x, origin_z) = self.partitioner.system_block_origin(coord);
        let span = self.partitioner.size_blocks() as u32;

        let capacity = slots.min(MAX_OBJECTS_PER_SYSTEM) as usize;
        let mut placed: Vec<SpheroidInstance> = Vec::with_capacity(capacity);
        let mut empty_slots = 0u32;
        for slot in 0..slots {
            let Ok(category) = self.catalog.draw_category(&mut rng) else {
                tracing::trace!("system {} has an empty catalog", coord);
                break;
            };
            let template = match self.catalog.draw_one(category, &mut rng) {
                Ok(template) => template,
                Err(err) => {
                    tracing::trace!("system {} slot {}: {}", coord, slot, err);
                    empty_slots += 1;
                    continue;
                }
            };
            let instance = template.instantiate(&mut rng);

            let mut accepted = None;
            for _ in 0..settings.placement_attempts.max(1) {
                let center = BlockPos::new(
                    origin_x + rng.next_int(span) as i32,
                    rng.range_i32(settings.height_min, settings.height_max),
                    origin_z + rng.next_int(span) as i32,
                );
                let candidate = instance.clone().with_center(center);
                if !placed
                    .iter()
                    .any(|other| candidate.too_close(other, settings.min_spacing))
                {
                    accepted = Some(candidate);
                    break;
                }
            }
            match accepted {
                Some(instance) => placed.push(instance),
                None => {
                    tracing::trace!(
                        "system {} slot {}: no room for `{}`",
                        coord,
                        slot,
                        template.id
                    );
                    empty_slots += 1;
                }
            }
        }

        tracing::debug!(
            "Generated system {}: {} spheroids ({} empty slots)",
            coord,
            placed.len(),
            empty_slots
        );
        Arc::from(placed)
    }

    /// Coordinates whose content has been computed.
    pub fn cached_systems(&self) -> Vec<SystemCoord> {
        let mut coords: Vec<SystemCoord> = self
            .cache
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| *entry.key())
            .collect();
        coords.sort_unstable();
        coords
    }

    /// Drops every cached system. Content recomputes identically on demand.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn partitioner(&self) -> &SystemPartitioner {
        &self.partitioner
    }

    pub fn catalog(&self) -> &Arc<TemplateCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        CatalogBuilder, FloatRange, MaterialChoice, ShapeTemplate, SpawnDef, Template,
    };
    use crate::decorator::{Decorator, DecoratorKind};
    use skyisle_voxel::{EntityKind, MaterialId, MaterialState};

    fn simple(id: &str, min: f32, max: f32) -> Template {
        Template {
            id: id.to_string(),
            radius: FloatRange::new(min, max),
            decorators: Vec::new(),
            spawns: Vec::new(),
            shape: ShapeTemplate::Simple {
                material: MaterialChoice::one(MaterialState::of(MaterialId(1))),
            },
        }
    }

    fn boulder() -> Template {
        let moss = Decorator {
            id: "moss".to_string(),
            chance: 0.2,
            kind: DecoratorKind::Hanging {
                block: MaterialState::of(MaterialId(2)),
            },
        };
        Template {
            decorators: vec![(Arc::new(moss), 0.5)],
            spawns: vec![SpawnDef {
                entity: EntityKind::new("goat"),
                chance: 0.5,
                min_count: 1,
                max_count: 3,
            }],
            ..simple("boulder", 3.0, 6.0)
        }
    }

    fn catalog() -> Arc<TemplateCatalog> {
        let mut builder = CatalogBuilder::new();
        builder.category("rock", 3.0).unwrap();
        builder.category("hollow", 1.0).unwrap();
        builder
            .register("rock", 2.0, boulder())
            .unwrap()
            .register("rock", 1.0, simple("pebble", 2.0, 3.0))
            .unwrap();
        Arc::new(builder.build())
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            seed: 42,
            objects_min: 20,
            objects_max: 30,
            height_min: 40,
            height_max: 120,
            min_spacing: 2.0,
            placement_attempts: 8,
        }
    }

    fn generator() -> SystemGenerator {
        SystemGenerator::new(SystemPartitioner::new(8).unwrap(), catalog(), settings())
    }

    #[test]
    fn test_get_system_is_deterministic() {
        let generator = generator();
        let a = generator.get_system(SystemCoord::new(3, -2));
        let b = generator.generate_system(SystemCoord::new(3, -2));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.template_id(), y.template_id());
            assert_eq!(x.center(), y.center());
            assert_eq!(x.radius(), y.radius());
            assert_eq!(x.shape(), y.shape());
            assert_eq!(decorator_ids(x), decorator_ids(y));
            assert_eq!(x.spawns(), y.spawns());
        }
        assert!(a.iter().any(|i| !i.decorators().is_empty()));
        assert!(a.iter().any(|i| !i.spawns().is_empty()));
    }

    fn decorator_ids(instance: &SpheroidInstance) -> Vec<&str> {
        instance.decorators().iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_get_system_returns_cached_list() {
        let generator = generator();
        let a = generator.get_system(SystemCoord::new(0, 0));
        let b = generator.get_system(SystemCoord::new(0, 0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(generator.cached_systems(), vec![SystemCoord::new(0, 0)]);

        generator.clear_cache();
        assert!(generator.cached_systems().is_empty());
        let c = generator.get_system(SystemCoord::new(0, 0));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.len(), c.len());
    }

    #[test]
    fn test_neighboring_systems_differ() {
        let generator = generator();
        let a = generator.get_system(SystemCoord::new(0, 0));
        let b = generator.get_system(SystemCoord::new(1, 0));
        let centers_a: Vec<_> = a.iter().map(|i| i.center()).collect();
        let centers_b: Vec<_> = b.iter().map(|i| i.center()).collect();
        assert_ne!(centers_a, centers_b);
    }

    #[test]
    fn test_instances_stay_inside_system_and_height_band() {
        let generator = generator();
        let coord = SystemCoord::new(-1, 2);
        let (ox, oz) = generator.partitioner().system_block_origin(coord);
        let span = generator.partitioner().size_blocks();
        for instance in generator.get_system(coord).iter() {
            let c = instance.center();
            assert!((ox..ox + span).contains(&c.x), "{c}");
            assert!((oz..oz + span).contains(&c.z), "{c}");
            assert!((40..=120).contains(&c.y), "{c}");
        }
    }

    #[test]
    fn test_object_count_and_spacing() {
        let generator = generator();
        let system = generator.get_system(SystemCoord::new(5, 5));
        // Empty-category slots and crowded slots may leave gaps.
        assert!(system.len() <= 30);
        assert!(!system.is_empty());
        for (i, a) in system.iter().enumerate() {
            for b in system.iter().skip(i + 1) {
                assert!(!a.too_close(b, 2.0), "{} / {}", a.center(), b.center());
            }
        }
    }

    #[test]
    fn test_empty_catalog_yields_empty_systems() {
        let generator = SystemGenerator::new(
            SystemPartitioner::new(4).unwrap(),
            Arc::new(CatalogBuilder::new().build()),
            settings(),
        );
        assert!(generator.get_system(SystemCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn test_concurrent_first_access_observes_one_result() {
        let generator = generator();
        let coord = SystemCoord::new(7, 7);
        let results: Vec<Arc<[SpheroidInstance]>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| generator.get_system(coord)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for result in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], result));
        }
    }

    #[test]
    fn test_full_width_object_range_does_not_overflow() {
        let generator = SystemGenerator::new(
            SystemPartitioner::new(4).unwrap(),
            Arc::new(CatalogBuilder::new().build()),
            GenerationSettings {
                objects_min: 0,
                objects_max: u32::MAX,
                ..settings()
            },
        );
        assert!(generator.generate_system(SystemCoord::new(2, 2)).is_empty());
    }

    #[test]
    fn test_from_config_rejects_zero_size() {
        let mut config = Config::default();
        config.world.system_size_chunks = 0;
        assert!(SystemGenerator::from_config(&config, catalog()).is_err());
    }
}
