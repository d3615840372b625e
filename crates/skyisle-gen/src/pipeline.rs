//! Chunk population: gathers the spheroids reaching into a chunk, rasterizes
//! them, runs their decorators, and resolves their spawn requests.

use std::sync::Arc;

use glam::DVec3;
use skyisle_config::Config;
use skyisle_coords::{ChunkPos, PartitionError};
use skyisle_voxel::{ChunkColumn, EntityKind, MaterialRegistry, VoxelWriter, WriteError};
use thiserror::Error;

use crate::catalog::TemplateCatalog;
use crate::decorator::{DecoratorPipeline, top_surface};
use crate::seed::{RandomSource, derive_chunk_seed, derive_decoration_seed, derive_spawn_seed};
use crate::spheroid::SpheroidInstance;
use crate::system::SystemGenerator;

/// Default lowest block Y of a generated column.
pub const DEFAULT_MIN_Y: i32 = -64;
/// Default number of block layers of a generated column.
pub const DEFAULT_HEIGHT: usize = 384;

/// Errors that abort the population of one chunk.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to write chunk {chunk}: {source}")]
    Write {
        chunk: ChunkPos,
        #[source]
        source: WriteError,
    },
}

/// An entity group the host should spawn once the chunk is live.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    pub entity: EntityKind,
    pub count: u32,
    /// Feet position: horizontally centered on the block above the surface.
    pub position: DVec3,
    pub template_id: String,
}

/// Summary of one populated chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkReport {
    pub chunk: ChunkPos,
    /// Spheroids that reached into the chunk.
    pub spheroids: usize,
    /// Voxels written by shape rasterization.
    pub voxels_written: usize,
    /// Voxels written by decorators.
    pub decorations_written: usize,
    pub spawns: Vec<SpawnRequest>,
}

/// Populates chunks from the shared system content.
#[derive(Clone)]
pub struct ChunkGenerator {
    systems: Arc<SystemGenerator>,
    materials: Arc<MaterialRegistry>,
    min_y: i32,
    height: usize,
}

impl ChunkGenerator {
    pub fn new(systems: Arc<SystemGenerator>, materials: Arc<MaterialRegistry>) -> Self {
        Self {
            systems,
            materials,
            min_y: DEFAULT_MIN_Y,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Builds the system generator and column extent from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the configured system size is not positive.
    pub fn from_config(
        config: &Config,
        catalog: Arc<TemplateCatalog>,
        materials: Arc<MaterialRegistry>,
    ) -> Result<Self, PartitionError> {
        let systems = SystemGenerator::from_config(config, catalog)?;
        Ok(Self::new(Arc::new(systems), materials)
            .with_column_extent(config.world.min_y, config.world.height as usize))
    }

    /// Sets the vertical extent of columns built by [`generate_column`](Self::generate_column).
    pub fn with_column_extent(mut self, min_y: i32, height: usize) -> Self {
        self.min_y = min_y;
        self.height = height;
        self
    }

    pub fn systems(&self) -> &Arc<SystemGenerator> {
        &self.systems
    }

    pub fn materials(&self) -> &Arc<MaterialRegistry> {
        &self.materials
    }

    /// Spheroids of the owning system and its neighbors whose bounding sphere
    /// reaches into `chunk`, in neighborhood order.
    pub fn spheroids_in_chunk(&self, chunk: ChunkPos) -> Vec<SpheroidInstance> {
        let owner = self.systems.partitioner().chunk_to_system(chunk);
        owner
            .neighborhood()
            .flat_map(|coord| {
                let system = self.systems.get_system(coord);
                system
                    .iter()
                    .filter(|instance| instance.intersects_chunk(chunk))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Writes every spheroid reaching into `chunk` through `writer`.
    ///
    /// All shapes are rasterized before any decorator runs, so decorators
    /// see the finished surface of overlapping spheroids.
    ///
    /// # Errors
    ///
    /// A rejected write aborts the chunk with [`GenerationError::Write`].
    pub fn populate_chunk<W: VoxelWriter + ?Sized>(
        &self,
        chunk: ChunkPos,
        writer: &mut W,
    ) -> Result<ChunkReport, GenerationError> {
        let seed = self.systems.settings().seed;
        let instances = self.spheroids_in_chunk(chunk);
        let write_err = |source| GenerationError::Write { chunk, source };

        let mut report = ChunkReport {
            chunk,
            spheroids: instances.len(),
            ..ChunkReport::default()
        };

        let mut rng = RandomSource::new(derive_chunk_seed(seed, chunk));
        for instance in &instances {
            rng.set_seed(derive_chunk_seed(seed, chunk));
            report.voxels_written += instance
                .rasterize(chunk, writer, &mut rng)
                .map_err(write_err)?;
        }

        let decorators = DecoratorPipeline::new(&self.materials);
        for instance in &instances {
            rng.set_seed(derive_decoration_seed(seed, chunk));
            report.decorations_written += decorators
                .run(instance, chunk, writer, &mut rng)
                .map_err(write_err)?;
        }

        rng.set_seed(derive_spawn_seed(seed, chunk));
        for instance in &instances {
            if instance.spawns().is_empty() || !chunk.contains(instance.center()) {
                continue;
            }
            let surface = top_surface(instance, chunk, &*writer);
            for (entity, count) in instance.spawns() {
                let Some(ground) = rng.pick(&surface) else {
                    tracing::trace!(
                        "no surface for `{}` spawns of `{}` in chunk {}",
                        entity,
                        instance.template_id(),
                        chunk
                    );
                    break;
                };
                let feet = ground.up(1);
                report.spawns.push(SpawnRequest {
                    entity: entity.clone(),
                    count: *count,
                    position: DVec3::new(feet.x as f64 + 0.5, feet.y as f64, feet.z as f64 + 0.5),
                    template_id: instance.template_id().to_string(),
                });
            }
        }

        tracing::trace!(
            "Populated chunk {}: {} spheroids, {} voxels, {} decorations, {} spawns",
            chunk,
            report.spheroids,
            report.voxels_written,
            report.decorations_written,
            report.spawns.len()
        );
        Ok(report)
    }

    /// Populates a fresh in-memory column for `chunk`.
    pub fn generate_column(
        &self,
        chunk: ChunkPos,
    ) -> Result<(ChunkColumn, ChunkReport), GenerationError> {
        let mut column = ChunkColumn::new(chunk, self.min_y, self.height);
        let report = self.populate_chunk(chunk, &mut column)?;
        Ok((column, report))
    }
}
