//! Deterministic spheroid population: system partitioning, weighted template
//! selection, shape rasterization, surface decoration, and proximity queries.

mod async_generation;
mod command;
mod pipeline;
mod proximity;
mod system;

pub mod catalog;
pub mod decorator;
pub mod seed;
pub mod spheroid;
pub mod weighted;

pub use async_generation::{AsyncChunkGenerator, GeneratedChunk, GenerationTask};
pub use catalog::{
    CatalogBuilder, CatalogError, CatalogFile, EmptyCategory, Template, TemplateCatalog,
    default_catalog, load_catalog, load_catalog_file,
};
pub use command::{NOT_FOUND, locate};
pub use decorator::{Decorator, DecoratorKind, DecoratorPipeline};
pub use pipeline::{
    ChunkGenerator, ChunkReport, DEFAULT_HEIGHT, DEFAULT_MIN_Y, GenerationError, SpawnRequest,
};
pub use proximity::{Nearest, ProximityQuery};
pub use seed::RandomSource;
pub use spheroid::{SpheroidInstance, SpheroidShape, TreasureChest};
pub use system::{GenerationSettings, SystemGenerator};
pub use weighted::{NoCandidates, WeightedList};
