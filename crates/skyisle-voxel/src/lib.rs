//! Material registry, voxel writer abstraction, and in-memory chunk columns.

pub mod attachment;
pub mod column;
pub mod registry;
pub mod state;
pub mod writer;

pub use attachment::{
    Attachment, EntityKind, LootHandle, LootResolver, LootTableSet, UnknownLootTable,
};
pub use column::{ChunkColumn, NETWORK_DIRTY, SAVE_DIRTY};
pub use registry::{
    MaterialDef, MaterialId, MaterialLookup, MaterialLookupError, MaterialRegistry, PlacementRule,
    RegistryError, default_materials,
};
pub use state::{BlockHalf, LeafSize, MaterialState, StateProps};
pub use writer::{NOTIFY_NEIGHBORS, NO_UPDATES, SYNC_CLIENTS, VoxelWriter, WriteError};
