//! Block, chunk, and system coordinate spaces for the spheroid world.
//!
//! Three integer coordinate spaces are used during generation:
//!
//! 1. **Block space**: absolute voxel positions ([`BlockPos`]).
//! 2. **Chunk space**: 16×16 block columns ([`ChunkPos`]), full world height.
//! 3. **System space**: square cells of `system_size_chunks`² chunks
//!    ([`SystemCoord`]) that own a deterministic set of spheroids.
//!
//! Every downward conversion uses floor division, so negative coordinates
//! resolve toward negative infinity:
//!
//! ```rust
//! use skyisle_coords::{BlockPos, ChunkPos, SystemPartitioner, SystemCoord};
//!
//! let partitioner = SystemPartitioner::new(50).unwrap();
//! assert_eq!(partitioner.chunk_to_system(ChunkPos::new(-1, -1)), SystemCoord::new(-1, -1));
//! assert_eq!(ChunkPos::from_block(BlockPos::new(-1, 70, 15)), ChunkPos::new(-1, 0));
//! ```

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of a chunk column along X and Z, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// Visitation order of the 3×3 system neighborhood: center first, then a
/// fixed ring order.
pub const NEIGHBORHOOD_OFFSETS: [(i32, i32); 9] = [
    (0, 0),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

// ---------------------------------------------------------------------------
// Block space
// ---------------------------------------------------------------------------

/// Absolute voxel position in the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the position offset by `(dx, dy, dz)`.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The block `n` positions above this one.
    pub const fn up(self, n: i32) -> Self {
        self.offset(0, n, 0)
    }

    /// The block `n` positions below this one.
    pub const fn down(self, n: i32) -> Self {
        self.offset(0, -n, 0)
    }

    /// Block center as a double-precision vector.
    pub fn as_dvec3(self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// Squared Euclidean distance to `other`, computed in `i64` to avoid overflow.
    pub fn distance_squared(self, other: BlockPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Floors a continuous position to the containing block.
    pub fn from_dvec3(v: DVec3) -> Self {
        Self::new(v.x.floor() as i32, v.y.floor() as i32, v.z.floor() as i32)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x={} y={} z={}", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Chunk space
// ---------------------------------------------------------------------------

/// A 16×16 column of blocks spanning the full world height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing `pos`.
    pub fn from_block(pos: BlockPos) -> Self {
        Self::new(pos.x.div_euclid(CHUNK_WIDTH), pos.z.div_euclid(CHUNK_WIDTH))
    }

    /// Smallest block X inside this chunk.
    pub const fn min_block_x(self) -> i32 {
        self.x * CHUNK_WIDTH
    }

    /// Smallest block Z inside this chunk.
    pub const fn min_block_z(self) -> i32 {
        self.z * CHUNK_WIDTH
    }

    /// Largest block X inside this chunk (inclusive).
    pub const fn max_block_x(self) -> i32 {
        self.min_block_x() + CHUNK_WIDTH - 1
    }

    /// Largest block Z inside this chunk (inclusive).
    pub const fn max_block_z(self) -> i32 {
        self.min_block_z() + CHUNK_WIDTH - 1
    }

    /// Returns `true` if the block's column lies inside this chunk.
    pub fn contains(self, pos: BlockPos) -> bool {
        (self.min_block_x()..=self.max_block_x()).contains(&pos.x)
            && (self.min_block_z()..=self.max_block_z()).contains(&pos.z)
    }

    /// Squared horizontal distance from `(x, z)` to the nearest point of this
    /// chunk's footprint. Zero when the point is inside.
    pub fn horizontal_distance_squared(self, x: i32, z: i32) -> i64 {
        let dx = axis_gap(x, self.min_block_x(), self.max_block_x());
        let dz = axis_gap(z, self.min_block_z(), self.max_block_z());
        dx * dx + dz * dz
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

fn axis_gap(v: i32, min: i32, max: i32) -> i64 {
    if v < min {
        (min - v) as i64
    } else if v > max {
        (v - max) as i64
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// System space
// ---------------------------------------------------------------------------

/// Index of a square partition cell ("system") in chunk space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SystemCoord {
    pub x: i32,
    pub z: i32,
}

impl SystemCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the system offset by `(dx, dz)`.
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// The 3×3 neighborhood around this system in [`NEIGHBORHOOD_OFFSETS`] order.
    pub fn neighborhood(self) -> impl Iterator<Item = SystemCoord> {
        NEIGHBORHOOD_OFFSETS
            .into_iter()
            .map(move |(dx, dz)| self.offset(dx, dz))
    }
}

impl std::fmt::Display for SystemCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}, {}>", self.x, self.z)
    }
}

/// Errors raised when constructing a [`SystemPartitioner`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// The system size must be a positive number of chunks.
    #[error("system size must be positive, got {0}")]
    NonPositiveSize(i32),
}

/// Maps chunk coordinates to the system cell that owns them and back.
///
/// The mapping depends only on the configured size. Changing the size for an
/// existing world breaks the correspondence between already generated and new
/// content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemPartitioner {
    size_chunks: i32,
}

impl SystemPartitioner {
    /// Creates a partitioner with cells of `size_chunks`² chunks.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::NonPositiveSize`] when `size_chunks <= 0`.
    pub fn new(size_chunks: i32) -> Result<Self, PartitionError> {
        if size_chunks <= 0 {
            return Err(PartitionError::NonPositiveSize(size_chunks));
        }
        Ok(Self { size_chunks })
    }

    /// Edge length of one system, in chunks.
    pub fn size_chunks(&self) -> i32 {
        self.size_chunks
    }

    /// Edge length of one system, in blocks.
    pub fn size_blocks(&self) -> i32 {
        self.size_chunks * CHUNK_WIDTH
    }

    /// The system owning `chunk`. Floors toward negative infinity.
    pub fn chunk_to_system(&self, chunk: ChunkPos) -> SystemCoord {
        SystemCoord::new(
            chunk.x.div_euclid(self.size_chunks),
            chunk.z.div_euclid(self.size_chunks),
        )
    }

    /// The system owning the block at `pos`.
    pub fn block_to_system(&self, pos: BlockPos) -> SystemCoord {
        self.chunk_to_system(ChunkPos::from_block(pos))
    }

    /// First and last chunk (inclusive) covered by `system`.
    pub fn system_chunk_span(&self, system: SystemCoord) -> (ChunkPos, ChunkPos) {
        let min = ChunkPos::new(system.x * self.size_chunks, system.z * self.size_chunks);
        let max = ChunkPos::new(min.x + self.size_chunks - 1, min.z + self.size_chunks - 1);
        (min, max)
    }

    /// Block X/Z of the system's minimum corner.
    pub fn system_block_origin(&self, system: SystemCoord) -> (i32, i32) {
        let (min, _) = self.system_chunk_span(system);
        (min.min_block_x(), min.min_block_z())
    }
}
