//! The write interface generation code uses to touch voxels.

use skyisle_coords::BlockPos;
use thiserror::Error;

use crate::attachment::Attachment;
use crate::state::MaterialState;

/// Write without notifying anything.
pub const NO_UPDATES: u32 = 0;
/// Neighboring voxels should re-check their state.
pub const NOTIFY_NEIGHBORS: u32 = 1;
/// Connected clients should receive the change.
pub const SYNC_CLIENTS: u32 = 2;

/// Errors returned by a [`VoxelWriter`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("position {0} is outside the writable region")]
    OutOfBounds(BlockPos),
}

/// Random-access voxel storage that generation writes through.
///
/// Reads outside the writable region return air.
pub trait VoxelWriter {
    /// Replaces the voxel at `pos`. `flags` is a bitset of [`NOTIFY_NEIGHBORS`]
    /// and [`SYNC_CLIENTS`]; storage without listeners may ignore it.
    fn set_voxel(&mut self, pos: BlockPos, state: MaterialState, flags: u32)
    -> Result<(), WriteError>;

    /// Returns the voxel at `pos`.
    fn get_voxel(&self, pos: BlockPos) -> MaterialState;

    /// Returns `true` if the voxel at `pos` is air.
    fn is_air_at(&self, pos: BlockPos) -> bool {
        self.get_voxel(pos).is_air()
    }

    /// Attaches out-of-band data (loot, spawner entity) to the voxel at `pos`.
    fn attach(&mut self, pos: BlockPos, attachment: Attachment) -> Result<(), WriteError>;

    /// Inclusive `(min_y, max_y)` of writable positions.
    fn height_range(&self) -> (i32, i32);
}
