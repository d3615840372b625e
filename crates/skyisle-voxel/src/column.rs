//! In-memory chunk column: a 16×H×16 voxel volume with palette compression,
//! per-voxel attachments, dirty tracking, and versioning.
//!
//! Positions are absolute [`BlockPos`] values. Reads outside the column return
//! air; writes outside it fail with [`WriteError::OutOfBounds`].

use rustc_hash::FxHashMap;
use skyisle_coords::{BlockPos, CHUNK_WIDTH, ChunkPos};

use crate::attachment::Attachment;
use crate::state::MaterialState;
use crate::writer::{SYNC_CLIENTS, VoxelWriter, WriteError};

/// Dirty-flag bit: column needs saving.
pub const SAVE_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: column needs network sync.
pub const NETWORK_DIRTY: u8 = 0b0000_0010;

const WIDTH: usize = CHUNK_WIDTH as usize;

/// Palette-compressed voxel storage for one chunk column.
///
/// A column that was never written holds a single palette entry (air) and no
/// index storage.
#[derive(Clone, Debug)]
pub struct ChunkColumn {
    pos: ChunkPos,
    min_y: i32,
    height: usize,
    /// Distinct states present in the column. Entry 0 is air.
    palette: Vec<MaterialState>,
    /// Palette indices, x fastest then z then y. Empty until the first
    /// non-air write.
    indices: Vec<u16>,
    attachments: FxHashMap<BlockPos, Attachment>,
    dirty: u8,
    version: u64,
}

impl ChunkColumn {
    /// Creates an all-air column for `pos` spanning `height` blocks from `min_y`.
    pub fn new(pos: ChunkPos, min_y: i32, height: usize) -> Self {
        Self {
            pos,
            min_y,
            height,
            palette: vec![MaterialState::AIR],
            indices: Vec::new(),
            attachments: FxHashMap::default(),
            dirty: 0,
            version: 0,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` if `pos` lies inside this column.
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.local_index(pos).is_some()
    }

    /// Number of distinct states stored, including air.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Attachment at `pos`, if any.
    pub fn attachment(&self, pos: BlockPos) -> Option<&Attachment> {
        self.attachments.get(&pos)
    }

    /// All attachments, in no particular order.
    pub fn attachments(&self) -> impl Iterator<Item = (&BlockPos, &Attachment)> {
        self.attachments.iter()
    }

    /// Number of non-air voxels.
    pub fn solid_count(&self) -> usize {
        self.indices.iter().filter(|&&i| i != 0).count()
    }

    /// Iterates all non-air voxels as `(position, state)`.
    pub fn iter_non_air(&self) -> impl Iterator<Item = (BlockPos, MaterialState)> + '_ {
        self.indices
            .iter()
            .enumerate()
            .filter(|(_, idx)| **idx != 0)
            .map(|(linear, idx)| (self.position_of(linear), self.palette[*idx as usize]))
    }

    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if the specified dirty flag (or combination) is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    /// Clears the specified dirty flag bits.
    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Monotonically increasing version counter, incremented on each mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn local_index(&self, pos: BlockPos) -> Option<usize> {
        if !self.pos.contains(pos) {
            return None;
        }
        let ly = pos.y.checked_sub(self.min_y)?;
        if ly < 0 || ly as usize >= self.height {
            return None;
        }
        let lx = (pos.x - self.pos.min_block_x()) as usize;
        let lz = (pos.z - self.pos.min_block_z()) as usize;
        Some(lx + lz * WIDTH + ly as usize * WIDTH * WIDTH)
    }

    fn position_of(&self, linear: usize) -> BlockPos {
        let lx = linear % WIDTH;
        let lz = (linear / WIDTH) % WIDTH;
        let ly = linear / (WIDTH * WIDTH);
        BlockPos::new(
            self.pos.min_block_x() + lx as i32,
            self.min_y + ly as i32,
            self.pos.min_block_z() + lz as i32,
        )
    }

    fn palette_index_or_insert(&mut self, state: MaterialState) -> u16 {
        if let Some(idx) = self.palette.iter().position(|s| *s == state) {
            return idx as u16;
        }
        self.palette.push(state);
        (self.palette.len() - 1) as u16
    }

    fn mark_mutated(&mut self, flags: u32) {
        self.dirty |= SAVE_DIRTY;
        if flags & SYNC_CLIENTS != 0 {
            self.dirty |= NETWORK_DIRTY;
        }
        self.version += 1;
    }
}

impl VoxelWriter for ChunkColumn {
    fn set_voxel(
        &mut self,
        pos: BlockPos,
        state: MaterialState,
        flags: u32,
    ) -> Result<(), WriteError> {
        let linear = self.local_index(pos).ok_or(WriteError::OutOfBounds(pos))?;
        let idx = self.palette_index_or_insert(state);
        if self.indices.is_empty() {
            if idx == 0 {
                return Ok(());
            }
            self.indices = vec![0; WIDTH * WIDTH * self.height];
        }
        self.indices[linear] = idx;
        if idx == 0 {
            self.attachments.remove(&pos);
        }
        self.mark_mutated(flags);
        Ok(())
    }

    fn get_voxel(&self, pos: BlockPos) -> MaterialState {
        match (self.local_index(pos), self.indices.is_empty()) {
            (Some(linear), false) => self.palette[self.indices[linear] as usize],
            _ => MaterialState::AIR,
        }
    }

    fn attach(&mut self, pos: BlockPos, attachment: Attachment) -> Result<(), WriteError> {
        if !self.contains(pos) {
            return Err(WriteError::OutOfBounds(pos));
        }
        tracing::trace!("attaching {:?} at {}", attachment, pos);
        self.attachments.insert(pos, attachment);
        self.mark_mutated(SYNC_CLIENTS);
        Ok(())
    }

    fn height_range(&self) -> (i32, i32) {
        (self.min_y, self.min_y + self.height as i32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{EntityKind, LootHandle};
    use crate::registry::MaterialId;
    use crate::writer::NO_UPDATES;

    fn stone() -> MaterialState {
        MaterialState::of(MaterialId(1))
    }

    #[test]
    fn test_new_column_is_air() {
        let column = ChunkColumn::new(ChunkPos::new(-2, 3), -64, 384);
        assert!(column.is_air_at(BlockPos::new(-32, 0, 48)));
        assert_eq!(column.height_range(), (-64, 319));
        assert_eq!(column.solid_count(), 0);
        assert_eq!(column.version(), 0);
    }

    #[test]
    fn test_set_then_get_with_negative_chunk() {
        let mut column = ChunkColumn::new(ChunkPos::new(-1, -1), 0, 32);
        let pos = BlockPos::new(-16, 5, -1);
        column.set_voxel(pos, stone(), NO_UPDATES).unwrap();
        assert_eq!(column.get_voxel(pos), stone());
        assert!(column.is_air_at(pos.up(1)));
        assert_eq!(column.solid_count(), 1);
        assert_eq!(column.iter_non_air().collect::<Vec<_>>(), vec![(pos, stone())]);
    }

    #[test]
    fn test_out_of_bounds_write_fails() {
        let mut column = ChunkColumn::new(ChunkPos::new(0, 0), 0, 16);
        let outside = [
            BlockPos::new(16, 0, 0),
            BlockPos::new(0, 16, 0),
            BlockPos::new(0, -1, 0),
            BlockPos::new(0, 0, -1),
        ];
        for pos in outside {
            assert_eq!(
                column.set_voxel(pos, stone(), NO_UPDATES),
                Err(WriteError::OutOfBounds(pos))
            );
            assert!(column.is_air_at(pos));
        }
        assert_eq!(column.version(), 0);
    }

    #[test]
    fn test_air_write_on_fresh_column_keeps_it_unallocated() {
        let mut column = ChunkColumn::new(ChunkPos::new(0, 0), 0, 16);
        column
            .set_voxel(BlockPos::new(1, 1, 1), MaterialState::AIR, NO_UPDATES)
            .unwrap();
        assert_eq!(column.version(), 0);
        assert_eq!(column.palette_len(), 1);
    }

    #[test]
    fn test_dirty_flags_follow_write_flags() {
        let mut column = ChunkColumn::new(ChunkPos::new(0, 0), 0, 16);
        column.set_voxel(BlockPos::new(0, 0, 0), stone(), NO_UPDATES).unwrap();
        assert!(column.is_dirty(SAVE_DIRTY));
        assert!(!column.is_dirty(NETWORK_DIRTY));
        column.set_voxel(BlockPos::new(1, 0, 0), stone(), SYNC_CLIENTS).unwrap();
        assert!(column.is_dirty(SAVE_DIRTY | NETWORK_DIRTY));
        column.clear_dirty(SAVE_DIRTY | NETWORK_DIRTY);
        assert_eq!(column.dirty_flags(), 0);
        assert_eq!(column.version(), 2);
    }

    #[test]
    fn test_attachments_cleared_when_voxel_removed() {
        let mut column = ChunkColumn::new(ChunkPos::new(0, 0), 0, 16);
        let pos = BlockPos::new(4, 4, 4);
        column.set_voxel(pos, stone(), NO_UPDATES).unwrap();
        column
            .attach(pos, Attachment::Spawner { entity: EntityKind::new("zombie") })
            .unwrap();
        assert!(matches!(column.attachment(pos), Some(Attachment::Spawner { .. })));
        column.set_voxel(pos, MaterialState::AIR, NO_UPDATES).unwrap();
        assert!(column.attachment(pos).is_none());

        let outside = BlockPos::new(40, 4, 4);
        let loot = Attachment::Loot { table: LootHandle(0), seed: 1 };
        assert_eq!(column.attach(outside, loot), Err(WriteError::OutOfBounds(outside)));
    }
}
