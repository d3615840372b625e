//! Concrete material states: a material id plus the small set of block-state
//! properties the generator cares about.

use serde::{Deserialize, Serialize};

use crate::registry::MaterialId;

/// Leaf growth on a stacked plant segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafSize {
    None,
    Small,
    Large,
}

/// Which half of a two-block-tall plant a voxel holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockHalf {
    Lower,
    Upper,
}

/// Optional block-state properties attached to a material.
///
/// An unset property means "the material's default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateProps {
    pub leaves: Option<LeafSize>,
    pub half: Option<BlockHalf>,
    pub waterlogged: bool,
    /// Stack count for cluster blocks (e.g. sea pickles), `1..=4`.
    pub count: Option<u8>,
}

/// A material together with its state properties. This is what a voxel holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialState {
    pub id: MaterialId,
    pub props: StateProps,
}

impl MaterialState {
    /// The empty voxel.
    pub const AIR: MaterialState = MaterialState {
        id: MaterialId::AIR,
        props: StateProps {
            leaves: None,
            half: None,
            waterlogged: false,
            count: None,
        },
    };

    /// Default state of a material.
    pub const fn of(id: MaterialId) -> Self {
        Self {
            id,
            props: StateProps {
                leaves: None,
                half: None,
                waterlogged: false,
                count: None,
            },
        }
    }

    pub fn is_air(&self) -> bool {
        self.id == MaterialId::AIR
    }

    /// Returns a copy with the given leaf size.
    pub fn with_leaves(mut self, leaves: LeafSize) -> Self {
        self.props.leaves = Some(leaves);
        self
    }

    /// Returns a copy with the given plant half.
    pub fn with_half(mut self, half: BlockHalf) -> Self {
        self.props.half = Some(half);
        self
    }

    /// Returns a copy with the waterlogged flag set.
    pub fn with_waterlogged(mut self, waterlogged: bool) -> Self {
        self.props.waterlogged = waterlogged;
        self
    }

    /// Returns `true` if both states hold the same material, ignoring properties.
    pub fn same_material(&self, other: &MaterialState) -> bool {
        self.id == other.id
    }
}

impl Default for MaterialState {
    fn default() -> Self {
        Self::AIR
    }
}
