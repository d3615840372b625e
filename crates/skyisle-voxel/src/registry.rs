//! Material registry: maps compact [`MaterialId`] values to [`MaterialDef`] metadata
//! and resolves textual material descriptors from configuration.
//!
//! The registry is built once during startup. Air is always ID 0 so that a
//! freshly allocated column reads as empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use skyisle_coords::BlockPos;
use thiserror::Error;

use crate::state::{BlockHalf, LeafSize, MaterialState, StateProps};
use crate::writer::VoxelWriter;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact material identifier stored in every voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u16);

impl MaterialId {
    pub const AIR: MaterialId = MaterialId(0);
}

/// Where a material may legally be placed, judged against its neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementRule {
    /// No constraint; the target voxel may hold anything.
    Anywhere,
    /// Target must be air and rest on a solid voxel.
    OnSolid,
    /// Like [`PlacementRule::OnSolid`], but may also rest on the same material.
    Stackable,
    /// Target must be air and hang from a solid voxel above.
    Hanging,
}

/// Full descriptor for a material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Name used in descriptors (e.g. "stone", "bamboo").
    pub name: String,
    /// Whether the material supports plants and hanging blocks.
    pub solid: bool,
    /// Placement constraint checked by decorators before writing.
    pub placement: PlacementRule,
}

impl MaterialDef {
    /// A solid block with no placement constraint.
    pub fn block(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: true,
            placement: PlacementRule::Anywhere,
        }
    }

    /// A non-solid material with the given placement rule.
    pub fn non_solid(name: &str, placement: PlacementRule) -> Self {
        Self {
            name: name.to_string(),
            solid: false,
            placement,
        }
    }
}

/// Errors that can occur during material registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A material with the same name has already been registered.
    #[error("duplicate material name: {0}")]
    DuplicateName(String),
    /// All 65 536 slots have been consumed.
    #[error("material registry is full (max 65536 materials)")]
    RegistryFull,
}

/// Errors from resolving a textual material descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaterialLookupError {
    /// No material with this name is registered.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),
    /// A `[key=value]` property could not be understood.
    #[error("invalid state property `{property}` in `{descriptor}`")]
    InvalidProperty { descriptor: String, property: String },
    /// The descriptor is not of the form `name` or `name[key=value,...]`.
    #[error("malformed material descriptor: {0}")]
    Malformed(String),
}

/// Resolves a textual descriptor (e.g. `"bamboo[leaves=small]"`) to a validated
/// material state.
pub trait MaterialLookup {
    /// # Errors
    ///
    /// Returns a [`MaterialLookupError`] when the name is unknown or the state
    /// properties are invalid.
    fn resolve(&self, descriptor: &str) -> Result<MaterialState, MaterialLookupError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`MaterialId`] → [`MaterialDef`] with O(1) lookup by index and
/// O(1) reverse lookup by name.
pub struct MaterialRegistry {
    /// Dense array where `index == MaterialId.0`.
    materials: Vec<MaterialDef>,
    name_to_id: HashMap<String, MaterialId>,
}

impl MaterialRegistry {
    /// Creates a new registry with Air pre-registered as ID 0.
    pub fn new() -> Self {
        let air = MaterialDef::non_solid("air", PlacementRule::Anywhere);
        let mut name_to_id = HashMap::new();
        name_to_id.insert(air.name.clone(), MaterialId::AIR);
        Self {
            materials: vec![air],
            name_to_id,
        }
    }

    /// Creates a registry holding [`default_materials`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for def in default_materials() {
            // Default names are unique and well under the slot limit.
            let _ = registry.register(def);
        }
        registry
    }

    /// Registers a new material and returns its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken, or
    /// [`RegistryError::RegistryFull`] when all slots are consumed.
    pub fn register(&mut self, def: MaterialDef) -> Result<MaterialId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.materials.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }
        let id = MaterialId(self.materials.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.materials.push(def);
        Ok(id)
    }

    /// Returns the definition for `id`, or `None` for ids this registry never issued.
    pub fn get(&self, id: MaterialId) -> Option<&MaterialDef> {
        self.materials.get(id.0 as usize)
    }

    /// Returns the ID for a named material.
    pub fn lookup_by_name(&self, name: &str) -> Option<MaterialId> {
        self.name_to_id.get(name).copied()
    }

    /// Default state of a named material.
    pub fn state(&self, name: &str) -> Option<MaterialState> {
        self.lookup_by_name(name).map(MaterialState::of)
    }

    /// Name of a material, `"?"` for unknown ids.
    pub fn name(&self, id: MaterialId) -> &str {
        self.get(id).map_or("?", |def| def.name.as_str())
    }

    /// Returns the total number of registered materials (including Air).
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.materials.len() <= 1
    }

    /// Returns `true` if the material is solid. Unknown ids count as non-solid.
    pub fn is_solid(&self, id: MaterialId) -> bool {
        self.get(id).is_some_and(|def| def.solid)
    }

    /// Checks whether `state` may legally occupy `pos` given the voxels around it.
    ///
    /// Positions outside the writer's height range are never valid.
    pub fn can_place_at<W: VoxelWriter + ?Sized>(
        &self,
        state: MaterialState,
        pos: BlockPos,
        writer: &W,
    ) -> bool {
        let (min_y, max_y) = writer.height_range();
        if pos.y < min_y || pos.y > max_y {
            return false;
        }
        let Some(def) = self.get(state.id) else {
            return false;
        };
        match def.placement {
            PlacementRule::Anywhere => true,
            PlacementRule::OnSolid => {
                writer.is_air_at(pos) && self.is_solid(writer.get_voxel(pos.down(1)).id)
            }
            PlacementRule::Stackable => {
                let below = writer.get_voxel(pos.down(1));
                writer.is_air_at(pos) && (self.is_solid(below.id) || below.same_material(&state))
            }
            PlacementRule::Hanging => {
                writer.is_air_at(pos) && self.is_solid(writer.get_voxel(pos.up(1)).id)
            }
        }
    }

    /// Human-readable rendering of a state, in descriptor syntax.
    pub fn describe(&self, state: &MaterialState) -> String {
        let mut props = Vec::new();
        if let Some(leaves) = state.props.leaves {
            props.push(format!("leaves={}", leaf_name(leaves)));
        }
        if let Some(half) = state.props.half {
            props.push(format!("half={}", half_name(half)));
        }
        if state.props.waterlogged {
            props.push("waterlogged=true".to_string());
        }
        if let Some(count) = state.props.count {
            props.push(format!("count={count}"));
        }
        let name = self.name(state.id);
        if props.is_empty() {
            name.to_string()
        } else {
            format!("{name}[{}]", props.join(","))
        }
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialLookup for MaterialRegistry {
    fn resolve(&self, descriptor: &str) -> Result<MaterialState, MaterialLookupError> {
        let descriptor = descriptor.trim();
        let (name, props_src) = match descriptor.split_once('[') {
            Some((name, rest)) => {
                let props = rest
                    .strip_suffix(']')
                    .ok_or_else(|| MaterialLookupError::Malformed(descriptor.to_string()))?;
                (name, Some(props))
            }
            None => (descriptor, None),
        };
        if name.is_empty() {
            return Err(MaterialLookupError::Malformed(descriptor.to_string()));
        }

        let id = self
            .lookup_by_name(name)
            .ok_or_else(|| MaterialLookupError::UnknownMaterial(name.to_string()))?;
        let mut state = MaterialState::of(id);
        if let Some(src) = props_src {
            state.props = parse_props(descriptor, src)?;
        }
        Ok(state)
    }
}

fn parse_props(descriptor: &str, src: &str) -> Result<StateProps, MaterialLookupError> {
    let mut props = StateProps::default();
    for pair in src.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = || MaterialLookupError::InvalidProperty {
            descriptor: descriptor.to_string(),
            property: pair.to_string(),
        };
        let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
        match (key.trim(), value.trim()) {
            ("leaves", "none") => props.leaves = Some(LeafSize::None),
            ("leaves", "small") => props.leaves = Some(LeafSize::Small),
            ("leaves", "large") => props.leaves = Some(LeafSize::Large),
            ("half", "lower") => props.half = Some(BlockHalf::Lower),
            ("half", "upper") => props.half = Some(BlockHalf::Upper),
            ("waterlogged", "true") => props.waterlogged = true,
            ("waterlogged", "false") => props.waterlogged = false,
            ("count" | "pickles", n) => {
                let count: u8 = n.parse().map_err(|_| invalid())?;
                if !(1..=4).contains(&count) {
                    return Err(invalid());
                }
                props.count = Some(count);
            }
            _ => return Err(invalid()),
        }
    }
    Ok(props)
}

fn leaf_name(leaves: LeafSize) -> &'static str {
    match leaves {
        LeafSize::None => "none",
        LeafSize::Small => "small",
        LeafSize::Large => "large",
    }
}

fn half_name(half: BlockHalf) -> &'static str {
    match half {
        BlockHalf::Lower => "lower",
        BlockHalf::Upper => "upper",
    }
}

/// Returns the built-in material table used by the default catalog.
pub fn default_materials() -> Vec<MaterialDef> {
    use PlacementRule::*;

    let blocks = [
        "stone",
        "cobblestone",
        "mossy_cobblestone",
        "dirt",
        "grass_block",
        "sand",
        "red_sand",
        "sandstone",
        "gravel",
        "clay",
        "mud",
        "moss_block",
        "calcite",
        "terracotta",
        "obsidian",
        "netherrack",
        "magma_block",
        "end_stone",
        "glowstone",
        "glass",
        "ice",
        "packed_ice",
        "snow_block",
        "oak_log",
        "oak_leaves",
        "birch_log",
        "birch_leaves",
        "spruce_log",
        "spruce_leaves",
        "jungle_log",
        "jungle_leaves",
        "coal_ore",
        "iron_ore",
        "copper_ore",
        "gold_ore",
        "redstone_ore",
        "lapis_ore",
        "diamond_ore",
        "emerald_ore",
        "amethyst_block",
        "prismarine",
        "prismarine_bricks",
        "dark_prismarine",
        "sea_lantern",
        "sponge",
        "brain_coral_block",
        "tube_coral_block",
        "bubble_coral_block",
        "fire_coral_block",
        "horn_coral_block",
        "chest",
        "spawner",
    ];

    let mut defs: Vec<MaterialDef> = blocks.iter().map(|name| MaterialDef::block(name)).collect();
    defs.extend([
        MaterialDef::non_solid("water", Anywhere),
        MaterialDef::non_solid("lava", Anywhere),
        MaterialDef::non_solid("brain_coral", Anywhere),
        MaterialDef::non_solid("tube_coral", Anywhere),
        MaterialDef::non_solid("bubble_coral", Anywhere),
        MaterialDef::non_solid("fire_coral", Anywhere),
        MaterialDef::non_solid("horn_coral", Anywhere),
        MaterialDef::non_solid("brain_coral_fan", Anywhere),
        MaterialDef::non_solid("tube_coral_fan", Anywhere),
        MaterialDef::non_solid("bubble_coral_fan", Anywhere),
        MaterialDef::non_solid("fire_coral_fan", Anywhere),
        MaterialDef::non_solid("horn_coral_fan", Anywhere),
        MaterialDef::non_solid("sea_pickle", Anywhere),
        MaterialDef::non_solid("short_grass", OnSolid),
        MaterialDef::non_solid("fern", OnSolid),
        MaterialDef::non_solid("dandelion", OnSolid),
        MaterialDef::non_solid("poppy", OnSolid),
        MaterialDef::non_solid("brown_mushroom", OnSolid),
        MaterialDef::non_solid("dead_bush", OnSolid),
        MaterialDef::non_solid("tall_grass", OnSolid),
        MaterialDef::non_solid("large_fern", OnSolid),
        MaterialDef::non_solid("sunflower", OnSolid),
        MaterialDef::non_solid("rose_bush", OnSolid),
        MaterialDef::non_solid("lilac", OnSolid),
        MaterialDef::non_solid("bamboo", Stackable),
        MaterialDef::non_solid("bamboo_sapling", OnSolid),
        MaterialDef::non_solid("hanging_roots", Hanging),
        MaterialDef::non_solid("spore_blossom", Hanging),
        MaterialDef::non_solid("glow_lichen", Hanging),
    ]);
    defs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
