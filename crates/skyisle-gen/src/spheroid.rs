//! Spheroid instances and their rasterization into chunk columns.
//!
//! An instance is fully resolved when it leaves its template: radius,
//! decorators, spawns, and variant materials never change afterwards.
//! Rasterization writes the voxels of the instance's bounding sphere that fall
//! inside one chunk, layering materials by the rounded distance from the
//! center.

use std::fmt::Write as _;
use std::sync::Arc;

use skyisle_coords::{BlockPos, ChunkPos};
use skyisle_voxel::{
    Attachment, EntityKind, LootHandle, MaterialRegistry, MaterialState, NO_UPDATES, VoxelWriter,
    WriteError,
};

use crate::catalog::Template;
use crate::decorator::Decorator;
use crate::seed::RandomSource;

/// A loot container resolved onto an instance.
#[derive(Clone, Debug, PartialEq)]
pub struct TreasureChest {
    pub container: MaterialState,
    pub loot: LootHandle,
}

/// Resolved variant parameters of an instance.
#[derive(Clone, Debug, PartialEq)]
pub enum SpheroidShape {
    Simple {
        material: MaterialState,
    },
    CoreShell {
        core: MaterialState,
        shell: MaterialState,
        core_radius: f32,
    },
    Layered {
        shell: MaterialState,
        shell_thickness: f32,
        fill: MaterialState,
        inner: Arc<[MaterialState]>,
        overlay: Arc<[MaterialState]>,
        treasure: Option<TreasureChest>,
    },
    Dungeon {
        shell: MaterialState,
        shell_thickness: f32,
        spawner: MaterialState,
        entity: Option<EntityKind>,
        treasure: Option<TreasureChest>,
    },
}

impl SpheroidShape {
    /// A core/shell shape whose core is kept strictly inside `radius`.
    pub fn core_shell(
        core: MaterialState,
        shell: MaterialState,
        core_radius: f32,
        radius: f32,
    ) -> Self {
        let core_radius = if core_radius >= radius {
            radius - 1.0
        } else {
            core_radius
        };
        SpheroidShape::CoreShell {
            core,
            shell,
            core_radius,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SpheroidShape::Simple { .. } => "Simple",
            SpheroidShape::CoreShell { .. } => "CoreShell",
            SpheroidShape::Layered { .. } => "Layered",
            SpheroidShape::Dungeon { .. } => "Dungeon",
        }
    }
}

/// One placed spatial object.
#[derive(Clone, Debug)]
pub struct SpheroidInstance {
    template: Arc<Template>,
    center: BlockPos,
    radius: f32,
    decorators: Vec<Arc<Decorator>>,
    spawns: Vec<(EntityKind, u32)>,
    shape: SpheroidShape,
}

/// `round(|a - b|)` as used for layering.
fn rounded_distance(a: BlockPos, b: BlockPos) -> f32 {
    libm::round(libm::sqrt(a.distance_squared(b) as f64)) as f32
}

impl SpheroidInstance {
    /// Creates an instance centered at the origin.
    pub fn new(
        template: Arc<Template>,
        radius: f32,
        decorators: Vec<Arc<Decorator>>,
        spawns: Vec<(EntityKind, u32)>,
        shape: SpheroidShape,
    ) -> Self {
        Self {
            template,
            center: BlockPos::default(),
            radius,
            decorators,
            spawns,
            shape,
        }
    }

    /// Moves the instance to `center`.
    pub fn with_center(mut self, center: BlockPos) -> Self {
        self.center = center;
        self
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn template_id(&self) -> &str {
        &self.template.id
    }

    pub fn center(&self) -> BlockPos {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The radius rounded up to whole blocks; bounds every loop over the sphere.
    pub fn ceil_radius(&self) -> i32 {
        libm::ceilf(self.radius) as i32
    }

    pub fn decorators(&self) -> &[Arc<Decorator>] {
        &self.decorators
    }

    pub fn spawns(&self) -> &[(EntityKind, u32)] {
        &self.spawns
    }

    pub fn shape(&self) -> &SpheroidShape {
        &self.shape
    }

    /// Returns `true` if the bounding sphere reaches into `chunk`'s columns.
    pub fn intersects_chunk(&self, chunk: ChunkPos) -> bool {
        let r = self.ceil_radius() as i64;
        chunk.horizontal_distance_squared(self.center.x, self.center.z) <= r * r
    }

    /// Returns `true` if the two spheres come closer than `spacing` blocks.
    pub fn too_close(&self, other: &SpheroidInstance, spacing: f64) -> bool {
        let gap = self.radius as f64 + other.radius as f64 + spacing;
        (self.center.distance_squared(other.center) as f64) < gap * gap
    }

    /// Writes this instance's voxels inside `chunk`.
    ///
    /// X and Z are clamped to the chunk, Y to the writer's height range.
    /// Returns the number of voxels written.
    pub fn rasterize<W: VoxelWriter + ?Sized>(
        &self,
        chunk: ChunkPos,
        writer: &mut W,
        rng: &mut RandomSource,
    ) -> Result<usize, WriteError> {
        let c = self.center;
        let r = self.ceil_radius();
        let (min_y, max_y) = writer.height_range();

        let min_x = c.x.saturating_sub(r).max(chunk.min_block_x());
        let max_x = c.x.saturating_add(r).min(chunk.max_block_x());
        let min_z = c.z.saturating_sub(r).max(chunk.min_block_z());
        let max_z = c.z.saturating_add(r).min(chunk.max_block_z());
        let bottom = c.y.saturating_sub(r).max(min_y);
        let top = c.y.saturating_add(r).min(max_y);

        let mut written = 0;
        for x in min_x..=max_x {
            for y in bottom..=top {
                for z in min_z..=max_z {
                    let pos = BlockPos::new(x, y, z);
                    let d = rounded_distance(c, pos);
                    if d > self.radius {
                        continue;
                    }
                    written += self.place(pos, d, writer, rng)?;
                }
            }
        }
        Ok(written)
    }

    /// Writes the voxel at distance `d` from the center. Returns the number
    /// of voxels written (the layered variant may also write the one below).
    fn place<W: VoxelWriter + ?Sized>(
        &self,
        pos: BlockPos,
        d: f32,
        writer: &mut W,
        rng: &mut RandomSource,
    ) -> Result<usize, WriteError> {
        let radius = self.radius;
        match &self.shape {
            SpheroidShape::Simple { material } => {
                writer.set_voxel(pos, *material, NO_UPDATES)?;
            }
            SpheroidShape::CoreShell {
                core,
                shell,
                core_radius,
            } => {
                let state = if d <= *core_radius { core } else { shell };
                writer.set_voxel(pos, *state, NO_UPDATES)?;
            }
            SpheroidShape::Layered {
                shell,
                shell_thickness,
                fill,
                inner,
                overlay,
                treasure,
            } => {
                if d == 0.0
                    && let Some(chest) = treasure
                {
                    place_chest(pos, chest, writer, rng)?;
                } else if d <= radius - shell_thickness - 1.0 {
                    let n = rng.next_int(7);
                    if n < 2 {
                        let variant = rng.pick(inner).copied().unwrap_or(*fill);
                        let below = pos.down(1);
                        if n == 0 && writer.get_voxel(below).same_material(fill) {
                            writer.set_voxel(below, variant, NO_UPDATES)?;
                            let over = rng.pick(overlay).copied().unwrap_or(*fill);
                            writer.set_voxel(pos, over, NO_UPDATES)?;
                            return Ok(2);
                        }
                        writer.set_voxel(pos, variant, NO_UPDATES)?;
                    } else {
                        writer.set_voxel(pos, *fill, NO_UPDATES)?;
                    }
                } else if d <= radius - shell_thickness {
                    writer.set_voxel(pos, *fill, NO_UPDATES)?;
                } else {
                    writer.set_voxel(pos, *shell, NO_UPDATES)?;
                }
            }
            SpheroidShape::Dungeon {
                shell,
                shell_thickness,
                spawner,
                entity,
                treasure,
            } => {
                if d == 0.0 {
                    writer.set_voxel(pos, *spawner, NO_UPDATES)?;
                    if let Some(entity) = entity {
                        writer.attach(
                            pos,
                            Attachment::Spawner {
                                entity: entity.clone(),
                            },
                        )?;
                    }
                } else if d <= radius - shell_thickness {
                    match treasure {
                        Some(chest) if pos == self.center.offset(1, 0, 0) => {
                            place_chest(pos, chest, writer, rng)?;
                        }
                        _ => writer.set_voxel(pos, MaterialState::AIR, NO_UPDATES)?,
                    }
                } else {
                    writer.set_voxel(pos, *shell, NO_UPDATES)?;
                }
            }
        }
        Ok(1)
    }

    /// Multi-line human-readable description.
    pub fn describe(&self, materials: &MaterialRegistry) -> String {
        let name = |state: &MaterialState| materials.describe(state);
        let mut out = format!(
            "+++ {} spheroid +++\nPosition: {}\nTemplate: {}\nRadius: {}",
            self.shape.kind_name(),
            self.center,
            self.template.id,
            self.radius
        );
        // Writing into a String cannot fail.
        let _ = match &self.shape {
            SpheroidShape::Simple { material } => write!(out, "\nBlock: {}", name(material)),
            SpheroidShape::CoreShell {
                core,
                shell,
                core_radius,
            } => write!(
                out,
                "\nShell: {}\nCore: {} (Radius: {})",
                name(shell),
                name(core),
                core_radius
            ),
            SpheroidShape::Layered {
                shell,
                shell_thickness,
                fill,
                treasure,
                ..
            } => write!(
                out,
                "\nShell: {} (Thickness: {})\nFill: {}\nTreasure: {}",
                name(shell),
                shell_thickness,
                name(fill),
                if treasure.is_some() { "yes" } else { "no" }
            ),
            SpheroidShape::Dungeon {
                shell,
                shell_thickness,
                entity,
                treasure,
                ..
            } => write!(
                out,
                "\nShell: {} (Thickness: {})\nSpawner: {}\nTreasure: {}",
                name(shell),
                shell_thickness,
                entity.as_ref().map_or("none", EntityKind::as_str),
                if treasure.is_some() { "yes" } else { "no" }
            ),
        };
        if !self.decorators.is_empty() {
            let ids: Vec<&str> = self.decorators.iter().map(|d| d.id.as_str()).collect();
            let _ = write!(out, "\nDecorators: {}", ids.join(", "));
        }
        for (entity, count) in &self.spawns {
            let _ = write!(out, "\nSpawns: {count}x {entity}");
        }
        out
    }
}

fn place_chest<W: VoxelWriter + ?Sized>(
    pos: BlockPos,
    chest: &TreasureChest,
    writer: &mut W,
    rng: &mut RandomSource,
) -> Result<(), WriteError> {
    writer.set_voxel(pos, chest.container, NO_UPDATES)?;
    writer.attach(
        pos,
        Attachment::Loot {
            table: chest.loot,
            seed: rng.next_u64(),
        },
    )
}
