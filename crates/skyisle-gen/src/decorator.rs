//! Surface decorators: post-processing rules that run over the exposed
//! surface of a spheroid after all base shapes of a chunk are written.
//!
//! Decorators are immutable and carry no state between invocations. Every
//! write is checked against the material's placement rule and silently
//! skipped when invalid.

use skyisle_coords::{BlockPos, ChunkPos};
use skyisle_voxel::{
    BlockHalf, LeafSize, MaterialRegistry, MaterialState, NOTIFY_NEIGHBORS, SYNC_CLIENTS,
    VoxelWriter, WriteError,
};

use crate::catalog::MaterialChoice;
use crate::seed::RandomSource;
use crate::spheroid::SpheroidInstance;

/// Flags for decoration writes: neighbors re-check, clients sync.
const DECORATION_FLAGS: u32 = NOTIFY_NEIGHBORS | SYNC_CLIENTS;

/// Exclusive upper bound of a stacked plant's drawn height.
const STACK_HEIGHT_BOUND: u32 = 8;

/// A decoration rule with its per-surface-voxel trigger chance.
#[derive(Clone, Debug)]
pub struct Decorator {
    pub id: String,
    pub chance: f32,
    pub kind: DecoratorKind,
}

#[derive(Clone, Debug)]
pub enum DecoratorKind {
    /// A single block on top of the surface.
    GroundCover { block: MaterialChoice },
    /// A column of stacked segments (bamboo-like) or, sometimes, a sapling.
    Stacked {
        block: MaterialState,
        sapling: MaterialState,
        sapling_chance: f32,
    },
    /// A two-block-tall plant: lower and upper half.
    DoubleTall { block: MaterialState },
    /// A block hanging below the bottom surface.
    Hanging { block: MaterialState },
}

impl DecoratorKind {
    fn uses_bottom_surface(&self) -> bool {
        matches!(self, DecoratorKind::Hanging { .. })
    }
}

/// Leaf state of segment `i` in a stacked plant of the given height.
pub fn stacked_leaves(i: u32, height: u32) -> LeafSize {
    if i == 3 && height < 5 {
        LeafSize::None
    } else if i > 4 {
        LeafSize::Large
    } else if i > 2 {
        LeafSize::Small
    } else {
        LeafSize::None
    }
}

// ---------------------------------------------------------------------------
// Surface collection
// ---------------------------------------------------------------------------

/// Columns of the instance's horizontal footprint that lie inside `chunk`.
fn footprint(instance: &SpheroidInstance, chunk: ChunkPos) -> impl Iterator<Item = (i32, i32)> {
    let center = instance.center();
    let r = instance.ceil_radius();
    let r_sq = r as i64 * r as i64;
    let xs = center.x.saturating_sub(r).max(chunk.min_block_x())
        ..=center.x.saturating_add(r).min(chunk.max_block_x());
    let zs = center.z.saturating_sub(r).max(chunk.min_block_z())
        ..=center.z.saturating_add(r).min(chunk.max_block_z());
    xs.flat_map(move |x| zs.clone().map(move |z| (x, z)))
        .filter(move |&(x, z)| {
            let dx = (x - center.x) as i64;
            let dz = (z - center.z) as i64;
            dx * dx + dz * dz <= r_sq
        })
}

/// First non-air voxel per footprint column, scanning down from the top of
/// the instance's bounding box to its bottom.
pub fn top_surface<W: VoxelWriter + ?Sized>(
    instance: &SpheroidInstance,
    chunk: ChunkPos,
    writer: &W,
) -> Vec<BlockPos> {
    let center = instance.center();
    let r = instance.ceil_radius();
    let (min_y, max_y) = writer.height_range();
    let top = (center.y + r).min(max_y);
    let bottom = (center.y - r).max(min_y);
    footprint(instance, chunk)
        .filter_map(|(x, z)| {
            (bottom..=top)
                .rev()
                .map(|y| BlockPos::new(x, y, z))
                .find(|pos| !writer.is_air_at(*pos))
        })
        .collect()
}

/// First non-air voxel per footprint column, scanning up from the bottom of
/// the instance's bounding box to its center.
pub fn bottom_surface<W: VoxelWriter + ?Sized>(
    instance: &SpheroidInstance,
    chunk: ChunkPos,
    writer: &W,
) -> Vec<BlockPos> {
    let center = instance.center();
    let r = instance.ceil_radius();
    let (min_y, max_y) = writer.height_range();
    let bottom = (center.y - r).max(min_y);
    let top = center.y.min(max_y);
    footprint(instance, chunk)
        .filter_map(|(x, z)| {
            (bottom..=top)
                .map(|y| BlockPos::new(x, y, z))
                .find(|pos| !writer.is_air_at(*pos))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Decoration
// ---------------------------------------------------------------------------

impl Decorator {
    /// Decorates one instance's surface inside `chunk`. Returns the number of
    /// voxels written.
    pub fn decorate<W: VoxelWriter + ?Sized>(
        &self,
        instance: &SpheroidInstance,
        chunk: ChunkPos,
        writer: &mut W,
        materials: &MaterialRegistry,
        rng: &mut RandomSource,
    ) -> Result<usize, WriteError> {
        let surface = if self.kind.uses_bottom_surface() {
            bottom_surface(instance, chunk, writer)
        } else {
            top_surface(instance, chunk, writer)
        };

        let mut placer = Placer {
            writer,
            materials,
            written: 0,
        };
        for pos in surface {
            match &self.kind {
                DecoratorKind::GroundCover { block } => {
                    if rng.chance(self.chance) {
                        placer.place(block.pick(rng), pos.up(1))?;
                    }
                }
                DecoratorKind::Stacked {
                    block,
                    sapling,
                    sapling_chance,
                } => {
                    if !rng.chance(self.chance) {
                        continue;
                    }
                    if rng.chance(*sapling_chance) {
                        placer.place(*sapling, pos.up(1))?;
                    } else {
                        let height = rng.next_int(STACK_HEIGHT_BOUND);
                        for i in 1..height {
                            let segment = block.with_leaves(stacked_leaves(i, height));
                            placer.place(segment, pos.up(i as i32))?;
                        }
                    }
                }
                DecoratorKind::DoubleTall { block } => {
                    let eligible = !placer.writer.is_air_at(pos)
                        && placer.writer.is_air_at(pos.up(1))
                        && placer.writer.is_air_at(pos.up(2));
                    if eligible && rng.chance(self.chance) {
                        let lower = block.with_half(BlockHalf::Lower);
                        let upper = block.with_half(BlockHalf::Upper);
                        let (_, max_y) = placer.writer.height_range();
                        if pos.y + 2 <= max_y
                            && placer.materials.can_place_at(lower, pos.up(1), &*placer.writer)
                        {
                            placer.write(lower, pos.up(1))?;
                            placer.write(upper, pos.up(2))?;
                        }
                    }
                }
                DecoratorKind::Hanging { block } => {
                    if rng.chance(self.chance) {
                        placer.place(*block, pos.down(1))?;
                    }
                }
            }
        }
        Ok(placer.written)
    }
}

/// Writes decorations after checking placement rules.
struct Placer<'a, W: VoxelWriter + ?Sized> {
    writer: &'a mut W,
    materials: &'a MaterialRegistry,
    written: usize,
}

impl<W: VoxelWriter + ?Sized> Placer<'_, W> {
    /// Writes `state` at `pos` if its placement rule allows it there.
    fn place(&mut self, state: MaterialState, pos: BlockPos) -> Result<(), WriteError> {
        if self.materials.can_place_at(state, pos, &*self.writer) {
            self.write(state, pos)?;
        }
        Ok(())
    }

    fn write(&mut self, state: MaterialState, pos: BlockPos) -> Result<(), WriteError> {
        self.writer.set_voxel(pos, state, DECORATION_FLAGS)?;
        self.written += 1;
        Ok(())
    }
}

/// Runs an instance's resolved decorators, in order, over one chunk.
pub struct DecoratorPipeline<'a> {
    materials: &'a MaterialRegistry,
}

impl<'a> DecoratorPipeline<'a> {
    pub fn new(materials: &'a MaterialRegistry) -> Self {
        Self { materials }
    }

    /// Decorates `instance` inside `chunk`. Returns the number of voxels written.
    pub fn run<W: VoxelWriter + ?Sized>(
        &self,
        instance: &SpheroidInstance,
        chunk: ChunkPos,
        writer: &mut W,
        rng: &mut RandomSource,
    ) -> Result<usize, WriteError> {
        let mut written = 0;
        for decorator in instance.decorators() {
            let placed = decorator.decorate(instance, chunk, writer, self.materials, rng)?;
            tracing::trace!(
                "decorator `{}` placed {} voxels on `{}` in chunk {}",
                decorator.id,
                placed,
                instance.template_id(),
                chunk
            );
            written += placed;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{FloatRange, ShapeTemplate, Template};
    use crate::spheroid::SpheroidShape;
    use skyisle_voxel::ChunkColumn;

    fn registry() -> MaterialRegistry {
        MaterialRegistry::with_defaults()
    }

    fn state(registry: &MaterialRegistry, name: &str) -> MaterialState {
        registry.state(name).unwrap()
    }

    /// A radius-3 grass sphere at (8, 20, 8) with the given decorator.
    fn decorated_sphere(registry: &MaterialRegistry, decorator: Decorator) -> SpheroidInstance {
        let material = state(registry, "grass_block");
        let template = Arc::new(Template {
            id: "test:grass".into(),
            radius: FloatRange::new(3.0, 3.0),
            decorators: Vec::new(),
            spawns: Vec::new(),
            shape: ShapeTemplate::Simple {
                material: MaterialChoice::one(material),
            },
        });
        SpheroidInstance::new(
            template,
            3.0,
            vec![Arc::new(decorator)],
            Vec::new(),
            SpheroidShape::Simple { material },
        )
        .with_center(BlockPos::new(8, 20, 8))
    }

    fn rasterized(instance: &SpheroidInstance) -> ChunkColumn {
        let mut column = ChunkColumn::new(ChunkPos::new(0, 0), 0, 64);
        instance
            .rasterize(ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(0))
            .unwrap();
        column
    }

    #[test]
    fn test_stacked_leaf_bands() {
        assert_eq!(stacked_leaves(1, 7), LeafSize::None);
        assert_eq!(stacked_leaves(2, 7), LeafSize::None);
        assert_eq!(stacked_leaves(3, 4), LeafSize::None);
        assert_eq!(stacked_leaves(3, 7), LeafSize::Small);
        assert_eq!(stacked_leaves(4, 7), LeafSize::Small);
        assert_eq!(stacked_leaves(5, 7), LeafSize::Large);
        assert_eq!(stacked_leaves(6, 7), LeafSize::Large);
    }

    #[test]
    fn test_top_and_bottom_surfaces() {
        let registry = registry();
        let decorator = Decorator {
            id: "none".into(),
            chance: 0.0,
            kind: DecoratorKind::Hanging {
                block: state(&registry, "hanging_roots"),
            },
        };
        let instance = decorated_sphere(&registry, decorator);
        let column = rasterized(&instance);

        let top = top_surface(&instance, ChunkPos::new(0, 0), &column);
        assert!(top.contains(&BlockPos::new(8, 23, 8)));
        assert!(top.iter().all(|pos| column.is_air_at(pos.up(1))));

        let bottom = bottom_surface(&instance, ChunkPos::new(0, 0), &column);
        assert!(bottom.contains(&BlockPos::new(8, 17, 8)));
        assert_eq!(top.len(), bottom.len());
    }

    #[test]
    fn test_ground_cover_places_on_every_surface_voxel() {
        let registry = registry();
        let grass = state(&registry, "short_grass");
        let decorator = Decorator {
            id: "cover".into(),
            chance: 1.0,
            kind: DecoratorKind::GroundCover {
                block: MaterialChoice::one(grass),
            },
        };
        let instance = decorated_sphere(&registry, decorator);
        let mut column = rasterized(&instance);
        let surface = top_surface(&instance, ChunkPos::new(0, 0), &column);

        let pipeline = DecoratorPipeline::new(&registry);
        let written = pipeline
            .run(&instance, ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(1))
            .unwrap();
        assert_eq!(written, surface.len());
        for pos in surface {
            assert_eq!(column.get_voxel(pos.up(1)), grass);
        }
    }

    #[test]
    fn test_double_tall_writes_both_halves() {
        let registry = registry();
        let flower = state(&registry, "sunflower");
        let decorator = Decorator {
            id: "tall".into(),
            chance: 1.0,
            kind: DecoratorKind::DoubleTall { block: flower },
        };
        let instance = decorated_sphere(&registry, decorator);
        let mut column = rasterized(&instance);
        DecoratorPipeline::new(&registry)
            .run(&instance, ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(2))
            .unwrap();

        let summit = BlockPos::new(8, 23, 8);
        assert_eq!(column.get_voxel(summit.up(1)), flower.with_half(BlockHalf::Lower));
        assert_eq!(column.get_voxel(summit.up(2)), flower.with_half(BlockHalf::Upper));
    }

    #[test]
    fn test_hanging_block_below_bottom_surface() {
        let registry = registry();
        let roots = state(&registry, "hanging_roots");
        let decorator = Decorator {
            id: "roots".into(),
            chance: 1.0,
            kind: DecoratorKind::Hanging { block: roots },
        };
        let instance = decorated_sphere(&registry, decorator);
        let mut column = rasterized(&instance);
        DecoratorPipeline::new(&registry)
            .run(&instance, ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(3))
            .unwrap();
        assert_eq!(column.get_voxel(BlockPos::new(8, 16, 8)), roots);
    }

    #[test]
    fn test_stacked_segments_use_leaf_bands() {
        let registry = registry();
        let bamboo = state(&registry, "bamboo");
        let decorator = Decorator {
            id: "bamboo".into(),
            chance: 1.0,
            kind: DecoratorKind::Stacked {
                block: bamboo,
                sapling: state(&registry, "bamboo_sapling"),
                sapling_chance: 0.0,
            },
        };
        let instance = decorated_sphere(&registry, decorator);
        let mut column = rasterized(&instance);
        let surface = top_surface(&instance, ChunkPos::new(0, 0), &column);
        DecoratorPipeline::new(&registry)
            .run(&instance, ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(4))
            .unwrap();

        for pos in surface {
            let mut height = 1;
            while column.get_voxel(pos.up(height)).same_material(&bamboo) {
                height += 1;
            }
            // Segments are 1..height, so at most 6 stand on one voxel.
            assert!(height - 1 <= 6);
            let segments = (height - 1) as u32;
            for i in 1..height {
                let leaves = column.get_voxel(pos.up(i)).props.leaves;
                assert_eq!(leaves, Some(stacked_leaves(i as u32, segments + 1)));
            }
        }
    }

    #[test]
    fn test_zero_chance_writes_nothing() {
        let registry = registry();
        let decorator = Decorator {
            id: "never".into(),
            chance: 0.0,
            kind: DecoratorKind::GroundCover {
                block: MaterialChoice::one(state(&registry, "poppy")),
            },
        };
        let instance = decorated_sphere(&registry, decorator);
        let mut column = rasterized(&instance);
        let before = column.version();
        let written = DecoratorPipeline::new(&registry)
            .run(&instance, ChunkPos::new(0, 0), &mut column, &mut RandomSource::new(5))
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(column.version(), before);
    }
}
