//! Immutable template definitions and their instantiation into spheroids.

use std::sync::Arc;

use skyisle_voxel::{EntityKind, LootHandle, MaterialState};

use crate::decorator::Decorator;
use crate::seed::RandomSource;
use crate::spheroid::{SpheroidInstance, SpheroidShape, TreasureChest};
use crate::weighted::WeightedList;

/// Inclusive float range, `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut RandomSource) -> f32 {
        rng.range_f32(self.min, self.max)
    }
}

/// Inclusive integer range, `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut RandomSource) -> i32 {
        rng.range_i32(self.min, self.max)
    }
}

/// One material, or a weighted set of alternatives picked per instance.
#[derive(Clone, Debug)]
pub struct MaterialChoice {
    options: WeightedList<MaterialState>,
}

impl MaterialChoice {
    /// A choice with a single option.
    pub fn one(state: MaterialState) -> Self {
        let mut options = WeightedList::new();
        // Weight 1.0 is always valid.
        let _ = options.push(state, 1.0);
        Self { options }
    }

    /// Wraps a weighted set. Returns `None` when the set is empty.
    pub fn from_weighted(options: WeightedList<MaterialState>) -> Option<Self> {
        (!options.is_empty()).then_some(Self { options })
    }

    /// Picks one option. A single-option choice still consumes one draw.
    pub fn pick(&self, rng: &mut RandomSource) -> MaterialState {
        self.options
            .pick(rng)
            .copied()
            .unwrap_or(MaterialState::AIR)
    }

    pub fn options(&self) -> impl Iterator<Item = (&MaterialState, f64)> {
        self.options.iter()
    }
}

/// An entity that may spawn at an instance, with its count range.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnDef {
    pub entity: EntityKind,
    /// Probability that an instance gets this spawn at all.
    pub chance: f32,
    pub min_count: u32,
    pub max_count: u32,
}

/// A loot container an instance may carry at its center.
#[derive(Clone, Debug, PartialEq)]
pub struct TreasureDef {
    pub container: MaterialState,
    pub loot: LootHandle,
    /// Probability that an instance carries the container.
    pub chance: f32,
}

/// Variant-specific shape parameters of a template.
#[derive(Clone, Debug)]
pub enum ShapeTemplate {
    /// Solid sphere of one material.
    Simple { material: MaterialChoice },
    /// Solid sphere with a core of a second material.
    CoreShell {
        core: MaterialChoice,
        shell: MaterialChoice,
        core_radius: IntRange,
    },
    /// Shell around a fluid-filled interior sprinkled with inner variants.
    Layered {
        shell: MaterialChoice,
        shell_thickness: IntRange,
        fill: MaterialState,
        inner: Arc<[MaterialState]>,
        overlay: Arc<[MaterialState]>,
        treasure: Option<TreasureDef>,
    },
    /// Hollow room around a spawner, optionally with a loot container.
    Dungeon {
        shell: MaterialChoice,
        shell_thickness: IntRange,
        spawner: MaterialState,
        entities: WeightedList<EntityKind>,
        container: MaterialState,
        loot: Option<LootHandle>,
    },
}

impl ShapeTemplate {
    /// Variant name used in descriptions and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShapeTemplate::Simple { .. } => "Simple",
            ShapeTemplate::CoreShell { .. } => "CoreShell",
            ShapeTemplate::Layered { .. } => "Layered",
            ShapeTemplate::Dungeon { .. } => "Dungeon",
        }
    }
}

/// An immutable object category definition.
#[derive(Clone, Debug)]
pub struct Template {
    pub id: String,
    pub radius: FloatRange,
    /// Candidate decorators with the chance an instance receives each.
    pub decorators: Vec<(Arc<Decorator>, f32)>,
    pub spawns: Vec<SpawnDef>,
    pub shape: ShapeTemplate,
}

impl Template {
    /// Derives an instance purely from `rng`.
    ///
    /// Draw order: radius, decorators (declared order), spawns (declared
    /// order), then the variant parameters. The center is left at the origin
    /// for the caller to place.
    pub fn instantiate(self: &Arc<Self>, rng: &mut RandomSource) -> SpheroidInstance {
        let radius = self.radius.sample(rng);

        let decorators: Vec<Arc<Decorator>> = self
            .decorators
            .iter()
            .filter(|(_, chance)| rng.chance(*chance))
            .map(|(decorator, _)| Arc::clone(decorator))
            .collect();

        let mut spawns: Vec<(EntityKind, u32)> = Vec::new();
        for spawn in &self.spawns {
            if rng.chance(spawn.chance) {
                let count = rng.range_u32(spawn.min_count, spawn.max_count);
                spawns.push((spawn.entity.clone(), count));
            }
        }

        let shape = match &self.shape {
            ShapeTemplate::Simple { material } => SpheroidShape::Simple {
                material: material.pick(rng),
            },
            ShapeTemplate::CoreShell {
                core,
                shell,
                core_radius,
            } => {
                let core_radius = core_radius.sample(rng).min(radius as i32 - 1);
                let (core, shell) = (core.pick(rng), shell.pick(rng));
                SpheroidShape::core_shell(core, shell, core_radius as f32, radius)
            }
            ShapeTemplate::Layered {
                shell,
                shell_thickness,
                fill,
                inner,
                overlay,
                treasure,
            } => {
                let shell_thickness = shell_thickness.sample(rng) as f32;
                let shell = shell.pick(rng);
                let treasure = treasure.as_ref().and_then(|t| {
                    rng.chance(t.chance).then_some(TreasureChest {
                        container: t.container,
                        loot: t.loot,
                    })
                });
                SpheroidShape::Layered {
                    shell,
                    shell_thickness,
                    fill: *fill,
                    inner: Arc::clone(inner),
                    overlay: Arc::clone(overlay),
                    treasure,
                }
            }
            ShapeTemplate::Dungeon {
                shell,
                shell_thickness,
                spawner,
                entities,
                container,
                loot,
            } => {
                let shell_thickness = shell_thickness.sample(rng) as f32;
                let shell = shell.pick(rng);
                let entity = entities.pick(rng).ok().cloned();
                SpheroidShape::Dungeon {
                    shell,
                    shell_thickness,
                    spawner: *spawner,
                    entity,
                    treasure: loot.map(|loot| TreasureChest {
                        container: *container,
                        loot,
                    }),
                }
            }
        };

        SpheroidInstance::new(Arc::clone(self), radius, decorators, spawns, shape)
    }
}
