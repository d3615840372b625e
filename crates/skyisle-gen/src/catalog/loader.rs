//! RON catalog files and their resolution against the material and loot
//! registries.
//!
//! Structural mistakes (bad weights or ranges, unknown categories or
//! decorators, duplicate ids) fail the whole load. Unknown materials and loot
//! tables only degrade the affected content: a template with an unknown
//! material is skipped, an unknown entry inside a multi-choice set is dropped,
//! and an unknown loot table leaves the template without treasure.

use std::path::Path;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use skyisle_voxel::{EntityKind, LootHandle, LootResolver, MaterialLookup, MaterialState};

use super::template::{
    FloatRange, IntRange, MaterialChoice, ShapeTemplate, SpawnDef, Template, TreasureDef,
};
use super::{CatalogBuilder, CatalogError, TemplateCatalog};
use crate::decorator::{Decorator, DecoratorKind};
use crate::weighted::{WeightedList, validate_weight};

const DEFAULT_CATALOG: &str = include_str!("../../data/default_catalog.ron");

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// Top-level catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub categories: Vec<CategoryDef>,
    pub decorators: Vec<DecoratorDef>,
    pub templates: Vec<TemplateDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    pub tag: String,
    pub weight: f64,
}

/// A material descriptor, or weighted alternatives picked per instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MaterialSet {
    One(String),
    AnyOf(Vec<(String, f64)>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoratorDef {
    pub id: String,
    /// Per-surface-voxel trigger chance.
    pub chance: f32,
    pub kind: DecoratorKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DecoratorKindDef {
    GroundCover {
        blocks: MaterialSet,
    },
    Stacked {
        block: String,
        sapling: String,
        sapling_chance: f32,
    },
    DoubleTall {
        block: String,
    },
    Hanging {
        block: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnDefFile {
    pub entity: String,
    pub chance: f32,
    pub min_count: u32,
    pub max_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasureDefFile {
    pub container: String,
    pub loot_table: String,
    pub chance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeDef {
    Simple {
        material: MaterialSet,
    },
    CoreShell {
        core: MaterialSet,
        shell: MaterialSet,
        min_core_radius: i32,
        max_core_radius: i32,
    },
    Layered {
        shell: MaterialSet,
        min_shell_thickness: i32,
        max_shell_thickness: i32,
        fill: String,
        inner: Vec<String>,
        overlay: Vec<String>,
        #[serde(default)]
        treasure: Option<TreasureDefFile>,
    },
    Dungeon {
        shell: MaterialSet,
        min_shell_thickness: i32,
        max_shell_thickness: i32,
        spawner: String,
        entities: Vec<(String, f64)>,
        container: String,
        #[serde(default)]
        loot_table: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    pub id: String,
    pub category: String,
    pub weight: f64,
    pub min_radius: f32,
    pub max_radius: f32,
    /// `(decorator id, chance an instance receives it)`, in application order.
    #[serde(default)]
    pub decorators: Vec<(String, f32)>,
    #[serde(default)]
    pub spawns: Vec<SpawnDefFile>,
    pub shape: ShapeDef,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parses and resolves a catalog from RON source.
pub fn load_catalog<M, L>(
    source: &str,
    materials: &M,
    loot: &L,
) -> Result<TemplateCatalog, CatalogError>
where
    M: MaterialLookup + ?Sized,
    L: LootResolver + ?Sized,
{
    let file: CatalogFile = ron::from_str(source).map_err(CatalogError::Parse)?;
    file.resolve(materials, loot)
}

/// Reads, parses, and resolves a catalog file.
pub fn load_catalog_file<M, L>(
    path: &Path,
    materials: &M,
    loot: &L,
) -> Result<TemplateCatalog, CatalogError>
where
    M: MaterialLookup + ?Sized,
    L: LootResolver + ?Sized,
{
    let source = std::fs::read_to_string(path).map_err(CatalogError::Read)?;
    tracing::info!("Loading catalog from {}", path.display());
    load_catalog(&source, materials, loot)
}

/// The catalog shipped with the crate.
pub fn default_catalog<M, L>(materials: &M, loot: &L) -> Result<TemplateCatalog, CatalogError>
where
    M: MaterialLookup + ?Sized,
    L: LootResolver + ?Sized,
{
    load_catalog(DEFAULT_CATALOG, materials, loot)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl CatalogFile {
    /// Validates the file and resolves every name it references.
    pub fn resolve<M, L>(&self, materials: &M, loot: &L) -> Result<TemplateCatalog, CatalogError>
    where
        M: MaterialLookup + ?Sized,
        L: LootResolver + ?Sized,
    {
        let resolver = Resolver { materials, loot };

        let mut builder = CatalogBuilder::new();
        for category in &self.categories {
            builder.category(&category.tag, category.weight)?;
        }

        let mut decorators: HashMap<&str, Option<Arc<Decorator>>> = HashMap::new();
        for def in &self.decorators {
            if decorators.contains_key(def.id.as_str()) {
                return Err(CatalogError::DuplicateDecorator(def.id.clone()));
            }
            let decorator = resolver.decorator(def)?;
            if decorator.is_none() {
                tracing::warn!("decorator `{}` disabled", def.id);
            }
            decorators.insert(def.id.as_str(), decorator.map(Arc::new));
        }

        let mut seen = HashSet::new();
        let mut disabled = 0usize;
        for def in &self.templates {
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateTemplate(def.id.clone()));
            }
            if !self.categories.iter().any(|c| c.tag == def.category) {
                return Err(CatalogError::UnknownCategory {
                    template: def.id.clone(),
                    category: def.category.clone(),
                });
            }
            validate_weight(def.weight).map_err(|e| CatalogError::InvalidWeight {
                owner: def.id.clone(),
                weight: e.0,
            })?;
            match resolver.template(def, &decorators)? {
                Some(template) => {
                    builder.register(&def.category, def.weight, template)?;
                }
                None => {
                    tracing::warn!("template `{}` disabled", def.id);
                    disabled += 1;
                }
            }
        }

        let catalog = builder.build();
        tracing::info!(
            "Catalog ready: {} templates in {} categories ({} disabled)",
            catalog.len(),
            self.categories.len(),
            disabled
        );
        Ok(catalog)
    }
}

struct Resolver<'a, M: ?Sized, L: ?Sized> {
    materials: &'a M,
    loot: &'a L,
}

fn check_chance(owner: &str, chance: f32) -> Result<f32, CatalogError> {
    if (0.0..=1.0).contains(&chance) {
        Ok(chance)
    } else {
        Err(CatalogError::InvalidChance {
            owner: owner.to_string(),
            chance,
        })
    }
}

fn check_range<T: Into<f64> + PartialOrd + Copy>(
    template: &str,
    field: &'static str,
    min: T,
    max: T,
) -> Result<(), CatalogError> {
    if min > max {
        return Err(CatalogError::InvalidRange {
            template: template.to_string(),
            field,
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(())
}

fn check_non_negative(template: &str, field: &'static str, min: i32) -> Result<(), CatalogError> {
    if min < 0 {
        return Err(CatalogError::InvalidTemplate {
            template: template.to_string(),
            reason: format!("{field} must not be negative, got {min}"),
        });
    }
    Ok(())
}

impl<M, L> Resolver<'_, M, L>
where
    M: MaterialLookup + ?Sized,
    L: LootResolver + ?Sized,
{
    /// A single descriptor. Unknown → warning and `None`.
    fn state(&self, owner: &str, descriptor: &str) -> Option<MaterialState> {
        match self.materials.resolve(descriptor) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!("`{}`: {}", owner, err);
                None
            }
        }
    }

    /// A material set. Bad entries of a multi-choice set are dropped; `None`
    /// when nothing usable is left.
    fn choice(
        &self,
        owner: &str,
        set: &MaterialSet,
    ) -> Result<Option<MaterialChoice>, CatalogError> {
        match set {
            MaterialSet::One(descriptor) => {
                Ok(self.state(owner, descriptor).map(MaterialChoice::one))
            }
            MaterialSet::AnyOf(options) => {
                let mut list = WeightedList::new();
                for (descriptor, weight) in options {
                    let weight = validate_weight(*weight).map_err(|e| {
                        CatalogError::InvalidWeight {
                            owner: format!("{owner}/{descriptor}"),
                            weight: e.0,
                        }
                    })?;
                    if let Some(state) = self.state(owner, descriptor) {
                        // Already validated.
                        let _ = list.push(state, weight);
                    }
                }
                Ok(MaterialChoice::from_weighted(list))
            }
        }
    }

    /// A uniform variant list. Unknown entries are dropped; `None` when a
    /// non-empty list lost every entry.
    fn list(&self, owner: &str, names: &[String]) -> Option<Arc<[MaterialState]>> {
        let states: Vec<MaterialState> = names
            .iter()
            .filter_map(|name| self.state(owner, name))
            .collect();
        if states.is_empty() && !names.is_empty() {
            return None;
        }
        Some(Arc::from(states))
    }

    fn loot_table(&self, owner: &str, id: &str) -> Option<LootHandle> {
        match self.loot.resolve_loot(id) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!("`{}`: {}; treasure disabled", owner, err);
                None
            }
        }
    }

    fn decorator(&self, def: &DecoratorDef) -> Result<Option<Decorator>, CatalogError> {
        let owner = def.id.as_str();
        let chance = check_chance(owner, def.chance)?;
        let kind = match &def.kind {
            DecoratorKindDef::GroundCover { blocks } => self
                .choice(owner, blocks)?
                .map(|block| DecoratorKind::GroundCover { block }),
            DecoratorKindDef::Stacked {
                block,
                sapling,
                sapling_chance,
            } => {
                let sapling_chance = check_chance(owner, *sapling_chance)?;
                match (self.state(owner, block), self.state(owner, sapling)) {
                    (Some(block), Some(sapling)) => Some(DecoratorKind::Stacked {
                        block,
                        sapling,
                        sapling_chance,
                    }),
                    _ => None,
                }
            }
            DecoratorKindDef::DoubleTall { block } => self
                .state(owner, block)
                .map(|block| DecoratorKind::DoubleTall { block }),
            DecoratorKindDef::Hanging { block } => self
                .state(owner, block)
                .map(|block| DecoratorKind::Hanging { block }),
        };
        Ok(kind.map(|kind| Decorator {
            id: def.id.clone(),
            chance,
            kind,
        }))
    }

    fn template(
        &self,
        def: &TemplateDef,
        decorators: &HashMap<&str, Option<Arc<Decorator>>>,
    ) -> Result<Option<Template>, CatalogError> {
        let owner = def.id.as_str();
        if !(def.min_radius > 0.0 && def.min_radius.is_finite() && def.max_radius.is_finite()) {
            return Err(CatalogError::InvalidTemplate {
                template: def.id.clone(),
                reason: format!("radius must be positive, got {}", def.min_radius),
            });
        }
        check_range(owner, "radius", def.min_radius, def.max_radius)?;

        let mut resolved_decorators = Vec::with_capacity(def.decorators.len());
        for (id, chance) in &def.decorators {
            let chance = check_chance(owner, *chance)?;
            match decorators.get(id.as_str()) {
                None => {
                    return Err(CatalogError::UnknownDecorator {
                        template: def.id.clone(),
                        decorator: id.clone(),
                    });
                }
                Some(None) => tracing::debug!("`{}`: skipping disabled decorator `{}`", owner, id),
                Some(Some(decorator)) => resolved_decorators.push((Arc::clone(decorator), chance)),
            }
        }

        let mut spawns = Vec::with_capacity(def.spawns.len());
        for spawn in &def.spawns {
            check_chance(owner, spawn.chance)?;
            check_range(owner, "spawn count", spawn.min_count, spawn.max_count)?;
            spawns.push(SpawnDef {
                entity: EntityKind::new(spawn.entity.as_str()),
                chance: spawn.chance,
                min_count: spawn.min_count,
                max_count: spawn.max_count,
            });
        }

        let Some(shape) = self.shape(owner, &def.shape)? else {
            return Ok(None);
        };

        Ok(Some(Template {
            id: def.id.clone(),
            radius: FloatRange::new(def.min_radius, def.max_radius),
            decorators: resolved_decorators,
            spawns,
            shape,
        }))
    }

    fn shape(&self, owner: &str, def: &ShapeDef) -> Result<Option<ShapeTemplate>, CatalogError> {
        let shape = match def {
            ShapeDef::Simple { material } => self
                .choice(owner, material)?
                .map(|material| ShapeTemplate::Simple { material }),
            ShapeDef::CoreShell {
                core,
                shell,
                min_core_radius,
                max_core_radius,
            } => {
                check_non_negative(owner, "core radius", *min_core_radius)?;
                check_range(owner, "core radius", *min_core_radius, *max_core_radius)?;
                match (self.choice(owner, core)?, self.choice(owner, shell)?) {
                    (Some(core), Some(shell)) => Some(ShapeTemplate::CoreShell {
                        core,
                        shell,
                        core_radius: IntRange::new(*min_core_radius, *max_core_radius),
                    }),
                    _ => None,
                }
            }
            ShapeDef::Layered {
                shell,
                min_shell_thickness,
                max_shell_thickness,
                fill,
                inner,
                overlay,
                treasure,
            } => {
                check_non_negative(owner, "shell thickness", *min_shell_thickness)?;
                check_range(
                    owner,
                    "shell thickness",
                    *min_shell_thickness,
                    *max_shell_thickness,
                )?;
                let treasure_def = match treasure {
                    Some(t) => {
                        check_chance(owner, t.chance)?;
                        match self.state(owner, &t.container) {
                            Some(container) => Some(
                                self.loot_table(owner, &t.loot_table)
                                    .map(|loot| TreasureDef {
                                        container,
                                        loot,
                                        chance: t.chance,
                                    }),
                            ),
                            // Unknown container material disables the template.
                            None => return Ok(None),
                        }
                    }
                    None => Some(None),
                };
                match (
                    self.choice(owner, shell)?,
                    self.state(owner, fill),
                    self.list(owner, inner),
                    self.list(owner, overlay),
                    treasure_def,
                ) {
                    (Some(shell), Some(fill), Some(inner), Some(overlay), Some(treasure)) => {
                        Some(ShapeTemplate::Layered {
                            shell,
                            shell_thickness: IntRange::new(
                                *min_shell_thickness,
                                *max_shell_thickness,
                            ),
                            fill,
                            inner,
                            overlay,
                            treasure,
                        })
                    }
                    _ => None,
                }
            }
            ShapeDef::Dungeon {
                shell,
                min_shell_thickness,
                max_shell_thickness,
                spawner,
                entities,
                container,
                loot_table,
            } => {
                check_non_negative(owner, "shell thickness", *min_shell_thickness)?;
                check_range(
                    owner,
                    "shell thickness",
                    *min_shell_thickness,
                    *max_shell_thickness,
                )?;
                let mut entity_list = WeightedList::new();
                for (entity, weight) in entities {
                    entity_list
                        .push(EntityKind::new(entity.as_str()), *weight)
                        .map_err(|e| CatalogError::InvalidWeight {
                            owner: format!("{owner}/{entity}"),
                            weight: e.0,
                        })?;
                }
                let loot = loot_table
                    .as_deref()
                    .and_then(|id| self.loot_table(owner, id));
                match (
                    self.choice(owner, shell)?,
                    self.state(owner, spawner),
                    self.state(owner, container),
                ) {
                    (Some(shell), Some(spawner), Some(container)) => {
                        Some(ShapeTemplate::Dungeon {
                            shell,
                            shell_thickness: IntRange::new(
                                *min_shell_thickness,
                                *max_shell_thickness,
                            ),
                            spawner,
                            entities: entity_list,
                            container,
                            loot,
                        })
                    }
                    _ => None,
                }
            }
        };
        Ok(shape)
    }
}
