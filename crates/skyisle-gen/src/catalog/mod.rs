//! Template catalog: categories of weighted templates, built once through a
//! [`CatalogBuilder`] and immutable afterwards.

mod loader;
mod template;

use std::sync::Arc;

use hashbrown::HashMap;
use thiserror::Error;

use crate::seed::RandomSource;
use crate::weighted::{NoCandidates, WeightedList, validate_weight};

pub use loader::{
    CatalogFile, CategoryDef, DecoratorDef, DecoratorKindDef, MaterialSet, ShapeDef, SpawnDefFile,
    TemplateDef, TreasureDefFile, default_catalog, load_catalog, load_catalog_file,
};
pub use template::{
    FloatRange, IntRange, MaterialChoice, ShapeTemplate, SpawnDef, Template, TreasureDef,
};

/// Fatal catalog problems, reported at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[source] ron::error::SpannedError),

    #[error("`{owner}`: weight must be positive and finite, got {weight}")]
    InvalidWeight { owner: String, weight: f64 },

    #[error("`{owner}`: chance must be within [0, 1], got {chance}")]
    InvalidChance { owner: String, chance: f32 },

    #[error("template `{template}`: {field} minimum {min} exceeds maximum {max}")]
    InvalidRange {
        template: String,
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("template `{template}` references unknown category `{category}`")]
    UnknownCategory { template: String, category: String },

    #[error("template `{template}` references unknown decorator `{decorator}`")]
    UnknownDecorator { template: String, decorator: String },

    #[error("duplicate category `{0}`")]
    DuplicateCategory(String),

    #[error("duplicate template id `{0}`")]
    DuplicateTemplate(String),

    #[error("duplicate decorator id `{0}`")]
    DuplicateDecorator(String),
}

/// A category had nothing to draw; the slot stays empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("category `{0}` has no templates")]
pub struct EmptyCategory(pub String);

struct CategoryEntry {
    tag: String,
    weight: f64,
    templates: WeightedList<Arc<Template>>,
}

/// Collects categories and templates during the single initialization phase.
#[derive(Default)]
pub struct CatalogBuilder {
    categories: Vec<CategoryEntry>,
    category_index: HashMap<String, usize>,
    template_ids: HashMap<String, String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a category with its selection weight.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate tag or a non-positive weight.
    pub fn category(&mut self, tag: &str, weight: f64) -> Result<&mut Self, CatalogError> {
        if self.category_index.contains_key(tag) {
            return Err(CatalogError::DuplicateCategory(tag.to_string()));
        }
        let weight = validate_weight(weight).map_err(|e| CatalogError::InvalidWeight {
            owner: tag.to_string(),
            weight: e.0,
        })?;
        self.category_index
            .insert(tag.to_string(), self.categories.len());
        self.categories.push(CategoryEntry {
            tag: tag.to_string(),
            weight,
            templates: WeightedList::new(),
        });
        Ok(self)
    }

    /// Registers `template` under a declared category.
    ///
    /// # Errors
    ///
    /// Fails on an undeclared category, a duplicate template id, or a
    /// non-positive weight.
    pub fn register(
        &mut self,
        category: &str,
        weight: f64,
        template: Template,
    ) -> Result<&mut Self, CatalogError> {
        let &index = self
            .category_index
            .get(category)
            .ok_or_else(|| CatalogError::UnknownCategory {
                template: template.id.clone(),
                category: category.to_string(),
            })?;
        if self.template_ids.contains_key(&template.id) {
            return Err(CatalogError::DuplicateTemplate(template.id));
        }
        let id = template.id.clone();
        self.categories[index]
            .templates
            .push(Arc::new(template), weight)
            .map_err(|e| CatalogError::InvalidWeight {
                owner: id.clone(),
                weight: e.0,
            })?;
        self.template_ids.insert(id, category.to_string());
        Ok(self)
    }

    /// Freezes the catalog.
    pub fn build(self) -> TemplateCatalog {
        let mut by_id = HashMap::new();
        let mut categories = Vec::with_capacity(self.categories.len());
        let mut category_weights = WeightedList::new();
        for (index, entry) in self.categories.into_iter().enumerate() {
            for (template, _) in entry.templates.iter() {
                by_id.insert(template.id.clone(), Arc::clone(template));
            }
            if entry.templates.is_empty() {
                tracing::debug!("catalog category `{}` has no templates", entry.tag);
            }
            // Weights were validated on declaration.
            let _ = category_weights.push(index, entry.weight);
            categories.push(Category {
                tag: entry.tag,
                templates: entry.templates,
            });
        }
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.tag.clone(), i))
            .collect();
        TemplateCatalog {
            categories,
            category_weights,
            index,
            by_id,
        }
    }
}

struct Category {
    tag: String,
    templates: WeightedList<Arc<Template>>,
}

/// Immutable, shareable set of templates grouped by category.
pub struct TemplateCatalog {
    categories: Vec<Category>,
    category_weights: WeightedList<usize>,
    index: HashMap<String, usize>,
    by_id: HashMap<String, Arc<Template>>,
}

impl TemplateCatalog {
    /// Draws a category by its weight.
    pub fn draw_category(&self, rng: &mut RandomSource) -> Result<&str, NoCandidates> {
        let &index = self.category_weights.pick(rng)?;
        Ok(&self.categories[index].tag)
    }

    /// Draws a template from `category` by template weight.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCategory`] when the category holds no templates or does
    /// not exist; the caller places nothing for this attempt.
    pub fn draw_one(
        &self,
        category: &str,
        rng: &mut RandomSource,
    ) -> Result<Arc<Template>, EmptyCategory> {
        self.index
            .get(category)
            .and_then(|&i| self.categories[i].templates.pick(rng).ok())
            .cloned()
            .ok_or_else(|| EmptyCategory(category.to_string()))
    }

    /// Looks up a template by id.
    pub fn template(&self, id: &str) -> Option<&Arc<Template>> {
        self.by_id.get(id)
    }

    /// Category tags in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.tag.as_str())
    }

    /// Templates of `category` with their weights, in registration order.
    pub fn templates_in(&self, category: &str) -> Vec<(&Arc<Template>, f64)> {
        self.index
            .get(category)
            .map(|&i| self.categories[i].templates.iter().collect())
            .unwrap_or_default()
    }

    /// All template ids, sorted.
    pub fn template_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
