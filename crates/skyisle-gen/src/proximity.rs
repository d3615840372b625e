//! Nearest-spheroid lookups around a block position.

use skyisle_coords::BlockPos;

use crate::spheroid::SpheroidInstance;
use crate::system::SystemGenerator;

/// A spheroid found by a proximity query.
#[derive(Clone, Debug)]
pub struct Nearest {
    pub instance: SpheroidInstance,
    /// Squared distance from the query point to the instance center.
    pub distance_squared: i64,
}

impl Nearest {
    pub fn distance(&self) -> f64 {
        (self.distance_squared as f64).sqrt()
    }
}

/// Read-only queries over the system content of a [`SystemGenerator`].
pub struct ProximityQuery<'a> {
    systems: &'a SystemGenerator,
}

impl<'a> ProximityQuery<'a> {
    pub fn new(systems: &'a SystemGenerator) -> Self {
        Self { systems }
    }

    /// The spheroid of the system owning `point` whose center is closest to it.
    ///
    /// Only the owning system is scanned; a closer spheroid just across a
    /// system border is not considered.
    pub fn nearest_to_point(&self, point: BlockPos) -> Option<Nearest> {
        let coord = self.systems.partitioner().block_to_system(point);
        let system = self.systems.get_system(coord);
        closest(point, system.iter())
    }

    /// The closest spheroid of template `template_id` around `point`.
    ///
    /// Scans the owning system and its eight neighbors, center first. The
    /// result is the closest match of the first system that has any match,
    /// which is not necessarily the globally closest one.
    pub fn nearest_matching_template(&self, point: BlockPos, template_id: &str) -> Option<Nearest> {
        let origin = self.systems.partitioner().block_to_system(point);
        origin.neighborhood().find_map(|coord| {
            let system = self.systems.get_system(coord);
            closest(
                point,
                system
                    .iter()
                    .filter(|instance| instance.template_id() == template_id),
            )
        })
    }
}

fn closest<'s>(
    point: BlockPos,
    instances: impl Iterator<Item = &'s SpheroidInstance>,
) -> Option<Nearest> {
    let mut best: Option<(&SpheroidInstance, i64)> = None;
    for instance in instances {
        let d = instance.center().distance_squared(point);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((instance, d));
        }
    }
    best.map(|(instance, distance_squared)| Nearest {
        instance: instance.clone(),
        distance_squared,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{CatalogBuilder, FloatRange, MaterialChoice, ShapeTemplate, Template};
    use crate::system::GenerationSettings;
    use skyisle_coords::{SystemCoord, SystemPartitioner};
    use skyisle_voxel::{MaterialId, MaterialState};

    fn template(id: &str) -> Template {
        Template {
            id: id.to_string(),
            radius: FloatRange::new(2.0, 4.0),
            decorators: Vec::new(),
            spawns: Vec::new(),
            shape: ShapeTemplate::Simple {
                material: MaterialChoice::one(MaterialState::of(MaterialId(1))),
            },
        }
    }

    fn generator(rare_weight: Option<f64>) -> SystemGenerator {
        let mut builder = CatalogBuilder::new();
        builder.category("rock", 1.0).unwrap();
        builder.register("rock", 50.0, template("common")).unwrap();
        if let Some(weight) = rare_weight {
            builder.register("rock", weight, template("rare")).unwrap();
        }
        let settings = GenerationSettings {
            seed: 7,
            objects_min: 10,
            objects_max: 15,
            height_min: 60,
            height_max: 90,
            min_spacing: 1.0,
            placement_attempts: 8,
        };
        SystemGenerator::new(
            SystemPartitioner::new(4).unwrap(),
            Arc::new(builder.build()),
            settings,
        )
    }

    #[test]
    fn test_nearest_to_point_is_minimum_of_owning_system() {
        let generator = generator(None);
        let query = ProximityQuery::new(&generator);
        let point = BlockPos::new(20, 70, 20);
        let nearest = query.nearest_to_point(point).unwrap();

        let system = generator.get_system(SystemCoord::new(0, 0));
        let min = system
            .iter()
            .map(|i| i.center().distance_squared(point))
            .min()
            .unwrap();
        assert_eq!(nearest.distance_squared, min);
    }

    #[test]
    fn test_negative_points_resolve_to_negative_system() {
        let generator = generator(None);
        let query = ProximityQuery::new(&generator);
        let nearest = query.nearest_to_point(BlockPos::new(-1, 70, -1)).unwrap();
        let c = nearest.instance.center();
        assert!(c.x < 0 && c.z < 0, "{c}");
    }

    #[test]
    fn test_no_match_returns_none() {
        let generator = generator(None);
        let query = ProximityQuery::new(&generator);
        assert!(
            query
                .nearest_matching_template(BlockPos::new(0, 64, 0), "rare")
                .is_none()
        );
    }

    #[test]
    fn test_match_comes_from_first_system_with_any_match() {
        let generator = generator(Some(5.0));
        let query = ProximityQuery::new(&generator);
        let point = BlockPos::new(30, 70, 30);
        let found = query.nearest_matching_template(point, "rare").unwrap();
        assert_eq!(found.instance.template_id(), "rare");

        let origin = generator.partitioner().block_to_system(point);
        let first = origin
            .neighborhood()
            .find(|coord| {
                generator
                    .get_system(*coord)
                    .iter()
                    .any(|i| i.template_id() == "rare")
            })
            .unwrap();
        let owner = generator
            .partitioner()
            .block_to_system(found.instance.center());
        assert_eq!(owner, first);

        let best_in_first = generator
            .get_system(first)
            .iter()
            .filter(|i| i.template_id() == "rare")
            .map(|i| i.center().distance_squared(point))
            .min()
            .unwrap();
        assert_eq!(found.distance_squared, best_in_first);
    }
}
