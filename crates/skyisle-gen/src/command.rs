//! The `locate` command: describes the spheroid closest to a position.

use skyisle_coords::BlockPos;
use skyisle_voxel::MaterialRegistry;

use crate::proximity::ProximityQuery;
use crate::system::SystemGenerator;

/// Feedback when no spheroid qualifies.
pub const NOT_FOUND: &str = "Could not determine closest spheroid.";

/// Describes the spheroid closest to `point`.
///
/// Without a template id the owning system is searched; with one, the 3×3
/// system neighborhood is searched for that template.
pub fn locate(
    systems: &SystemGenerator,
    materials: &MaterialRegistry,
    point: BlockPos,
    template: Option<&str>,
) -> String {
    if let Some(id) = template
        && systems.catalog().template(id).is_none()
    {
        return format!("Unknown template `{id}`.");
    }

    let query = ProximityQuery::new(systems);
    let nearest = match template {
        Some(id) => query.nearest_matching_template(point, id),
        None => query.nearest_to_point(point),
    };
    match nearest {
        Some(nearest) => format!(
            "{}\nDistance: {:.1}",
            nearest.instance.describe(materials),
            nearest.distance()
        ),
        None => NOT_FOUND.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::default_catalog;
    use crate::system::GenerationSettings;
    use skyisle_coords::{SystemCoord, SystemPartitioner};
    use skyisle_voxel::LootTableSet;

    fn setup() -> (SystemGenerator, MaterialRegistry) {
        let materials = MaterialRegistry::with_defaults();
        let catalog = default_catalog(&materials, &LootTableSet::with_defaults()).unwrap();
        let systems = SystemGenerator::new(
            SystemPartitioner::new(8).unwrap(),
            Arc::new(catalog),
            GenerationSettings {
                seed: 5,
                objects_min: 30,
                objects_max: 40,
                ..GenerationSettings::default()
            },
        );
        (systems, materials)
    }

    #[test]
    fn test_locate_nearest() {
        let (systems, materials) = setup();
        let out = locate(&systems, &materials, BlockPos::new(10, 100, 10), None);
        assert!(out.starts_with("+++ "), "{out}");
        assert!(out.contains("\nPosition: x="));
        assert!(out.contains("\nDistance: "));
    }

    #[test]
    fn test_locate_unknown_template() {
        let (systems, materials) = setup();
        let out = locate(&systems, &materials, BlockPos::new(0, 0, 0), Some("moon"));
        assert_eq!(out, "Unknown template `moon`.");
    }

    #[test]
    fn test_locate_by_template() {
        let (systems, materials) = setup();
        let coal = (0..16)
            .find_map(|x| {
                systems
                    .get_system(SystemCoord::new(x, 0))
                    .iter()
                    .find(|i| i.template_id() == "coal")
                    .cloned()
            })
            .unwrap();
        let out = locate(&systems, &materials, coal.center(), Some("coal"));
        assert!(out.contains("Template: coal"), "{out}");
        assert!(out.ends_with("\nDistance: 0.0"), "{out}");
    }

    #[test]
    fn test_locate_in_empty_world() {
        let materials = MaterialRegistry::with_defaults();
        let systems = SystemGenerator::new(
            SystemPartitioner::new(8).unwrap(),
            Arc::new(crate::catalog::CatalogBuilder::new().build()),
            GenerationSettings::default(),
        );
        assert_eq!(locate(&systems, &materials, BlockPos::new(1, 2, 3), None), NOT_FOUND);
    }
}
