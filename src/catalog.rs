//! Per-node-type traits consumed by placement, moves and the reference
//! energy.
//!
//! Lookup falls back from the full type (`Path/Full`) to its base type
//! (`Path`) and then to the catalog default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::Vec3;

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn default_half_extents() -> Option<Vec3> {
    Some([0.5, 0.5, 0.5])
}

fn default_path_width() -> f64 {
    1.0
}

fn default_vertex_count() -> usize {
    3
}

fn default_vertex_spacing() -> f64 {
    2.0
}

fn default_angle_limit_deg() -> f64 {
    60.0
}

fn default_length_limit() -> f64 {
    1.0
}

// -- Paths ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTraits {
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub is_intersection: bool,
    #[serde(default = "default_path_width")]
    pub width: f64,
    /// Control vertices laid out when the path is first placed.
    #[serde(default = "default_vertex_count")]
    pub vertex_count: usize,
    #[serde(default = "default_vertex_spacing")]
    pub vertex_spacing: f64,
    #[serde(default)]
    pub fix_start_x: bool,
    #[serde(default)]
    pub fix_start_z: bool,
    #[serde(default)]
    pub fix_end_x: bool,
    #[serde(default)]
    pub fix_end_z: bool,
    /// Paths owned by an object may overlap that object's footprint.
    #[serde(default)]
    pub ignore_owner_collider: bool,
    #[serde(default = "default_angle_limit_deg")]
    pub angle_limit_deg: f64,
    #[serde(default = "default_length_limit")]
    pub length_limit: f64,
}

impl Default for PathTraits {
    fn default() -> Self {
        PathTraits {
            is_root: false,
            is_intersection: false,
            width: default_path_width(),
            vertex_count: default_vertex_count(),
            vertex_spacing: default_vertex_spacing(),
            fix_start_x: false,
            fix_start_z: false,
            fix_end_x: false,
            fix_end_z: false,
            ignore_owner_collider: false,
            angle_limit_deg: default_angle_limit_deg(),
            length_limit: default_length_limit(),
        }
    }
}

// -- Nodes ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTraits {
    /// Half size of the object's box, measured from its base centre.
    /// `None` for objects without a collider (pure groups).
    #[serde(default = "default_half_extents")]
    pub half_extents: Option<Vec3>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_position_move: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_rotation_move: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_swap_move: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathTraits>,
}

impl Default for NodeTraits {
    fn default() -> Self {
        NodeTraits {
            half_extents: default_half_extents(),
            allow_position_move: true,
            allow_rotation_move: true,
            allow_swap_move: true,
            path: None,
        }
    }
}

impl NodeTraits {
    /// Box half extents, or a degenerate box for collider-less objects.
    pub fn extents(&self) -> Vec3 {
        self.half_extents.unwrap_or([0.0; 3])
    }

    fn fixed() -> Self {
        NodeTraits {
            allow_position_move: false,
            allow_rotation_move: false,
            allow_swap_move: false,
            ..NodeTraits::default()
        }
    }

    fn with_extents(mut self, half_extents: Option<Vec3>) -> Self {
        self.half_extents = half_extents;
        self
    }

    fn with_path(mut self, path: PathTraits) -> Self {
        self.path = Some(path);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeCatalog {
    #[serde(default)]
    pub types: BTreeMap<String, NodeTraits>,
    #[serde(default)]
    pub default: NodeTraits,
}

impl NodeCatalog {
    pub fn get(&self, node_type: &str) -> &NodeTraits {
        if let Some(traits) = self.types.get(node_type) {
            return traits;
        }
        node_type
            .split_once('/')
            .and_then(|(base, _)| self.types.get(base))
            .unwrap_or(&self.default)
    }

    pub fn insert(&mut self, node_type: impl Into<String>, traits: NodeTraits) {
        self.types.insert(node_type.into(), traits);
    }

    /// Traits for the node types of the built-in grammars.
    pub fn builtin() -> Self {
        let mut catalog = NodeCatalog::default();
        let swap_only = NodeTraits {
            allow_rotation_move: false,
            ..NodeTraits::default()
        };

        catalog.insert("SimpleTerrain", NodeTraits::fixed().with_extents(Some([30.0, 0.0, 30.0])));

        let full = PathTraits {
            is_root: true,
            width: 2.0,
            vertex_count: 5,
            vertex_spacing: 5.0,
            length_limit: 60.0,
            ..PathTraits::default()
        };
        let half = PathTraits {
            width: 2.0,
            length_limit: 30.0,
            fix_start_x: true,
            fix_start_z: true,
            ..PathTraits::default()
        };
        let intersection = PathTraits {
            is_root: true,
            is_intersection: true,
            width: 2.0,
            vertex_count: 1,
            length_limit: 1.0,
            ..PathTraits::default()
        };
        catalog.insert("Path/Full", NodeTraits::fixed().with_extents(None).with_path(full));
        catalog.insert("Path/Half", NodeTraits::fixed().with_extents(None).with_path(half));
        for name in ["Path/Intersection3", "Path/Intersection4"] {
            catalog.insert(
                name,
                NodeTraits::fixed().with_extents(None).with_path(intersection.clone()),
            );
        }

        catalog.insert("SimpleLargeBox", NodeTraits::default().with_extents(Some([1.0, 1.0, 1.0])));
        catalog.insert("SimpleSmallBox", NodeTraits::default().with_extents(Some([0.5, 0.5, 0.5])));
        catalog.insert("SimpleSphere", swap_only.with_extents(Some([0.5, 0.5, 0.5])));
        for group in ["SimpleTower", "SimpleBoxGroup", "SimpleSphereGroup"] {
            catalog.insert(group, NodeTraits::default().with_extents(None));
        }

        catalog.insert("TerrainPlains", NodeTraits::fixed().with_extents(Some([40.0, 0.0, 40.0])));
        for group in ["Farm", "Blacksmith", "Mill", "MarketCenter", "MarketStand", "ForestSmall"] {
            catalog.insert(group, NodeTraits::default().with_extents(None));
        }
        let village: [(&str, Vec3); 59] = [
            ("Building", [3.0, 3.5, 3.0]),
            ("BuildingShed", [2.0, 1.5, 2.0]),
            ("BuildingWindmill", [2.5, 6.0, 2.5]),
            ("Farmland", [4.0, 0.1, 3.0]),
            ("PropTreeLeaves", [1.5, 4.0, 1.5]),
            ("PropTreeConifer", [1.2, 5.0, 1.2]),
            ("PropTreeFruit", [1.2, 3.0, 1.2]),
            ("PropBush", [0.8, 0.6, 0.8]),
            ("PropGrass", [0.3, 0.2, 0.3]),
            ("PropFlower", [0.2, 0.3, 0.2]),
            ("PropMushroom", [0.15, 0.15, 0.15]),
            ("PropWell", [1.0, 1.2, 1.0]),
            ("PropWagon", [1.0, 0.9, 2.0]),
            ("PropStreetLamp", [0.2, 2.0, 0.2]),
            ("PropNoticeBoard", [0.8, 1.2, 0.15]),
            ("PropFlowerPot", [0.25, 0.3, 0.25]),
            ("PropCrateStack", [0.6, 0.9, 0.6]),
            ("PropBarrel", [0.4, 0.5, 0.4]),
            ("PropClothesline", [1.5, 1.2, 0.1]),
            ("PropWaterBucket", [0.2, 0.25, 0.2]),
            ("PropCoalBucket", [0.2, 0.25, 0.2]),
            ("PropWheatSheaf", [0.3, 0.6, 0.3]),
            ("PropWheatPallet", [0.6, 0.5, 0.6]),
            ("PropSackFlour", [0.3, 0.4, 0.3]),
            ("PropToolScythe", [0.6, 0.1, 0.15]),
            ("PropToolRake", [0.6, 0.1, 0.15]),
            ("PropForge", [1.0, 1.0, 1.0]),
            ("PropBrazier", [0.5, 0.6, 0.5]),
            ("PropAnvil", [0.3, 0.4, 0.5]),
            ("PropBlacksmithTable", [0.9, 0.45, 0.5]),
            ("PropTable", [0.9, 0.45, 0.5]),
            ("PropFoodTable", [0.9, 0.45, 0.5]),
            ("PropTableSmall", [0.5, 0.4, 0.5]),
            ("PropChair", [0.25, 0.45, 0.25]),
            ("PropStool", [0.25, 0.3, 0.25]),
            ("PropTool", [0.3, 0.05, 0.1]),
            ("PropGrindstone", [0.4, 0.5, 0.3]),
            ("PropSignBlacksmith", [0.5, 1.2, 0.1]),
            ("PropSignFood", [0.5, 1.2, 0.1]),
            ("PropSignBeverages", [0.5, 1.2, 0.1]),
            ("PropSignPlants", [0.5, 1.2, 0.1]),
            ("PropSignBooks", [0.5, 1.2, 0.1]),
            ("PropSignInn", [0.5, 1.2, 0.1]),
            ("PropFood", [0.15, 0.1, 0.15]),
            ("PropFruitBasket", [0.2, 0.15, 0.2]),
            ("PropVegetableBox", [0.3, 0.2, 0.25]),
            ("PropBottleBox", [0.3, 0.2, 0.25]),
            ("PropBottle", [0.05, 0.15, 0.05]),
            ("PropBook", [0.12, 0.03, 0.1]),
            ("PropBookStack", [0.12, 0.15, 0.1]),
            ("PropCandle", [0.04, 0.1, 0.04]),
            ("PropPotSoup", [0.3, 0.3, 0.3]),
            ("PropCuttingBoard", [0.25, 0.02, 0.15]),
            ("PropKnife", [0.12, 0.01, 0.02]),
            ("PropDishPile", [0.15, 0.1, 0.15]),
            ("PropCutleryBox", [0.15, 0.08, 0.1]),
            ("PropLumberPile", [1.0, 0.5, 0.5]),
            ("PropLumberChoppingBlock", [0.3, 0.35, 0.3]),
            ("PropLumberSawStand", [0.6, 0.5, 0.3]),
        ];
        for (name, half_extents) in village {
            catalog.insert(name, NodeTraits::default().with_extents(Some(half_extents)));
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_base_type_then_default() {
        let catalog = NodeCatalog::builtin();
        assert!(catalog.get("SimpleLargeBox/Green").allow_swap_move);
        assert_eq!(catalog.get("SimpleLargeBox/Green").extents(), [1.0, 1.0, 1.0]);
        assert!(catalog.get("Path/Full").path.as_ref().unwrap().is_root);
        assert!(!catalog.get("Path/Half").path.as_ref().unwrap().is_root);
        assert_eq!(catalog.get("Unknown"), &NodeTraits::default());
    }

    #[test]
    fn terrain_is_fixed() {
        let catalog = NodeCatalog::builtin();
        for name in ["SimpleTerrain", "TerrainPlains"] {
            let terrain = catalog.get(name);
            assert!(!terrain.allow_position_move && !terrain.allow_rotation_move && !terrain.allow_swap_move);
            assert!(terrain.path.is_none());
        }
    }

    #[test]
    fn village_variants_use_their_base_entry() {
        let catalog = NodeCatalog::builtin();
        assert_eq!(catalog.get("PropTool/Hammer"), catalog.get("PropTool"));
        assert_eq!(catalog.get("PropWagon/Wheat").extents(), [1.0, 0.9, 2.0]);
        assert!(catalog.get("MarketStand/Soup").half_extents.is_none());
        assert!(catalog.get("ForestSmall").half_extents.is_none());
    }

    #[test]
    fn sparse_json_gets_defaults() {
        let json = r#"{
            "types": {
                "Crate": {"half_extents": [1.0, 0.5, 1.0], "allow_swap_move": false},
                "Road": {"half_extents": null, "path": {"is_root": true}}
            }
        }"#;
        let catalog: NodeCatalog = serde_json::from_str(json).expect("deserialize");
        let crate_traits = catalog.get("Crate");
        assert!(!crate_traits.allow_swap_move);
        assert!(crate_traits.allow_position_move);
        let road = catalog.get("Road").path.as_ref().expect("path traits");
        assert_eq!(road.width, 1.0);
        assert_eq!(road.vertex_count, 3);
        assert_eq!(road.angle_limit_deg, 60.0);
        assert!(catalog.get("Road").half_extents.is_none());

        let out = serde_json::to_string(&catalog).expect("serialize");
        let back: NodeCatalog = serde_json::from_str(&out).expect("re-deserialize");
        assert_eq!(back, catalog);
    }
}
