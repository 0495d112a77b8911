//! Settlement grammar: buildings along paths, farms, a blacksmith, a mill,
//! market stands, decorations and vegetation on plain terrain.

use crate::error::Result;
use crate::relationship::Relationship::{
    FacingAwayFrom, FacingTowards, ImplicitFacingSameDirection, ImplicitFacingTowards, IsPartOf,
    IsPartOfEdge, IsPartOfFrontEdge, NextTo, NextToBehind, NextToChooseDirection,
    NextToChooseSide, NextToEast, NextToFront, NextToLeft, NextToNorth, NextToRight,
    NextToSouth, NextToWest, OnTopOf, OnTopOfMiddle,
};
use crate::relationship::Relationship;

use super::{grammar, path_starts, rule, Fragment, SceneGrammar, SceneRule};

type Edges<'a> = &'a [(usize, Relationship, usize)];

const TERRAIN: &str = "TerrainPlains";
const TERRAIN_PATH: Fragment<'static> = (&[TERRAIN, "Path"], &[(1, OnTopOf, 0)]);
const PATH_TERRAIN: Fragment<'static> = (&["Path", TERRAIN], &[(0, OnTopOf, 1)]);
const TERRAIN_BUILDING: Fragment<'static> = (&[TERRAIN, "Building"], &[(1, OnTopOf, 0)]);

/// Keeps all of `base` and appends `added` nodes joined by `edges`.
fn grow(
    name: &str,
    probability: f64,
    base: Fragment<'_>,
    added: &[&str],
    edges: Edges<'_>,
    cap: Option<usize>,
) -> Result<SceneRule> {
    let nodes: Vec<&str> = base.0.iter().chain(added).copied().collect();
    let all_edges: Vec<_> = base.1.iter().chain(edges).copied().collect();
    rule(name, probability, base, base.0.len(), base.1.len(), (&nodes, &all_edges), cap)
}

pub(super) fn village() -> Result<SceneGrammar> {
    let mut rules = Vec::new();
    rules.extend(building_rules()?);
    rules.extend(specialize_rules()?);
    rules.extend(decoration_rules()?);
    rules.extend(farm_rules()?);
    rules.extend(market_rules()?);
    rules.extend(blacksmith_rules()?);
    rules.extend(mill_rules()?);
    rules.extend(vegetation_rules()?);
    Ok(grammar("village", path_starts(TERRAIN)?, rules))
}

// -- Buildings -----------------------------------------------------

fn building_rules() -> Result<Vec<SceneRule>> {
    let mut rules = vec![
        grow(
            "ConstructBuildingRule",
            0.6,
            TERRAIN_PATH,
            &["Building"],
            &[(2, OnTopOf, 0), (2, NextTo, 1)],
            Some(8),
        )?,
        grow(
            "PlaceTreeInBetweenBuildings",
            0.6,
            (&[TERRAIN, "Building", "Building"], &[(1, OnTopOf, 0), (2, OnTopOf, 0)]),
            &["PropTreeLeaves"],
            &[(3, NextToEast, 2), (3, NextToWest, 1), (3, OnTopOf, 0)],
            None,
        )?,
        grow(
            "FlowerPotNextToBuilding",
            0.8,
            TERRAIN_BUILDING,
            &["PropFlowerPot"],
            &[(2, NextToChooseDirection, 1)],
            Some(9),
        )?,
    ];
    for (name, probability, prop, cap) in [
        ("CrateStackNextToBuilding", 0.5, "PropCrateStack", 8),
        ("BarrelNextToBuilding", 0.3, "PropBarrel", 8),
    ] {
        rules.push(grow(
            name,
            probability,
            TERRAIN_BUILDING,
            &[prop],
            &[(2, OnTopOf, 0), (2, NextToChooseDirection, 1)],
            Some(cap),
        )?);
    }
    rules.push(grow(
        "ClothesLineNextToBuilding",
        1.5,
        TERRAIN_BUILDING,
        &["PropClothesline"],
        &[(2, OnTopOf, 0), (2, NextToBehind, 1)],
        Some(7),
    )?);
    Ok(rules)
}

/// Rewrites an undirected neighbour relation into a concrete direction.
fn specialize_rules() -> Result<Vec<SceneRule>> {
    let table: [(&str, f64, Relationship, Relationship); 10] = [
        ("SpezializeNextToLeft", 2.0, NextToChooseDirection, NextToLeft),
        ("SpezializeNextToRight", 2.0, NextToChooseDirection, NextToRight),
        ("SpezializeNextToFront", 2.0, NextToChooseDirection, NextToFront),
        ("SpezializeNextToBehind", 2.0, NextToChooseDirection, NextToBehind),
        ("SpezializeNextToNorth", 1.0, NextToChooseDirection, NextToNorth),
        ("SpezializeNextToEast", 1.0, NextToChooseDirection, NextToEast),
        ("SpezializeNextToSouth", 1.0, NextToChooseDirection, NextToSouth),
        ("SpezializeNextToWest", 1.0, NextToChooseDirection, NextToWest),
        ("SpezializeNextToBesidesLeft", 2.0, NextToChooseSide, NextToLeft),
        ("SpezializeNextToBesidesRight", 2.0, NextToChooseSide, NextToRight),
    ];
    table
        .into_iter()
        .map(|(name, probability, vague, concrete)| {
            rule(
                name,
                probability,
                (&["", ""], &[(0, vague, 1)]),
                2,
                0,
                (&["", ""], &[(0, concrete, 1)]),
                None,
            )
        })
        .collect()
}

fn decoration_rules() -> Result<Vec<SceneRule>> {
    Ok(vec![
        grow("ConstructWellRule1", 0.4, (&[TERRAIN], &[]), &["PropWell"], &[(1, OnTopOf, 0)], Some(4))?,
        grow("ConstructWagon", 0.3, PATH_TERRAIN, &["PropWagon"], &[(2, NextTo, 0)], Some(4))?,
        grow(
            "PlaceWaterBucket",
            0.2,
            (&["PropWell", ""], &[(0, OnTopOf, 1)]),
            &["PropWaterBucket"],
            &[(2, NextToChooseDirection, 0), (2, OnTopOf, 1)],
            Some(4),
        )?,
        grow(
            "PlaceStreetLamp",
            1.0,
            PATH_TERRAIN,
            &["PropStreetLamp"],
            &[(2, OnTopOf, 1), (2, NextTo, 0)],
            Some(8),
        )?,
        grow(
            "PlaceNoticeBoard",
            0.5,
            (&["Path/Intersection3", TERRAIN], &[(0, OnTopOf, 1)]),
            &["PropNoticeBoard"],
            &[(2, OnTopOf, 1), (2, NextTo, 0), (2, ImplicitFacingTowards, 0)],
            Some(5),
        )?,
    ])
}

// -- Farm ----------------------------------------------------------

fn farm_rules() -> Result<Vec<SceneRule>> {
    let farm_member: Fragment<'static> = (&["Farm", ""], &[(1, IsPartOf, 0)]);
    let farm_building: Fragment<'static> = (&["Farm", "Building"], &[(1, IsPartOf, 0)]);
    let farm_shed: Fragment<'static> = (&["Farm", "BuildingShed"], &[(1, IsPartOf, 0)]);
    let farm_field: Fragment<'static> = (&["Farm", "Farmland"], &[(1, IsPartOfEdge, 0)]);

    let mut rules = vec![
        grow(
            "ConstructFarmRule",
            1.0,
            TERRAIN_PATH,
            &["Farm", "Building", "BuildingShed", "Farmland", "PropWheatSheaf"],
            &[
                (2, OnTopOf, 0),
                (2, NextTo, 1),
                (3, IsPartOf, 2),
                (4, IsPartOf, 2),
                (5, IsPartOfEdge, 2),
                (6, IsPartOf, 2),
                (6, NextToChooseSide, 4),
            ],
            Some(4),
        )?,
        grow("PlaceFarmField", 2.0, (&["Farm"], &[]), &["Farmland"], &[(1, IsPartOfEdge, 0)], Some(6))?,
        grow("PlaceFarmBarn", 0.5, (&["Farm"], &[]), &["BuildingShed"], &[(1, IsPartOf, 0)], Some(6))?,
        grow(
            "PlaceFarmTreeFruit",
            1.2,
            farm_member,
            &["PropTreeFruit"],
            &[(2, IsPartOf, 0), (2, NextToChooseDirection, 1)],
            Some(8),
        )?,
        grow(
            "PlaceFarmWheatSheaf",
            0.5,
            farm_shed,
            &["PropWheatSheaf"],
            &[(2, IsPartOf, 0), (2, NextToChooseSide, 1)],
            Some(9),
        )?,
        grow(
            "PlaceFarmWheatPallet",
            0.8,
            farm_shed,
            &["PropWheatPallet"],
            &[(2, IsPartOf, 0), (2, NextToChooseSide, 1)],
            Some(9),
        )?,
        // the membership edge is dropped and added back after the wagon's
        rule(
            "PlaceFarmWagon",
            0.4,
            farm_member,
            2,
            0,
            (
                &["Farm", "", "PropWagon"],
                &[(1, IsPartOf, 0), (2, IsPartOf, 0), (2, NextToChooseSide, 1)],
            ),
            Some(8),
        )?,
    ];
    for (name, probability, prop, cap) in [
        ("FlowerPotNextToFarmBuilding", 0.8, "PropFlowerPot", 9),
        ("CrateStackNextToFarmBuilding", 0.5, "PropCrateStack", 8),
        ("BarrelNextToFarmBuilding", 0.3, "PropBarrel", 8),
    ] {
        rules.push(grow(
            name,
            probability,
            farm_building,
            &[prop],
            &[(2, IsPartOf, 0), (2, NextToChooseDirection, 1)],
            Some(cap),
        )?);
    }
    for (name, tool) in [("ScytheNextToFarmland", "PropToolScythe"), ("RakeNextToFarmland", "PropToolRake")] {
        rules.push(grow(name, 0.4, farm_field, &[tool], &[(2, IsPartOf, 0), (2, NextTo, 1)], Some(9))?);
    }
    Ok(rules)
}

// -- Blacksmith ----------------------------------------------------

fn blacksmith_rules() -> Result<Vec<SceneRule>> {
    let brazier_member: Fragment<'static> = (&["PropBrazier", ""], &[(0, IsPartOf, 1)]);
    let mut rules = vec![grow(
        "ConstructBlacksmithRule",
        0.5,
        TERRAIN_PATH,
        &["Blacksmith", "Building", "PropForge", "PropBrazier", "PropAnvil", "PropSignBlacksmith"],
        &[
            (2, OnTopOf, 0),
            (2, NextTo, 1),
            (3, OnTopOf, 0),
            (2, NextToChooseSide, 3),
            (4, IsPartOf, 2),
            (5, IsPartOf, 2),
            (6, IsPartOf, 2),
            (4, FacingAwayFrom, 3),
            (5, NextToFront, 4),
            (5, ImplicitFacingSameDirection, 4),
            (6, NextToFront, 5),
            (7, NextToChooseDirection, 3),
            (7, IsPartOf, 2),
        ],
        Some(8),
    )?];
    for (name, probability, prop, beside) in [
        ("PlaceCoalBucket", 1.0, "PropCoalBucket", NextToChooseSide),
        ("PlaceWaterBucket", 1.0, "PropWaterBucket", NextToChooseSide),
        ("PlaceAnvil", 0.5, "PropAnvil", NextToChooseDirection),
    ] {
        rules.push(grow(
            name,
            probability,
            brazier_member,
            &[prop],
            &[(2, beside, 0), (2, IsPartOf, 1)],
            None,
        )?);
    }
    rules.push(grow(
        "PlaceBlacksmithTable1",
        1.0,
        (&["PropBrazier", ""], &[(0, OnTopOf, 1)]),
        &["PropBlacksmithTable"],
        &[(2, NextToChooseSide, 0), (2, OnTopOf, 1)],
        None,
    )?);
    rules.push(grow(
        "PlaceAnvilHammer",
        3.0,
        (&["PropAnvil"], &[]),
        &["PropTool/Hammer"],
        &[(1, OnTopOf, 0)],
        Some(2),
    )?);
    rules.push(grow(
        "PlaceBlacksmithTable2",
        2.0,
        (&["Blacksmith", ""], &[(1, IsPartOf, 0)]),
        &["PropTable"],
        &[(2, IsPartOf, 0), (2, NextToChooseDirection, 1)],
        None,
    )?);
    let tools = [
        ("PlaceToolOnBlacksmithTable1", "PropTable", "PropTool/Mallet"),
        ("PlaceToolOnBlacksmithTable2", "PropTable", "PropTool/MalletBig"),
        ("PlaceToolOnBlacksmithTable3", "PropTable", "PropTool/Saw"),
        ("PlaceToolOnBlacksmithTable4", "PropTable", "PropTool/SawBig"),
        ("PlaceToolOnBlacksmithTable5", "BlacksmithTable", "PropTool/Pingers"),
        ("PlaceToolOnBlacksmithTable6", "BlacksmithTable", "PropTool/PingersBig"),
    ];
    for (name, table, tool) in tools {
        rules.push(grow(
            name,
            3.0,
            (&[table, "Blacksmith"], &[(0, IsPartOf, 1)]),
            &[tool],
            &[(2, OnTopOf, 0)],
            Some(3),
        )?);
    }
    Ok(rules)
}

// -- Mill ----------------------------------------------------------

fn mill_rules() -> Result<Vec<SceneRule>> {
    let mut rules = vec![grow(
        "ConstructMillRule",
        0.5,
        TERRAIN_PATH,
        &["Mill", "BuildingWindmill", "PropSackFlour", "PropSackFlour"],
        &[
            (2, OnTopOf, 0),
            (2, NextTo, 1),
            (3, IsPartOf, 2),
            (4, IsPartOf, 2),
            (5, IsPartOf, 2),
            (4, NextToChooseSide, 3),
            (5, NextToChooseSide, 3),
        ],
        Some(8),
    )?];
    for (name, probability, prop) in [
        ("PlaceSackFlour", 0.5, "PropSackFlour"),
        ("PlaceWheatPallet", 0.3, "PropWheatPallet"),
        ("PlaceWheatWagon", 0.3, "PropWagon/Wheat"),
    ] {
        rules.push(grow(
            name,
            probability,
            (&["BuildingWindmill", "Mill"], &[(0, IsPartOf, 1)]),
            &[prop],
            &[(2, IsPartOf, 1), (2, NextToChooseSide, 0)],
            Some(7),
        )?);
    }
    Ok(rules)
}

// -- Vegetation ----------------------------------------------------

fn vegetation_rules() -> Result<Vec<SceneRule>> {
    let anywhere: Fragment<'static> = (&[TERRAIN, ""], &[]);
    let mut rules = Vec::new();
    for (name, probability, plants) in [
        ("ConstructTreeLeaves", 0.4, &["PropTreeLeaves"][..]),
        ("ConstructBush1", 0.2, &["PropBush"][..]),
        ("ConstructGrass1", 0.05, &["PropGrass", "PropGrass", "PropGrass"][..]),
        ("ConstructGrass2", 0.05, &["PropFlower", "PropGrass", "PropGrass"][..]),
        ("ConstructTreeConifer", 0.3, &["PropTreeConifer"][..]),
    ] {
        let edges: Vec<_> = (0..plants.len()).map(|i| (i + 2, OnTopOf, 0)).collect();
        rules.push(grow(name, probability, anywhere, plants, &edges, None)?);
    }
    for (name, tree) in [
        ("CreateSmallForestLeaves", "PropTreeLeaves"),
        ("CreateSmallForestConifer", "PropTreeConifer"),
    ] {
        // the tree leaves the terrain and joins the new forest
        rules.push(rule(
            name,
            0.7,
            (&[TERRAIN, tree], &[(1, OnTopOf, 0)]),
            2,
            0,
            (
                &[TERRAIN, tree, "ForestSmall", tree, tree],
                &[(1, IsPartOf, 2), (2, OnTopOf, 0), (3, IsPartOf, 2), (4, IsPartOf, 2)],
            ),
            None,
        )?);
    }
    for (name, tree) in [
        ("GrowSmallForestConifer", "PropTreeConifer"),
        ("GrowSmallForestLeaves", "PropTreeLeaves"),
    ] {
        rules.push(grow(
            name,
            2.0,
            (&["ForestSmall", ""], &[(1, IsPartOf, 0)]),
            &[tree],
            &[(2, IsPartOf, 0)],
            Some(8),
        )?);
    }
    for (name, plant) in [("GrowSmallForestBush", "PropBush"), ("GrowSmallForestMushroom", "PropMushroom")] {
        rules.push(grow(name, 1.5, (&["ForestSmall"], &[]), &[plant], &[(1, IsPartOf, 0)], Some(9))?);
    }
    Ok(rules)
}

// -- Market --------------------------------------------------------

/// Edges every stand shares: table at the front edge, a sign beside it.
const STAND_FRONT: [(usize, Relationship, usize); 2] =
    [(1, IsPartOfFrontEdge, 0), (1, ImplicitFacingSameDirection, 0)];
const STAND_SIGN: [(usize, Relationship, usize); 3] =
    [(2, IsPartOf, 0), (2, NextToChooseSide, 1), (2, ImplicitFacingSameDirection, 1)];

/// Stand with two goods on its table and a sign as node 4.
fn goods_stand_edges(extra: Edges<'_>) -> Vec<(usize, Relationship, usize)> {
    let mut edges = STAND_FRONT.to_vec();
    edges.extend([(2, OnTopOf, 1), (3, OnTopOf, 1)]);
    edges.extend(STAND_SIGN.iter().map(|&(a, r, b)| (a + 2, r, b)));
    edges.extend_from_slice(extra);
    edges
}

/// Rules that open a market with `stand`, add `stand` to an existing market,
/// and the stand's own furnishing rules renamed after it.
fn market_stand_rules(name: &str, stand: Fragment<'_>, furnishing: Vec<SceneRule>) -> Result<Vec<SceneRule>> {
    let offset = |edges: Edges<'_>| -> Vec<(usize, Relationship, usize)> {
        edges.iter().map(|&(a, r, b)| (a + 3, r, b + 3)).collect()
    };

    let mut construct_nodes = vec!["MarketCenter"];
    construct_nodes.extend_from_slice(stand.0);
    let mut construct_edges = vec![
        (2, NextTo, 1),
        (3, NextTo, 1),
        (2, OnTopOf, 0),
        (3, OnTopOf, 0),
        (3, NextToChooseDirection, 2),
        (3, FacingTowards, 2),
    ];
    construct_edges.extend(offset(stand.1));

    let mut expand_edges = vec![
        (3, OnTopOf, 1),
        (3, NextToChooseDirection, 0),
        (3, FacingTowards, 0),
        (3, NextTo, 2),
    ];
    expand_edges.extend(offset(stand.1));

    let mut rules = vec![
        grow(
            &format!("ConstructMarketRule{name}"),
            0.15,
            TERRAIN_PATH,
            &construct_nodes,
            &construct_edges,
            Some(6),
        )?,
        grow(
            &format!("ExpandMarketRule{name}"),
            0.5,
            (
                &["MarketCenter", TERRAIN, "Path"],
                &[(0, OnTopOf, 1), (2, OnTopOf, 1), (0, NextTo, 2)],
            ),
            stand.0,
            &expand_edges,
            Some(7),
        )?,
    ];
    for furnish in furnishing {
        rules.push(SceneRule::new(
            format!("MarketStand{name}{}", furnish.name()),
            furnish.probability(),
            furnish.pattern().clone(),
            furnish.shared_nodes(),
            furnish.shared_edges(),
            furnish.replacement().clone(),
            furnish.first_node_degree_cap(),
        )?);
    }
    Ok(rules)
}

/// One prop on the stand's table, which sits at the stand's front edge.
fn on_table(name: &str, probability: f64, table: &str, stand: &str, prop: &str, cap: usize) -> Result<SceneRule> {
    grow(
        name,
        probability,
        (&[table, stand], &[(0, IsPartOfFrontEdge, 1)]),
        &[prop],
        &[(2, OnTopOf, 0)],
        Some(cap),
    )
}

/// One prop on the floor of the stand, behind its front table.
fn behind_table(name: &str, probability: f64, stand: &str, table: &str, prop: &str, cap: usize) -> Result<SceneRule> {
    grow(
        name,
        probability,
        (&[stand, table], &[(1, IsPartOfFrontEdge, 0)]),
        &[prop],
        &[(2, IsPartOf, 0), (2, NextToBehind, 1)],
        Some(cap),
    )
}

fn market_rules() -> Result<Vec<SceneRule>> {
    const FOOD: &str = "MarketStand/Food";
    const BEVERAGES: &str = "MarketStand/Beverages";
    const FLOWERS: &str = "MarketStand/Flowers";
    const LUMBER: &str = "MarketStand/Lumber";
    const BOOKS: &str = "MarketStand/Books";
    const SOUP: &str = "MarketStand/Soup";
    const TOOLS: &str = "MarketStand/Tools";

    let mut rules = Vec::new();

    let food_edges = goods_stand_edges(&[]);
    rules.extend(market_stand_rules(
        "Food1",
        (&[FOOD, "PropFoodTable", "PropFood", "PropFood", "PropSignFood"], &food_edges),
        vec![
            on_table("TableFood1", 6.0, "PropFoodTable", FOOD, "PropFood", 3)?,
            on_table("TableFood2", 3.0, "PropTable", FOOD, "PropFruitBasket", 3)?,
            on_table("TableFood3", 3.0, "PropTable", FOOD, "PropVegetableBox", 3)?,
            behind_table("FloorFood1", 1.0, FOOD, "PropTable", "PropVegetableBox", 7)?,
            behind_table("FloorFood2", 1.0, FOOD, "PropTable", "PropBottleBox", 7)?,
            behind_table("FloorFood3", 1.0, FOOD, "PropFoodTable", "PropVegetableBox", 7)?,
        ],
    )?);
    rules.extend(market_stand_rules(
        "Food2",
        (&[FOOD, "PropTable", "PropVegetableBox", "PropVegetableBox", "PropSignFood"], &food_edges),
        Vec::new(),
    )?);

    rules.extend(market_stand_rules(
        "Beverages",
        (&[BEVERAGES, "PropTable", "PropBottleBox", "PropBottleBox", "PropSignBeverages"], &food_edges),
        vec![
            on_table("TableBottles", 3.0, "PropTable", BEVERAGES, "PropBottleBox", 3)?,
            grow(
                "TableBottle",
                3.0,
                (&["PropTable", BEVERAGES], &[(0, IsPartOfFrontEdge, 1)]),
                &["PropBottle", "PropBottle"],
                &[(2, OnTopOf, 0), (3, OnTopOf, 0)],
                Some(5),
            )?,
            behind_table("FloorBottles", 1.0, BEVERAGES, "PropFoodTable", "PropBottleBox", 7)?,
        ],
    )?);

    let flower_edges = goods_stand_edges(&[(5, OnTopOf, 1)]);
    rules.extend(market_stand_rules(
        "Flowers",
        (
            &[FLOWERS, "PropTable", "PropFlowerPot", "PropFlowerPot", "PropSignPlants", "PropFlowerPot"],
            &flower_edges,
        ),
        vec![
            on_table("TableFlowers", 3.0, "PropTable", FLOWERS, "PropFlowerPot", 7)?,
            behind_table("FloorFlowers", 1.0, FLOWERS, "PropTable", "PropFlowerPot", 9)?,
        ],
    )?);

    let mut lumber_edges = STAND_FRONT.to_vec();
    lumber_edges.extend([(2, NextToBehind, 1), (2, IsPartOf, 0)]);
    lumber_edges.extend(STAND_SIGN.iter().map(|&(a, r, b)| (a + 1, r, b)));
    rules.extend(market_stand_rules(
        "Lumber",
        (&[LUMBER, "PropTable", "PropLumberPile", "PropSignPlants"], &lumber_edges),
        vec![
            behind_table("FloorLumberPiles", 1.0, LUMBER, "PropTable", "PropLumberPile", 5)?,
            behind_table("FloorChoppingBlock", 0.7, LUMBER, "PropTable", "PropLumberChoppingBlock", 5)?,
            behind_table("FloorLumberSawStand", 0.7, LUMBER, "PropTable", "PropLumberSawStand", 5)?,
            on_table("TableTool1", 1.0, "PropTable", LUMBER, "PropTool/SawBig", 5)?,
            on_table("TableTool2", 1.5, "PropTable", LUMBER, "PropTool/Axe", 5)?,
            on_table("TableTool3", 1.0, "PropTable", LUMBER, "PropTool/Hatchet", 5)?,
        ],
    )?);

    let book_edges = goods_stand_edges(&[
        (5, IsPartOf, 0),
        (5, NextToBehind, 1),
        (5, ImplicitFacingSameDirection, 1),
    ]);
    rules.extend(market_stand_rules(
        "Books",
        (&[BOOKS, "PropTable", "PropBook", "PropBook", "PropSignBooks", "PropChair"], &book_edges),
        vec![
            grow(
                "PlaceCandle1",
                1.0,
                (&["PropTable", "PropBook"], &[(1, OnTopOf, 0)]),
                &["PropCandle"],
                &[(2, OnTopOf, 0), (2, NextTo, 1)],
                Some(7),
            )?,
            grow(
                "PlaceCandle2",
                0.5,
                (&["PropTable", "PropBookStack"], &[(1, OnTopOf, 0)]),
                &["PropCandle"],
                &[(2, OnTopOf, 0), (2, NextTo, 1)],
                Some(7),
            )?,
            grow(
                "PlaceStool",
                0.6,
                (&[BOOKS, "PropTable"], &[(1, IsPartOfFrontEdge, 0)]),
                &["PropStool", "PropBook"],
                &[(2, IsPartOf, 0), (2, NextToBehind, 1), (3, OnTopOf, 2)],
                Some(6),
            )?,
        ],
    )?);

    let mut soup_edges = STAND_FRONT.to_vec();
    soup_edges.extend(STAND_SIGN);
    soup_edges.push((3, OnTopOfMiddle, 1));
    rules.extend(market_stand_rules(
        "Soup",
        (&[SOUP, "PropTable", "PropSignInn", "PropPotSoup"], &soup_edges),
        vec![
            grow(
                "PlaceCuttingBoard",
                0.4,
                (
                    &["PropTable", SOUP, "PropPotSoup"],
                    &[(0, IsPartOfFrontEdge, 1), (2, OnTopOfMiddle, 0)],
                ),
                &["PropCuttingBoard", "PropKnife"],
                &[(3, OnTopOf, 0), (3, NextToChooseDirection, 2), (4, OnTopOf, 3)],
                Some(6),
            )?,
            grow(
                "PlaceCuttingBoardFood",
                0.3,
                (
                    &["PropCuttingBoard", SOUP, "PropTable"],
                    &[(2, IsPartOfFrontEdge, 1), (0, OnTopOf, 2)],
                ),
                &["PropFood"],
                &[(3, OnTopOf, 0)],
                Some(5),
            )?,
            on_table("PlaceDishPile", 0.3, "PropTable", SOUP, "PropDishPile", 6)?,
            on_table("PlaceCutleryBox", 0.3, "PropTable", SOUP, "PropCutleryBox", 6)?,
            grow(
                "PlaceEatingTable",
                0.3,
                (&["MarketCenter", SOUP], &[(1, NextToChooseDirection, 0)]),
                &["PropTableSmall", "PropStool", "PropStool"],
                &[
                    (2, IsPartOf, 0),
                    (3, IsPartOf, 0),
                    (4, IsPartOf, 0),
                    (2, NextToFront, 1),
                    (3, NextToChooseDirection, 2),
                    (4, NextToChooseDirection, 2),
                    (3, ImplicitFacingTowards, 2),
                    (4, ImplicitFacingTowards, 2),
                ],
                Some(8),
            )?,
        ],
    )?);

    let mut tool_edges = STAND_FRONT.to_vec();
    tool_edges.extend(STAND_SIGN);
    tool_edges.extend([(3, OnTopOf, 1), (4, OnTopOf, 1)]);
    let stand_only: Fragment<'static> = (&[TOOLS], &[]);
    rules.extend(market_stand_rules(
        "Tools",
        (&[TOOLS, "PropTable", "PropSignBlacksmith", "PropTool", "PropTool"], &tool_edges),
        vec![
            on_table("PlaceTableTool", 0.3, "PropTable", TOOLS, "PropTool", 6)?,
            grow(
                "PlaceTableSmallTool",
                0.3,
                (&["PropTableSmall", TOOLS], &[(0, IsPartOf, 1)]),
                &["PropTool"],
                &[(2, OnTopOf, 0)],
                Some(5),
            )?,
            grow(
                "PlaceStool",
                0.2,
                stand_only,
                &["PropStool", "PropTool"],
                &[(1, IsPartOf, 0), (2, OnTopOf, 1)],
                Some(6),
            )?,
            grow(
                "PlaceTableSmall",
                0.3,
                stand_only,
                &["PropTableSmall", "PropTool"],
                &[(1, IsPartOf, 0), (2, OnTopOf, 1)],
                Some(6),
            )?,
            grow("PlaceGrindstone", 0.4, stand_only, &["PropGrindstone"], &[(1, IsPartOf, 0)], Some(6))?,
        ],
    )?);

    Ok(rules)
}
