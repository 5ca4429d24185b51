//! The shipped element set
//!
//! Identifiers and declarative definitions for the standard materials. Ids
//! are stable; extend the set by appending, never by renumbering.

use super::compiler::{self, CompileError};
use super::{
    Action, BehaviorRule, BehaviorSpec, Condition, DensityLimit, Dir, ElementSpec,
    GrowthDirection, GrowthModifier, GrowthRule, InteractionSpec, SpreadRule, WeightedAction,
};
use crate::sim::element::{ElementId, ElementRegistry, Rgb};
use crate::sim::interaction::InteractionTable;

pub const EMPTY: ElementId = ElementId::EMPTY;
pub const SAND: ElementId = ElementId(1);
pub const WATER: ElementId = ElementId(2);
pub const SOIL: ElementId = ElementId(3);
pub const LAVA: ElementId = ElementId(4);
pub const FIRE: ElementId = ElementId(5);
pub const SEED: ElementId = ElementId(6);
pub const PLANT: ElementId = ElementId(7);
pub const STEAM: ElementId = ElementId(8);

/// Identifiers in registration order, pairing positionally with
/// [`standard_elements`].
pub fn standard_ids() -> Vec<ElementId> {
    vec![EMPTY, SAND, WATER, SOIL, LAVA, FIRE, SEED, PLANT, STEAM]
}

/// Declarative definitions of the standard materials.
pub fn standard_elements() -> Vec<ElementSpec> {
    vec![
        ElementSpec::new("Empty", Rgb::new(50, 50, 50), BehaviorSpec::Static),
        ElementSpec::new(
            "Sand",
            Rgb::new(200, 180, 100),
            BehaviorSpec::Falling { viscosity: 2 },
        ),
        ElementSpec {
            name: "Water".to_string(),
            color: Rgb::new(120, 120, 210),
            vapor: false,
            fluid: true,
            behavior: BehaviorSpec::Falling { viscosity: 20 },
        },
        ElementSpec::new(
            "Soil",
            Rgb::new(100, 100, 100),
            BehaviorSpec::Falling { viscosity: 1 },
        ),
        ElementSpec::new(
            "Lava",
            Rgb::new(200, 70, 70),
            BehaviorSpec::Falling { viscosity: 5 },
        ),
        fire(),
        seed(),
        plant(),
        steam(),
    ]
}

/// Fire rises, occasionally burns out, and spreads to adjacent plants.
fn fire() -> ElementSpec {
    ElementSpec::new(
        "Fire",
        Rgb::new(255, 150, 0),
        BehaviorSpec::Custom {
            rules: vec![
                BehaviorRule {
                    condition: Some(Condition::Empty(Dir::Above)),
                    actions: vec![
                        WeightedAction {
                            action: Action::MoveTo(Dir::Above),
                            probability: 0.95,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.05,
                        },
                    ],
                },
                BehaviorRule {
                    condition: None,
                    actions: vec![
                        WeightedAction {
                            action: Action::Stay,
                            probability: 0.9,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.1,
                        },
                    ],
                },
            ],
            spread: vec![SpreadRule {
                target: PLANT,
                becomes: FIRE,
                probability: 0.3,
            }],
            growth: vec![],
            fallback_viscosity: None,
        },
    )
}

/// Seeds sprout on contact with soil and otherwise fall like sand.
fn seed() -> ElementSpec {
    ElementSpec::new(
        "Seed",
        Rgb::new(139, 90, 43),
        BehaviorSpec::Custom {
            rules: vec![BehaviorRule {
                condition: Some(Condition::AdjacentIs(SOIL)),
                actions: vec![WeightedAction {
                    action: Action::Become(PLANT),
                    probability: 1.0,
                }],
            }],
            spread: vec![],
            growth: vec![],
            fallback_viscosity: Some(2),
        },
    )
}

/// Plants stay put and grow, faster near water, capped by local density.
fn plant() -> ElementSpec {
    let near_water = GrowthModifier {
        factor: 3.0,
        condition: Condition::NearbyIs(WATER),
    };
    let crowding = DensityLimit {
        element: PLANT,
        max: 8,
    };
    ElementSpec::new(
        "Plant",
        Rgb::new(34, 139, 34),
        BehaviorSpec::Custom {
            rules: vec![BehaviorRule {
                condition: None,
                actions: vec![WeightedAction {
                    action: Action::Stay,
                    probability: 1.0,
                }],
            }],
            spread: vec![],
            growth: vec![
                GrowthRule {
                    direction: GrowthDirection::Upward,
                    condition: Some(Condition::Empty(Dir::Above)),
                    probability: 0.01,
                    modifiers: vec![near_water],
                    limit: Some(crowding),
                },
                GrowthRule {
                    direction: GrowthDirection::Horizontal,
                    condition: None,
                    probability: 0.005,
                    modifiers: vec![near_water],
                    limit: Some(crowding),
                },
            ],
            fallback_viscosity: None,
        },
    )
}

/// Steam rises and condenses back into water against obstacles, at the top
/// boundary, or slowly on its own.
fn steam() -> ElementSpec {
    ElementSpec {
        name: "Steam".to_string(),
        color: Rgb::new(200, 200, 200),
        vapor: true,
        fluid: false,
        behavior: BehaviorSpec::Custom {
            rules: vec![
                BehaviorRule {
                    condition: Some(Condition::Empty(Dir::Above)),
                    actions: vec![
                        WeightedAction {
                            action: Action::MoveTo(Dir::Above),
                            probability: 0.995,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.005,
                        },
                    ],
                },
                BehaviorRule {
                    condition: Some(Condition::AtTopBoundary),
                    actions: vec![
                        WeightedAction {
                            action: Action::Become(WATER),
                            probability: 0.8,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.2,
                        },
                    ],
                },
                BehaviorRule {
                    condition: Some(Condition::AboveBlocked),
                    actions: vec![
                        WeightedAction {
                            action: Action::Become(WATER),
                            probability: 0.7,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.05,
                        },
                        WeightedAction {
                            action: Action::Stay,
                            probability: 0.25,
                        },
                    ],
                },
                BehaviorRule {
                    condition: None,
                    actions: vec![
                        WeightedAction {
                            action: Action::Become(WATER),
                            probability: 0.14,
                        },
                        WeightedAction {
                            action: Action::Vanish,
                            probability: 0.01,
                        },
                        WeightedAction {
                            action: Action::Stay,
                            probability: 0.85,
                        },
                    ],
                },
            ],
            spread: vec![],
            growth: vec![],
            fallback_viscosity: None,
        },
    }
}

/// Pairwise interactions of the standard set.
pub fn standard_interactions() -> Vec<InteractionSpec> {
    vec![
        // Quenching: water boils off, lava solidifies.
        InteractionSpec::new("Water", "Lava", STEAM, SAND),
        // Plants ignite on contact; lava is unaffected and the burn replaces
        // normal processing for the tick.
        InteractionSpec::new("Lava", "Plant", LAVA, FIRE).skipping_processing(),
        // Extinguishing takes priority over everything else fire would do.
        InteractionSpec::new("Water", "Fire", EMPTY, FIRE).skipping_processing(),
    ]
}

/// Compile the standard catalog into a ready registry and interaction table.
pub fn compile() -> Result<(ElementRegistry, InteractionTable), CompileError> {
    compiler::compile(
        &standard_elements(),
        &standard_ids(),
        &standard_interactions(),
    )
}
