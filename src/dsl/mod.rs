//! Declarative element behavior language
//!
//! Element behaviors are described as plain data — tables of conditions,
//! weighted actions, spread rules, and growth rules — and compiled once at
//! startup into the registry the engine runs against. Nothing in this module
//! executes during a tick.
//!
//! - `mod.rs`: the rule description types
//! - `compiler`: validation and translation into registry + interaction table
//! - `catalog`: the shipped element set

pub mod catalog;
pub mod compiler;

use serde::{Deserialize, Serialize};

use crate::sim::element::{ElementId, Rgb};

/// One of the four cardinal neighbors of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dir {
    Above,
    Below,
    Left,
    Right,
}

impl Dir {
    /// All four directions, in the order neighbor scans use.
    pub const ALL: [Dir; 4] = [Dir::Left, Dir::Right, Dir::Above, Dir::Below];

    /// Grid-space offset; `y` grows downward.
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Above => (0, -1),
            Dir::Below => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

/// Boolean predicate over a cell and the read-only current grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// The named neighbor is in bounds and empty.
    Empty(Dir),
    /// The named neighbor is in bounds and holds the given element.
    Is(Dir, ElementId),
    /// Any of the four neighbors holds the given element.
    AdjacentIs(ElementId),
    /// Any of the eight surrounding cells holds the given element.
    NearbyIs(ElementId),
    /// The cell is on the top boundary row.
    AtTopBoundary,
    /// The cell is on the bottom boundary row.
    AtBottomBoundary,
    /// The cell directly above is occupied by a non-empty, non-vapor element.
    AboveBlocked,
    /// At most `max` cells of `element` in the 5x5 window around the cell.
    NotCrowded { element: ElementId, max: usize },
}

/// What a selected rule action does to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Move the current element to the named neighbor, leaving the source
    /// empty. Out-of-bounds targets do nothing.
    MoveTo(Dir),
    /// Write a specific element at the named neighbor; the current cell is
    /// unaffected by this action alone.
    Set(Dir, ElementId),
    /// Write nothing; the cell becomes empty.
    Vanish,
    /// Keep the current element in place.
    Stay,
    /// Replace the current cell's element in place.
    Become(ElementId),
    /// Run the shared falling algorithm with the given viscosity.
    Fall { viscosity: u8 },
}

/// An action paired with its selection weight.
///
/// Pooled weights are normalized into a cumulative distribution, so they need
/// not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedAction {
    pub action: Action,
    pub probability: f64,
}

/// A conditional rule: when the condition holds (or unconditionally, for
/// "otherwise" rules), its actions join the tick's selection pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRule {
    /// `None` marks an "otherwise" rule, used only when no earlier
    /// conditioned rule matched; the first otherwise rule wins.
    pub condition: Option<Condition>,
    pub actions: Vec<WeightedAction>,
}

/// Probabilistic replacement of a matching 4-neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadRule {
    /// Neighbor element this rule applies to.
    pub target: ElementId,
    /// What a converted neighbor becomes.
    pub becomes: ElementId,
    /// Per-neighbor conversion probability, rolled independently.
    pub probability: f64,
}

/// Direction a growth rule expands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthDirection {
    /// One row up, if empty.
    Upward,
    /// One column left and one column right, each with its own roll.
    Horizontal,
}

/// Conditional multiplier on a growth rule's probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthModifier {
    pub factor: f64,
    pub condition: Condition,
}

/// Skip growth entirely when the 5x5 window holds more than `max` cells of
/// `element`. Caps plant density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityLimit {
    pub element: ElementId,
    pub max: usize,
}

/// Probabilistic creation of the current element in an adjacent empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRule {
    pub direction: GrowthDirection,
    /// Optional gate; the rule is skipped when this does not hold.
    pub condition: Option<Condition>,
    pub probability: f64,
    /// Multiplicative modifiers, each applied when its condition holds.
    pub modifiers: Vec<GrowthModifier>,
    pub limit: Option<DensityLimit>,
}

/// Behavior description of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BehaviorSpec {
    /// Never changes cell; viscosity is forced to zero.
    Static,
    /// Gravity with viscosity-bounded lateral spread; no custom logic.
    Falling { viscosity: u8 },
    /// Ordered rules with optional spread/growth and falling fallback.
    Custom {
        rules: Vec<BehaviorRule>,
        spread: Vec<SpreadRule>,
        growth: Vec<GrowthRule>,
        /// When set, an idle tick falls with this viscosity instead of
        /// staying in place.
        fallback_viscosity: Option<u8>,
    },
}

/// Declarative definition of one element, consumed by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub name: String,
    pub color: Rgb,
    /// Rising gas; exempt from `AboveBlocked` obstruction checks.
    pub vapor: bool,
    /// Displaceable liquid; denser falling material sinks through it.
    pub fluid: bool,
    pub behavior: BehaviorSpec,
}

impl ElementSpec {
    /// Shorthand for an ordinary (non-vapor, non-fluid) element.
    pub fn new(name: &str, color: Rgb, behavior: BehaviorSpec) -> Self {
        Self {
            name: name.to_string(),
            color,
            vapor: false,
            fluid: false,
            behavior,
        }
    }
}

/// Declarative pairwise interaction, referencing elements by display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSpec {
    pub first: String,
    pub second: String,
    /// What the `first` element becomes.
    pub first_becomes: ElementId,
    /// What the `second` element becomes.
    pub second_becomes: ElementId,
    /// Suppress normal behavior dispatch for the involved cells this tick.
    pub skip_processing: bool,
}

impl InteractionSpec {
    pub fn new(
        first: &str,
        second: &str,
        first_becomes: ElementId,
        second_becomes: ElementId,
    ) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
            first_becomes,
            second_becomes,
            skip_processing: false,
        }
    }

    /// Mark the interaction as replacing normal processing for the tick.
    pub fn skipping_processing(mut self) -> Self {
        self.skip_processing = true;
        self
    }
}
