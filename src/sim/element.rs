//! Element identifiers, definitions, and the registry
//!
//! Every grid cell holds exactly one [`ElementId`]. The registry maps ids to
//! their immutable definitions, built once at startup by the DSL compiler and
//! never mutated afterward.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dsl::{BehaviorRule, GrowthRule, SpreadRule};

/// Identifier of an element kind.
///
/// A small non-negative integer with `0` reserved for the empty cell. New
/// elements extend the id space without renumbering existing ones, so ids are
/// stable across compile and serialization boundaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ElementId(pub u8);

impl ElementId {
    /// The reserved empty-cell identifier.
    pub const EMPTY: ElementId = ElementId(0);

    /// Whether this id is the reserved empty value.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGB color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Compiled custom behavior, carried as data and interpreted by the engine.
///
/// Rules keep their declaration order; the pooling and first-otherwise-wins
/// policy is applied at tick time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Ordered conditional rules.
    pub rules: Vec<BehaviorRule>,
    /// Spread rules, applied every tick regardless of rule outcome.
    pub spread: Vec<SpreadRule>,
    /// Growth rules, applied every tick regardless of rule outcome.
    pub growth: Vec<GrowthRule>,
    /// When no action fired, fall with this viscosity instead of staying.
    pub fallback_viscosity: Option<u8>,
}

/// Behavior class, dispatched once per cell per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Never moves; copied unchanged into the next grid.
    Static,
    /// Gravity plus viscosity-bounded lateral spread.
    Falling { viscosity: u8 },
    /// Compiled rule program.
    Custom(Program),
}

/// Immutable description of one element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub id: ElementId,
    pub name: String,
    pub color: Rgb,
    /// Lateral spread radius when falling (0 for static elements).
    pub viscosity: u8,
    /// Rising gas; does not count as an obstacle for `AboveBlocked` checks.
    pub vapor: bool,
    /// Displaceable liquid; denser falling material sinks through it.
    pub fluid: bool,
    pub behavior: Behavior,
}

/// Registry of all compiled element definitions.
///
/// Lookup is total over registered ids; asking for an unregistered id is a
/// programming error and panics rather than returning a sentinel.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    defs: Vec<ElementDefinition>,
    by_id: HashMap<ElementId, usize>,
}

impl ElementRegistry {
    /// Build a registry from definitions in registration order.
    ///
    /// Ids must be unique; the DSL compiler validates this before calling.
    pub fn new(defs: Vec<ElementDefinition>) -> Self {
        let by_id = defs.iter().enumerate().map(|(i, d)| (d.id, i)).collect();
        Self { defs, by_id }
    }

    /// Definition for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never registered.
    pub fn lookup(&self, id: ElementId) -> &ElementDefinition {
        match self.get(id) {
            Some(def) => def,
            None => panic!("unknown element id {id}"),
        }
    }

    /// Non-panicking lookup.
    pub fn get(&self, id: ElementId) -> Option<&ElementDefinition> {
        self.by_id.get(&id).map(|&i| &self.defs[i])
    }

    /// All elements a user can place, in registration order, excluding empty.
    pub fn all_selectable(&self) -> impl Iterator<Item = &ElementDefinition> {
        self.defs.iter().filter(|d| !d.id.is_empty())
    }

    /// Number of registered elements, including empty.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
