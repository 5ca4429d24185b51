//! Simulation core
//!
//! Everything that runs per tick lives here. This module must stay pure and
//! deterministic:
//! - Double-buffered grid only; the current buffer is never mutated mid-tick
//! - Seeded RNG only, one draw per probability-gated decision
//! - Fixed column-major scan order
//! - No rendering or platform dependencies

pub mod element;
pub mod engine;
pub mod grid;
pub mod interaction;

pub use element::{Behavior, ElementDefinition, ElementId, ElementRegistry, Program, Rgb};
pub use engine::Engine;
pub use grid::Grid;
pub use interaction::{Interaction, InteractionTable};
