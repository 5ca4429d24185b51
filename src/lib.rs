//! Sandfall - a falling-sand cellular automaton engine
//!
//! Core modules:
//! - `sim`: Deterministic grid simulation (double-buffered tick, falling
//!   algorithm, interaction resolution, compiled behavior dispatch)
//! - `dsl`: Declarative element behavior language, its compiler, and the
//!   shipped element catalog
//!
//! The engine consumes a grid snapshot and produces the next one; rendering,
//! input, and persistence are host concerns. A host calls
//! [`dsl::catalog::compile`] (or [`dsl::compiler::compile`] with its own
//! definitions) once at startup, then drives [`Engine::advance`] per frame.

pub mod dsl;
pub mod sim;

pub use dsl::compiler::{compile, CompileError};
pub use sim::{ElementDefinition, ElementId, ElementRegistry, Engine, Grid, InteractionTable, Rgb};

/// Engine configuration constants
pub mod consts {
    /// Default stage width used by hosts (cells).
    pub const GRID_WIDTH: usize = 300;
    /// Default stage height used by hosts (cells).
    pub const GRID_HEIGHT: usize = 300;
    /// Radius of the crowding/density window; 2 gives the 5x5 window the
    /// growth limits and crowding conditions are defined over.
    pub const DENSITY_WINDOW_RADIUS: usize = 2;
}
