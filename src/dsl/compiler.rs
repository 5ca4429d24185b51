//! DSL compilation
//!
//! Turns declarative element and interaction definitions into the immutable
//! registry and interaction table the engine runs against. Runs once at
//! startup and is inert afterward.
//!
//! Malformed element definitions fail fast with a descriptive
//! [`CompileError`]. The one recoverable case is an interaction referencing
//! an unknown element name: it is logged and skipped so the rest of the
//! table stays usable.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::{BehaviorSpec, ElementSpec, GrowthRule, InteractionSpec};
use crate::sim::element::{Behavior, ElementDefinition, ElementId, ElementRegistry, Program};
use crate::sim::interaction::{Interaction, InteractionTable};

/// Configuration-time failure while compiling DSL definitions.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Definitions pair positionally with identifiers; the lengths differed.
    #[error("definition count mismatch: {specs} definitions for {ids} identifiers")]
    DefinitionCountMismatch { specs: usize, ids: usize },

    #[error("duplicate element id {0}")]
    DuplicateId(ElementId),

    #[error("duplicate element name \"{0}\"")]
    DuplicateName(String),

    /// The reserved empty id must be defined; the engine depends on it.
    #[error("no definition maps to the reserved empty id")]
    MissingEmpty,

    #[error("element \"{element}\": probability {value} is outside [0, 1]")]
    InvalidProbability { element: String, value: f64 },

    #[error("element \"{element}\": growth factor {value} is negative or non-finite")]
    InvalidFactor { element: String, value: f64 },

    #[error("element \"{element}\": rule with no actions")]
    EmptyRule { element: String },
}

/// Compile element definitions and interactions into runtime form.
///
/// `specs[i]` pairs with `ids[i]`; the pairing is positional and must match
/// exactly in length.
pub fn compile(
    specs: &[ElementSpec],
    ids: &[ElementId],
    interactions: &[InteractionSpec],
) -> Result<(ElementRegistry, InteractionTable), CompileError> {
    if specs.len() != ids.len() {
        return Err(CompileError::DefinitionCountMismatch {
            specs: specs.len(),
            ids: ids.len(),
        });
    }

    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();
    for (spec, &id) in specs.iter().zip(ids) {
        if !seen_ids.insert(id) {
            return Err(CompileError::DuplicateId(id));
        }
        if !seen_names.insert(spec.name.clone()) {
            return Err(CompileError::DuplicateName(spec.name.clone()));
        }
        validate_spec(spec)?;
    }
    if !seen_ids.contains(&ElementId::EMPTY) {
        return Err(CompileError::MissingEmpty);
    }

    let defs: Vec<ElementDefinition> = specs
        .iter()
        .zip(ids)
        .map(|(spec, &id)| compile_element(spec, id))
        .collect();

    let name_to_id: HashMap<&str, ElementId> = specs
        .iter()
        .zip(ids)
        .map(|(spec, &id)| (spec.name.as_str(), id))
        .collect();
    let table = resolve_interactions(interactions, &name_to_id);

    log::info!(
        "compiled {} elements, {} interactions",
        defs.len(),
        table.len()
    );
    Ok((ElementRegistry::new(defs), table))
}

/// Translate one validated spec into its runtime definition.
fn compile_element(spec: &ElementSpec, id: ElementId) -> ElementDefinition {
    let (viscosity, behavior) = match &spec.behavior {
        BehaviorSpec::Static => (0, Behavior::Static),
        BehaviorSpec::Falling { viscosity } => {
            (*viscosity, Behavior::Falling { viscosity: *viscosity })
        }
        BehaviorSpec::Custom {
            rules,
            spread,
            growth,
            fallback_viscosity,
        } => (
            fallback_viscosity.unwrap_or(0),
            Behavior::Custom(Program {
                rules: rules.clone(),
                spread: spread.clone(),
                growth: growth.clone(),
                fallback_viscosity: *fallback_viscosity,
            }),
        ),
    };
    ElementDefinition {
        id,
        name: spec.name.clone(),
        color: spec.color,
        viscosity,
        vapor: spec.vapor,
        fluid: spec.fluid,
        behavior,
    }
}

fn validate_spec(spec: &ElementSpec) -> Result<(), CompileError> {
    let BehaviorSpec::Custom {
        rules,
        spread,
        growth,
        ..
    } = &spec.behavior
    else {
        return Ok(());
    };

    for rule in rules {
        if rule.actions.is_empty() {
            return Err(CompileError::EmptyRule {
                element: spec.name.clone(),
            });
        }
        for action in &rule.actions {
            check_probability(spec, action.probability)?;
        }
    }
    for rule in spread {
        check_probability(spec, rule.probability)?;
    }
    for rule in growth {
        validate_growth(spec, rule)?;
    }
    Ok(())
}

fn validate_growth(spec: &ElementSpec, rule: &GrowthRule) -> Result<(), CompileError> {
    check_probability(spec, rule.probability)?;
    for modifier in &rule.modifiers {
        if !modifier.factor.is_finite() || modifier.factor < 0.0 {
            return Err(CompileError::InvalidFactor {
                element: spec.name.clone(),
                value: modifier.factor,
            });
        }
    }
    Ok(())
}

fn check_probability(spec: &ElementSpec, value: f64) -> Result<(), CompileError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(CompileError::InvalidProbability {
            element: spec.name.clone(),
            value,
        });
    }
    Ok(())
}

/// Resolve named interaction definitions against the compiled name set.
///
/// Unknown names are logged and the offending interaction skipped.
fn resolve_interactions(
    interactions: &[InteractionSpec],
    name_to_id: &HashMap<&str, ElementId>,
) -> InteractionTable {
    let mut table = InteractionTable::new();
    for spec in interactions {
        let (Some(&a), Some(&b)) = (
            name_to_id.get(spec.first.as_str()),
            name_to_id.get(spec.second.as_str()),
        ) else {
            log::warn!(
                "interaction references unknown element: {} or {}",
                spec.first,
                spec.second
            );
            continue;
        };
        table.insert(
            a,
            b,
            Interaction {
                a_becomes: spec.first_becomes,
                b_becomes: spec.second_becomes,
                skip_processing: spec.skip_processing,
            },
        );
    }
    table
}
