//! The grid simulation engine
//!
//! One tick transforms the read-only current grid into a freshly allocated
//! next grid. Per cell, in a fixed column-major scan: resolve pairwise
//! interactions against the four neighbors, then dispatch on the element's
//! behavior class. Intra-tick ordering is load-bearing — later cells observe
//! next-grid writes made by earlier cells, and the first writer to a
//! next-grid cell wins.
//!
//! All randomness comes from a seeded [`Pcg32`], one uniform draw per
//! probability-gated decision, so a fixed seed replays a run exactly.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::element::{Behavior, ElementId, ElementRegistry, Program};
use super::grid::Grid;
use super::interaction::InteractionTable;
use crate::consts::DENSITY_WINDOW_RADIUS;
use crate::dsl::{Action, Condition, Dir, GrowthDirection, GrowthRule, SpreadRule, WeightedAction};

/// The simulation engine: element metadata, interaction table, RNG.
///
/// Exactly one tick runs at a time; the caller owns the returned grid
/// between ticks and may paint into it before the next [`Engine::advance`].
pub struct Engine {
    registry: ElementRegistry,
    interactions: InteractionTable,
    rng: Pcg32,
}

impl Engine {
    pub fn new(registry: ElementRegistry, interactions: InteractionTable, seed: u64) -> Self {
        Self {
            registry,
            interactions,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Read-only element metadata, for renderers and UI layers.
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn interactions(&self) -> &InteractionTable {
        &self.interactions
    }

    /// Advance the simulation by one tick.
    pub fn advance(&mut self, current: &Grid) -> Grid {
        let mut next = Grid::new(current.width(), current.height());
        let mut ctx = TickCtx {
            registry: &self.registry,
            rng: &mut self.rng,
        };

        for x in 0..current.width() {
            for y in 0..current.height() {
                let element = current.get(x, y);
                if element.is_empty() {
                    continue;
                }

                // Interaction pass. The skip flag is only consulted after all
                // four neighbors, so a later neighbor's interaction still
                // writes its results even when an earlier one already set it.
                let mut skip = false;
                for dir in Dir::ALL {
                    let (dx, dy) = dir.delta();
                    let Some((nx, ny)) = current.offset(x, y, dx, dy) else {
                        continue;
                    };
                    let neighbor = current.get(nx, ny);
                    let Some(hit) = self.interactions.resolve(element, neighbor) else {
                        continue;
                    };
                    if next.get(x, y).is_empty() {
                        next.set(x, y, hit.a_becomes);
                    }
                    if next.get(nx, ny).is_empty() {
                        next.set(nx, ny, hit.b_becomes);
                    }
                    skip |= hit.skip_processing;
                }
                if skip {
                    continue;
                }

                ctx.dispatch(x, y, element, current, &mut next);
            }
        }

        next
    }
}

/// Per-tick working context: registry access plus the RNG stream.
struct TickCtx<'a> {
    registry: &'a ElementRegistry,
    rng: &'a mut Pcg32,
}

impl<'a> TickCtx<'a> {
    /// One uniform `[0, 1)` draw per probability-gated decision point.
    #[inline]
    fn chance(&mut self, probability: f64) -> bool {
        self.rng.random::<f64>() < probability
    }

    fn dispatch(&mut self, x: usize, y: usize, element: ElementId, current: &Grid, next: &mut Grid) {
        let registry = self.registry;
        match &registry.lookup(element).behavior {
            Behavior::Static => {
                if next.get(x, y).is_empty() {
                    next.set(x, y, element);
                }
            }
            Behavior::Falling { viscosity } => {
                self.fall(x, y, current, next, element, *viscosity);
            }
            Behavior::Custom(program) => {
                self.run_program(x, y, element, program, current, next);
            }
        }
    }

    /// Shared falling algorithm: seek the lowest free diagonal within the
    /// spread radius, right side first, sinking through displaceable fluids.
    fn fall(
        &self,
        x: usize,
        y: usize,
        current: &Grid,
        next: &mut Grid,
        element: ElementId,
        max_spread: u8,
    ) {
        if y + 1 >= current.height() {
            // Bottom row: stay, without clobbering an earlier write.
            if next.get(x, y).is_empty() {
                next.set(x, y, element);
            }
            return;
        }
        let below = y + 1;

        for sign in [1isize, -1] {
            for p in 0..max_spread as isize {
                let tx = x as isize + sign * p;
                if tx < 0 || tx >= current.width() as isize {
                    break;
                }
                let tx = tx as usize;
                let occupant = current.get(tx, below);
                if occupant.is_empty() {
                    next.set(tx, below, element);
                    return;
                }
                if occupant != element {
                    if self.registry.lookup(occupant).fluid {
                        // Denser material sinks; the fluid is displaced into
                        // the vacated cell.
                        next.set(tx, below, element);
                        next.set(x, y, occupant);
                        return;
                    }
                    break; // blocked by a different solid
                }
                // Same kind: keep scanning outward across the pile.
            }
        }

        if next.get(x, y).is_empty() {
            next.set(x, y, element);
        }
    }

    /// Interpret a compiled custom-behavior program for one cell.
    fn run_program(
        &mut self,
        x: usize,
        y: usize,
        element: ElementId,
        program: &Program,
        current: &Grid,
        next: &mut Grid,
    ) {
        // Pool the actions of every matching conditioned rule. An otherwise
        // rule contributes only while the pool is still empty, so the first
        // otherwise rule wins and later ones are ignored.
        let mut pool: Vec<WeightedAction> = Vec::new();
        for rule in &program.rules {
            match rule.condition {
                Some(condition) => {
                    if self.check(condition, x, y, current) {
                        pool.extend_from_slice(&rule.actions);
                    }
                }
                None => {
                    if pool.is_empty() {
                        pool.extend_from_slice(&rule.actions);
                    }
                }
            }
        }

        let mut acted = false;
        if let Some(action) = self.select_action(&pool) {
            acted = self.execute_action(action, x, y, element, current, next);
        }

        // Spread and growth run every tick, independent of the rule outcome.
        for rule in &program.spread {
            self.apply_spread(rule, x, y, current, next);
        }
        for rule in &program.growth {
            self.apply_growth(rule, x, y, element, current, next);
        }

        if !acted {
            match program.fallback_viscosity {
                Some(viscosity) if viscosity > 0 => {
                    self.fall(x, y, current, next, element, viscosity);
                }
                _ => {
                    if next.get(x, y).is_empty() {
                        next.set(x, y, element);
                    }
                }
            }
        }
    }

    /// Weighted random selection: normalize the pooled probabilities into a
    /// cumulative distribution and sample once.
    fn select_action(&mut self, pool: &[WeightedAction]) -> Option<Action> {
        if pool.is_empty() {
            return None;
        }
        let total: f64 = pool.iter().map(|a| a.probability).sum();
        let mut roll = self.rng.random::<f64>() * total;
        for weighted in pool {
            roll -= weighted.probability;
            if roll <= 0.0 {
                return Some(weighted.action);
            }
        }
        // Floating-point tail: fall back to the last entry.
        Some(pool[pool.len() - 1].action)
    }

    /// Execute one selected action. Returns whether the action settled the
    /// current cell (a `Set` does not; the cell still falls through to the
    /// stay/fall default).
    fn execute_action(
        &mut self,
        action: Action,
        x: usize,
        y: usize,
        element: ElementId,
        current: &Grid,
        next: &mut Grid,
    ) -> bool {
        match action {
            Action::MoveTo(dir) => {
                let (dx, dy) = dir.delta();
                match current.offset(x, y, dx, dy) {
                    Some((nx, ny)) => {
                        next.set(nx, ny, element);
                        true
                    }
                    None => false,
                }
            }
            Action::Set(dir, to) => {
                let (dx, dy) = dir.delta();
                if let Some((nx, ny)) = current.offset(x, y, dx, dy) {
                    next.set(nx, ny, to);
                }
                false
            }
            Action::Vanish => true,
            Action::Stay => {
                next.set(x, y, element);
                true
            }
            Action::Become(to) => {
                next.set(x, y, to);
                true
            }
            Action::Fall { viscosity } => {
                self.fall(x, y, current, next, element, viscosity);
                true
            }
        }
    }

    fn apply_spread(&mut self, rule: &SpreadRule, x: usize, y: usize, current: &Grid, next: &mut Grid) {
        for dir in Dir::ALL {
            let (dx, dy) = dir.delta();
            let Some((nx, ny)) = current.offset(x, y, dx, dy) else {
                continue;
            };
            if current.get(nx, ny) == rule.target && self.chance(rule.probability) {
                next.set(nx, ny, rule.becomes);
            }
        }
    }

    fn apply_growth(
        &mut self,
        rule: &GrowthRule,
        x: usize,
        y: usize,
        element: ElementId,
        current: &Grid,
        next: &mut Grid,
    ) {
        if let Some(limit) = rule.limit {
            if current.count_in_window(x, y, DENSITY_WINDOW_RADIUS, limit.element) > limit.max {
                return;
            }
        }

        let mut probability = rule.probability;
        for modifier in &rule.modifiers {
            if self.check(modifier.condition, x, y, current) {
                probability *= modifier.factor;
            }
        }

        if let Some(condition) = rule.condition {
            if !self.check(condition, x, y, current) {
                return;
            }
        }

        match rule.direction {
            GrowthDirection::Upward => {
                if let Some((nx, ny)) = current.offset(x, y, 0, -1) {
                    if current.get(nx, ny).is_empty() && self.chance(probability) {
                        next.set(nx, ny, element);
                    }
                }
            }
            GrowthDirection::Horizontal => {
                // Independent roll per side.
                for dx in [-1isize, 1] {
                    if let Some((nx, ny)) = current.offset(x, y, dx, 0) {
                        if current.get(nx, ny).is_empty() && self.chance(probability) {
                            next.set(nx, ny, element);
                        }
                    }
                }
            }
        }
    }

    /// Evaluate a condition against the read-only current grid.
    fn check(&self, condition: Condition, x: usize, y: usize, current: &Grid) -> bool {
        match condition {
            Condition::Empty(dir) => {
                let (dx, dy) = dir.delta();
                current
                    .offset(x, y, dx, dy)
                    .is_some_and(|(nx, ny)| current.get(nx, ny).is_empty())
            }
            Condition::Is(dir, element) => {
                let (dx, dy) = dir.delta();
                current
                    .offset(x, y, dx, dy)
                    .is_some_and(|(nx, ny)| current.get(nx, ny) == element)
            }
            Condition::AdjacentIs(element) => Dir::ALL.iter().any(|dir| {
                let (dx, dy) = dir.delta();
                current
                    .offset(x, y, dx, dy)
                    .is_some_and(|(nx, ny)| current.get(nx, ny) == element)
            }),
            Condition::NearbyIs(element) => {
                for dx in -1..=1isize {
                    for dy in -1..=1isize {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        if let Some((nx, ny)) = current.offset(x, y, dx, dy) {
                            if current.get(nx, ny) == element {
                                return true;
                            }
                        }
                    }
                }
                false
            }
            Condition::AtTopBoundary => y == 0,
            Condition::AtBottomBoundary => y == current.height() - 1,
            Condition::AboveBlocked => match current.offset(x, y, 0, -1) {
                Some((nx, ny)) => {
                    let above = current.get(nx, ny);
                    !above.is_empty() && !self.registry.lookup(above).vapor
                }
                None => false,
            },
            Condition::NotCrowded { element, max } => {
                current.count_in_window(x, y, DENSITY_WINDOW_RADIUS, element) <= max
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::catalog::{self, EMPTY, FIRE, LAVA, PLANT, SAND, SEED, SOIL, STEAM, WATER};
    use crate::dsl::{compiler, BehaviorRule, BehaviorSpec, ElementSpec, InteractionSpec};
    use crate::sim::element::Rgb;
    use proptest::prelude::*;

    fn standard_engine(seed: u64) -> Engine {
        let (registry, table) = catalog::compile().unwrap();
        Engine::new(registry, table, seed)
    }

    #[test]
    fn test_lone_sand_falls_straight_to_the_bottom() {
        let mut engine = standard_engine(1);
        let mut grid = Grid::new(5, 8);
        grid.set(2, 0, SAND);
        for _ in 0..8 {
            grid = engine.advance(&grid);
        }
        assert_eq!(grid.get(2, 7), SAND);
        assert_eq!(grid.count_of(SAND), 1);
    }

    #[test]
    fn test_sand_sinks_through_water() {
        let mut engine = standard_engine(2);
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, SAND);
        grid.set(1, 2, WATER);
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 2), SAND);
        assert_eq!(next.get(1, 1), WATER);
    }

    #[test]
    fn test_water_does_not_sink_through_water() {
        let mut engine = standard_engine(3);
        let mut grid = Grid::new(1, 3);
        grid.set(0, 1, WATER);
        grid.set(0, 2, WATER);
        let next = engine.advance(&grid);
        assert_eq!(next.get(0, 1), WATER);
        assert_eq!(next.get(0, 2), WATER);
    }

    #[test]
    fn test_sand_tower_collapses_without_losing_grains() {
        let mut engine = standard_engine(4);
        let mut grid = Grid::new(13, 8);
        for y in 2..8 {
            grid.set(6, y, SAND);
        }
        for _ in 0..50 {
            grid = engine.advance(&grid);
            assert_eq!(grid.count_of(SAND), 6);
        }
    }

    #[test]
    fn test_water_spreads_across_its_own_surface() {
        // A water column on the floor flattens out; grains pass over their
        // own kind diagonally within the viscosity radius.
        let mut engine = standard_engine(5);
        let mut grid = Grid::new(9, 6);
        for y in 2..6 {
            grid.set(4, y, WATER);
        }
        for _ in 0..30 {
            grid = engine.advance(&grid);
        }
        assert_eq!(grid.count_of(WATER), 4);
        // No cell left stacked above the bottom two rows.
        for x in 0..9 {
            for y in 0..4 {
                assert_eq!(grid.get(x, y), EMPTY, "water still stacked at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_quench_water_and_lava_become_steam_and_sand() {
        let mut engine = standard_engine(6);
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, WATER);
        grid.set(1, 2, LAVA);
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 1), STEAM);
        assert_eq!(next.get(1, 2), SAND);
        assert_eq!(next.count_of(WATER), 0);
        assert_eq!(next.count_of(LAVA), 0);
    }

    #[test]
    fn test_lava_ignites_plant_and_skip_suppresses_lava_fall() {
        let mut engine = standard_engine(7);
        let mut grid = Grid::new(4, 4);
        grid.set(1, 1, LAVA);
        grid.set(2, 1, PLANT);
        let next = engine.advance(&grid);
        // Lava stays put despite the empty cell below it: the interaction
        // carries skip_processing for both sides.
        assert_eq!(next.get(1, 1), LAVA);
        assert_eq!(next.get(2, 1), FIRE);
        assert_eq!(next.get(1, 2), EMPTY);
    }

    #[test]
    fn test_water_extinguishes_fire_in_one_tick() {
        let mut engine = standard_engine(8);
        let mut grid = Grid::new(10, 10);
        grid.set(5, 5, FIRE);
        grid.set(5, 4, WATER);
        let next = engine.advance(&grid);
        assert_eq!(next.get(5, 4), EMPTY);
        assert_eq!(next.get(5, 5), FIRE);
        // Extinguishing replaced fire's processing: it neither moved nor
        // spread anywhere this tick.
        assert_eq!(next.count_of(FIRE), 1);
        assert_eq!(next.count_of(WATER), 0);
    }

    #[test]
    fn test_fire_spreads_to_adjacent_plants_at_declared_rate() {
        let mut engine = standard_engine(9);
        let trials = 1000;
        let mut either_ignited = 0;
        let mut right_ignited = 0;
        for _ in 0..trials {
            let mut grid = Grid::new(10, 10);
            grid.set(5, 5, FIRE);
            grid.set(4, 5, PLANT);
            grid.set(6, 5, PLANT);
            let next = engine.advance(&grid);
            if next.get(4, 5) == FIRE || next.get(6, 5) == FIRE {
                either_ignited += 1;
            }
            if next.get(6, 5) == FIRE {
                right_ignited += 1;
            }
        }
        // The right plant is scanned after the fire, so its unconditional
        // stay overwrites the spread write within the same tick; only the
        // left plant can hold an ignition. The observed either-plant rate
        // therefore converges on the declared 0.3 spread probability.
        assert_eq!(right_ignited, 0);
        let rate = either_ignited as f64 / trials as f64;
        assert!((0.24..=0.36).contains(&rate), "ignition rate {rate}");
    }

    #[test]
    fn test_fire_rises_or_burns_out() {
        let mut engine = standard_engine(10);
        let trials = 500;
        let mut rose = 0;
        for _ in 0..trials {
            let mut grid = Grid::new(3, 4);
            grid.set(1, 2, FIRE);
            let next = engine.advance(&grid);
            match (next.get(1, 1), next.get(1, 2)) {
                (FIRE, EMPTY) => rose += 1,
                (EMPTY, EMPTY) => {} // burned out
                other => panic!("unexpected fire outcome {other:?}"),
            }
        }
        let rate = rose as f64 / trials as f64;
        assert!(rate > 0.88 && rate < 1.0, "rise rate {rate}");
    }

    #[test]
    fn test_seed_sprouts_on_soil_contact() {
        let mut engine = standard_engine(11);
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, SEED);
        grid.set(1, 2, SOIL);
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 1), PLANT);
        assert_eq!(next.get(1, 2), SOIL);
    }

    #[test]
    fn test_seed_falls_like_sand_without_soil() {
        let mut engine = standard_engine(12);
        let mut grid = Grid::new(3, 3);
        grid.set(1, 0, SEED);
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 1), SEED);
        assert_eq!(next.get(1, 0), EMPTY);
    }

    #[test]
    fn test_steam_at_top_boundary_condenses_or_vanishes() {
        let mut engine = standard_engine(13);
        let mut condensed = 0;
        for _ in 0..200 {
            let mut grid = Grid::new(3, 3);
            grid.set(1, 0, STEAM);
            let next = engine.advance(&grid);
            let cell = next.get(1, 0);
            assert_ne!(cell, STEAM, "steam must not linger at the ceiling");
            if cell == WATER {
                condensed += 1;
            } else {
                assert_eq!(cell, EMPTY);
            }
        }
        assert!(condensed > 120, "condensed {condensed}/200");
    }

    #[test]
    fn test_steam_under_obstacle_mostly_condenses() {
        let mut engine = standard_engine(14);
        let mut condensed = 0;
        for _ in 0..200 {
            let mut grid = Grid::new(3, 4);
            grid.set(1, 1, PLANT); // non-vapor obstacle
            grid.set(1, 2, STEAM);
            let next = engine.advance(&grid);
            if next.get(1, 2) == WATER {
                condensed += 1;
            }
        }
        // Blocked-above pool: become water 0.7, vanish 0.05, stay 0.25.
        let rate = condensed as f64 / 200.0;
        assert!((0.55..=0.85).contains(&rate), "condensation rate {rate}");
    }

    #[test]
    fn test_steam_does_not_condense_against_other_steam() {
        // Steam above is vapor, not an obstacle: the blocked rule must not
        // match, leaving the otherwise pool (stay-dominated) in charge.
        let mut engine = standard_engine(15);
        let mut stayed_steam = 0;
        for _ in 0..200 {
            let mut grid = Grid::new(3, 5);
            grid.set(1, 2, STEAM);
            grid.set(1, 3, STEAM);
            let next = engine.advance(&grid);
            if next.get(1, 3) == STEAM {
                stayed_steam += 1;
            }
        }
        // Otherwise pool keeps steam with probability 0.85.
        let rate = stayed_steam as f64 / 200.0;
        assert!((0.7..=0.95).contains(&rate), "stay rate {rate}");
    }

    #[test]
    fn test_plant_density_cap_stops_growth() {
        let mut engine = standard_engine(16);
        let mut grid = Grid::new(10, 10);
        for x in 4..7 {
            for y in 4..7 {
                grid.set(x, y, PLANT);
            }
        }
        // Every member of the 3x3 block sees all nine plants in its 5x5
        // window, exceeding the cap of eight.
        for _ in 0..100 {
            grid = engine.advance(&grid);
        }
        assert_eq!(grid.count_of(PLANT), 9);
    }

    #[test]
    fn test_lone_plant_grows_eventually() {
        let mut engine = standard_engine(17);
        let mut grid = Grid::new(11, 10);
        grid.set(5, 9, PLANT);
        for _ in 0..2000 {
            grid = engine.advance(&grid);
        }
        assert!(grid.count_of(PLANT) > 1);
    }

    #[test]
    fn test_static_element_never_moves() {
        let wall = ElementSpec::new("Wall", Rgb::new(80, 80, 80), BehaviorSpec::Static);
        let empty = ElementSpec::new("Empty", Rgb::new(50, 50, 50), BehaviorSpec::Static);
        let (registry, table) =
            compiler::compile(&[empty, wall], &[ElementId::EMPTY, ElementId(1)], &[]).unwrap();
        let mut engine = Engine::new(registry, table, 18);
        let mut grid = Grid::new(4, 4);
        grid.set(2, 1, ElementId(1));
        for _ in 0..10 {
            grid = engine.advance(&grid);
        }
        assert_eq!(grid.get(2, 1), ElementId(1));
        assert_eq!(grid.count_of(ElementId(1)), 1);
    }

    #[test]
    fn test_first_otherwise_rule_wins() {
        // Two otherwise rules: only the first may ever contribute actions.
        let mark = ElementId(2);
        let flip = ElementSpec::new(
            "Flip",
            Rgb::new(1, 1, 1),
            BehaviorSpec::Custom {
                rules: vec![
                    BehaviorRule {
                        condition: None,
                        actions: vec![WeightedAction {
                            action: Action::Become(mark),
                            probability: 1.0,
                        }],
                    },
                    BehaviorRule {
                        condition: None,
                        actions: vec![WeightedAction {
                            action: Action::Vanish,
                            probability: 1.0,
                        }],
                    },
                ],
                spread: vec![],
                growth: vec![],
                fallback_viscosity: None,
            },
        );
        let empty = ElementSpec::new("Empty", Rgb::new(0, 0, 0), BehaviorSpec::Static);
        let marker = ElementSpec::new("Mark", Rgb::new(2, 2, 2), BehaviorSpec::Static);
        let (registry, table) = compiler::compile(
            &[empty, flip, marker],
            &[ElementId::EMPTY, ElementId(1), mark],
            &[],
        )
        .unwrap();
        let mut engine = Engine::new(registry, table, 19);
        for _ in 0..50 {
            let mut grid = Grid::new(3, 3);
            grid.set(1, 1, ElementId(1));
            let next = engine.advance(&grid);
            assert_eq!(next.get(1, 1), mark);
        }
    }

    #[test]
    fn test_fall_is_selectable_as_a_weighted_action() {
        let faller = ElementSpec::new(
            "Dripper",
            Rgb::new(3, 3, 3),
            BehaviorSpec::Custom {
                rules: vec![BehaviorRule {
                    condition: Some(Condition::Empty(Dir::Below)),
                    actions: vec![WeightedAction {
                        action: Action::Fall { viscosity: 1 },
                        probability: 1.0,
                    }],
                }],
                spread: vec![],
                growth: vec![],
                fallback_viscosity: None,
            },
        );
        let empty = ElementSpec::new("Empty", Rgb::new(0, 0, 0), BehaviorSpec::Static);
        let (registry, table) =
            compiler::compile(&[empty, faller], &[ElementId::EMPTY, ElementId(1)], &[]).unwrap();
        let mut engine = Engine::new(registry, table, 20);
        let mut grid = Grid::new(3, 3);
        grid.set(1, 0, ElementId(1));
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 1), ElementId(1));
        assert_eq!(next.get(1, 0), EMPTY);
    }

    #[test]
    fn test_set_action_does_not_settle_the_source_cell() {
        // A rule that only pokes a neighbor leaves the element itself to the
        // stay default.
        let marker = ElementId(2);
        let poker = ElementSpec::new(
            "Poker",
            Rgb::new(4, 4, 4),
            BehaviorSpec::Custom {
                rules: vec![BehaviorRule {
                    condition: Some(Condition::Empty(Dir::Right)),
                    actions: vec![WeightedAction {
                        action: Action::Set(Dir::Right, marker),
                        probability: 1.0,
                    }],
                }],
                spread: vec![],
                growth: vec![],
                fallback_viscosity: None,
            },
        );
        let empty = ElementSpec::new("Empty", Rgb::new(0, 0, 0), BehaviorSpec::Static);
        let mark = ElementSpec::new("Mark", Rgb::new(5, 5, 5), BehaviorSpec::Static);
        let (registry, table) = compiler::compile(
            &[empty, poker, mark],
            &[ElementId::EMPTY, ElementId(1), marker],
            &[],
        )
        .unwrap();
        let mut engine = Engine::new(registry, table, 21);
        let mut grid = Grid::new(3, 3);
        grid.set(0, 1, ElementId(1));
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 1), marker);
        assert_eq!(next.get(0, 1), ElementId(1));
    }

    #[test]
    fn test_named_neighbor_and_bottom_boundary_conditions() {
        // Boundary rule first: on the bottom row it wins even with the
        // trigger above; elsewhere the named-neighbor rule fires.
        let trigger = ElementId(2);
        let mark_bottom = ElementId(3);
        let mark_above = ElementId(4);
        let sensor = ElementSpec::new(
            "Sensor",
            Rgb::new(6, 6, 6),
            BehaviorSpec::Custom {
                rules: vec![
                    BehaviorRule {
                        condition: Some(Condition::AtBottomBoundary),
                        actions: vec![WeightedAction {
                            action: Action::Become(mark_bottom),
                            probability: 1.0,
                        }],
                    },
                    BehaviorRule {
                        condition: Some(Condition::Is(Dir::Above, trigger)),
                        actions: vec![WeightedAction {
                            action: Action::Become(mark_above),
                            probability: 1.0,
                        }],
                    },
                ],
                spread: vec![],
                growth: vec![],
                fallback_viscosity: None,
            },
        );
        let mk_static = |name: &str| {
            ElementSpec::new(name, Rgb::new(0, 0, 0), BehaviorSpec::Static)
        };
        let (registry, table) = compiler::compile(
            &[
                mk_static("Empty"),
                sensor,
                mk_static("Trigger"),
                mk_static("MarkBottom"),
                mk_static("MarkAbove"),
            ],
            &[ElementId::EMPTY, ElementId(1), trigger, mark_bottom, mark_above],
            &[],
        )
        .unwrap();
        let mut engine = Engine::new(registry, table, 22);

        let mut grid = Grid::new(3, 4);
        grid.set(1, 3, ElementId(1)); // bottom row
        grid.set(2, 1, trigger);
        grid.set(2, 2, ElementId(1)); // mid-grid, trigger above
        let next = engine.advance(&grid);
        assert_eq!(next.get(1, 3), mark_bottom);
        assert_eq!(next.get(2, 2), mark_above);
    }

    #[test]
    fn test_crowding_condition_gates_a_rule() {
        let mark = ElementId(2);
        let shy = ElementSpec::new(
            "Shy",
            Rgb::new(7, 7, 7),
            BehaviorSpec::Custom {
                rules: vec![BehaviorRule {
                    // Counts itself, so a pair in one window exceeds max 1.
                    condition: Some(Condition::NotCrowded {
                        element: ElementId(1),
                        max: 1,
                    }),
                    actions: vec![WeightedAction {
                        action: Action::Become(mark),
                        probability: 1.0,
                    }],
                }],
                spread: vec![],
                growth: vec![],
                fallback_viscosity: None,
            },
        );
        let empty = ElementSpec::new("Empty", Rgb::new(0, 0, 0), BehaviorSpec::Static);
        let marker = ElementSpec::new("Mark", Rgb::new(8, 8, 8), BehaviorSpec::Static);
        let (registry, table) = compiler::compile(
            &[empty, shy, marker],
            &[ElementId::EMPTY, ElementId(1), mark],
            &[],
        )
        .unwrap();
        let mut engine = Engine::new(registry, table, 23);

        let mut lone = Grid::new(7, 7);
        lone.set(3, 3, ElementId(1));
        assert_eq!(engine.advance(&lone).get(3, 3), mark);

        let mut crowded = Grid::new(7, 7);
        crowded.set(3, 3, ElementId(1));
        crowded.set(4, 3, ElementId(1));
        let next = engine.advance(&crowded);
        // Both see two of their kind in the window: no rule matches and the
        // cells fall back to staying put.
        assert_eq!(next.get(3, 3), ElementId(1));
        assert_eq!(next.get(4, 3), ElementId(1));
    }

    #[test]
    fn test_later_neighbor_skip_still_applies_after_earlier_write() {
        // Two interactions on one cell: the left neighbor's entry writes a
        // result without skip; the right neighbor's entry carries skip. The
        // first write stands, and the skip from the later neighbor must
        // still suppress behavior dispatch for the tick.
        let core = ElementId(1);
        let soft = ElementId(2);
        let hard = ElementId(3);
        let scarred = ElementId(4);
        let mk = |name: &str, behavior: BehaviorSpec| {
            ElementSpec::new(name, Rgb::new(9, 9, 9), behavior)
        };
        // Core is falling: if dispatch ran it would drop into the empty cell
        // below instead of holding its interaction result.
        let specs = vec![
            mk("Empty", BehaviorSpec::Static),
            mk("Core", BehaviorSpec::Falling { viscosity: 1 }),
            mk("Soft", BehaviorSpec::Static),
            mk("Hard", BehaviorSpec::Static),
            mk("Scarred", BehaviorSpec::Static),
        ];
        let interactions = vec![
            InteractionSpec::new("Core", "Soft", scarred, soft),
            InteractionSpec::new("Core", "Hard", core, hard).skipping_processing(),
        ];
        let (registry, table) = compiler::compile(
            &specs,
            &[ElementId::EMPTY, core, soft, hard, scarred],
            &interactions,
        )
        .unwrap();
        let mut engine = Engine::new(registry, table, 24);

        let mut grid = Grid::new(5, 3);
        grid.set(1, 0, soft);
        grid.set(2, 0, core);
        grid.set(3, 0, hard);
        let next = engine.advance(&grid);
        // Left neighbor's interaction wrote first (scarred), the right
        // neighbor's skip kept the falling dispatch from running.
        assert_eq!(next.get(2, 0), scarred);
        assert_eq!(next.get(2, 1), EMPTY);
        assert_eq!(next.get(1, 0), soft);
        assert_eq!(next.get(3, 0), hard);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut grid_a = Grid::new(12, 12);
        let mut grid_b = Grid::new(12, 12);
        for (x, e) in [(2, SAND), (3, WATER), (5, FIRE), (7, SEED), (9, LAVA)] {
            grid_a.set(x, 3, e);
            grid_b.set(x, 3, e);
        }
        let mut engine_a = standard_engine(42);
        let mut engine_b = standard_engine(42);
        for _ in 0..40 {
            grid_a = engine_a.advance(&grid_a);
            grid_b = engine_b.advance(&grid_b);
            assert_eq!(grid_a, grid_b);
        }
    }

    proptest! {
        /// Falling-only content is conserved. One grain per column keeps the
        /// grains out of each other's diagonal scan paths, so nothing merges
        /// and nothing vanishes.
        #[test]
        fn falling_grains_are_conserved(
            columns in proptest::collection::vec(
                proptest::option::of((0usize..12, 0usize..3)),
                16,
            ),
            seed in 0u64..1000,
        ) {
            let materials = [SAND, SOIL, WATER];
            let mut grid = Grid::new(16, 12);
            for (x, cell) in columns.iter().enumerate() {
                if let Some((y, m)) = cell {
                    grid.set(x, *y, materials[*m]);
                }
            }
            let before: Vec<usize> =
                materials.iter().map(|&m| grid.count_of(m)).collect();

            let mut engine = standard_engine(seed);
            for _ in 0..20 {
                grid = engine.advance(&grid);
            }

            let after: Vec<usize> =
                materials.iter().map(|&m| grid.count_of(m)).collect();
            prop_assert_eq!(before, after);
        }
    }
}
