//! Headless demo harness
//!
//! Builds the standard catalog, pours a small scene onto a stage, and dumps
//! ASCII frames to stdout while the engine ticks. Rendering proper is a host
//! concern; this binary exists to watch the simulation without one.

use sandfall::dsl::catalog::{self, EMPTY, FIRE, LAVA, PLANT, SAND, SEED, SOIL, STEAM, WATER};
use sandfall::{ElementId, Engine, Grid};

const WIDTH: usize = 72;
const HEIGHT: usize = 28;
const TICKS: u32 = 400;
const FRAME_EVERY: u32 = 100;

fn main() {
    env_logger::init();

    let (registry, interactions) = catalog::compile().expect("built-in catalog must compile");
    let names: Vec<&str> = registry.all_selectable().map(|d| d.name.as_str()).collect();
    log::info!("elements: {}", names.join(", "));

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0xC0FFEE);
    log::info!("running {TICKS} ticks on a {WIDTH}x{HEIGHT} stage, seed {seed}");

    let mut engine = Engine::new(registry, interactions, seed);
    let mut grid = Grid::new(WIDTH, HEIGHT);
    pour_scene(&mut grid);

    for tick in 1..=TICKS {
        grid = engine.advance(&grid);
        if tick % FRAME_EVERY == 0 {
            println!("--- tick {tick} ---");
            print_frame(&grid);
        }
    }
}

/// Soil floor, a sand heap, a water pool, a lava pocket, seeds, and fire.
fn pour_scene(grid: &mut Grid) {
    for x in 0..WIDTH {
        grid.set(x, HEIGHT - 1, SOIL);
    }
    for x in 8..=16 {
        for y in 4..=8 {
            grid.set(x, y, SAND);
        }
    }
    for x in 40..=52 {
        for y in 2..=6 {
            grid.set(x, y, WATER);
        }
    }
    for x in 26..=31 {
        grid.set(x, HEIGHT - 3, LAVA);
    }
    for x in [20, 22, 24] {
        grid.set(x, 2, SEED);
    }
    grid.set(60, HEIGHT - 2, PLANT);
    grid.set(34, HEIGHT - 4, FIRE);
}

fn print_frame(grid: &Grid) {
    for y in 0..grid.height() {
        let mut line = String::with_capacity(grid.width());
        for x in 0..grid.width() {
            line.push(glyph(grid.get(x, y)));
        }
        println!("{line}");
    }
}

/// ASCII glyphs for the standard elements.
fn glyph(id: ElementId) -> char {
    match id {
        EMPTY => ' ',
        SAND => '.',
        WATER => '~',
        SOIL => '#',
        LAVA => 'L',
        FIRE => '*',
        SEED => 'o',
        PLANT => 'p',
        STEAM => '"',
        _ => '?',
    }
}
