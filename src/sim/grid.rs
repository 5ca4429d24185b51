//! The simulation grid
//!
//! A fixed-size 2D field of element ids, stored column-major to match the
//! engine's scan order (`x` outer, `y` inner; `y` grows downward). Two grids
//! exist during a tick: the read-only current buffer and the write-only next
//! buffer. Cells serialize as plain integers.

use serde::{Deserialize, Serialize};

use super::element::ElementId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<ElementId>,
}

impl Grid {
    /// Create an all-empty grid.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        Self {
            width,
            height,
            cells: vec![ElementId::EMPTY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    /// Element at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range coordinate; silently returning a sentinel
    /// here would let corruption propagate into the next grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> ElementId {
        assert!(
            x < self.width && y < self.height,
            "grid access out of range: ({x}, {y}) in {}x{}",
            self.width,
            self.height
        );
        self.cells[self.idx(x, y)]
    }

    /// Write `element` at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range coordinate.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, element: ElementId) {
        assert!(
            x < self.width && y < self.height,
            "grid access out of range: ({x}, {y}) in {}x{}",
            self.width,
            self.height
        );
        let i = self.idx(x, y);
        self.cells[i] = element;
    }

    /// Whether signed coordinates land inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// Offset `(x, y)` by `(dx, dy)`, returning the target if in bounds.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, dx: isize, dy: isize) -> Option<(usize, usize)> {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if self.in_bounds(nx, ny) {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }

    /// Count cells holding `element` in the `(2r+1)²` window centered on
    /// `(x, y)`, clipped at the boundaries. The center cell is included.
    pub fn count_in_window(&self, x: usize, y: usize, radius: usize, element: ElementId) -> usize {
        let r = radius as isize;
        let mut count = 0;
        for dx in -r..=r {
            for dy in -r..=r {
                if let Some((nx, ny)) = self.offset(x, y, dx, dy) {
                    if self.cells[self.idx(nx, ny)] == element {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Total number of cells holding `element`.
    pub fn count_of(&self, element: ElementId) -> usize {
        self.cells.iter().filter(|&&c| c == element).count()
    }

    /// Raw cell buffer in column-major order (for renderers).
    pub fn cells(&self) -> &[ElementId] {
        &self.cells
    }
}
