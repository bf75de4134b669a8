//! Viewport context: grid↔pixel transforms and responsive sizing.
//!
//! The board is a fixed `dim.x × dim.y` grid drawn at the top-left of the
//! canvas with a UI bar reserved beneath it. Every pixel position the engine
//! produces is derived from [`Viewport::unit`], the side of one grid cell in
//! CSS pixels, so a resize only has to recompute `unit` and re-layout.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

/// A point in either pixel space or fractional grid space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The fractional grid point at the center of this cell.
    #[must_use]
    pub fn center(self) -> Point {
        Point::new(f64::from(self.x) + 0.5, f64::from(self.y) + 0.5)
    }
}

/// Canvas dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pixel/grid transform for one canvas and one board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    size: Size,
    dim: Coord,
    ui_bar_height: f64,
    unit: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(size: Size, dim: Coord, ui_bar_height: f64) -> Self {
        let mut viewport = Self { size, dim, ui_bar_height, unit: 0.0 };
        viewport.recompute();
        viewport
    }

    /// Side of one grid cell in CSS pixels. Zero when the canvas is degenerate.
    #[must_use]
    pub fn unit(&self) -> f64 {
        self.unit
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn dim(&self) -> Coord {
        self.dim
    }

    #[must_use]
    pub fn ui_bar_height(&self) -> f64 {
        self.ui_bar_height
    }

    /// Update the canvas size and recompute `unit`.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.recompute();
    }

    /// Update the grid dimensions and recompute `unit`.
    pub fn set_dim(&mut self, dim: Coord) {
        self.dim = dim;
        self.recompute();
    }

    /// Grid cell containing the pixel `pos` (floored).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_coordinate(&self, pos: Point) -> Coord {
        let precise = self.to_coordinate_precise(pos);
        Coord::new(precise.x.floor() as i32, precise.y.floor() as i32)
    }

    /// Fractional grid position of the pixel `pos`.
    #[must_use]
    pub fn to_coordinate_precise(&self, pos: Point) -> Point {
        if self.unit <= 0.0 {
            return Point::default();
        }
        Point::new(pos.x / self.unit, pos.y / self.unit)
    }

    /// Top-left pixel of the grid cell `coord`.
    #[must_use]
    pub fn to_pixel(&self, coord: Coord) -> Point {
        Point::new(f64::from(coord.x) * self.unit, f64::from(coord.y) * self.unit)
    }

    /// Pixel position of a fractional grid point.
    #[must_use]
    pub fn to_pixel_precise(&self, pos: Point) -> Point {
        Point::new(pos.x * self.unit, pos.y * self.unit)
    }

    /// Clamp a pixel position to the canvas bounds.
    #[must_use]
    pub fn clamp_to_canvas(&self, pos: Point) -> Point {
        Point::new(pos.x.clamp(0.0, self.size.width.max(0.0)), pos.y.clamp(0.0, self.size.height.max(0.0)))
    }

    /// Pixel extent of the whole grid.
    #[must_use]
    pub fn board_size(&self) -> Size {
        Size::new(f64::from(self.dim.x) * self.unit, f64::from(self.dim.y) * self.unit)
    }

    fn recompute(&mut self) {
        if self.dim.x <= 0 || self.dim.y <= 0 {
            self.unit = 0.0;
            return;
        }
        let usable_height = (self.size.height - self.ui_bar_height).max(0.0);
        let by_width = self.size.width.max(0.0) / f64::from(self.dim.x);
        let by_height = usable_height / f64::from(self.dim.y);
        self.unit = by_width.min(by_height).floor().max(0.0);
    }
}
