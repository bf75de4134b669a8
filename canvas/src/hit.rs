//! Spatial queries: drag-select rectangles and the tile under the pointer.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::entity::{Entity, Player};
use crate::viewport::{Coord, Point, Viewport};
use crate::world::World;

/// A drag rectangle normalized to `[min, max]` on both axes, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub min: Point,
    pub max: Point,
}

impl SelectionRect {
    /// Build from two corners in any order.
    #[must_use]
    pub fn new(a: Point, b: Point) -> Self {
        Self { min: Point::new(a.x.min(b.x), a.y.min(b.y)), max: Point::new(a.x.max(b.x), a.y.max(b.y)) }
    }

    /// Closed containment on both axes.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Ids of `player`'s probes whose drawn center lies inside `rect`, in id order.
#[must_use]
pub fn probes_in_rect(player: &Player, rect: &SelectionRect) -> Vec<String> {
    player.probes().filter(|p| rect.contains(p.sprite().center)).map(|p| p.id().to_owned()).collect()
}

/// Coordinate of the tile under pixel `pos`, if the board has one there.
#[must_use]
pub fn tile_under(world: &World, viewport: &Viewport, pos: Point) -> Option<Coord> {
    if viewport.unit() <= 0.0 {
        return None;
    }
    let coord = viewport.to_coordinate(pos);
    world.tile_at(coord).map(|t| t.coord())
}
