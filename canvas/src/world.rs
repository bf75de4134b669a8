//! The board: a fixed grid of tiles built once per match.
//!
//! Tiles are never added or removed after construction, only patched. Lookups
//! are bounds-checked and return `None` outside the grid.

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;

use crate::entity::{Color, Entity, Tile};
use crate::protocol::TileState;
use crate::viewport::{Coord, Viewport};

/// Ownership transfer reported by [`World::apply_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    pub coord: Coord,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Row-major grid of tiles.
#[derive(Debug, Clone)]
pub struct World {
    dim: Coord,
    tiles: Vec<Tile>,
}

impl World {
    /// Build an unowned `dim.x × dim.y` grid. Non-positive dimensions yield an empty world.
    #[must_use]
    pub fn new(dim: Coord, viewport: &Viewport) -> Self {
        let mut tiles = Vec::new();
        for y in 0..dim.y.max(0) {
            for x in 0..dim.x.max(0) {
                tiles.push(Tile::new(Coord::new(x, y), viewport));
            }
        }
        Self { dim, tiles }
    }

    #[must_use]
    pub fn dim(&self) -> Coord {
        self.dim
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(&self, coord: Coord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.dim.x || coord.y >= self.dim.y {
            return None;
        }
        Some(coord.y as usize * self.dim.x as usize + coord.x as usize)
    }

    #[must_use]
    pub fn tile_at(&self, coord: Coord) -> Option<&Tile> {
        self.index(coord).and_then(|i| self.tiles.get(i))
    }

    pub fn tile_at_mut(&mut self, coord: Coord) -> Option<&mut Tile> {
        self.index(coord).and_then(|i| self.tiles.get_mut(i))
    }

    /// Patch tiles by coordinate. Coordinates outside the grid are skipped.
    pub fn apply_state(&mut self, patches: &[TileState]) -> Vec<OwnerChange> {
        let mut changes = Vec::new();
        for patch in patches {
            let Some(tile) = self.tile_at_mut(patch.coord) else {
                log::debug!("skipping patch for out-of-bounds tile ({}, {})", patch.coord.x, patch.coord.y);
                continue;
            };
            let from = tile.owner().map(str::to_owned);
            if tile.apply_state(patch) {
                changes.push(OwnerChange { coord: patch.coord, from, to: tile.owner().map(str::to_owned) });
            }
        }
        changes
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Toggle the highlight on every tile owned by `username`.
    pub fn set_highlight_owned(&mut self, username: &str, on: bool) {
        for tile in self.tiles.iter_mut().filter(|t| t.owner() == Some(username)) {
            tile.set_highlighted(on);
        }
    }

    pub fn clear_highlights(&mut self) {
        for tile in &mut self.tiles {
            tile.set_highlighted(false);
        }
    }

    /// Move the hover flag from `from` to `to`. Missing tiles are ignored.
    pub fn move_hover(&mut self, from: Option<Coord>, to: Option<Coord>) {
        if from == to {
            return;
        }
        if let Some(tile) = from.and_then(|c| self.tile_at_mut(c)) {
            tile.set_hovered(false);
        }
        if let Some(tile) = to.and_then(|c| self.tile_at_mut(c)) {
            tile.set_hovered(true);
        }
    }

    pub fn relayout(&mut self, viewport: &Viewport) {
        for tile in &mut self.tiles {
            tile.relayout(viewport);
        }
    }

    /// Resolve each tile's owner color through `color_of`. Unknown and absent
    /// owners render neutral.
    pub fn recolor(&mut self, color_of: impl Fn(&str) -> Option<Color>) {
        for tile in &mut self.tiles {
            let color = tile.owner().and_then(&color_of).unwrap_or_else(Color::neutral);
            tile.set_color(&color);
        }
    }
}
