//! Entity model: tiles, buildings, probes, and the players owning them.
//!
//! Every renderable game object implements [`Entity`], which is all the
//! session and renderer need to iterate mixed collections. Each variant keeps
//! its own patch logic (`apply_state`) because the patch records differ.
//!
//! Visual state lives in a [`Sprite`]: pixel geometry derived from the
//! viewport plus a color. Recoloring is treated as a rebuild and bumps
//! [`Sprite::revision`], so it is skipped when the color is unchanged.

pub mod factory;
pub mod player;
pub mod probe;
pub mod tile;
pub mod turret;


use serde::{Deserialize, Serialize};

use crate::viewport::{Point, Viewport};

pub use factory::Factory;
pub use player::{Player, PlayerDelta, Removed, UnitStats};
pub use probe::Probe;
pub use tile::Tile;
pub use turret::Turret;

/// A CSS color string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub String);

impl Color {
    #[must_use]
    pub fn new(css: &str) -> Self {
        Self(css.to_owned())
    }

    /// Color of unowned tiles.
    #[must_use]
    pub fn neutral() -> Self {
        Self::new(crate::consts::NEUTRAL_COLOR)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which variant an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tile,
    Factory,
    Turret,
    Probe,
}

/// Cached visual of an entity, in CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Pixel center.
    pub center: Point,
    /// Pixel extent (side for squares, diameter for probes).
    pub size: f64,
    pub color: Color,
    /// Incremented on every visual rebuild.
    pub revision: u32,
}

impl Sprite {
    #[must_use]
    pub fn new(center: Point, size: f64, color: Color) -> Self {
        Self { center, size, color, revision: 0 }
    }

    /// Swap the color, rebuilding only if it differs. Returns `true` on rebuild.
    pub fn recolor(&mut self, color: &Color) -> bool {
        if self.color == *color {
            return false;
        }
        self.color = color.clone();
        self.revision = self.revision.wrapping_add(1);
        true
    }

    /// Top-left corner of the sprite's bounding square.
    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(self.center.x - self.size / 2.0, self.center.y - self.size / 2.0)
    }
}

/// Shared capability of every renderable game object.
pub trait Entity {
    fn id(&self) -> &str;

    fn kind(&self) -> EntityKind;

    fn sprite(&self) -> &Sprite;

    fn sprite_mut(&mut self) -> &mut Sprite;

    /// Recompute pixel geometry after the viewport changed.
    fn relayout(&mut self, viewport: &Viewport);

    /// Per-frame update; `dt` in seconds.
    fn update(&mut self, _dt: f64) {}

    /// Whether the entity has no death timestamp.
    fn is_alive(&self) -> bool {
        true
    }

    /// Change the color, rebuilding the visual only if it differs.
    fn set_color(&mut self, color: &Color) -> bool {
        self.sprite_mut().recolor(color)
    }
}
