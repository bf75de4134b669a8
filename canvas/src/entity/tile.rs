use crate::entity::{Color, Entity, EntityKind, Sprite};
use crate::protocol::TileState;
use crate::viewport::{Coord, Viewport};

/// One grid cell. Owned by the world; its owner is a username looked up
/// against the session's players on demand.
#[derive(Debug, Clone)]
pub struct Tile {
    id: String,
    coord: Coord,
    owner: Option<String>,
    occupation: u32,
    highlighted: bool,
    hovered: bool,
    sprite: Sprite,
}

impl Tile {
    #[must_use]
    pub fn new(coord: Coord, viewport: &Viewport) -> Self {
        let mut tile = Self {
            id: format!("tile-{}-{}", coord.x, coord.y),
            coord,
            owner: None,
            occupation: 0,
            highlighted: false,
            hovered: false,
            sprite: Sprite::new(coord.center(), 0.0, Color::neutral()),
        };
        tile.relayout(viewport);
        tile
    }

    #[must_use]
    pub fn coord(&self) -> Coord {
        self.coord
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub fn occupation(&self) -> u32 {
        self.occupation
    }

    /// Apply a tile patch. Returns `true` if the owner changed.
    pub fn apply_state(&mut self, state: &TileState) -> bool {
        state.occupation.apply(&mut self.occupation);
        state.owner.apply_nullable(&mut self.owner)
    }

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, on: bool) {
        self.highlighted = on;
    }

    #[must_use]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn set_hovered(&mut self, on: bool) {
        self.hovered = on;
    }
}

impl Entity for Tile {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Tile
    }

    fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }

    fn relayout(&mut self, viewport: &Viewport) {
        self.sprite.center = viewport.to_pixel_precise(self.coord.center());
        self.sprite.size = viewport.unit();
    }
}
