use crate::consts::FACTORY_SCALE;
use crate::entity::{Color, Entity, EntityKind, Sprite};
use crate::protocol::FactoryState;
use crate::viewport::{Coord, Viewport};

/// A probe-producing building.
#[derive(Debug, Clone)]
pub struct Factory {
    id: String,
    coord: Coord,
    death: Option<f64>,
    sprite: Sprite,
}

impl Factory {
    /// Build from a snapshot or build-event record. Returns `None` when the
    /// record carries no coordinate.
    #[must_use]
    pub fn from_state(state: &FactoryState, color: &Color, viewport: &Viewport) -> Option<Self> {
        let coord = *state.coord.value()?;
        let mut factory = Self {
            id: state.id.clone(),
            coord,
            death: None,
            sprite: Sprite::new(coord.center(), 0.0, color.clone()),
        };
        state.death.apply_nullable(&mut factory.death);
        factory.relayout(viewport);
        Some(factory)
    }

    #[must_use]
    pub fn coord(&self) -> Coord {
        self.coord
    }

    #[must_use]
    pub fn death(&self) -> Option<f64> {
        self.death
    }

    pub fn apply_state(&mut self, state: &FactoryState, viewport: &Viewport) {
        if let Some(coord) = state.coord.value() {
            self.set_coordinate(*coord, viewport);
        }
        state.death.apply_nullable(&mut self.death);
    }

    pub fn set_coordinate(&mut self, coord: Coord, viewport: &Viewport) {
        self.coord = coord;
        self.relayout(viewport);
    }
}

impl Entity for Factory {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Factory
    }

    fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }

    fn relayout(&mut self, viewport: &Viewport) {
        self.sprite.center = viewport.to_pixel_precise(self.coord.center());
        self.sprite.size = viewport.unit() * FACTORY_SCALE;
    }

    fn is_alive(&self) -> bool {
        self.death.is_none()
    }
}
