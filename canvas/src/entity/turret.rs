use crate::consts::TURRET_SCALE;
use crate::entity::{Color, Entity, EntityKind, Sprite};
use crate::protocol::TurretState;
use crate::viewport::{Coord, Viewport};

/// A defensive building that fires at enemy probes in range.
#[derive(Debug, Clone)]
pub struct Turret {
    id: String,
    coord: Coord,
    death: Option<f64>,
    /// Range ring radius in pixels, shown while building turrets.
    scope_px: f64,
    scope_cells: f64,
    sprite: Sprite,
}

impl Turret {
    /// Build from a snapshot or build-event record. Returns `None` when the
    /// record carries no coordinate.
    #[must_use]
    pub fn from_state(state: &TurretState, color: &Color, scope_cells: f64, viewport: &Viewport) -> Option<Self> {
        let coord = *state.coord.value()?;
        let mut turret = Self {
            id: state.id.clone(),
            coord,
            death: None,
            scope_px: 0.0,
            scope_cells,
            sprite: Sprite::new(coord.center(), 0.0, color.clone()),
        };
        state.death.apply_nullable(&mut turret.death);
        turret.relayout(viewport);
        Some(turret)
    }

    #[must_use]
    pub fn coord(&self) -> Coord {
        self.coord
    }

    #[must_use]
    pub fn death(&self) -> Option<f64> {
        self.death
    }

    #[must_use]
    pub fn scope_px(&self) -> f64 {
        self.scope_px
    }

    pub fn apply_state(&mut self, state: &TurretState, viewport: &Viewport) {
        if let Some(coord) = state.coord.value() {
            self.set_coordinate(*coord, viewport);
        }
        state.death.apply_nullable(&mut self.death);
    }

    pub fn set_coordinate(&mut self, coord: Coord, viewport: &Viewport) {
        self.coord = coord;
        self.relayout(viewport);
    }

    pub fn set_scope(&mut self, scope_cells: f64, viewport: &Viewport) {
        self.scope_cells = scope_cells;
        self.relayout(viewport);
    }
}

impl Entity for Turret {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Turret
    }

    fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }

    fn relayout(&mut self, viewport: &Viewport) {
        self.sprite.center = viewport.to_pixel_precise(self.coord.center());
        self.sprite.size = viewport.unit() * TURRET_SCALE;
        self.scope_px = viewport.unit() * self.scope_cells;
    }

    fn is_alive(&self) -> bool {
        self.death.is_none()
    }
}
