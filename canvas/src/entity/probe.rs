use crate::consts::{PROBE_CATCH_UP, PROBE_SCALE, PROBE_SNAP_CELLS};
use crate::entity::{Color, Entity, EntityKind, Sprite};
use crate::protocol::ProbeState;
use crate::viewport::{Point, Viewport};

/// A mobile unit. `pos` is the server's fractional grid position; the
/// sprite follows `display`, which eases toward `pos` between patches.
#[derive(Debug, Clone)]
pub struct Probe {
    id: String,
    pos: Point,
    display: Point,
    target: Option<Point>,
    death: Option<f64>,
    selected: bool,
    /// Cells per second.
    speed: f64,
    unit: f64,
    sprite: Sprite,
}

impl Probe {
    /// Build from a snapshot or build-event record. Returns `None` when the
    /// record carries no position.
    #[must_use]
    pub fn from_state(state: &ProbeState, color: &Color, speed: f64, viewport: &Viewport) -> Option<Self> {
        let pos = *state.pos.value()?;
        let mut probe = Self {
            id: state.id.clone(),
            pos,
            display: pos,
            target: None,
            death: None,
            selected: false,
            speed,
            unit: 0.0,
            sprite: Sprite::new(pos, 0.0, color.clone()),
        };
        state.target.apply_nullable(&mut probe.target);
        state.death.apply_nullable(&mut probe.death);
        probe.relayout(viewport);
        Some(probe)
    }

    /// Authoritative fractional grid position.
    #[must_use]
    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Fractional grid position currently drawn.
    #[must_use]
    pub fn display_pos(&self) -> Point {
        self.display
    }

    #[must_use]
    pub fn target(&self) -> Option<Point> {
        self.target
    }

    #[must_use]
    pub fn death(&self) -> Option<f64> {
        self.death
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, on: bool) {
        self.selected = on;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn apply_state(&mut self, state: &ProbeState) {
        if let Some(pos) = state.pos.value() {
            self.pos = *pos;
            if self.display.distance(self.pos) > PROBE_SNAP_CELLS {
                self.display = self.pos;
                self.sync_sprite();
            }
        }
        state.target.apply_nullable(&mut self.target);
        state.death.apply_nullable(&mut self.death);
    }

    /// Teleport: both the authoritative and the drawn position jump.
    pub fn set_position(&mut self, pos: Point) {
        self.pos = pos;
        self.display = pos;
        self.sync_sprite();
    }

    fn sync_sprite(&mut self) {
        self.sprite.center = Point::new(self.display.x * self.unit, self.display.y * self.unit);
    }
}

impl Entity for Probe {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Probe
    }

    fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }

    fn relayout(&mut self, viewport: &Viewport) {
        self.unit = viewport.unit();
        self.sprite.size = self.unit * PROBE_SCALE;
        self.sync_sprite();
    }

    fn update(&mut self, dt: f64) {
        let gap = self.display.distance(self.pos);
        if gap <= f64::EPSILON {
            return;
        }
        let step = self.speed * PROBE_CATCH_UP * dt.max(0.0);
        if step >= gap {
            self.display = self.pos;
        } else {
            let t = step / gap;
            self.display = Point::new(
                self.display.x + (self.pos.x - self.display.x) * t,
                self.display.y + (self.pos.y - self.display.y) * t,
            );
        }
        self.sync_sprite();
    }

    fn is_alive(&self) -> bool {
        self.death.is_none()
    }
}
