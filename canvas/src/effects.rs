//! Transient overlay effects: turret beams and explosions.
//!
//! Each effect is independent and expires on its own deadline. Time is
//! passed in explicitly (`now_ms`, the host's monotonic clock) so expiry is
//! deterministic under test. Nothing cancels an effect early; tearing the
//! layer down with [`Effects::clear`] makes every later prune a no-op.

#[cfg(test)]
#[path = "effects_test.rs"]
mod effects_test;

use crate::entity::Color;
use crate::viewport::Point;

/// What an effect draws, in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// Line from a turret to the probe it hit.
    Beam { from: Point, to: Point, color: Color },
    /// Expanding ring where a probe died.
    Explosion { center: Point, radius: f64, color: Color },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub visual: Visual,
    pub started_ms: f64,
    pub expires_ms: f64,
}

impl Effect {
    /// Elapsed fraction of the effect's lifetime, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self, now_ms: f64) -> f64 {
        let span = self.expires_ms - self.started_ms;
        if span <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.started_ms) / span).clamp(0.0, 1.0)
    }
}

/// The overlay layer.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    active: Vec<Effect>,
}

impl Effects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `visual` for `duration_s` seconds starting at `now_ms`.
    pub fn add(&mut self, visual: Visual, duration_s: f64, now_ms: f64) {
        let expires_ms = now_ms + duration_s.max(0.0) * 1000.0;
        self.active.push(Effect { visual, started_ms: now_ms, expires_ms });
    }

    /// Drop every effect whose deadline is at or before `now_ms`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now_ms: f64) -> usize {
        let before = self.active.len();
        self.active.retain(|e| e.expires_ms > now_ms);
        before - self.active.len()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.active.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
