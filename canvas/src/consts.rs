//! Shared numeric and color constants for the canvas crate.

// ── Colors ──────────────────────────────────────────────────────

/// Fill of unowned tiles.
pub const NEUTRAL_COLOR: &str = "#2b2b2b";

/// Player colors, assigned in snapshot order when the server sends none.
pub const PALETTE: [&str; 6] = ["#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4"];

// ── Entity geometry (fractions of one grid cell) ────────────────

pub const FACTORY_SCALE: f64 = 0.6;
pub const TURRET_SCALE: f64 = 0.5;

/// Probe diameter.
pub const PROBE_SCALE: f64 = 0.25;

// ── Probe smoothing ─────────────────────────────────────────────

/// Display catch-up speed as a multiple of the probe's own speed.
pub const PROBE_CATCH_UP: f64 = 2.0;

/// Gap in cells beyond which the displayed probe snaps instead of easing.
pub const PROBE_SNAP_CELLS: f64 = 2.0;

// ── Engine defaults ─────────────────────────────────────────────

/// Pointer travel below which a press/release pair counts as a click.
pub const DEFAULT_CLICK_THRESHOLD_PX: f64 = 10.0;

pub const DEFAULT_RESIZE_DELAY_MS: f64 = 500.0;

/// Height of the UI bar reserved under the board.
pub const DEFAULT_UI_BAR_HEIGHT_PX: f64 = 40.0;

/// Upper bound on one tick's `dt`, so a backgrounded tab does not teleport probes.
pub const DEFAULT_MAX_TICK_DT_S: f64 = 0.1;

/// Intents remembered while awaiting an ack. The oldest is forgotten first;
/// a late ack for it falls back to the reply's own event name.
pub const MAX_PENDING_ACKS: usize = 64;

// ── Effects ─────────────────────────────────────────────────────

pub const BEAM_DURATION_S: f64 = 0.2;
pub const EXPLOSION_DURATION_S: f64 = 0.4;

/// Explosion radius in cells.
pub const EXPLOSION_RADIUS_CELLS: f64 = 0.75;
