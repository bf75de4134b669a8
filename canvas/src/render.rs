//! Rendering: draws the full game scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads session state and produces pixels; it never mutates anything.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::effects::{Effects, Visual};
use crate::entity::{Entity, Player, Sprite};
use crate::input::{CursorIcon, Interaction, Mode};
use crate::session::{Game, GameSession};
use crate::viewport::Size;

const BACKGROUND: &str = "#111111";
const GRID_LINE: &str = "rgba(255, 255, 255, 0.06)";
const HIGHLIGHT: &str = "rgba(255, 255, 255, 0.22)";
const HOVER: &str = "rgba(255, 255, 255, 0.7)";
const SELECTION: &str = "#ffffff";
const DRAG_FILL: &str = "rgba(255, 255, 255, 0.08)";
const UI_BAR: &str = "#1c1c1c";
const UI_TEXT: &str = "#e0e0e0";

/// Selection dash segment length in pixels.
const DRAG_DASH_PX: f64 = 4.0;

/// Opacity of the build ghost following the pointer.
const GHOST_ALPHA: f64 = 0.5;

/// Draw the full scene.
///
/// Layers, bottom first: tiles, range rings, buildings, probes, effects,
/// drag rectangle, cursor ghost, UI bar, result banner.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, session: &GameSession, dpr: f64, now_ms: f64) -> Result<(), JsValue> {
    let canvas = session.canvas_size();

    // Layer 1: clear.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, canvas.width, canvas.height);

    let Some(game) = session.game() else {
        return Ok(());
    };
    if game.viewport().unit() <= 0.0 {
        return Ok(());
    }
    let ix = session.interaction();

    // Layer 2: board.
    draw_tiles(ctx, game);

    // Layer 3: turret ranges while placing turrets.
    if ix.mode() == Mode::BuildTurret {
        if let Some(local) = session.local_player() {
            draw_ranges(ctx, local)?;
        }
    }

    // Layer 4: units.
    for player in game.players() {
        draw_player(ctx, player)?;
    }

    // Layer 5: overlays.
    draw_effects(ctx, session.effects(), now_ms)?;
    draw_drag(ctx, ix)?;
    draw_ghost(ctx, ix, game)?;

    // Layer 6: chrome.
    draw_ui_bar(ctx, session, game, canvas)?;
    if let Some(result) = game.result() {
        let winner = result.ranking.first().map_or("nobody", String::as_str);
        draw_banner(ctx, canvas, &format!("Game over. Winner: {winner}"))?;
    }
    Ok(())
}

// =============================================================
// Board
// =============================================================

fn draw_tiles(ctx: &CanvasRenderingContext2d, game: &Game) {
    ctx.set_line_width(1.0);
    for tile in game.world().tiles() {
        let sprite = tile.sprite();
        let corner = sprite.top_left();
        ctx.set_fill_style_str(sprite.color.as_str());
        ctx.fill_rect(corner.x, corner.y, sprite.size, sprite.size);
        ctx.set_stroke_style_str(GRID_LINE);
        ctx.stroke_rect(corner.x, corner.y, sprite.size, sprite.size);

        if tile.is_highlighted() {
            ctx.set_fill_style_str(HIGHLIGHT);
            ctx.fill_rect(corner.x, corner.y, sprite.size, sprite.size);
        }
        if tile.is_hovered() {
            ctx.set_stroke_style_str(HOVER);
            ctx.stroke_rect(corner.x + 0.5, corner.y + 0.5, sprite.size - 1.0, sprite.size - 1.0);
        }
    }
}

fn draw_ranges(ctx: &CanvasRenderingContext2d, player: &Player) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(player.color().as_str());
    ctx.set_global_alpha(0.35);
    for turret in player.turrets() {
        let c = turret.sprite().center;
        ctx.begin_path();
        ctx.arc(c.x, c.y, turret.scope_px(), 0.0, 2.0 * PI)?;
        ctx.stroke();
    }
    ctx.restore();
    Ok(())
}

// =============================================================
// Units
// =============================================================

fn draw_player(ctx: &CanvasRenderingContext2d, player: &Player) -> Result<(), JsValue> {
    for factory in player.factories() {
        draw_square(ctx, factory.sprite());
    }
    for turret in player.turrets() {
        draw_disc(ctx, turret.sprite())?;
        ctx.set_stroke_style_str(BACKGROUND);
        ctx.set_line_width(2.0);
        ctx.stroke();
    }
    for probe in player.probes() {
        draw_disc(ctx, probe.sprite())?;
        if probe.is_selected() {
            ctx.set_stroke_style_str(SELECTION);
            ctx.set_line_width(2.0);
            ctx.stroke();
        }
    }
    Ok(())
}

fn draw_square(ctx: &CanvasRenderingContext2d, sprite: &Sprite) {
    let corner = sprite.top_left();
    ctx.set_fill_style_str(sprite.color.as_str());
    ctx.fill_rect(corner.x, corner.y, sprite.size, sprite.size);
    ctx.set_stroke_style_str(BACKGROUND);
    ctx.set_line_width(2.0);
    ctx.stroke_rect(corner.x, corner.y, sprite.size, sprite.size);
}

/// Fill a circle for `sprite` and leave its path open for an optional stroke.
fn draw_disc(ctx: &CanvasRenderingContext2d, sprite: &Sprite) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(sprite.center.x, sprite.center.y, sprite.size / 2.0, 0.0, 2.0 * PI)?;
    ctx.set_fill_style_str(sprite.color.as_str());
    ctx.fill();
    Ok(())
}

// =============================================================
// Overlays
// =============================================================

fn draw_effects(ctx: &CanvasRenderingContext2d, effects: &Effects, now_ms: f64) -> Result<(), JsValue> {
    for effect in effects.iter() {
        let t = effect.progress(now_ms);
        ctx.save();
        ctx.set_global_alpha(1.0 - t);
        match &effect.visual {
            Visual::Beam { from, to, color } => {
                ctx.set_stroke_style_str(color.as_str());
                ctx.set_line_width(2.0);
                ctx.begin_path();
                ctx.move_to(from.x, from.y);
                ctx.line_to(to.x, to.y);
                ctx.stroke();
            }
            Visual::Explosion { center, radius, color } => {
                ctx.set_fill_style_str(color.as_str());
                ctx.begin_path();
                ctx.arc(center.x, center.y, radius * (0.3 + 0.7 * t), 0.0, 2.0 * PI)?;
                ctx.fill();
            }
        }
        ctx.restore();
    }
    Ok(())
}

fn draw_drag(ctx: &CanvasRenderingContext2d, ix: &Interaction) -> Result<(), JsValue> {
    let Some(drag) = ix.drag().filter(|d| d.visible) else {
        return Ok(());
    };
    let rect = drag.rect();
    ctx.save();
    let dash_array = js_sys::Array::new();
    dash_array.push(&DRAG_DASH_PX.into());
    dash_array.push(&DRAG_DASH_PX.into());
    ctx.set_line_dash(&dash_array)?;
    ctx.set_stroke_style_str(SELECTION);
    ctx.set_fill_style_str(DRAG_FILL);
    ctx.set_line_width(1.0);
    ctx.fill_rect(rect.min.x, rect.min.y, rect.width(), rect.height());
    ctx.stroke_rect(rect.min.x, rect.min.y, rect.width(), rect.height());
    ctx.set_line_dash(&js_sys::Array::new())?;
    ctx.restore();
    Ok(())
}

/// Translucent preview of the building about to be placed, centered on the pointer.
fn draw_ghost(ctx: &CanvasRenderingContext2d, ix: &Interaction, game: &Game) -> Result<(), JsValue> {
    let (Some(icon), Some(pointer)) = (ix.cursor(), ix.pointer()) else {
        return Ok(());
    };
    let unit = game.viewport().unit();
    let center = pointer;
    ctx.save();
    ctx.set_global_alpha(GHOST_ALPHA);
    ctx.set_fill_style_str(SELECTION);
    match icon {
        CursorIcon::Factory => {
            let side = unit * crate::consts::FACTORY_SCALE;
            ctx.fill_rect(center.x - side / 2.0, center.y - side / 2.0, side, side);
        }
        CursorIcon::Turret => {
            ctx.begin_path();
            ctx.arc(center.x, center.y, unit * crate::consts::TURRET_SCALE / 2.0, 0.0, 2.0 * PI)?;
            ctx.fill();
        }
    }
    ctx.restore();
    Ok(())
}

// =============================================================
// Chrome
// =============================================================

fn draw_ui_bar(ctx: &CanvasRenderingContext2d, session: &GameSession, game: &Game, canvas: Size) -> Result<(), JsValue> {
    let top = game.viewport().board_size().height;
    let height = game.viewport().ui_bar_height();
    ctx.set_fill_style_str(UI_BAR);
    ctx.fill_rect(0.0, top, canvas.width, height);

    let Some(local) = session.local_player() else {
        return Ok(());
    };
    let mode = match session.interaction().mode() {
        Mode::Idle => String::new(),
        Mode::BuildFactory => format!("  |  factory ({:.0})", game.config().factory_price),
        Mode::BuildTurret => format!("  |  turret ({:.0})", game.config().turret_price),
        Mode::SelectProbes => format!("  |  {} probes selected", session.interaction().selected().len()),
    };
    let label = format!("{}  |  money {:.0}  |  score {:.0}{mode}", local.username(), local.money(), local.score());

    ctx.set_fill_style_str(UI_TEXT);
    ctx.set_text_align("left");
    ctx.set_text_baseline("middle");
    ctx.set_font(&format!("{:.0}px sans-serif", (height * 0.4).clamp(10.0, 16.0)));
    ctx.fill_text(&label, 12.0, top + height / 2.0)?;
    Ok(())
}

fn draw_banner(ctx: &CanvasRenderingContext2d, canvas: Size, text: &str) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str("rgba(0, 0, 0, 0.6)");
    ctx.fill_rect(0.0, 0.0, canvas.width, canvas.height);
    ctx.set_fill_style_str(UI_TEXT);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_font("24px sans-serif");
    ctx.fill_text(text, canvas.width / 2.0, canvas.height / 2.0)?;
    ctx.restore();
    Ok(())
}
