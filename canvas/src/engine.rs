//! Browser-facing engine: wraps [`GameSession`] and owns the canvas element.
//!
//! Everything testable lives in [`GameSession`]; this layer only decodes
//! inbound socket payloads, keeps the canvas backing store in step with the
//! board size, and hands the 2D context to [`crate::render`].

use futures::channel::mpsc::UnboundedSender;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::config::{Control, EngineSettings};
use crate::input::{Action, Button, Key};
use crate::session::GameSession;
use crate::viewport::{Point, Size};
use frames::Frame;

/// The full game view. Wraps `GameSession` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    /// CSS size the backing store was last sized for.
    backing: Size,
    dpr: f64,
    pub core: GameSession,
}

impl Engine {
    /// Create an engine bound to `canvas`, sending intents through `outbound`.
    #[must_use]
    pub fn new(
        canvas: HtmlCanvasElement,
        username: impl Into<String>,
        settings: EngineSettings,
        outbound: UnboundedSender<Frame>,
    ) -> Self {
        Self { canvas, backing: Size::default(), dpr: 1.0, core: GameSession::new(username, settings, outbound) }
    }

    /// Route `log` records to the browser console. Call once at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if a logger was already installed.
    pub fn init_logging(level: log::Level) -> Result<(), log::SetLoggerError> {
        console_log::init_with_level(level)
    }

    // --- Viewport ---

    /// Apply a CSS size and device pixel ratio immediately, bypassing the debounce.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };
        if (dpr - self.dpr).abs() > f64::EPSILON {
            self.dpr = dpr;
            self.backing = Size::default();
        }
        self.core.set_canvas_size(Size::new(width_css, height_css));
        self.sync_backing();
    }

    /// Feed a container size observation into the resize debounce.
    pub fn request_resize(&mut self, now_ms: f64, width_css: f64, height_css: f64) {
        self.core.request_resize(now_ms, width_css, height_css);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sync_backing(&mut self) {
        let size = self.core.canvas_size();
        if size == self.backing {
            return;
        }
        self.canvas.set_width((size.width * self.dpr).round().max(0.0) as u32);
        self.canvas.set_height((size.height * self.dpr).round().max(0.0) as u32);
        self.backing = size;
    }

    // --- Socket ---

    /// Handle a text (JSON) frame from the socket.
    pub fn handle_text(&mut self, text: &str, now_ms: f64) -> Vec<Action> {
        match frames::from_json(text) {
            Ok(frame) => self.handle_frame(&frame, now_ms),
            Err(e) => {
                log::warn!("dropping undecodable text frame: {e}");
                Vec::new()
            }
        }
    }

    /// Handle a binary (protobuf) frame from the socket.
    pub fn handle_bytes(&mut self, bytes: &[u8], now_ms: f64) -> Vec<Action> {
        match frames::decode_frame(bytes) {
            Ok(frame) => self.handle_frame(&frame, now_ms),
            Err(e) => {
                log::warn!("dropping undecodable binary frame: {e}");
                Vec::new()
            }
        }
    }

    fn handle_frame(&mut self, frame: &Frame, now_ms: f64) -> Vec<Action> {
        match self.core.handle_frame(frame, now_ms) {
            Ok(actions) => actions,
            Err(e) => {
                log::warn!("frame {} ({}) not applied: {e}", frame.id, frame.event);
                Vec::new()
            }
        }
    }

    /// Install the single error subscriber for rejected requests.
    pub fn on_error(&mut self, callback: impl FnMut(&str) + 'static) {
        self.core.on_error(callback);
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, pos: Point, button: Button) -> Vec<Action> {
        self.core.pointer_down(pos, button)
    }

    pub fn on_pointer_move(&mut self, pos: Point) -> Vec<Action> {
        self.core.pointer_move(pos)
    }

    pub fn on_pointer_up(&mut self, pos: Point, button: Button) -> Vec<Action> {
        self.core.pointer_up(pos, button)
    }

    pub fn on_key_down(&mut self, key: &str) -> Vec<Action> {
        self.core.key_down(&Key(key.to_owned()))
    }

    /// Trigger a control from a toolbar button rather than a key.
    pub fn on_control(&mut self, control: Control) -> Vec<Action> {
        self.core.control(control)
    }

    // --- Frame loop ---

    /// Advance one animation frame and keep the backing store sized.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        let actions = self.core.tick(now_ms);
        self.sync_backing();
        actions
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self, now_ms: f64) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        crate::render::draw(&ctx, &self.core, self.dpr, now_ms)
    }

    /// Tear the view down; the engine can receive another `start_game` later.
    pub fn end(&mut self) {
        self.core.end();
    }
}
