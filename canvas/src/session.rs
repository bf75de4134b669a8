//! One running match: server frames in, intents out, and the per-frame tick.
//!
//! [`GameSession`] holds every session-scoped service (interaction machine,
//! effects layer, resize debouncer, key bindings) and is the testable core of
//! the engine: it has no browser dependencies. [`crate::engine::Engine`]
//! wraps it together with the canvas element.
//!
//! Nothing here is applied speculatively. Intents go out through the
//! outbound channel and their effect, if any, comes back as a server event.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::{BTreeMap, VecDeque};

use frames::{Ack, Frame};
use futures::channel::mpsc::UnboundedSender;

use crate::config::{Control, EngineSettings};
use crate::consts::{BEAM_DURATION_S, EXPLOSION_DURATION_S, EXPLOSION_RADIUS_CELLS, MAX_PENDING_ACKS, PALETTE};
use crate::effects::{Effects, Visual};
use crate::entity::{Color, Entity, EntityKind, Player, Removed, UnitStats};
use crate::error::SessionError;
use crate::input::{Action, Button, Interaction, Key, Scene};
use crate::protocol::{
    BuildFactory, BuildProbe, BuildTurret, GameConfig, GameResult, GameStatePatch, Intent, ServerEvent, StartGame,
    TurretFireProbe,
};
use crate::resize::ResizeController;
use crate::viewport::{Point, Size, Viewport};
use crate::world::{OwnerChange, World};

/// Receives the `msg` of every rejected intent.
pub type ErrorCallback = Box<dyn FnMut(&str)>;

/// Authoritative mirror of the match, built from the `start_game` snapshot.
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    viewport: Viewport,
    world: World,
    players: BTreeMap<String, Player>,
    result: Option<GameResult>,
}

impl Game {
    fn from_snapshot(start: &StartGame, canvas: Size, ui_bar_height: f64) -> Self {
        let config = start.config.clone();
        let viewport = Viewport::new(canvas, config.dim, ui_bar_height);
        let mut world = World::new(config.dim, &viewport);
        let changes = world.apply_state(&start.map.tiles);

        let stats = unit_stats(&config);
        let mut players = BTreeMap::new();
        for (i, state) in start.players.iter().enumerate() {
            let fallback = Color::new(PALETTE[i % PALETTE.len()]);
            players.insert(state.username.clone(), Player::from_state(state, fallback, stats, &viewport));
        }

        let mut game = Self { config, viewport, world, players, result: None };
        game.track_owners(&changes);
        let players = &game.players;
        game.world.recolor(|name| players.get(name).map(|p| p.color().clone()));
        game
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.get(username)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Final standings, once `game_result` arrived.
    #[must_use]
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    fn scene<'a>(&'a mut self, username: &str) -> Scene<'a> {
        Scene { viewport: &self.viewport, world: &mut self.world, local: self.players.get_mut(username) }
    }

    /// Move tile coordinates between players' owned sets and repaint the tiles.
    fn track_owners(&mut self, changes: &[OwnerChange]) {
        for change in changes {
            if let Some(player) = change.from.as_deref().and_then(|name| self.players.get_mut(name)) {
                player.release_tile(change.coord);
            }
            if let Some(player) = change.to.as_deref().and_then(|name| self.players.get_mut(name)) {
                player.claim_tile(change.coord);
            }
            let color = change
                .to
                .as_deref()
                .and_then(|name| self.players.get(name))
                .map_or_else(Color::neutral, |p| p.color().clone());
            if let Some(tile) = self.world.tile_at_mut(change.coord) {
                tile.set_color(&color);
            }
        }
    }

    fn relayout(&mut self, canvas: Size) {
        self.viewport.resize(canvas);
        self.world.relayout(&self.viewport);
        for player in self.players.values_mut() {
            player.relayout(&self.viewport);
        }
    }
}

fn unit_stats(config: &GameConfig) -> UnitStats {
    UnitStats { probe_speed: config.probe_speed, turret_scope: config.turret_scope }
}

/// The session controller.
pub struct GameSession {
    username: String,
    settings: EngineSettings,
    outbound: UnboundedSender<Frame>,
    /// (request id, event name) for intents awaiting an ack, oldest first.
    pending: VecDeque<(String, &'static str)>,
    on_error: Option<ErrorCallback>,
    canvas: Size,
    game: Option<Game>,
    interaction: Interaction,
    effects: Effects,
    resize: ResizeController,
    last_tick_ms: Option<f64>,
}

impl GameSession {
    #[must_use]
    pub fn new(username: impl Into<String>, settings: EngineSettings, outbound: UnboundedSender<Frame>) -> Self {
        let interaction = Interaction::new(settings.click_threshold_px);
        let resize = ResizeController::new(settings.resize_delay_ms);
        Self {
            username: username.into(),
            settings,
            outbound,
            pending: VecDeque::new(),
            on_error: None,
            canvas: Size::default(),
            game: None,
            interaction,
            effects: Effects::new(),
            resize,
            last_tick_ms: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    #[must_use]
    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    #[must_use]
    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    /// The local player, once the snapshot named it.
    #[must_use]
    pub fn local_player(&self) -> Option<&Player> {
        self.game.as_ref().and_then(|g| g.player(&self.username))
    }

    /// Number of intents still waiting for an acknowledgement.
    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.pending.len()
    }

    // --- Setup ---

    /// Register the rejected-intent callback. Replaces any previous one.
    pub fn on_error(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Set the canvas size immediately, bypassing the debounce. Used once
    /// the host knows the element's initial size.
    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas = size;
        self.resize.set_applied(size);
        if let Some(game) = self.game.as_mut() {
            game.relayout(size);
        }
    }

    // --- Server frames ---

    /// Process one inbound frame: an ack for an earlier intent or a server push.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownEvent`] and [`SessionError::Payload`] for
    /// frames the engine cannot decode, [`SessionError::NoGame`] for in-game
    /// events that arrive before `start_game`.
    pub fn handle_frame(&mut self, frame: &Frame, now_ms: f64) -> Result<Vec<Action>, SessionError> {
        if frame.is_ack() {
            self.handle_ack(frame);
            return Ok(Vec::new());
        }
        match ServerEvent::from_frame(frame)? {
            ServerEvent::StartGame(start) => Ok(self.start_game(&start, now_ms)),
            ServerEvent::GameState(patch) => self.apply_game_state(&patch, now_ms),
            ServerEvent::GameResult(result) => self.on_game_result(result),
            ServerEvent::BuildFactory(ev) => self.on_build_factory(&ev),
            ServerEvent::BuildTurret(ev) => self.on_build_turret(&ev),
            ServerEvent::BuildProbe(ev) => self.on_build_probe(&ev),
            ServerEvent::TurretFireProbe(ev) => self.on_turret_fire_probe(&ev, now_ms),
        }
    }

    fn handle_ack(&mut self, frame: &Frame) {
        let event = frame.parent_id.as_deref().and_then(|id| self.take_pending(id)).unwrap_or(frame.event.as_str());
        let Some(ack) = Ack::from_frame(frame) else {
            return;
        };
        if ack.success {
            return;
        }
        let msg = ack.msg.unwrap_or_else(|| format!("{event} rejected"));
        log::warn!("{event} rejected: {msg}");
        if let Some(callback) = self.on_error.as_mut() {
            callback(&msg);
        }
    }

    /// Build the world and players from the full snapshot, replacing any previous match.
    pub fn start_game(&mut self, start: &StartGame, now_ms: f64) -> Vec<Action> {
        let game = Game::from_snapshot(start, self.canvas, self.settings.ui_bar_height_px);
        log::info!(
            "game started: {}x{} board, {} players, local player {}",
            game.config.dim.x,
            game.config.dim.y,
            game.players.len(),
            if game.players.contains_key(&self.username) { self.username.as_str() } else { "(spectating)" }
        );
        self.game = Some(game);
        self.interaction.reset();
        self.effects.clear();
        self.resize.set_applied(self.canvas);
        self.last_tick_ms = Some(now_ms);
        vec![Action::RenderNeeded]
    }

    /// Apply an incremental patch.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn apply_game_state(&mut self, patch: &GameStatePatch, now_ms: f64) -> Result<Vec<Action>, SessionError> {
        let game = self.game.as_mut().ok_or_else(|| SessionError::NoGame(frames::events::GAME_STATE.to_owned()))?;

        if let Some(config) = &patch.config {
            if let Some(dim) = config.dim.filter(|d| *d != game.config.dim) {
                log::warn!("ignoring board dimension change to {}x{}", dim.x, dim.y);
            }
            game.config.apply_patch(config);
            let stats = unit_stats(&game.config);
            for player in game.players.values_mut() {
                player.set_stats(stats, &game.viewport);
            }
        }

        if let Some(map) = &patch.map {
            let changes = game.world.apply_state(&map.tiles);
            game.track_owners(&changes);
            if self.interaction.mode().is_build() && !changes.is_empty() {
                game.world.clear_highlights();
                game.world.set_highlight_owned(&self.username, true);
            }
        }

        let unit = game.viewport.unit();
        for state in &patch.players {
            let Some(player) = game.players.get_mut(&state.username) else {
                log::debug!("skipping patch for unknown player {}", state.username);
                continue;
            };
            let delta = player.apply_state(state, &game.viewport);
            let color = player.color().clone();
            if delta.recolored {
                let owned: Vec<_> = player.tiles().iter().copied().collect();
                for coord in owned {
                    if let Some(tile) = game.world.tile_at_mut(coord) {
                        tile.set_color(&color);
                    }
                }
            }
            for removed in &delta.removed {
                explode(&mut self.effects, removed, &color, unit, now_ms);
            }
        }

        let local = game.players.get(&self.username);
        self.interaction.prune_selection(local);
        Ok(vec![Action::RenderNeeded])
    }

    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn on_build_factory(&mut self, ev: &BuildFactory) -> Result<Vec<Action>, SessionError> {
        let game = self.game_for(frames::events::BUILD_FACTORY)?;
        let Some(player) = game.players.get_mut(&ev.username) else {
            log::debug!("build_factory for unknown player {}", ev.username);
            return Ok(Vec::new());
        };
        player.set_money(ev.money);
        player.add_factory(&ev.factory, &game.viewport);
        Ok(vec![Action::RenderNeeded])
    }

    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn on_build_turret(&mut self, ev: &BuildTurret) -> Result<Vec<Action>, SessionError> {
        let game = self.game_for(frames::events::BUILD_TURRET)?;
        let Some(player) = game.players.get_mut(&ev.username) else {
            log::debug!("build_turret for unknown player {}", ev.username);
            return Ok(Vec::new());
        };
        player.set_money(ev.money);
        player.add_turret(&ev.turret, &game.viewport);
        Ok(vec![Action::RenderNeeded])
    }

    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn on_build_probe(&mut self, ev: &BuildProbe) -> Result<Vec<Action>, SessionError> {
        let game = self.game_for(frames::events::BUILD_PROBE)?;
        let Some(player) = game.players.get_mut(&ev.username) else {
            log::debug!("build_probe for unknown player {}", ev.username);
            return Ok(Vec::new());
        };
        player.set_money(ev.money);
        player.add_probe(&ev.probe, &game.viewport);
        Ok(vec![Action::RenderNeeded])
    }

    /// Draw a beam from the turret to its target.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn on_turret_fire_probe(&mut self, ev: &TurretFireProbe, now_ms: f64) -> Result<Vec<Action>, SessionError> {
        let game = self.game.as_ref().ok_or_else(|| SessionError::NoGame(frames::events::TURRET_FIRE_PROBE.to_owned()))?;
        let Some(owner) = game.players.get(&ev.username) else {
            log::debug!("turret_fire_probe for unknown player {}", ev.username);
            return Ok(Vec::new());
        };
        let Some(turret) = owner.turret(&ev.turret_id) else {
            log::debug!("turret_fire_probe for unknown turret {}", ev.turret_id);
            return Ok(Vec::new());
        };
        let Some(probe) = game.players.values().find_map(|p| p.probe(&ev.probe_id)) else {
            log::debug!("turret_fire_probe for unknown probe {}", ev.probe_id);
            return Ok(Vec::new());
        };
        let visual = Visual::Beam { from: turret.sprite().center, to: probe.sprite().center, color: owner.color().clone() };
        self.effects.add(visual, BEAM_DURATION_S, now_ms);
        Ok(vec![Action::RenderNeeded])
    }

    /// Store final standings. Input stops producing intents.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoGame`] before `start_game`.
    pub fn on_game_result(&mut self, result: GameResult) -> Result<Vec<Action>, SessionError> {
        let game = self.game.as_mut().ok_or_else(|| SessionError::NoGame(frames::events::GAME_RESULT.to_owned()))?;
        log::info!("game over, ranking: {}", result.ranking.join(", "));
        game.result = Some(result);
        let mut scene = game.scene(&self.username);
        let mut actions = self.interaction.cancel(&mut scene);
        self.interaction.clear_hover(&mut scene);
        self.interaction.reset();
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    fn game_for(&mut self, event: &str) -> Result<&mut Game, SessionError> {
        self.game.as_mut().ok_or_else(|| SessionError::NoGame(event.to_owned()))
    }

    // --- Input ---

    fn accepts_input(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.result.is_none())
    }

    pub fn pointer_down(&mut self, pos: Point, button: Button) -> Vec<Action> {
        if !self.accepts_input() {
            return Vec::new();
        }
        self.interaction.pointer_down(pos, button)
    }

    pub fn pointer_move(&mut self, pos: Point) -> Vec<Action> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        self.interaction.pointer_move(pos, &mut game.scene(&self.username))
    }

    /// Intents in the returned actions have already been sent.
    pub fn pointer_up(&mut self, pos: Point, button: Button) -> Vec<Action> {
        if !self.accepts_input() {
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let actions = self.interaction.pointer_up(pos, button, &mut game.scene(&self.username));
        self.dispatch(actions)
    }

    /// Intents in the returned actions have already been sent.
    pub fn key_down(&mut self, key: &Key) -> Vec<Action> {
        if !self.accepts_input() {
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let actions = self.interaction.on_key(key, &self.settings.key_bindings, &mut game.scene(&self.username));
        self.dispatch(actions)
    }

    /// A UI button press. Intents in the returned actions have already been sent.
    pub fn control(&mut self, control: Control) -> Vec<Action> {
        if !self.accepts_input() {
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let actions = self.interaction.on_control(control, &mut game.scene(&self.username));
        self.dispatch(actions)
    }

    fn dispatch(&mut self, actions: Vec<Action>) -> Vec<Action> {
        for action in &actions {
            if let Action::Intent(intent) = action {
                self.send(intent);
            }
        }
        actions
    }

    // --- Outbound ---

    /// Send an intent. Returns `false` if the outbound channel is closed.
    pub fn send(&mut self, intent: &Intent) -> bool {
        let frame = intent.to_frame();
        let id = frame.id.clone();
        if self.outbound.unbounded_send(frame).is_err() {
            log::warn!("{}: outbound channel closed", intent.event());
            return false;
        }
        self.pending.push_back((id, intent.event()));
        if self.pending.len() > MAX_PENDING_ACKS {
            if let Some((id, event)) = self.pending.pop_front() {
                log::debug!("{event} {id}: still unacknowledged, no longer tracked");
            }
        }
        true
    }

    fn take_pending(&mut self, id: &str) -> Option<&'static str> {
        let index = self.pending.iter().position(|(pending, _)| pending == id)?;
        self.pending.remove(index).map(|(_, event)| event)
    }

    pub fn create_queue(&mut self, n_player: u32) -> bool {
        self.send(&Intent::CreateQueue { n_player })
    }

    pub fn join_queue(&mut self, qid: &str) -> bool {
        self.send(&Intent::JoinQueue { qid: qid.to_owned() })
    }

    pub fn leave_queue(&mut self, qid: &str) -> bool {
        self.send(&Intent::LeaveQueue { qid: qid.to_owned() })
    }

    pub fn resign(&mut self) -> bool {
        self.send(&Intent::ResignGame)
    }

    // --- Frame loop ---

    /// Advance animations to `now_ms`. `dt` is capped so a stalled tab does
    /// not make probes jump.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        let dt = self
            .last_tick_ms
            .map_or(0.0, |last| ((now_ms - last) / 1000.0).clamp(0.0, self.settings.max_tick_dt_s));
        self.last_tick_ms = Some(now_ms);

        if let Some(size) = self.resize.poll(now_ms) {
            log::debug!("canvas resized to {}x{}", size.width, size.height);
            self.canvas = size;
            if let Some(game) = self.game.as_mut() {
                game.relayout(size);
            }
        }
        self.effects.prune(now_ms);

        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        for player in game.players.values_mut() {
            player.update(dt);
        }
        vec![Action::RenderNeeded]
    }

    /// Note a new container size. The canvas follows after the debounce delay.
    pub fn request_resize(&mut self, now_ms: f64, width: f64, height: f64) {
        self.resize.request(now_ms, Size::new(width, height));
    }

    /// Tear down the match: effects, interaction state, pending acks.
    pub fn end(&mut self) {
        if self.game.take().is_some() {
            log::info!("game session ended for {}", self.username);
        }
        self.effects.clear();
        self.interaction.reset();
        self.pending.clear();
        self.last_tick_ms = None;
    }
}

fn explode(effects: &mut Effects, removed: &Removed, color: &Color, unit: f64, now_ms: f64) {
    if removed.kind != EntityKind::Probe {
        return;
    }
    let visual = Visual::Explosion { center: removed.center, radius: unit * EXPLOSION_RADIUS_CELLS, color: color.clone() };
    effects.add(visual, EXPLOSION_DURATION_S, now_ms);
}
