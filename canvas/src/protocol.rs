//! Typed views of the realtime game protocol.
//!
//! Inbound frames become [`ServerEvent`]s; player decisions become
//! [`Intent`]s that serialize into request frames. Patch records
//! (`*State`) use [`Field`] for every optional entity field so that
//! absent, `null`, and value stay distinct all the way to the entity layer.

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;

use std::collections::HashMap;

use frames::{Frame, events};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SessionError;
use crate::field::Field;
use crate::viewport::{Coord, Point};

/// Match parameters decided by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid dimensions in cells.
    pub dim: Coord,
    pub initial_money: f64,
    pub factory_price: f64,
    pub turret_price: f64,
    pub probe_price: f64,
    /// Seconds between two probes produced by one factory.
    pub factory_probe_delay: f64,
    /// Turret range in cells.
    pub turret_scope: f64,
    /// Seconds between two turret shots.
    pub turret_fire_delay: f64,
    /// Probe speed in cells per second.
    pub probe_speed: f64,
    pub probe_explosion_intensity: f64,
    /// Money earned per owned tile per second.
    pub income_rate: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dim: Coord::new(20, 20),
            initial_money: 100.0,
            factory_price: 50.0,
            turret_price: 75.0,
            probe_price: 10.0,
            factory_probe_delay: 2.0,
            turret_scope: 3.0,
            turret_fire_delay: 1.0,
            probe_speed: 1.5,
            probe_explosion_intensity: 10.0,
            income_rate: 0.1,
        }
    }
}

/// Partial config carried by `game_state`. Omitted keys keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfigPatch {
    pub dim: Option<Coord>,
    pub initial_money: Option<f64>,
    pub factory_price: Option<f64>,
    pub turret_price: Option<f64>,
    pub probe_price: Option<f64>,
    pub factory_probe_delay: Option<f64>,
    pub turret_scope: Option<f64>,
    pub turret_fire_delay: Option<f64>,
    pub probe_speed: Option<f64>,
    pub probe_explosion_intensity: Option<f64>,
    pub income_rate: Option<f64>,
}

impl GameConfig {
    /// Overlay the keys present in `patch`. The board dimensions are fixed
    /// for a match, so `dim` is never taken from a patch.
    pub fn apply_patch(&mut self, patch: &GameConfigPatch) {
        let fields = [
            (&mut self.initial_money, patch.initial_money),
            (&mut self.factory_price, patch.factory_price),
            (&mut self.turret_price, patch.turret_price),
            (&mut self.probe_price, patch.probe_price),
            (&mut self.factory_probe_delay, patch.factory_probe_delay),
            (&mut self.turret_scope, patch.turret_scope),
            (&mut self.turret_fire_delay, patch.turret_fire_delay),
            (&mut self.probe_speed, patch.probe_speed),
            (&mut self.probe_explosion_intensity, patch.probe_explosion_intensity),
            (&mut self.income_rate, patch.income_rate),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Patch for one tile. Tiles are addressed by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileState {
    pub coord: Coord,
    /// Username of the owning player; `null` means unowned.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub owner: Field<String>,
    /// Strength of the owner's hold on the tile.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub occupation: Field<u32>,
}

/// Patch for one factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryState {
    pub id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub coord: Field<Coord>,
    /// Death timestamp; `null` means alive.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub death: Field<f64>,
}

/// Patch for one turret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurretState {
    pub id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub coord: Field<Coord>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub death: Field<f64>,
}

/// Patch for one probe. Positions are fractional grid coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeState {
    pub id: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub pos: Field<Point>,
    /// Where the probe is heading; `null` means idle.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub target: Field<Point>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub death: Field<f64>,
}

/// Patch for one player and the entities it owns.
///
/// Entity lists carry patches for known ids only; new entities arrive
/// through build events or the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub username: String,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub color: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub money: Field<f64>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub score: Field<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factories: Vec<FactoryState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turrets: Vec<TurretState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapState {
    #[serde(default)]
    pub tiles: Vec<TileState>,
}

/// Full snapshot sent once at match start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGame {
    pub config: GameConfig,
    #[serde(default)]
    pub map: MapState,
    #[serde(default)]
    pub players: Vec<PlayerState>,
}

/// Incremental patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatePatch {
    #[serde(default)]
    pub config: Option<GameConfigPatch>,
    #[serde(default)]
    pub map: Option<MapState>,
    #[serde(default)]
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// Usernames, winner first.
    pub ranking: Vec<String>,
    #[serde(default)]
    pub stats: Value,
    #[serde(default)]
    pub mmrs: HashMap<String, f64>,
    #[serde(default)]
    pub mmr_diffs: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFactory {
    pub username: String,
    pub money: f64,
    pub factory: FactoryState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTurret {
    pub username: String,
    pub money: f64,
    pub turret: TurretState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildProbe {
    pub username: String,
    pub money: f64,
    pub probe: ProbeState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretFireProbe {
    /// Owner of the turret.
    pub username: String,
    pub turret_id: String,
    pub probe_id: String,
}

/// An inbound server push.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    StartGame(StartGame),
    GameState(GameStatePatch),
    GameResult(GameResult),
    BuildFactory(BuildFactory),
    BuildTurret(BuildTurret),
    BuildProbe(BuildProbe),
    TurretFireProbe(TurretFireProbe),
}

impl ServerEvent {
    /// Decode a server push.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownEvent`] for event names the engine does not
    /// consume and [`SessionError::Payload`] for payloads that do not match.
    pub fn from_frame(frame: &Frame) -> Result<Self, SessionError> {
        let event = frame.event.as_str();
        match event {
            events::START_GAME => parse(frame).map(Self::StartGame),
            events::GAME_STATE => parse(frame).map(Self::GameState),
            events::GAME_RESULT => parse(frame).map(Self::GameResult),
            events::BUILD_FACTORY => parse(frame).map(Self::BuildFactory),
            events::BUILD_TURRET => parse(frame).map(Self::BuildTurret),
            events::BUILD_PROBE => parse(frame).map(Self::BuildProbe),
            events::TURRET_FIRE_PROBE => parse(frame).map(Self::TurretFireProbe),
            other => Err(SessionError::UnknownEvent(other.to_owned())),
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(frame: &Frame) -> Result<T, SessionError> {
    T::deserialize(&frame.data).map_err(|source| SessionError::Payload { event: frame.event.clone(), source })
}

/// A player action request. Never applied locally; its effect, if any,
/// arrives later as a server event.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CreateQueue { n_player: u32 },
    JoinQueue { qid: String },
    LeaveQueue { qid: String },
    ResignGame,
    BuildFactory { coord: Coord },
    BuildTurret { coord: Coord },
    MoveProbes { ids: Vec<String>, targets: Vec<Coord> },
    ExplodeProbes { ids: Vec<String> },
    ProbesAttack { ids: Vec<String> },
}

impl Intent {
    /// Wire event name.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::CreateQueue { .. } => events::CREATE_QUEUE,
            Self::JoinQueue { .. } => events::JOIN_QUEUE,
            Self::LeaveQueue { .. } => events::LEAVE_QUEUE,
            Self::ResignGame => events::RESIGN_GAME,
            Self::BuildFactory { .. } => events::BUILD_FACTORY_ACTION,
            Self::BuildTurret { .. } => events::BUILD_TURRET_ACTION,
            Self::MoveProbes { .. } => events::MOVE_PROBES,
            Self::ExplodeProbes { .. } => events::EXPLODE_PROBES,
            Self::ProbesAttack { .. } => events::PROBES_ATTACK,
        }
    }

    /// Wire payload.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::CreateQueue { n_player } => json!({ "n_player": n_player }),
            Self::JoinQueue { qid } | Self::LeaveQueue { qid } => json!({ "qid": qid }),
            Self::ResignGame => json!({}),
            Self::BuildFactory { coord } | Self::BuildTurret { coord } => json!({ "coord": coord }),
            Self::MoveProbes { ids, targets } => json!({ "ids": ids, "targets": targets }),
            Self::ExplodeProbes { ids } | Self::ProbesAttack { ids } => json!({ "ids": ids }),
        }
    }

    /// Build the request frame carrying this intent.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::request(uuid::Uuid::new_v4().to_string(), self.event(), self.payload())
    }
}
