use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::entity::{Color, Entity, EntityKind, Factory, Probe, Turret};
use crate::protocol::{FactoryState, PlayerState, ProbeState, TurretState};
use crate::viewport::{Coord, Point, Viewport};

/// An entity removed by a patch, with where it was last drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub kind: EntityKind,
    pub id: String,
    pub center: Point,
}

/// What a player patch changed beyond plain field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerDelta {
    pub removed: Vec<Removed>,
    pub recolored: bool,
}

/// Unit stats a player needs to build its entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub probe_speed: f64,
    pub turret_scope: f64,
}

/// A match participant and everything it owns.
#[derive(Debug, Clone)]
pub struct Player {
    username: String,
    money: f64,
    score: f64,
    color: Color,
    stats: UnitStats,
    factories: BTreeMap<String, Factory>,
    turrets: BTreeMap<String, Turret>,
    probes: BTreeMap<String, Probe>,
    tiles: BTreeSet<Coord>,
    graveyard: HashSet<String>,
}

impl Player {
    /// Build a player from its snapshot record. `fallback` is used when the
    /// record carries no color.
    #[must_use]
    pub fn from_state(state: &PlayerState, fallback: Color, stats: UnitStats, viewport: &Viewport) -> Self {
        let color = state.color.value().map_or(fallback, |c| Color::new(c));
        let mut player = Self {
            username: state.username.clone(),
            money: 0.0,
            score: 0.0,
            color,
            stats,
            factories: BTreeMap::new(),
            turrets: BTreeMap::new(),
            probes: BTreeMap::new(),
            tiles: BTreeSet::new(),
            graveyard: HashSet::new(),
        };
        state.money.apply(&mut player.money);
        state.score.apply(&mut player.score);
        for f in &state.factories {
            player.add_factory(f, viewport);
        }
        for t in &state.turrets {
            player.add_turret(t, viewport);
        }
        for p in &state.probes {
            player.add_probe(p, viewport);
        }
        player
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn money(&self) -> f64 {
        self.money
    }

    pub fn set_money(&mut self, money: f64) {
        self.money = money;
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn color(&self) -> &Color {
        &self.color
    }

    /// Change the player color and every owned entity's color.
    /// Returns `true` if anything was rebuilt.
    pub fn set_color(&mut self, color: &Color) -> bool {
        if self.color == *color {
            return false;
        }
        self.color = color.clone();
        for entity in self.entities_mut() {
            entity.set_color(color);
        }
        true
    }

    /// Update unit stats after a config change.
    pub fn set_stats(&mut self, stats: UnitStats, viewport: &Viewport) {
        self.stats = stats;
        for probe in self.probes.values_mut() {
            probe.set_speed(stats.probe_speed);
        }
        for turret in self.turrets.values_mut() {
            turret.set_scope(stats.turret_scope, viewport);
        }
    }

    /// Apply a player patch. Entity patches for unknown ids are skipped;
    /// entities that gain a death timestamp are removed for good.
    pub fn apply_state(&mut self, state: &PlayerState, viewport: &Viewport) -> PlayerDelta {
        let mut delta = PlayerDelta::default();
        state.money.apply(&mut self.money);
        state.score.apply(&mut self.score);
        if let Some(color) = state.color.value() {
            delta.recolored = self.set_color(&Color::new(color));
        }

        for patch in &state.factories {
            match self.factories.get_mut(&patch.id) {
                Some(factory) => factory.apply_state(patch, viewport),
                None => log::debug!("{}: skipping patch for unknown factory {}", self.username, patch.id),
            }
        }
        for patch in &state.turrets {
            match self.turrets.get_mut(&patch.id) {
                Some(turret) => turret.apply_state(patch, viewport),
                None => log::debug!("{}: skipping patch for unknown turret {}", self.username, patch.id),
            }
        }
        for patch in &state.probes {
            match self.probes.get_mut(&patch.id) {
                Some(probe) => probe.apply_state(patch),
                None => log::debug!("{}: skipping patch for unknown probe {}", self.username, patch.id),
            }
        }

        delta.removed = self.bury_dead();
        delta
    }

    /// Add a factory confirmed by the server. Returns `false` for duplicate,
    /// buried, dead, or coordinate-less records.
    pub fn add_factory(&mut self, state: &FactoryState, viewport: &Viewport) -> bool {
        if !self.accepts(&state.id, state.death.value().is_some()) || self.factories.contains_key(&state.id) {
            return false;
        }
        let Some(factory) = Factory::from_state(state, &self.color, viewport) else {
            log::debug!("{}: factory {} has no coordinate", self.username, state.id);
            return false;
        };
        self.factories.insert(state.id.clone(), factory);
        true
    }

    /// Add a turret confirmed by the server.
    pub fn add_turret(&mut self, state: &TurretState, viewport: &Viewport) -> bool {
        if !self.accepts(&state.id, state.death.value().is_some()) || self.turrets.contains_key(&state.id) {
            return false;
        }
        let Some(turret) = Turret::from_state(state, &self.color, self.stats.turret_scope, viewport) else {
            log::debug!("{}: turret {} has no coordinate", self.username, state.id);
            return false;
        };
        self.turrets.insert(state.id.clone(), turret);
        true
    }

    /// Add a probe confirmed by the server.
    pub fn add_probe(&mut self, state: &ProbeState, viewport: &Viewport) -> bool {
        if !self.accepts(&state.id, state.death.value().is_some()) || self.probes.contains_key(&state.id) {
            return false;
        }
        let Some(probe) = Probe::from_state(state, &self.color, self.stats.probe_speed, viewport) else {
            log::debug!("{}: probe {} has no position", self.username, state.id);
            return false;
        };
        self.probes.insert(state.id.clone(), probe);
        true
    }

    fn accepts(&mut self, id: &str, dead: bool) -> bool {
        if self.graveyard.contains(id) {
            log::debug!("{}: ignoring resurrection of {id}", self.username);
            return false;
        }
        if dead {
            self.graveyard.insert(id.to_owned());
            return false;
        }
        true
    }

    fn bury_dead(&mut self) -> Vec<Removed> {
        let mut removed = Vec::new();
        bury(&mut self.factories, &mut self.graveyard, &mut removed);
        bury(&mut self.turrets, &mut self.graveyard, &mut removed);
        bury(&mut self.probes, &mut self.graveyard, &mut removed);
        removed
    }

    /// Whether `id` was owned once and has been removed.
    #[must_use]
    pub fn is_buried(&self, id: &str) -> bool {
        self.graveyard.contains(id)
    }

    #[must_use]
    pub fn factory(&self, id: &str) -> Option<&Factory> {
        self.factories.get(id)
    }

    #[must_use]
    pub fn turret(&self, id: &str) -> Option<&Turret> {
        self.turrets.get(id)
    }

    #[must_use]
    pub fn probe(&self, id: &str) -> Option<&Probe> {
        self.probes.get(id)
    }

    pub fn probe_mut(&mut self, id: &str) -> Option<&mut Probe> {
        self.probes.get_mut(id)
    }

    pub fn factories(&self) -> impl Iterator<Item = &Factory> {
        self.factories.values()
    }

    pub fn turrets(&self) -> impl Iterator<Item = &Turret> {
        self.turrets.values()
    }

    pub fn probes(&self) -> impl Iterator<Item = &Probe> {
        self.probes.values()
    }

    pub fn probes_mut(&mut self) -> impl Iterator<Item = &mut Probe> {
        self.probes.values_mut()
    }

    /// Coordinates of the tiles this player owns.
    #[must_use]
    pub fn tiles(&self) -> &BTreeSet<Coord> {
        &self.tiles
    }

    pub fn claim_tile(&mut self, coord: Coord) {
        self.tiles.insert(coord);
    }

    pub fn release_tile(&mut self, coord: Coord) {
        self.tiles.remove(&coord);
    }

    /// All owned buildings and units.
    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.factories
            .values()
            .map(|f| f as &dyn Entity)
            .chain(self.turrets.values().map(|t| t as &dyn Entity))
            .chain(self.probes.values().map(|p| p as &dyn Entity))
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut dyn Entity> {
        self.factories
            .values_mut()
            .map(|f| f as &mut dyn Entity)
            .chain(self.turrets.values_mut().map(|t| t as &mut dyn Entity))
            .chain(self.probes.values_mut().map(|p| p as &mut dyn Entity))
    }

    pub fn relayout(&mut self, viewport: &Viewport) {
        for entity in self.entities_mut() {
            entity.relayout(viewport);
        }
    }

    pub fn update(&mut self, dt: f64) {
        for entity in self.entities_mut() {
            entity.update(dt);
        }
    }
}

fn bury<E: Entity>(items: &mut BTreeMap<String, E>, graveyard: &mut HashSet<String>, removed: &mut Vec<Removed>) {
    items.retain(|id, entity| {
        if entity.is_alive() {
            return true;
        }
        graveyard.insert(id.clone());
        removed.push(Removed { kind: entity.kind(), id: id.clone(), center: entity.sprite().center });
        false
    });
}
