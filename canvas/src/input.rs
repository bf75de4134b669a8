//! Input model: modes, pointer buttons, keys, and the interaction state machine.
//!
//! [`Interaction`] turns raw pointer and keyboard events into [`Action`]s.
//! It never creates entities: a build click only emits an intent, and the
//! building appears once the server confirms it. Handlers borrow the parts
//! of the session they touch through a [`Scene`].
//!
//! Modes: `Idle` (initial), `BuildFactory`, `BuildTurret`, `SelectProbes`.
//! Every mode can return to `Idle`; there is no terminal mode.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::BTreeSet;

use crate::config::{Control, KeyBindings};
use crate::entity::{Entity, Player};
use crate::hit::{self, SelectionRect};
use crate::protocol::Intent;
use crate::viewport::{Coord, Point, Viewport};
use crate::world::World;

/// Interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    BuildFactory,
    BuildTurret,
    SelectProbes,
}

impl Mode {
    #[must_use]
    pub fn is_build(self) -> bool {
        matches!(self, Self::BuildFactory | Self::BuildTurret)
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"f"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Icon that follows the pointer while a build mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorIcon {
    Factory,
    Turret,
}

/// Drag-select rectangle in pixels. Hidden until the pointer passes the click threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragRect {
    pub start: Point,
    pub end: Point,
    pub visible: bool,
}

impl DragRect {
    #[must_use]
    pub fn rect(&self) -> SelectionRect {
        SelectionRect::new(self.start, self.end)
    }
}

/// Output of an input handler, for the session or host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send this intent to the server.
    Intent(Intent),
    /// Show an icon at the pointer, or hide it.
    SetCursor(Option<CursorIcon>),
    RenderNeeded,
}

/// Mutable view of the session state an input handler may touch.
pub struct Scene<'a> {
    pub viewport: &'a Viewport,
    pub world: &'a mut World,
    /// The local player, absent for spectators or before the snapshot names us.
    pub local: Option<&'a mut Player>,
}

/// The interaction state machine.
#[derive(Debug, Clone)]
pub struct Interaction {
    mode: Mode,
    selected: BTreeSet<String>,
    hovered: Option<Coord>,
    drag: Option<DragRect>,
    pointer: Option<Point>,
    cursor: Option<CursorIcon>,
    click_threshold: f64,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_CLICK_THRESHOLD_PX)
    }
}

impl Interaction {
    #[must_use]
    pub fn new(click_threshold: f64) -> Self {
        Self {
            mode: Mode::Idle,
            selected: BTreeSet::new(),
            hovered: None,
            drag: None,
            pointer: None,
            cursor: None,
            click_threshold,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Selected probe ids, sorted.
    #[must_use]
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    #[must_use]
    pub fn hovered(&self) -> Option<Coord> {
        self.hovered
    }

    /// The drag rectangle while a press is in progress.
    #[must_use]
    pub fn drag(&self) -> Option<DragRect> {
        self.drag
    }

    /// Last pointer position seen by `pointer_move`.
    #[must_use]
    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    #[must_use]
    pub fn cursor(&self) -> Option<CursorIcon> {
        self.cursor
    }

    /// Whether the offset between press and release stays under the click threshold on both axes.
    #[must_use]
    pub fn is_click(&self, down: Point, up: Point) -> bool {
        (up.x - down.x).abs() < self.click_threshold && (up.y - down.y).abs() < self.click_threshold
    }

    // --- Pointer ---

    pub fn pointer_down(&mut self, pos: Point, button: Button) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        self.drag = Some(DragRect { start: pos, end: pos, visible: false });
        Vec::new()
    }

    pub fn pointer_move(&mut self, pos: Point, scene: &mut Scene<'_>) -> Vec<Action> {
        let mut render = false;
        self.pointer = Some(pos);

        let under = hit::tile_under(scene.world, scene.viewport, pos);
        if under != self.hovered {
            scene.world.move_hover(self.hovered, under);
            self.hovered = under;
            render = true;
        }

        if let Some(mut drag) = self.drag {
            drag.end = pos;
            if !drag.visible && !self.is_click(drag.start, pos) {
                drag.visible = true;
            }
            if drag.visible {
                render = true;
            }
            self.drag = Some(drag);
        }

        if render || self.cursor.is_some() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn pointer_up(&mut self, pos: Point, button: Button, scene: &mut Scene<'_>) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        let mut actions = if self.is_click(drag.start, pos) {
            self.on_click(pos, scene)
        } else {
            self.drag_select(drag.start, pos, scene)
        };
        if drag.visible {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn on_click(&mut self, pos: Point, scene: &mut Scene<'_>) -> Vec<Action> {
        let Some(coord) = hit::tile_under(scene.world, scene.viewport, pos) else {
            return Vec::new();
        };
        match self.mode {
            Mode::BuildFactory | Mode::BuildTurret => {
                let intent = if self.mode == Mode::BuildFactory {
                    Intent::BuildFactory { coord }
                } else {
                    Intent::BuildTurret { coord }
                };
                let mut actions = self.exit_build(scene);
                actions.insert(0, Action::Intent(intent));
                actions
            }
            Mode::SelectProbes if !self.selected.is_empty() => {
                let ids: Vec<String> = self.selected.iter().cloned().collect();
                let targets = vec![coord; ids.len()];
                vec![Action::Intent(Intent::MoveProbes { ids, targets })]
            }
            Mode::SelectProbes | Mode::Idle => Vec::new(),
        }
    }

    fn drag_select(&mut self, start: Point, end: Point, scene: &mut Scene<'_>) -> Vec<Action> {
        self.clear_selection(scene);
        let rect = SelectionRect::new(start, end);
        let ids = scene.local.as_deref().map(|p| hit::probes_in_rect(p, &rect)).unwrap_or_default();
        if ids.is_empty() {
            if self.mode == Mode::SelectProbes {
                self.mode = Mode::Idle;
            }
            return vec![Action::RenderNeeded];
        }
        self.select(ids, scene)
    }

    // --- Keyboard / buttons ---

    /// Resolve `key` through `bindings` and dispatch the control, if any.
    pub fn on_key(&mut self, key: &Key, bindings: &KeyBindings, scene: &mut Scene<'_>) -> Vec<Action> {
        match bindings.control(&key.0) {
            Some(control) => self.on_control(control, scene),
            None => Vec::new(),
        }
    }

    pub fn on_control(&mut self, control: Control, scene: &mut Scene<'_>) -> Vec<Action> {
        match control {
            Control::BuildFactory => self.toggle_build(Mode::BuildFactory, scene),
            Control::BuildTurret => self.toggle_build(Mode::BuildTurret, scene),
            Control::SelectAll => {
                let ids: Vec<String> = scene
                    .local
                    .as_deref()
                    .map(|p| p.probes().map(|probe| probe.id().to_owned()).collect())
                    .unwrap_or_default();
                if ids.is_empty() {
                    return Vec::new();
                }
                self.clear_selection(scene);
                self.select(ids, scene)
            }
            Control::Explode | Control::Attack => {
                if self.mode != Mode::SelectProbes || self.selected.is_empty() {
                    return Vec::new();
                }
                let ids: Vec<String> = self.selected.iter().cloned().collect();
                let intent = if control == Control::Explode {
                    Intent::ExplodeProbes { ids }
                } else {
                    Intent::ProbesAttack { ids }
                };
                self.clear_selection(scene);
                self.mode = Mode::Idle;
                vec![Action::Intent(intent), Action::RenderNeeded]
            }
            Control::Cancel => self.cancel(scene),
        }
    }

    /// Return to `Idle`: drop highlights, cursor icon, selection, and any pending drag.
    pub fn cancel(&mut self, scene: &mut Scene<'_>) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.mode.is_build() {
            actions = self.exit_build(scene);
        }
        self.clear_selection(scene);
        self.drag = None;
        self.mode = Mode::Idle;
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Session hooks ---

    /// Drop selected ids the local player no longer owns. An emptied
    /// selection returns to `Idle`. Returns `true` if anything changed.
    pub fn prune_selection(&mut self, local: Option<&Player>) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| local.is_some_and(|p| p.probe(id).is_some()));
        let changed = self.selected.len() != before;
        if changed && self.selected.is_empty() && self.mode == Mode::SelectProbes {
            self.mode = Mode::Idle;
        }
        changed
    }

    /// Drop the hover flag from the world tile and forget it.
    pub fn clear_hover(&mut self, scene: &mut Scene<'_>) {
        scene.world.move_hover(self.hovered.take(), None);
    }

    /// Reset everything for a new world. Call [`Interaction::clear_hover`]
    /// first if the current world stays on screen.
    pub fn reset(&mut self) {
        *self = Self::new(self.click_threshold);
    }

    // --- Internals ---

    fn toggle_build(&mut self, target: Mode, scene: &mut Scene<'_>) -> Vec<Action> {
        if self.mode == target {
            let mut actions = self.exit_build(scene);
            actions.push(Action::RenderNeeded);
            return actions;
        }
        self.clear_selection(scene);
        scene.world.clear_highlights();
        if let Some(player) = scene.local.as_deref() {
            scene.world.set_highlight_owned(player.username(), true);
        }
        self.mode = target;
        self.cursor = Some(if target == Mode::BuildFactory { CursorIcon::Factory } else { CursorIcon::Turret });
        vec![Action::SetCursor(self.cursor), Action::RenderNeeded]
    }

    fn exit_build(&mut self, scene: &mut Scene<'_>) -> Vec<Action> {
        scene.world.clear_highlights();
        self.mode = Mode::Idle;
        self.cursor = None;
        vec![Action::SetCursor(None)]
    }

    fn select(&mut self, ids: Vec<String>, scene: &mut Scene<'_>) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.mode.is_build() {
            actions = self.exit_build(scene);
        }
        if let Some(player) = scene.local.as_deref_mut() {
            for id in &ids {
                if let Some(probe) = player.probe_mut(id) {
                    probe.set_selected(true);
                }
            }
        }
        self.selected = ids.into_iter().collect();
        self.mode = Mode::SelectProbes;
        actions.push(Action::RenderNeeded);
        actions
    }

    fn clear_selection(&mut self, scene: &mut Scene<'_>) {
        if let Some(player) = scene.local.as_deref_mut() {
            for id in &self.selected {
                if let Some(probe) = player.probe_mut(id) {
                    probe.set_selected(false);
                }
            }
        }
        self.selected.clear();
    }
}
