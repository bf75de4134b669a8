#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::rc::Rc;

use frames::{Status, events};
use futures::channel::mpsc::{UnboundedReceiver, unbounded};
use serde_json::{Value, json};

use super::*;
use crate::effects::Effect;
use crate::entity::Tile;
use crate::input::Mode;
use crate::viewport::Coord;

// =============================================================
// Helpers
// =============================================================

fn snapshot() -> Value {
    json!({
        "config": {"dim": {"x": 20, "y": 15}, "probe_speed": 1.5, "turret_scope": 3.0},
        "map": {"tiles": [
            {"coord": {"x": 0, "y": 0}, "owner": "ada", "occupation": 1},
            {"coord": {"x": 1, "y": 0}, "owner": "ada"},
            {"coord": {"x": 5, "y": 5}, "owner": "bo"}
        ]},
        "players": [
            {"username": "ada", "color": "#ff0000", "money": 100.0, "score": 0.0,
             "factories": [{"id": "f1", "coord": {"x": 0, "y": 0}, "death": null}],
             "turrets": [{"id": "t1", "coord": {"x": 1, "y": 0}, "death": null}],
             "probes": [{"id": "p1", "pos": {"x": 1.5, "y": 1.5}},
                        {"id": "p2", "pos": {"x": 2.5, "y": 1.5}}]},
            {"username": "bo", "money": 80.0,
             "probes": [{"id": "q1", "pos": {"x": 5.5, "y": 5.5}}]}
        ]
    })
}

fn push(event: &str, data: Value) -> Frame {
    Frame::request("srv", event, data)
}

/// Session for "ada" on an 800x640 canvas (unit 40), snapshot applied at t=0.
fn started() -> (GameSession, UnboundedReceiver<Frame>) {
    let (tx, rx) = unbounded();
    let mut session = GameSession::new("ada", EngineSettings::default(), tx);
    session.set_canvas_size(Size::new(800.0, 640.0));
    session.handle_frame(&push(events::START_GAME, snapshot()), 0.0).unwrap();
    (session, rx)
}

fn drain(rx: &mut UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut out = Vec::new();
    while let Ok(Some(frame)) = rx.try_next() {
        out.push(frame);
    }
    out
}

fn game(session: &GameSession) -> &Game {
    session.game().unwrap()
}

fn click(session: &mut GameSession, x: f64, y: f64) -> Vec<Action> {
    session.pointer_down(Point::new(x, y), Button::Primary);
    session.pointer_up(Point::new(x, y), Button::Primary)
}

// =============================================================
// Snapshot
// =============================================================

#[test]
fn start_game_builds_world_and_players() {
    let (session, _rx) = started();
    let g = game(&session);
    assert_eq!(g.viewport().unit(), 40.0);
    assert_eq!(g.world().tiles().count(), 300);
    assert_eq!(g.world().tile_at(Coord::new(0, 0)).unwrap().occupation(), 1);

    let ada = session.local_player().unwrap();
    assert_eq!(ada.money(), 100.0);
    assert!(ada.factory("f1").is_some());
    assert_eq!(ada.probes().count(), 2);
    assert_eq!(ada.tiles().len(), 2);
    assert_eq!(g.player("bo").unwrap().tiles().len(), 1);
}

#[test]
fn snapshot_colors_tiles_by_owner() {
    let (session, _rx) = started();
    let g = game(&session);
    assert_eq!(g.world().tile_at(Coord::new(0, 0)).unwrap().sprite().color.as_str(), "#ff0000");
    // bo has no color in the snapshot: second palette entry.
    assert_eq!(g.world().tile_at(Coord::new(5, 5)).unwrap().sprite().color.as_str(), PALETTE[1]);
    assert_eq!(g.world().tile_at(Coord::new(9, 9)).unwrap().sprite().color, Color::neutral());
}

#[test]
fn in_game_event_before_start_is_an_error() {
    let (tx, _rx) = unbounded();
    let mut session = GameSession::new("ada", EngineSettings::default(), tx);
    let err = session.handle_frame(&push(events::GAME_STATE, json!({"players": []})), 0.0).unwrap_err();
    assert!(matches!(err, SessionError::NoGame(ref e) if e == events::GAME_STATE));
}

#[test]
fn unknown_event_is_an_error() {
    let (mut session, _rx) = started();
    let err = session.handle_frame(&push("chat_message", json!({})), 0.0).unwrap_err();
    assert!(matches!(err, SessionError::UnknownEvent(_)));
}

#[test]
fn malformed_payload_is_an_error() {
    let (mut session, _rx) = started();
    let err = session.handle_frame(&push(events::BUILD_PROBE, json!({"username": 5})), 0.0).unwrap_err();
    assert!(matches!(err, SessionError::Payload { .. }));
}

// =============================================================
// Patches
// =============================================================

#[test]
fn tile_patch_moves_ownership_bookkeeping() {
    let (mut session, _rx) = started();
    let patch = json!({"map": {"tiles": [{"coord": {"x": 1, "y": 0}, "owner": "bo"},
                                          {"coord": {"x": 0, "y": 0}, "owner": null}]}});
    session.handle_frame(&push(events::GAME_STATE, patch), 100.0).unwrap();

    let g = game(&session);
    assert!(g.player("ada").unwrap().tiles().is_empty());
    assert_eq!(g.player("bo").unwrap().tiles().len(), 2);
    assert_eq!(g.world().tile_at(Coord::new(1, 0)).unwrap().sprite().color.as_str(), PALETTE[1]);
    assert_eq!(g.world().tile_at(Coord::new(0, 0)).unwrap().sprite().color, Color::neutral());
}

#[test]
fn absent_owner_keeps_tile() {
    let (mut session, _rx) = started();
    let patch = json!({"map": {"tiles": [{"coord": {"x": 0, "y": 0}, "occupation": 4}]}});
    session.handle_frame(&push(events::GAME_STATE, patch), 100.0).unwrap();
    let tile = game(&session).world().tile_at(Coord::new(0, 0)).unwrap().clone();
    assert_eq!(tile.owner(), Some("ada"));
    assert_eq!(tile.occupation(), 4);
}

#[test]
fn player_patch_updates_money_and_score() {
    let (mut session, _rx) = started();
    let patch = json!({"players": [{"username": "ada", "money": 42.5, "score": 3.0}]});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    let ada = session.local_player().unwrap();
    assert_eq!(ada.money(), 42.5);
    assert_eq!(ada.score(), 3.0);
}

#[test]
fn patch_for_unknown_player_or_entity_is_skipped() {
    let (mut session, _rx) = started();
    let patch = json!({"players": [
        {"username": "zed", "money": 1.0},
        {"username": "ada", "probes": [{"id": "ghost", "pos": {"x": 3.0, "y": 3.0}}]}
    ]});
    let actions = session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(game(&session).player("zed").is_none());
    assert!(session.local_player().unwrap().probe("ghost").is_none());
}

#[test]
fn same_patch_twice_is_idempotent() {
    let (mut session, _rx) = started();
    let patch = json!({"players": [{"username": "ada", "money": 10.0,
        "probes": [{"id": "p1", "target": {"x": 4.0, "y": 4.0}}]}],
        "map": {"tiles": [{"coord": {"x": 3, "y": 3}, "owner": "ada"}]}});
    session.handle_frame(&push(events::GAME_STATE, patch.clone()), 0.0).unwrap();
    let once = session.local_player().unwrap().clone();
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    let twice = session.local_player().unwrap();
    assert_eq!(once.money(), twice.money());
    assert_eq!(once.tiles(), twice.tiles());
    assert_eq!(once.probe("p1").unwrap().target(), twice.probe("p1").unwrap().target());
}

#[test]
fn probe_death_explodes_and_prunes_selection() {
    let (mut session, _rx) = started();
    session.control(Control::SelectAll);
    assert_eq!(session.interaction().selected().len(), 2);

    let patch = json!({"players": [{"username": "ada", "probes": [{"id": "p1", "death": 12.0}]}]});
    session.handle_frame(&push(events::GAME_STATE, patch), 1_000.0).unwrap();

    assert!(session.local_player().unwrap().probe("p1").is_none());
    assert_eq!(session.interaction().selected().iter().collect::<Vec<_>>(), vec!["p2"]);
    let effects: Vec<&Effect> = session.effects().iter().collect();
    assert_eq!(effects.len(), 1);
    assert!(matches!(
        &effects[0].visual,
        Visual::Explosion { center, .. } if *center == Point::new(60.0, 60.0)
    ));
}

#[test]
fn losing_the_last_selected_probe_returns_to_idle() {
    let (mut session, _rx) = started();
    session.control(Control::SelectAll);
    let patch = json!({"players": [{"username": "ada",
        "probes": [{"id": "p1", "death": 1.0}, {"id": "p2", "death": 1.0}]}]});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    assert_eq!(session.interaction().mode(), Mode::Idle);
}

#[test]
fn config_patch_updates_unit_stats_but_not_dim() {
    let (mut session, _rx) = started();
    let patch = json!({"config": {"dim": {"x": 50, "y": 50}, "turret_scope": 5.0}});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    let g = game(&session);
    assert_eq!(g.config().dim, Coord::new(20, 15));
    assert_eq!(g.config().turret_scope, 5.0);
    assert_eq!(g.player("ada").unwrap().turret("t1").unwrap().scope_px(), 200.0);
}

#[test]
fn partial_config_patch_keeps_omitted_stats() {
    let (mut session, _rx) = started();
    let patch = json!({"config": {"factory_price": 99.0}});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    let g = game(&session);
    assert_eq!(g.config().factory_price, 99.0);
    assert_eq!(g.config().turret_scope, 3.0);
    assert_eq!(g.config().probe_speed, 1.5);
    assert_eq!(g.player("ada").unwrap().turret("t1").unwrap().scope_px(), 120.0);
}

#[test]
fn ownership_change_in_build_mode_moves_highlights() {
    let (mut session, _rx) = started();
    session.control(Control::BuildFactory);
    let patch = json!({"map": {"tiles": [{"coord": {"x": 1, "y": 0}, "owner": "bo"},
                                          {"coord": {"x": 9, "y": 9}, "owner": "ada"}]}});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();

    let lit: Vec<Coord> = game(&session).world().tiles().filter(|t| t.is_highlighted()).map(Tile::coord).collect();
    assert_eq!(lit, vec![Coord::new(0, 0), Coord::new(9, 9)]);
}

#[test]
fn ownership_change_when_idle_lights_nothing() {
    let (mut session, _rx) = started();
    let patch = json!({"map": {"tiles": [{"coord": {"x": 9, "y": 9}, "owner": "ada"}]}});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();
    assert_eq!(game(&session).world().tiles().filter(|t| t.is_highlighted()).count(), 0);
}

// =============================================================
// Build confirmations
// =============================================================

#[test]
fn build_events_create_entities_and_set_money() {
    let (mut session, _rx) = started();
    session
        .handle_frame(
            &push(events::BUILD_FACTORY, json!({"username": "ada", "money": 50.0, "factory": {"id": "f2", "coord": {"x": 1, "y": 0}}})),
            0.0,
        )
        .unwrap();
    session
        .handle_frame(
            &push(events::BUILD_TURRET, json!({"username": "bo", "money": 5.0, "turret": {"id": "t9", "coord": {"x": 5, "y": 5}}})),
            0.0,
        )
        .unwrap();
    session
        .handle_frame(
            &push(events::BUILD_PROBE, json!({"username": "ada", "money": 40.0, "probe": {"id": "p3", "pos": {"x": 0.5, "y": 0.5}}})),
            0.0,
        )
        .unwrap();

    let g = game(&session);
    let ada = g.player("ada").unwrap();
    assert!(ada.factory("f2").is_some());
    assert!(ada.probe("p3").is_some());
    assert_eq!(ada.money(), 40.0);
    let bo = g.player("bo").unwrap();
    assert!(bo.turret("t9").is_some());
    assert_eq!(bo.money(), 5.0);
}

#[test]
fn build_for_unknown_player_is_ignored() {
    let (mut session, _rx) = started();
    let actions = session
        .handle_frame(
            &push(events::BUILD_PROBE, json!({"username": "zed", "money": 1.0, "probe": {"id": "z", "pos": {"x": 0.5, "y": 0.5}}})),
            0.0,
        )
        .unwrap();
    assert!(actions.is_empty());
}

#[test]
fn dead_probe_is_not_rebuilt() {
    let (mut session, _rx) = started();
    let kill = json!({"players": [{"username": "ada", "probes": [{"id": "p1", "death": 2.0}]}]});
    session.handle_frame(&push(events::GAME_STATE, kill), 0.0).unwrap();
    session
        .handle_frame(
            &push(events::BUILD_PROBE, json!({"username": "ada", "money": 1.0, "probe": {"id": "p1", "pos": {"x": 0.5, "y": 0.5}}})),
            0.0,
        )
        .unwrap();
    assert!(session.local_player().unwrap().probe("p1").is_none());
}

// =============================================================
// Effects
// =============================================================

#[test]
fn turret_fire_draws_a_beam_until_it_expires() {
    let (mut session, _rx) = started();
    let fire = json!({"username": "ada", "turret_id": "t1", "probe_id": "q1"});
    session.handle_frame(&push(events::TURRET_FIRE_PROBE, fire), 1_000.0).unwrap();

    let beam = session.effects().iter().next().unwrap().visual.clone();
    assert_eq!(
        beam,
        Visual::Beam { from: Point::new(60.0, 20.0), to: Point::new(220.0, 220.0), color: Color::new("#ff0000") }
    );

    session.tick(1_100.0);
    assert_eq!(session.effects().len(), 1);
    session.tick(1_200.0);
    assert!(session.effects().is_empty());
}

#[test]
fn turret_fire_with_unknown_ids_is_ignored() {
    let (mut session, _rx) = started();
    let fire = json!({"username": "ada", "turret_id": "t1", "probe_id": "nope"});
    assert!(session.handle_frame(&push(events::TURRET_FIRE_PROBE, fire), 0.0).unwrap().is_empty());
    assert!(session.effects().is_empty());
}

// =============================================================
// Intents and acks
// =============================================================

#[test]
fn build_click_sends_intent_without_local_creation() {
    let (mut session, mut rx) = started();
    session.control(Control::BuildFactory);
    let actions = click(&mut session, 45.0, 5.0);
    assert!(actions.contains(&Action::Intent(Intent::BuildFactory { coord: Coord::new(1, 0) })));

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, events::BUILD_FACTORY_ACTION);
    assert_eq!(sent[0].status, Status::Request);
    assert_eq!(sent[0].data, json!({"coord": {"x": 1, "y": 0}}));

    assert_eq!(session.local_player().unwrap().factories().count(), 1);
    assert_eq!(session.pending_acks(), 1);
}

#[test]
fn move_then_explode_sends_two_frames() {
    let (mut session, mut rx) = started();
    session.control(Control::SelectAll);
    click(&mut session, 300.0, 200.0);
    session.key_down(&Key("e".into()));

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].event, events::MOVE_PROBES);
    assert_eq!(sent[0].data["targets"], json!([{"x": 7, "y": 5}, {"x": 7, "y": 5}]));
    assert_eq!(sent[1].event, events::EXPLODE_PROBES);
    assert_eq!(sent[1].data, json!({"ids": ["p1", "p2"]}));
    assert_eq!(session.interaction().mode(), Mode::Idle);
}

#[test]
fn rejected_ack_reaches_the_error_callback() {
    let (mut session, mut rx) = started();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.on_error(move |msg| sink.borrow_mut().push(msg.to_owned()));

    session.create_queue(2);
    let request = drain(&mut rx).remove(0);
    assert_eq!(request.data, json!({"n_player": 2}));

    let reply = request.reply("r1", &Ack { success: false, msg: Some("queue full".into()) });
    assert!(session.handle_frame(&reply, 0.0).unwrap().is_empty());
    assert_eq!(*seen.borrow(), vec!["queue full".to_owned()]);
    assert_eq!(session.pending_acks(), 0);
}

#[test]
fn accepted_ack_is_silent() {
    let (mut session, mut rx) = started();
    let seen = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&seen);
    session.on_error(move |_| *sink.borrow_mut() += 1);

    session.join_queue("q-1");
    let request = drain(&mut rx).remove(0);
    session.handle_frame(&request.reply("r1", &Ack { success: true, msg: None }), 0.0).unwrap();
    assert_eq!(*seen.borrow(), 0);
    assert_eq!(session.pending_acks(), 0);
}

#[test]
fn error_callback_last_writer_wins() {
    let (mut session, mut rx) = started();
    let first = Rc::new(RefCell::new(0));
    let second = Rc::new(RefCell::new(0));
    let a = Rc::clone(&first);
    let b = Rc::clone(&second);
    session.on_error(move |_| *a.borrow_mut() += 1);
    session.on_error(move |_| *b.borrow_mut() += 1);

    session.resign();
    let request = drain(&mut rx).remove(0);
    assert_eq!(request.event, events::RESIGN_GAME);
    session.handle_frame(&request.reply("r1", &Ack { success: false, msg: None }), 0.0).unwrap();
    assert_eq!(*first.borrow(), 0);
    assert_eq!(*second.borrow(), 1);
}

#[test]
fn rejected_ack_without_msg_names_the_event() {
    let (mut session, mut rx) = started();
    let seen = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&seen);
    session.on_error(move |msg| *sink.borrow_mut() = msg.to_owned());

    session.leave_queue("q-1");
    let request = drain(&mut rx).remove(0);
    session.handle_frame(&request.reply("r1", &Ack { success: false, msg: None }), 0.0).unwrap();
    assert_eq!(*seen.borrow(), "leave_queue rejected");
}

#[test]
fn closed_channel_reports_failure() {
    let (mut session, rx) = started();
    drop(rx);
    assert!(!session.resign());
    assert_eq!(session.pending_acks(), 0);
}

#[test]
fn unacked_intents_stay_bounded() {
    let (mut session, mut rx) = started();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.on_error(move |msg| sink.borrow_mut().push(msg.to_owned()));

    for _ in 0..1_000 {
        assert!(session.resign());
    }
    assert_eq!(session.pending_acks(), MAX_PENDING_ACKS);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1_000);
    let latest = sent.last().unwrap();
    session.handle_frame(&latest.reply("r1", &Ack { success: false, msg: None }), 0.0).unwrap();
    assert_eq!(session.pending_acks(), MAX_PENDING_ACKS - 1);

    // Forgotten request: the reply's own event names it.
    session.handle_frame(&sent[0].reply("r2", &Ack { success: false, msg: None }), 0.0).unwrap();
    assert_eq!(session.pending_acks(), MAX_PENDING_ACKS - 1);
    assert_eq!(*seen.borrow(), vec![format!("{} rejected", events::RESIGN_GAME); 2]);
}

// =============================================================
// Tick and resize
// =============================================================

#[test]
fn tick_caps_dt() {
    let (mut session, _rx) = started();
    let patch = json!({"players": [{"username": "ada", "probes": [{"id": "p1", "pos": {"x": 2.5, "y": 1.5}}]}]});
    session.handle_frame(&push(events::GAME_STATE, patch), 0.0).unwrap();

    // A ten-second stall still advances by at most 0.1s: 1.5 * 2 * 0.1 = 0.3 cells.
    session.tick(10_000.0);
    let x = session.local_player().unwrap().probe("p1").unwrap().display_pos().x;
    assert!((x - 1.8).abs() < 1e-9);
}

#[test]
fn resize_burst_applies_once_after_debounce() {
    let (mut session, _rx) = started();
    for (i, w) in (0u32..).zip([820.0, 840.0, 860.0, 880.0, 400.0]) {
        let now = f64::from(i) * 20.0;
        session.request_resize(now, w, 340.0);
        session.tick(now);
    }
    session.tick(499.0);
    assert_eq!(game(&session).viewport().unit(), 40.0);

    session.tick(500.0);
    session.tick(1_000.0);
    assert_eq!(session.canvas_size(), Size::new(400.0, 340.0));
    // min(400 / 20, 300 / 15) = 20
    assert_eq!(game(&session).viewport().unit(), 20.0);
    let tile = game(&session).world().tile_at(Coord::new(1, 1)).unwrap();
    assert_eq!(tile.sprite().center, Point::new(30.0, 30.0));
}

#[test]
fn resize_to_same_size_is_skipped() {
    let (mut session, _rx) = started();
    session.request_resize(0.0, 800.0, 640.0);
    session.tick(600.0);
    assert_eq!(session.canvas_size(), Size::new(800.0, 640.0));
}

// =============================================================
// Result / teardown
// =============================================================

#[test]
fn game_result_stops_input() {
    let (mut session, mut rx) = started();
    session.control(Control::BuildFactory);
    let result = json!({"ranking": ["ada", "bo"], "stats": {}, "mmrs": {"ada": 1010.0}, "mmr_diffs": {"ada": 10.0}});
    session.handle_frame(&push(events::GAME_RESULT, result), 0.0).unwrap();

    assert_eq!(game(&session).result().unwrap().ranking, vec!["ada", "bo"]);
    assert_eq!(session.interaction().mode(), Mode::Idle);
    assert_eq!(game(&session).world().tiles().filter(|t| t.is_highlighted()).count(), 0);

    assert!(session.control(Control::BuildFactory).is_empty());
    assert!(click(&mut session, 45.0, 5.0).is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn game_result_clears_the_hovered_tile() {
    let (mut session, _rx) = started();
    session.pointer_move(Point::new(45.0, 5.0));
    let result = json!({"ranking": ["ada", "bo"], "stats": {}, "mmrs": {}, "mmr_diffs": {}});
    session.handle_frame(&push(events::GAME_RESULT, result), 0.0).unwrap();
    assert_eq!(game(&session).world().tiles().filter(|t| t.is_hovered()).count(), 0);

    session.pointer_move(Point::new(405.0, 405.0));
    let hovered: Vec<Coord> = game(&session).world().tiles().filter(|t| t.is_hovered()).map(Tile::coord).collect();
    assert_eq!(hovered, vec![Coord::new(10, 10)]);
}

#[test]
fn end_tears_everything_down() {
    let (mut session, _rx) = started();
    session.control(Control::SelectAll);
    let fire = json!({"username": "ada", "turret_id": "t1", "probe_id": "q1"});
    session.handle_frame(&push(events::TURRET_FIRE_PROBE, fire), 0.0).unwrap();

    session.end();
    assert!(session.game().is_none());
    assert!(session.effects().is_empty());
    assert_eq!(session.interaction().mode(), Mode::Idle);
    assert!(session.tick(100.0).is_empty());
    assert!(click(&mut session, 45.0, 5.0).is_empty());
}

#[test]
fn restart_replaces_previous_match() {
    let (mut session, _rx) = started();
    session.control(Control::SelectAll);
    session.handle_frame(&push(events::START_GAME, snapshot()), 5_000.0).unwrap();
    assert_eq!(session.interaction().mode(), Mode::Idle);
    assert!(session.local_player().unwrap().probes().all(|p| !p.is_selected()));
}
