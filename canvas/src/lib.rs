//! Real-time game view for the territory-control client.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It mirrors
//! the server's authoritative match state (applying a full snapshot and then
//! sparse patches), turns raw pointer and keyboard input into game intents,
//! animates probes and transient effects, and renders the board. The host
//! JavaScript layer owns the socket and the DOM: it forwards frames and
//! events to the [`engine::Engine`] and writes the frames the engine queues.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Browser wrapper around the testable [`session::GameSession`] |
//! | [`session`] | Game lifecycle, server events, outbound intents, acks |
//! | [`protocol`] | Typed server events and client intents |
//! | [`field`] | Three-way absent / null / value patch fields |
//! | [`entity`] | Tiles, factories, turrets, probes and players |
//! | [`world`] | The tile grid |
//! | [`effects`] | Beams and explosions with their own expiry |
//! | [`input`] | Interaction modes and the pointer/key state machine |
//! | [`hit`] | Rectangle selection and tile lookup |
//! | [`viewport`] | Grid/pixel geometry for the current canvas size |
//! | [`resize`] | Debounced canvas resizing |
//! | [`render`] | Scene rendering |
//! | [`config`] | Engine settings and key bindings |
//! | [`error`] | Session error type |
//! | [`consts`] | Shared constants (scales, durations, palette) |

pub mod config;
pub mod consts;
pub mod effects;
pub mod engine;
pub mod entity;
pub mod error;
pub mod field;
pub mod hit;
pub mod input;
pub mod protocol;
pub mod render;
pub mod resize;
pub mod session;
pub mod viewport;
pub mod world;
