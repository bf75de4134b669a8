//! Error types for frame handling.
//!
//! Only malformed or unexpected traffic is an error. Steady-state conditions
//! (unknown entity ids, out-of-bounds coordinates, rejected intents) are
//! handled by conditional returns and never surface here.

/// Error returned by [`crate::session::GameSession::handle_frame`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The frame names an event the engine does not consume.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The frame payload does not match the event's schema.
    #[error("malformed {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// An in-game event arrived before `start_game`.
    #[error("{0} received with no game in progress")]
    NoGame(String),
    /// Host-supplied engine settings are not valid JSON for [`crate::config::EngineSettings`].
    #[error("invalid engine settings: {0}")]
    Settings(#[source] serde_json::Error),
    /// The raw message could not be decoded into a frame.
    #[error(transparent)]
    Codec(#[from] frames::CodecError),
}
