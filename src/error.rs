//! Centralized error type for the pamidi umbrella crate.
//!
//! Wraps both subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] pamidi_midi_io::Error),

    #[error("Audio server: {0}")]
    Pulse(#[from] pamidi_pulse::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
