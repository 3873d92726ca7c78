//! # pamidi - MIDI controller to audio server bridge
//!
//! Turns knob turns and button presses on a MIDI controller into volume and
//! mute changes on named audio endpoints, and lights the controller's LEDs
//! from endpoint presence and mute state.
//!
//! ## Architecture
//!
//! pamidi is an umbrella crate that coordinates:
//! - **pamidi-midi-io** - MIDI transport (port listing, message decoding, threaded I/O)
//! - **pamidi-pulse** - Audio server side (endpoint model, name index, in-memory server)
//!
//! On top of those it provides the action table, the event dispatcher, the
//! LED feedback map, and the topology synchronizer, wired together by
//! [`Bridge`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use pamidi::prelude::*;
//!
//! let bridge = Bridge::builder()
//!     .config(BridgeConfig::load("pamidi.toml")?)?
//!     .server(server)
//!     .build()?;
//!
//! bridge.run(|| println!("bridge ready"))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - System MIDI ports
//! - `midi-io` - System MIDI ports through `midir`

/// Re-export of pamidi-midi-io for direct access
pub use pamidi_midi_io as midi;

/// Re-export of pamidi-pulse for direct access
pub use pamidi_pulse as pulse;

pub use pamidi_midi_io::{ControlMessage, MessageType, MidiDevices, MidiTransport};
pub use pamidi_pulse::{
    AudioServer, EndpointCategory, EndpointIndex, Notification, ObjectPath, PropertyValue,
};

mod error;
pub use error::{Error, Result};

pub mod action;
pub use action::{ActionBinding, ActionTable, Effect, EffectRequest, EventPattern, Target};

pub mod config;
pub use config::{ActionConfig, BridgeConfig};

pub mod led;
pub use led::{LedBindings, LedFeedback, LedId, LedWriter, MidiLedWriter};

pub mod dispatcher;
pub use dispatcher::{Dispatcher, EffectOutcome, EndpointFailure};

pub mod sync;
pub use sync::TopologySynchronizer;

mod bridge;
mod builder;

pub use bridge::{Bridge, ShutdownHandle};
pub use builder::BridgeBuilder;

/// Convenience prelude for common imports
pub mod prelude {
    // Bridge
    pub use crate::{Bridge, BridgeBuilder, BridgeConfig, ShutdownHandle};

    // Action table
    pub use crate::{ActionBinding, ActionTable, Effect, EventPattern, Target};

    // LEDs
    pub use crate::LedBindings;

    // Endpoints
    pub use crate::{AudioServer, EndpointCategory};
    pub use crate::pulse::MemoryServer;

    // MIDI
    pub use crate::{ControlMessage, MidiTransport};
    #[cfg(feature = "midi-io")]
    pub use crate::midi::MidirTransport;

    pub use crate::{Error, Result};
    pub use std::sync::Arc;
}
