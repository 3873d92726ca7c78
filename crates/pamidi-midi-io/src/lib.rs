//! MIDI transport for pamidi.
//!
//! Provides port listing, typed control message decoding, and threaded
//! input/output connections. Hardware ports go through `midir` (feature
//! `midi-io`); [`port::VirtualTransport`] serves in-process ports.

pub mod error;
pub use error::{Error, Result};

pub mod event;
pub use event::{ControlMessage, MessageType, MidiChannel};

mod io;
pub use io::{
    forward_raw, InputGuard, MidiInputHandle, MidiOutputHandle, MidiOutputMessage, MidiOutputPort,
};

pub mod port;
pub use port::{VirtualOutput, VirtualTransport};

mod transport;
pub use transport::{MidiDevices, MidiTransport};

#[cfg(feature = "midi-io")]
pub use transport::MidirTransport;
