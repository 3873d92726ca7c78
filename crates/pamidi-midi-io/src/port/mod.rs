//! In-process MIDI ports.
//!
//! Virtual ports stand in for hardware when driving the bridge from tests or
//! a dry run: inputs are fed through a channel, outputs record every message.

mod virtual_port;

pub use virtual_port::{VirtualOutput, VirtualTransport};
