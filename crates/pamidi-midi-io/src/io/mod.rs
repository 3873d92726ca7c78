//! Hardware MIDI I/O.
//!
//! Connections run on dedicated threads; the midir-backed transport
//! requires the `midi-io` feature.

mod input;
mod output;

pub(crate) use input::INPUT_QUEUE_CAPACITY;
pub use input::{forward_raw, InputGuard, MidiInputHandle};
pub use output::{MidiOutputHandle, MidiOutputMessage, MidiOutputPort};
