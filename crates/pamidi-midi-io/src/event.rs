//! Typed control messages received from a MIDI controller.
//!
//! Raw bytes are decoded with `midi-msg`; only the channel voice messages a
//! control surface emits are kept as distinct variants. Control changes are
//! read straight from the data bytes so that controllers 120-127 (channel
//! mode numbers) stay bindable.

use midi_msg::{ChannelVoiceMsg, MidiMsg};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// MIDI channel (0-15, where 0 = channel 1)
pub type MidiChannel = u8;

/// Message kinds an action binding can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ControlChange,
    NoteOn,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::ControlChange => f.write_str("ControlChange"),
            MessageType::NoteOn => f.write_str("NoteOn"),
        }
    }
}

/// A decoded message from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    ControlChange {
        channel: MidiChannel,
        controller: u8,
        value: u8,
    },
    /// Velocity is always non-zero; a zero-velocity Note On decodes as `NoteOff`.
    NoteOn {
        channel: MidiChannel,
        key: u8,
        velocity: u8,
    },
    NoteOff {
        channel: MidiChannel,
        key: u8,
        velocity: u8,
    },
    /// Anything else the controller sends (clock, pitch bend, sysex, ...).
    Other,
}

impl ControlMessage {
    pub fn control_change(channel: MidiChannel, controller: u8, value: u8) -> Self {
        ControlMessage::ControlChange {
            channel,
            controller,
            value,
        }
    }

    pub fn note_on(channel: MidiChannel, key: u8, velocity: u8) -> Self {
        ControlMessage::NoteOn {
            channel,
            key,
            velocity,
        }
    }

    /// Decode one message from raw MIDI bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if let &[status, controller, value, ..] = bytes {
            if status & 0xF0 == 0xB0 {
                return Ok(ControlMessage::ControlChange {
                    channel: status & 0x0F,
                    controller: controller & 0x7F,
                    value: value & 0x7F,
                });
            }
        }

        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        let message = match msg {
            MidiMsg::ChannelVoice { channel, msg } => {
                let channel = channel as u8;
                match msg {
                    ChannelVoiceMsg::NoteOn { note, velocity } if velocity == 0 => {
                        ControlMessage::NoteOff {
                            channel,
                            key: note,
                            velocity,
                        }
                    }
                    ChannelVoiceMsg::NoteOn { note, velocity } => ControlMessage::NoteOn {
                        channel,
                        key: note,
                        velocity,
                    },
                    ChannelVoiceMsg::NoteOff { note, velocity } => ControlMessage::NoteOff {
                        channel,
                        key: note,
                        velocity,
                    },
                    _ => ControlMessage::Other,
                }
            }
            _ => ControlMessage::Other,
        };
        Ok(message)
    }

    /// The bindable kind of this message, if any.
    #[inline]
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            ControlMessage::ControlChange { .. } => Some(MessageType::ControlChange),
            ControlMessage::NoteOn { .. } => Some(MessageType::NoteOn),
            _ => None,
        }
    }

    #[inline]
    pub fn channel(&self) -> Option<MidiChannel> {
        match *self {
            ControlMessage::ControlChange { channel, .. }
            | ControlMessage::NoteOn { channel, .. }
            | ControlMessage::NoteOff { channel, .. } => Some(channel),
            ControlMessage::Other => None,
        }
    }

    /// Controller number for CC, key number for notes.
    #[inline]
    pub fn number(&self) -> Option<u8> {
        match *self {
            ControlMessage::ControlChange { controller, .. } => Some(controller),
            ControlMessage::NoteOn { key, .. } | ControlMessage::NoteOff { key, .. } => Some(key),
            ControlMessage::Other => None,
        }
    }

    /// CC value or note velocity.
    #[inline]
    pub fn value(&self) -> Option<u8> {
        match *self {
            ControlMessage::ControlChange { value, .. } => Some(value),
            ControlMessage::NoteOn { velocity, .. } | ControlMessage::NoteOff { velocity, .. } => {
                Some(velocity)
            }
            ControlMessage::Other => None,
        }
    }
}
