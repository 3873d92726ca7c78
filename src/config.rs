//! TOML configuration for a bridge.

use crate::action::{ActionBinding, ActionTable, Effect, EventPattern, Target};
use crate::error::{Error, Result};
use crate::led::LedBindings;
use pamidi_midi_io::{MessageType, MidiChannel};
use pamidi_pulse::EndpointCategory;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_max_input_value() -> u8 {
    crate::action::DEFAULT_MAX_INPUT_VALUE
}

/// One action table entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub message_type: MessageType,
    pub channel: MidiChannel,
    /// Controller number for CC, key number for NoteOn.
    pub controller: u8,
    #[serde(default = "default_max_input_value")]
    pub max_input_value: u8,
    pub action: Effect,
    pub target_type: EndpointCategory,
    pub target_name: String,
}

impl ActionConfig {
    pub fn to_binding(&self) -> Result<ActionBinding> {
        let pattern = EventPattern {
            message_type: self.message_type,
            channel: self.channel,
            number: self.controller,
            max_input_value: Some(self.max_input_value),
        };
        ActionBinding::new(
            pattern,
            self.action,
            Target::new(self.target_type, self.target_name.clone()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Exact name of the MIDI input port.
    pub input_port: String,
    /// Exact name of the MIDI output port driving the LEDs.
    pub output_port: String,
    #[serde(default)]
    pub led_channel: MidiChannel,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    #[serde(default)]
    pub leds: LedBindings,
}

impl BridgeConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.led_channel > 15 {
            return Err(Error::InvalidConfig(format!(
                "LED channel {} out of range 0-15",
                self.led_channel
            )));
        }
        self.action_table().map(|_| ())
    }

    /// Validated bindings, in file order.
    pub fn action_table(&self) -> Result<ActionTable> {
        self.actions.iter().map(ActionConfig::to_binding).collect()
    }
}
