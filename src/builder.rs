//! Builder for configuring and constructing a `Bridge`.

use crate::action::{ActionBinding, ActionTable};
use crate::config::BridgeConfig;
use crate::led::LedBindings;
use crate::{Bridge, Error, Result};
use pamidi_midi_io::{MidiChannel, MidiTransport};
use pamidi_pulse::AudioServer;
use std::sync::Arc;

/// The audio server must always be supplied. Without an explicit transport,
/// system MIDI ports are used (feature `midi-io`).
///
/// # Example
///
/// ```ignore
/// use pamidi::prelude::*;
///
/// let bridge = Bridge::builder()
///     .ports("X-Touch Mini")
///     .server(Arc::new(MemoryServer::new()))
///     .action(ActionBinding::volume(
///         EventPattern::control_change(0, 1),
///         Target::new(EndpointCategory::PhysicalSink, "Speakers"),
///     )?)
///     .leds(LedBindings::new().activity("Firefox", 6))
///     .build()?;
/// ```
#[derive(Default)]
pub struct BridgeBuilder {
    transport: Option<Arc<dyn MidiTransport>>,
    server: Option<Arc<dyn AudioServer>>,
    input_port: Option<String>,
    output_port: Option<String>,
    led_channel: MidiChannel,
    actions: Vec<ActionBinding>,
    leds: LedBindings,
}

impl BridgeBuilder {
    pub fn transport(mut self, transport: Arc<dyn MidiTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn server(mut self, server: Arc<dyn AudioServer>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn input_port(mut self, name: impl Into<String>) -> Self {
        self.input_port = Some(name.into());
        self
    }

    pub fn output_port(mut self, name: impl Into<String>) -> Self {
        self.output_port = Some(name.into());
        self
    }

    /// Same name for input and output, as most controllers report.
    pub fn ports(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.input_port(name.clone()).output_port(name)
    }

    /// Default: 0
    pub fn led_channel(mut self, channel: MidiChannel) -> Self {
        self.led_channel = channel;
        self
    }

    /// Appended after any bindings already added.
    pub fn action(mut self, binding: ActionBinding) -> Self {
        self.actions.push(binding);
        self
    }

    pub fn actions(mut self, bindings: impl IntoIterator<Item = ActionBinding>) -> Self {
        self.actions.extend(bindings);
        self
    }

    pub fn leds(mut self, leds: LedBindings) -> Self {
        self.leds = leds;
        self
    }

    /// Ports, LED channel, actions, and LED tables from a config file.
    pub fn config(self, config: BridgeConfig) -> Result<Self> {
        let table = config.action_table()?;
        Ok(self
            .input_port(config.input_port)
            .output_port(config.output_port)
            .led_channel(config.led_channel)
            .actions(table.bindings().iter().cloned())
            .leds(config.leds))
    }

    pub fn build(self) -> Result<Bridge> {
        if self.led_channel > 15 {
            return Err(Error::InvalidConfig(format!(
                "LED channel {} out of range 0-15",
                self.led_channel
            )));
        }
        let input_port = self
            .input_port
            .ok_or_else(|| Error::InvalidConfig("no MIDI input port configured".to_string()))?;
        let output_port = self
            .output_port
            .ok_or_else(|| Error::InvalidConfig("no MIDI output port configured".to_string()))?;
        let server = self
            .server
            .ok_or_else(|| Error::InvalidConfig("no audio server configured".to_string()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        Ok(Bridge::from_parts(
            transport,
            server,
            input_port,
            output_port,
            self.led_channel,
            ActionTable::new(self.actions),
            self.leds,
        ))
    }
}

#[cfg(feature = "midi-io")]
fn default_transport() -> Result<Arc<dyn MidiTransport>> {
    Ok(Arc::new(pamidi_midi_io::MidirTransport::default()))
}

#[cfg(not(feature = "midi-io"))]
fn default_transport() -> Result<Arc<dyn MidiTransport>> {
    Err(Error::InvalidConfig(
        "no MIDI transport configured and system MIDI support is disabled".to_string(),
    ))
}
