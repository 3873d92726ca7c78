//! Port enumeration and connection.

use crate::error::Result;
use crate::io::{MidiInputHandle, MidiOutputHandle};

#[cfg(feature = "midi-io")]
use crate::error::Error;
#[cfg(feature = "midi-io")]
use crate::io::{forward_raw, InputGuard, MidiOutputPort};
#[cfg(feature = "midi-io")]
use midir::{Ignore, MidiInput, MidiOutput};
#[cfg(feature = "midi-io")]
use tracing::info;

/// Port names reported by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MidiDevices {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Source of MIDI ports. Ports are addressed by their exact reported name.
pub trait MidiTransport: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<String>>;

    fn list_outputs(&self) -> Result<Vec<String>>;

    fn open_input(&self, name: &str) -> Result<MidiInputHandle>;

    fn open_output(&self, name: &str) -> Result<MidiOutputHandle>;

    fn list_devices(&self) -> Result<MidiDevices> {
        Ok(MidiDevices {
            inputs: self.list_inputs()?,
            outputs: self.list_outputs()?,
        })
    }
}

/// System MIDI ports through `midir`.
#[cfg(feature = "midi-io")]
#[derive(Debug, Clone)]
pub struct MidirTransport {
    client_name: String,
}

#[cfg(feature = "midi-io")]
impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn input_names(input: &MidiInput) -> Vec<String> {
        input
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index))
            })
            .collect()
    }

    fn output_names(output: &MidiOutput) -> Vec<String> {
        output
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index))
            })
            .collect()
    }
}

#[cfg(feature = "midi-io")]
impl Default for MidirTransport {
    fn default() -> Self {
        Self::new("pamidi")
    }
}

#[cfg(feature = "midi-io")]
impl MidiTransport for MidirTransport {
    fn list_inputs(&self) -> Result<Vec<String>> {
        let input = MidiInput::new(&format!("{}-device-list", self.client_name))?;
        Ok(Self::input_names(&input))
    }

    fn list_outputs(&self) -> Result<Vec<String>> {
        let output = MidiOutput::new(&format!("{}-device-list", self.client_name))?;
        Ok(Self::output_names(&output))
    }

    fn open_input(&self, name: &str) -> Result<MidiInputHandle> {
        let client_name = self.client_name.clone();
        let port_name = name.to_string();
        MidiInputHandle::spawn_with(name, move |sender| {
            let mut midi_input = MidiInput::new(&format!("{}-input", client_name))?;
            midi_input.ignore(Ignore::None);

            for found in Self::input_names(&midi_input) {
                info!("Found input midi device: {}", found);
            }

            let ports = midi_input.ports();
            let port = ports
                .iter()
                .find(|port| midi_input.port_name(port).ok().as_deref() == Some(port_name.as_str()))
                .cloned()
                .ok_or_else(|| Error::PortNotFound(port_name.clone()))?;

            let callback_name = port_name.clone();
            let connection = midi_input.connect(
                &port,
                &format!("{}-in", client_name),
                move |_timestamp, bytes, _| forward_raw(&sender, &callback_name, bytes),
                (),
            )?;
            info!("Opened MIDI input '{}'", port_name);
            Ok(Box::new(connection) as InputGuard)
        })
    }

    fn open_output(&self, name: &str) -> Result<MidiOutputHandle> {
        let client_name = self.client_name.clone();
        let port_name = name.to_string();
        MidiOutputHandle::spawn_with(name, move || {
            let midi_output = MidiOutput::new(&format!("{}-output", client_name))?;

            for found in Self::output_names(&midi_output) {
                info!("Found output midi device: {}", found);
            }

            let ports = midi_output.ports();
            let port = ports
                .iter()
                .find(|port| {
                    midi_output.port_name(port).ok().as_deref() == Some(port_name.as_str())
                })
                .cloned()
                .ok_or_else(|| Error::PortNotFound(port_name.clone()))?;

            let connection = midi_output.connect(&port, &format!("{}-out", client_name))?;
            info!("Opened MIDI output '{}'", port_name);
            Ok(Box::new(connection) as Box<dyn MidiOutputPort>)
        })
    }
}
