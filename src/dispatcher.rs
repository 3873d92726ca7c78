//! Event dispatcher: applies the action table to incoming MIDI messages.

use crate::action::{volume_level, ActionTable, EffectRequest, Target};
use crossbeam_channel::{select, Receiver};
use pamidi_midi_io::{ControlMessage, MidiInputHandle};
use pamidi_pulse::{AudioServer, EndpointIndex, ObjectPath, PropertyValue};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A write that failed on one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub path: ObjectPath,
    pub error: pamidi_pulse::Error,
}

/// Result of applying one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    /// No endpoint is known under the target name.
    NotConnected,
    /// Attempted on `endpoints` references; `failures` lists those that failed.
    Applied {
        endpoints: usize,
        failures: Vec<EndpointFailure>,
    },
}

impl EffectOutcome {
    pub fn is_not_connected(&self) -> bool {
        matches!(self, EffectOutcome::NotConnected)
    }

    /// Applied with no failures.
    pub fn is_success(&self) -> bool {
        matches!(self, EffectOutcome::Applied { failures, .. } if failures.is_empty())
    }
}

/// Consumes control messages and applies matching effects.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<ActionTable>,
    index: Arc<EndpointIndex>,
    server: Arc<dyn AudioServer>,
}

impl Dispatcher {
    pub fn new(
        table: Arc<ActionTable>,
        index: Arc<EndpointIndex>,
        server: Arc<dyn AudioServer>,
    ) -> Self {
        Self {
            table,
            index,
            server,
        }
    }

    /// Apply every binding `message` fires, in table order.
    ///
    /// One outcome per fired binding; a miss or failure on one never stops
    /// the rest.
    pub fn dispatch(&self, message: &ControlMessage) -> Vec<EffectOutcome> {
        log_message(message);
        self.table
            .resolve(message)
            .into_iter()
            .map(|request| match request {
                EffectRequest::SetVolume { target, fraction } => self.set_volume(target, fraction),
                EffectRequest::ToggleMute { target } => self.toggle_mute(target),
            })
            .collect()
    }

    /// Write `fraction` of full scale to every channel of every endpoint
    /// named by `target`.
    pub fn set_volume(&self, target: &Target, fraction: f32) -> EffectOutcome {
        let paths = self.index.lookup(target.category, &target.name);
        if paths.is_empty() {
            warn!("Could not find {} to set its volume", target);
            return EffectOutcome::NotConnected;
        }

        let level = volume_level(fraction);
        let endpoints = paths.len();
        let mut failures = Vec::new();
        for path in paths {
            let result = self.server.channels(&path).and_then(|channels| {
                debug!("Set volume {}: {} x{}", path, level, channels.len());
                self.server
                    .set(&path, PropertyValue::Volume(vec![level; channels.len()]))
            });
            if let Err(e) = result {
                error!("Failed to set volume on {}: {}", path, e);
                failures.push(EndpointFailure { path, error: e });
            }
        }
        EffectOutcome::Applied {
            endpoints,
            failures,
        }
    }

    /// Invert the mute state of every endpoint named by `target`.
    pub fn toggle_mute(&self, target: &Target) -> EffectOutcome {
        let paths = self.index.lookup(target.category, &target.name);
        if paths.is_empty() {
            warn!("Could not find {} to toggle its mute", target);
            return EffectOutcome::NotConnected;
        }

        let endpoints = paths.len();
        let mut failures = Vec::new();
        for path in paths {
            let result = self
                .server
                .mute(&path)
                .and_then(|muted| self.server.set(&path, PropertyValue::Mute(!muted)));
            if let Err(e) = result {
                error!("Failed to toggle mute on {}: {}", path, e);
                failures.push(EndpointFailure { path, error: e });
            }
        }
        EffectOutcome::Applied {
            endpoints,
            failures,
        }
    }

    /// Receive loop. Returns when the input closes or `shutdown` fires.
    pub fn run(&self, input: &MidiInputHandle, shutdown: &Receiver<()>) {
        info!("Listening on MIDI input '{}'", input.name());
        loop {
            select! {
                recv(input.events()) -> message => match message {
                    Ok(message) => {
                        self.dispatch(&message);
                    }
                    Err(_) => {
                        info!("MIDI input '{}' closed", input.name());
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    debug!("Dispatcher shutting down");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bindings", &self.table.len())
            .field("index", &self.index)
            .finish()
    }
}

fn log_message(message: &ControlMessage) {
    match *message {
        ControlMessage::ControlChange {
            channel,
            controller,
            value,
        } => info!(
            "Saw ControlChange input on Channel {}, Controller {}, with value {}",
            channel, controller, value
        ),
        ControlMessage::NoteOn {
            channel,
            key,
            velocity,
        } => info!(
            "Saw NoteOn input on Channel {}, Key {}, with velocity {}",
            channel, key, velocity
        ),
        ControlMessage::NoteOff { channel, key, .. } => {
            debug!("Saw NoteOff input on Channel {}, Key {}", channel, key)
        }
        ControlMessage::Other => {}
    }
}
