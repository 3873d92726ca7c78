//! LED feedback: endpoint presence and mute state shown on the controller.

use pamidi_midi_io::{MidiChannel, MidiOutputHandle};
use pamidi_pulse::EndpointSnapshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Controller LED, addressed by note number.
pub type LedId = u8;

/// Display name to LED tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedBindings {
    /// Lit while an endpoint with this name exists.
    #[serde(default)]
    pub activity: BTreeMap<String, LedId>,
    /// Lit while an endpoint with this name is muted.
    #[serde(default)]
    pub mute: BTreeMap<String, LedId>,
}

impl LedBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(mut self, name: impl Into<String>, led: LedId) -> Self {
        self.activity.insert(name.into(), led);
        self
    }

    pub fn mute(mut self, name: impl Into<String>, led: LedId) -> Self {
        self.mute.insert(name.into(), led);
        self
    }
}

/// Sink for LED state changes.
///
/// Implementations must not block; writes are issued while holding the
/// feedback lock.
pub trait LedWriter: Send + Sync {
    fn set_led(&self, led: LedId, on: bool);
}

/// Drives LEDs with Note On (velocity 127) and Note Off (velocity 0).
#[derive(Debug, Clone)]
pub struct MidiLedWriter {
    output: MidiOutputHandle,
    channel: MidiChannel,
}

impl MidiLedWriter {
    pub fn new(output: MidiOutputHandle, channel: MidiChannel) -> Self {
        Self { output, channel }
    }
}

impl LedWriter for MidiLedWriter {
    fn set_led(&self, led: LedId, on: bool) {
        if on {
            self.output.send_note_on(self.channel, led, 127);
        } else {
            self.output.send_note_off(self.channel, led, 0);
        }
    }
}

/// Maps endpoint names to LED writes.
pub struct LedFeedback {
    bindings: LedBindings,
    writer: Box<dyn LedWriter>,
    /// Keeps a sweep's off/on pass from interleaving with single updates.
    write_lock: Mutex<()>,
}

impl LedFeedback {
    pub fn new(bindings: LedBindings, writer: impl LedWriter + 'static) -> Self {
        Self {
            bindings,
            writer: Box::new(writer),
            write_lock: Mutex::new(()),
        }
    }

    pub fn bindings(&self) -> &LedBindings {
        &self.bindings
    }

    /// Drive the activity LED for `name`. Returns `false` if `name` has none.
    pub fn set_activity(&self, name: &str, present: bool) -> bool {
        let Some(&led) = self.bindings.activity.get(name) else {
            return false;
        };
        let _guard = self.write_lock.lock();
        info!("Activity LED {} for {} {}", led, name, on_off(present));
        self.writer.set_led(led, present);
        true
    }

    /// Drive the mute LED for `name`. Returns `false` if `name` has none.
    pub fn set_mute(&self, name: &str, muted: bool) -> bool {
        let Some(&led) = self.bindings.mute.get(name) else {
            return false;
        };
        let _guard = self.write_lock.lock();
        info!("Mute LED {} for {} {}", led, name, on_off(muted));
        self.writer.set_led(led, muted);
        true
    }

    /// Turn every activity LED off, then light those of names present in
    /// any category of `snapshot`. Mute LEDs are left alone.
    pub fn refresh_all_leds(&self, snapshot: &EndpointSnapshot) {
        let _guard = self.write_lock.lock();
        for &led in self.bindings.activity.values() {
            self.writer.set_led(led, false);
        }
        let mut lit = 0usize;
        for name in snapshot.all_names() {
            if let Some(&led) = self.bindings.activity.get(name) {
                self.writer.set_led(led, true);
                lit += 1;
            }
        }
        info!(
            "Activity LEDs refreshed: {} of {} lit",
            lit,
            self.bindings.activity.len()
        );
    }
}

impl std::fmt::Debug for LedFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedFeedback")
            .field("bindings", &self.bindings)
            .finish()
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
