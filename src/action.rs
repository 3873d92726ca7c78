//! Action table: MIDI event patterns bound to audio effects.
//!
//! Bindings are immutable once built and matched in table order. Every
//! matching binding fires; there is no first-match short-circuit.

use crate::error::{Error, Result};
use pamidi_midi_io::{ControlMessage, MessageType, MidiChannel};
use pamidi_pulse::{EndpointCategory, VOLUME_NORM};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest value a 7-bit controller sends.
pub const DEFAULT_MAX_INPUT_VALUE: u8 = 127;

/// The MIDI side of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventPattern {
    pub message_type: MessageType,
    pub channel: MidiChannel,
    /// Controller number for CC, key number for NoteOn.
    pub number: u8,
    /// Input value that maps to full scale. `None` means 127.
    pub max_input_value: Option<u8>,
}

impl EventPattern {
    pub fn control_change(channel: MidiChannel, controller: u8) -> Self {
        Self {
            message_type: MessageType::ControlChange,
            channel,
            number: controller,
            max_input_value: None,
        }
    }

    pub fn note_on(channel: MidiChannel, key: u8) -> Self {
        Self {
            message_type: MessageType::NoteOn,
            channel,
            number: key,
            max_input_value: None,
        }
    }

    pub fn with_max_input_value(mut self, max: u8) -> Self {
        self.max_input_value = Some(max);
        self
    }

    /// Type, channel, and controller/key must all be equal.
    #[inline]
    pub fn matches(&self, message: &ControlMessage) -> bool {
        message.message_type() == Some(self.message_type)
            && message.channel() == Some(self.channel)
            && message.number() == Some(self.number)
    }

    /// Scale an input value to 0.0..=1.0.
    #[inline]
    pub fn scale(&self, value: u8) -> f32 {
        let max = self.max_input_value.unwrap_or(DEFAULT_MAX_INPUT_VALUE);
        if max == 0 {
            return 0.0;
        }
        (value as f32 / max as f32).clamp(0.0, 1.0)
    }
}

/// What a binding does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    VolumeChange,
    MuteToggle,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::VolumeChange => f.write_str("volume change"),
            Effect::MuteToggle => f.write_str("mute toggle"),
        }
    }
}

/// Named endpoint of one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub category: EndpointCategory,
    pub name: String,
}

impl Target {
    pub fn new(category: EndpointCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.category, self.name)
    }
}

/// One rule: pattern, effect, target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionBinding {
    pattern: EventPattern,
    effect: Effect,
    target: Target,
}

impl ActionBinding {
    /// Rejects NoteOn bound to a volume change (notes carry no level),
    /// a zero input range, channels above 15, and controller or key numbers
    /// above 127.
    pub fn new(pattern: EventPattern, effect: Effect, target: Target) -> Result<Self> {
        if pattern.channel > 15 {
            return Err(Error::InvalidConfig(format!(
                "MIDI channel {} out of range 0-15",
                pattern.channel
            )));
        }
        if pattern.number > 127 {
            return Err(Error::InvalidConfig(format!(
                "controller/key number {} out of range 0-127 for {}",
                pattern.number, target
            )));
        }
        if pattern.max_input_value == Some(0) {
            return Err(Error::InvalidConfig(format!(
                "max input value of 0 for {}",
                target
            )));
        }
        if pattern.message_type == MessageType::NoteOn && effect == Effect::VolumeChange {
            return Err(Error::InvalidConfig(format!(
                "NoteOn key {} cannot drive a volume change on {}",
                pattern.number, target
            )));
        }
        Ok(Self {
            pattern,
            effect,
            target,
        })
    }

    pub fn volume(pattern: EventPattern, target: Target) -> Result<Self> {
        Self::new(pattern, Effect::VolumeChange, target)
    }

    pub fn mute_toggle(pattern: EventPattern, target: Target) -> Result<Self> {
        Self::new(pattern, Effect::MuteToggle, target)
    }

    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The effect this binding requests for `message`, if it fires.
    ///
    /// A ControlChange bound to a mute toggle fires on the press only: a
    /// value of 0 (the button release) matches but requests nothing.
    pub fn resolve(&self, message: &ControlMessage) -> Option<EffectRequest<'_>> {
        if !self.pattern.matches(message) {
            return None;
        }
        match (*message, self.effect) {
            (ControlMessage::ControlChange { value, .. }, Effect::VolumeChange) => {
                Some(EffectRequest::SetVolume {
                    target: &self.target,
                    fraction: self.pattern.scale(value),
                })
            }
            // Button press only; the release sends 0.
            (ControlMessage::ControlChange { value, .. }, Effect::MuteToggle) => {
                (value > 0).then_some(EffectRequest::ToggleMute {
                    target: &self.target,
                })
            }
            (ControlMessage::NoteOn { .. }, _) => Some(EffectRequest::ToggleMute {
                target: &self.target,
            }),
            _ => None,
        }
    }
}

/// A fired binding, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectRequest<'a> {
    SetVolume { target: &'a Target, fraction: f32 },
    ToggleMute { target: &'a Target },
}

impl EffectRequest<'_> {
    pub fn target(&self) -> &Target {
        match self {
            EffectRequest::SetVolume { target, .. } | EffectRequest::ToggleMute { target } => {
                target
            }
        }
    }
}

/// Convert a 0.0..=1.0 fraction to a server volume level.
#[inline]
pub fn volume_level(fraction: f32) -> u32 {
    (fraction.clamp(0.0, 1.0) as f64 * VOLUME_NORM as f64).round() as u32
}

/// Ordered, read-only set of bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTable {
    bindings: Vec<ActionBinding>,
}

impl ActionTable {
    pub fn new(bindings: Vec<ActionBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[ActionBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Effects fired by `message`, in table order.
    pub fn resolve(&self, message: &ControlMessage) -> Vec<EffectRequest<'_>> {
        self.bindings
            .iter()
            .filter_map(|binding| binding.resolve(message))
            .collect()
    }
}

impl FromIterator<ActionBinding> for ActionTable {
    fn from_iter<I: IntoIterator<Item = ActionBinding>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn speakers() -> Target {
        Target::new(EndpointCategory::PhysicalSink, "Speakers")
    }

    #[test]
    fn test_pattern_matches_all_fields() {
        let pattern = EventPattern::control_change(0, 1);
        assert!(pattern.matches(&ControlMessage::control_change(0, 1, 10)));
        assert!(!pattern.matches(&ControlMessage::control_change(1, 1, 10))); // Wrong channel
        assert!(!pattern.matches(&ControlMessage::control_change(0, 2, 10))); // Wrong controller
        assert!(!pattern.matches(&ControlMessage::note_on(0, 1, 10))); // Wrong type
    }

    #[test]
    fn test_note_off_never_matches() {
        let pattern = EventPattern::note_on(0, 4);
        let release = ControlMessage::from_bytes(&[0x90, 4, 0]).unwrap();
        assert!(!pattern.matches(&release));
    }

    #[test]
    fn test_scale() {
        let pattern = EventPattern::control_change(0, 1);
        assert_relative_eq!(pattern.scale(64), 0.503_937, epsilon = 1e-5);
        assert_eq!(pattern.scale(127), 1.0);
        assert_eq!(pattern.scale(0), 0.0);

        // Values above max clamp to full scale.
        let short = pattern.with_max_input_value(100);
        assert_eq!(short.scale(120), 1.0);
        assert_relative_eq!(short.scale(50), 0.5);
    }

    #[test]
    fn test_volume_level() {
        assert_eq!(volume_level(1.0), 65535);
        assert_eq!(volume_level(0.0), 0);
        assert_eq!(volume_level(64.0 / 127.0), 33026);
        assert_eq!(volume_level(1.5), 65535);
    }

    #[test]
    fn test_note_on_volume_rejected() {
        let result = ActionBinding::volume(EventPattern::note_on(0, 3), speakers());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let zero_range = EventPattern::control_change(0, 1).with_max_input_value(0);
        assert!(ActionBinding::volume(zero_range, speakers()).is_err());
        assert!(ActionBinding::volume(EventPattern::control_change(16, 1), speakers()).is_err());

        let out_of_range = ActionBinding::volume(EventPattern::control_change(0, 200), speakers());
        assert!(matches!(out_of_range, Err(Error::InvalidConfig(_))));
        let out_of_range = ActionBinding::mute_toggle(EventPattern::note_on(0, 128), speakers());
        assert!(matches!(out_of_range, Err(Error::InvalidConfig(_))));

        let highest = ActionBinding::volume(EventPattern::control_change(15, 127), speakers());
        assert!(highest.is_ok());
    }

    #[test]
    fn test_control_change_resolves_volume() {
        let binding =
            ActionBinding::volume(EventPattern::control_change(0, 1), speakers()).unwrap();
        let request = binding
            .resolve(&ControlMessage::control_change(0, 1, 127))
            .unwrap();
        assert_eq!(
            request,
            EffectRequest::SetVolume {
                target: &speakers(),
                fraction: 1.0
            }
        );
    }

    #[test]
    fn test_note_on_always_toggles() {
        let binding =
            ActionBinding::mute_toggle(EventPattern::note_on(0, 4), speakers()).unwrap();
        for velocity in [1, 64, 127] {
            assert!(matches!(
                binding.resolve(&ControlMessage::note_on(0, 4, velocity)),
                Some(EffectRequest::ToggleMute { .. })
            ));
        }
    }

    #[test]
    fn test_cc_mute_toggle_fires_on_press_only() {
        let binding =
            ActionBinding::mute_toggle(EventPattern::control_change(0, 20), speakers()).unwrap();
        assert!(binding
            .resolve(&ControlMessage::control_change(0, 20, 127))
            .is_some());
        assert!(binding
            .resolve(&ControlMessage::control_change(0, 20, 0))
            .is_none());
    }

    #[test]
    fn test_table_applies_all_matches_in_order() {
        let firefox = Target::new(EndpointCategory::PlaybackStream, "Firefox");
        let table: ActionTable = [
            ActionBinding::volume(EventPattern::control_change(0, 1), speakers()).unwrap(),
            ActionBinding::volume(EventPattern::control_change(0, 2), speakers()).unwrap(),
            ActionBinding::volume(EventPattern::control_change(0, 1), firefox.clone()).unwrap(),
        ]
        .into_iter()
        .collect();

        let requests = table.resolve(&ControlMessage::control_change(0, 1, 64));
        let targets: Vec<&Target> = requests.iter().map(EffectRequest::target).collect();
        assert_eq!(targets, vec![&speakers(), &firefox]);

        assert!(table
            .resolve(&ControlMessage::control_change(3, 1, 64))
            .is_empty());
    }
}
