//! The audio server interface consumed by the bridge.

use crate::endpoint::{EndpointCategory, ObjectKind, ObjectPath, PropertyList};
use crate::error::Result;
use crossbeam_channel::Receiver;

/// Writable object properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// One value per channel, 0..=65535 for 0..100%.
    Volume(Vec<u32>),
    Mute(bool),
}

/// Change reported by the audio server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EndpointAppeared {
        category: EndpointCategory,
        path: ObjectPath,
    },
    EndpointRemoved {
        category: EndpointCategory,
        path: ObjectPath,
    },
    MuteChanged {
        kind: ObjectKind,
        path: ObjectPath,
        muted: bool,
    },
    VolumeChanged {
        kind: ObjectKind,
        path: ObjectPath,
        volume: Vec<u32>,
    },
}

/// Client connection to an audio server.
///
/// Calls may block on the server; callers must not hold locks across them.
pub trait AudioServer: Send + Sync {
    /// Object paths currently present in `category`.
    fn list_endpoints(&self, category: EndpointCategory) -> Result<Vec<ObjectPath>>;

    fn property_list(&self, path: &ObjectPath) -> Result<PropertyList>;

    /// Channel positions; the length is the channel count.
    fn channels(&self, path: &ObjectPath) -> Result<Vec<u32>>;

    fn volume(&self, path: &ObjectPath) -> Result<Vec<u32>>;

    fn mute(&self, path: &ObjectPath) -> Result<bool>;

    fn set(&self, path: &ObjectPath, value: PropertyValue) -> Result<()>;

    /// Start receiving change notifications.
    fn subscribe(&self) -> Result<Receiver<Notification>>;

    /// Human-readable name of an object, `None` if it has no name property.
    fn display_name(&self, path: &ObjectPath, kind: ObjectKind) -> Result<Option<String>> {
        let mut properties = self.property_list(path)?;
        Ok(properties.remove(kind.name_property()))
    }
}
