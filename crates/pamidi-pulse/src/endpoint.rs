//! Endpoint categories and object references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// String properties attached to an audio object.
pub type PropertyList = BTreeMap<String, String>;

/// Property holding a device's display name.
pub const DEVICE_NAME_PROPERTY: &str = "device.description";

/// Property holding a stream's display name.
pub const STREAM_NAME_PROPERTY: &str = "application.name";

/// Full-scale volume (100%).
pub const VOLUME_NORM: u32 = 65535;

/// The four kinds of endpoint a binding can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    /// Physical output device.
    #[serde(alias = "sink")]
    PhysicalSink,
    /// Physical input device.
    #[serde(alias = "source")]
    PhysicalSource,
    /// Per-application stream playing to a sink.
    PlaybackStream,
    /// Per-application stream recording from a source.
    RecordStream,
}

impl EndpointCategory {
    pub const ALL: [EndpointCategory; 4] = [
        EndpointCategory::PlaybackStream,
        EndpointCategory::RecordStream,
        EndpointCategory::PhysicalSink,
        EndpointCategory::PhysicalSource,
    ];

    /// Dense index, for per-category arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            EndpointCategory::PhysicalSink => 0,
            EndpointCategory::PhysicalSource => 1,
            EndpointCategory::PlaybackStream => 2,
            EndpointCategory::RecordStream => 3,
        }
    }

    #[inline]
    pub const fn object_kind(self) -> ObjectKind {
        match self {
            EndpointCategory::PhysicalSink | EndpointCategory::PhysicalSource => ObjectKind::Device,
            EndpointCategory::PlaybackStream | EndpointCategory::RecordStream => ObjectKind::Stream,
        }
    }

    /// Property that holds the display name for objects of this category.
    #[inline]
    pub const fn name_property(self) -> &'static str {
        self.object_kind().name_property()
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointCategory::PhysicalSink => "sink",
            EndpointCategory::PhysicalSource => "source",
            EndpointCategory::PlaybackStream => "playback stream",
            EndpointCategory::RecordStream => "record stream",
        })
    }
}

/// Devices and streams expose different object interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Device,
    Stream,
}

impl ObjectKind {
    #[inline]
    pub const fn name_property(self) -> &'static str {
        match self {
            ObjectKind::Device => DEVICE_NAME_PROPERTY,
            ObjectKind::Stream => STREAM_NAME_PROPERTY,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Device => f.write_str("device"),
            ObjectKind::Stream => f.write_str("stream"),
        }
    }
}

/// Opaque reference to one live audio object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ObjectPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_indices_are_dense() {
        let mut seen = [false; 4];
        for category in EndpointCategory::ALL {
            seen[category.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_name_property_by_kind() {
        assert_eq!(
            EndpointCategory::PhysicalSink.name_property(),
            "device.description"
        );
        assert_eq!(
            EndpointCategory::RecordStream.name_property(),
            "application.name"
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(EndpointCategory::PhysicalSource.to_string(), "source");
        assert_eq!(
            EndpointCategory::PlaybackStream.to_string(),
            "playback stream"
        );
    }
}
