//! Audio server side of pamidi.
//!
//! Endpoint model, the [`AudioServer`] client interface, the atomically
//! swapped [`EndpointIndex`], and an in-memory server.

pub mod error;
pub use error::{Error, Result};

pub mod endpoint;
pub use endpoint::{
    EndpointCategory, ObjectKind, ObjectPath, PropertyList, DEVICE_NAME_PROPERTY,
    STREAM_NAME_PROPERTY, VOLUME_NORM,
};

mod server;
pub use server::{AudioServer, Notification, PropertyValue};

pub mod index;
pub use index::{EndpointIndex, EndpointSnapshot, RefreshStats, Removal};

pub mod memory;
pub use memory::{MemoryServer, RecordedWrite};
