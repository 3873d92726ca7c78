//! In-memory audio server.
//!
//! Models sinks, sources, and streams with the same property layout a real
//! server reports. Every write is recorded, and changes are announced to
//! subscribers the way a live server announces them. Used as a dry-run
//! backend and as the test double for the bridge.

use crate::endpoint::{EndpointCategory, ObjectKind, ObjectPath, PropertyList, VOLUME_NORM};
use crate::error::{Error, Result};
use crate::server::{AudioServer, Notification, PropertyValue};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tracing::debug;

const OBJECT_PATH_PREFIX: &str = "/org/pulseaudio/core1";

/// One recorded `set` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub path: ObjectPath,
    pub value: PropertyValue,
}

#[derive(Debug)]
struct MemoryObject {
    category: EndpointCategory,
    path: ObjectPath,
    properties: PropertyList,
    channels: Vec<u32>,
    volume: Vec<u32>,
    muted: bool,
}

#[derive(Default)]
struct MemoryState {
    /// Creation order.
    objects: Vec<MemoryObject>,
    next_id: [u32; 4],
    writes: Vec<RecordedWrite>,
    subscribers: Vec<Sender<Notification>>,
    failing_properties: BTreeSet<ObjectPath>,
    failing_channels: BTreeSet<ObjectPath>,
    failing_writes: BTreeSet<ObjectPath>,
    failing_enumeration: bool,
}

impl MemoryState {
    fn object(&self, path: &ObjectPath) -> Result<&MemoryObject> {
        self.objects
            .iter()
            .find(|object| &object.path == path)
            .ok_or_else(|| Error::ObjectNotFound(path.to_string()))
    }

    fn object_mut(&mut self, path: &ObjectPath) -> Result<&mut MemoryObject> {
        self.objects
            .iter_mut()
            .find(|object| &object.path == path)
            .ok_or_else(|| Error::ObjectNotFound(path.to_string()))
    }

    fn notify(&mut self, notification: Notification) {
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }
}

/// Audio server held entirely in memory.
#[derive(Default)]
pub struct MemoryServer {
    state: Mutex<MemoryState>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stereo sink with `description` as its display name.
    pub fn add_sink(&self, description: &str) -> ObjectPath {
        self.add_named(EndpointCategory::PhysicalSink, description, 2)
    }

    /// Mono source with `description` as its display name.
    pub fn add_source(&self, description: &str) -> ObjectPath {
        self.add_named(EndpointCategory::PhysicalSource, description, 1)
    }

    /// Stereo playback stream owned by `application`.
    pub fn add_playback_stream(&self, application: &str) -> ObjectPath {
        self.add_named(EndpointCategory::PlaybackStream, application, 2)
    }

    /// Mono record stream owned by `application`.
    pub fn add_record_stream(&self, application: &str) -> ObjectPath {
        self.add_named(EndpointCategory::RecordStream, application, 1)
    }

    fn add_named(&self, category: EndpointCategory, name: &str, channels: usize) -> ObjectPath {
        let mut properties = PropertyList::new();
        properties.insert(category.name_property().to_string(), name.to_string());
        self.add_endpoint(category, properties, channels)
    }

    /// Create an object with arbitrary properties and announce it.
    pub fn add_endpoint(
        &self,
        category: EndpointCategory,
        properties: PropertyList,
        channel_count: usize,
    ) -> ObjectPath {
        let mut state = self.state.lock();
        let id = state.next_id[category.index()];
        state.next_id[category.index()] += 1;

        let path = ObjectPath::new(format!(
            "{}/{}{}",
            OBJECT_PATH_PREFIX,
            path_segment(category),
            id
        ));
        state.objects.push(MemoryObject {
            category,
            path: path.clone(),
            properties,
            channels: (0..channel_count as u32).collect(),
            volume: vec![VOLUME_NORM; channel_count],
            muted: false,
        });
        debug!("Memory server added {} {}", category, path);
        state.notify(Notification::EndpointAppeared {
            category,
            path: path.clone(),
        });
        path
    }

    /// Remove an object and announce it. Returns `false` if it did not exist.
    pub fn remove(&self, path: &ObjectPath) -> bool {
        let mut state = self.state.lock();
        let Some(position) = state.objects.iter().position(|object| &object.path == path) else {
            return false;
        };
        let object = state.objects.remove(position);
        debug!("Memory server removed {} {}", object.category, path);
        state.notify(Notification::EndpointRemoved {
            category: object.category,
            path: object.path,
        });
        true
    }

    /// Change mute as another client would, without recording a write.
    pub fn set_external_mute(&self, path: &ObjectPath, muted: bool) -> Result<()> {
        let mut state = self.state.lock();
        let object = state.object_mut(path)?;
        object.muted = muted;
        let kind = object.category.object_kind();
        state.notify(Notification::MuteChanged {
            kind,
            path: path.clone(),
            muted,
        });
        Ok(())
    }

    /// Current mute state, bypassing failure injection.
    pub fn mute_of(&self, path: &ObjectPath) -> Option<bool> {
        self.state.lock().object(path).ok().map(|object| object.muted)
    }

    /// Current volume, bypassing failure injection.
    pub fn volume_of(&self, path: &ObjectPath) -> Option<Vec<u32>> {
        self.state
            .lock()
            .object(path)
            .ok()
            .map(|object| object.volume.clone())
    }

    /// Every successful `set` call so far, in order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Make property reads on `path` fail.
    pub fn fail_properties(&self, path: &ObjectPath) {
        self.state.lock().failing_properties.insert(path.clone());
    }

    /// Make channel reads on `path` fail.
    pub fn fail_channels(&self, path: &ObjectPath) {
        self.state.lock().failing_channels.insert(path.clone());
    }

    /// Make writes to `path` fail.
    pub fn fail_writes(&self, path: &ObjectPath) {
        self.state.lock().failing_writes.insert(path.clone());
    }

    /// Make every `list_endpoints` call fail.
    pub fn fail_enumeration(&self, failing: bool) {
        self.state.lock().failing_enumeration = failing;
    }
}

fn path_segment(category: EndpointCategory) -> &'static str {
    match category {
        EndpointCategory::PhysicalSink => "sink",
        EndpointCategory::PhysicalSource => "source",
        EndpointCategory::PlaybackStream => "playback_stream",
        EndpointCategory::RecordStream => "record_stream",
    }
}

impl AudioServer for MemoryServer {
    fn list_endpoints(&self, category: EndpointCategory) -> Result<Vec<ObjectPath>> {
        let state = self.state.lock();
        if state.failing_enumeration {
            return Err(Error::Enumeration(category.to_string()));
        }
        Ok(state
            .objects
            .iter()
            .filter(|object| object.category == category)
            .map(|object| object.path.clone())
            .collect())
    }

    fn property_list(&self, path: &ObjectPath) -> Result<PropertyList> {
        let state = self.state.lock();
        if state.failing_properties.contains(path) {
            return Err(Error::property(path, "PropertyList unavailable"));
        }
        Ok(state.object(path)?.properties.clone())
    }

    fn channels(&self, path: &ObjectPath) -> Result<Vec<u32>> {
        let state = self.state.lock();
        if state.failing_channels.contains(path) {
            return Err(Error::property(path, "Channels unavailable"));
        }
        Ok(state.object(path)?.channels.clone())
    }

    fn volume(&self, path: &ObjectPath) -> Result<Vec<u32>> {
        Ok(self.state.lock().object(path)?.volume.clone())
    }

    fn mute(&self, path: &ObjectPath) -> Result<bool> {
        Ok(self.state.lock().object(path)?.muted)
    }

    fn set(&self, path: &ObjectPath, value: PropertyValue) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing_writes.contains(path) {
            return Err(Error::property(path, "write rejected"));
        }
        let object = state.object_mut(path)?;
        let kind = object.category.object_kind();
        let notification = match &value {
            PropertyValue::Volume(volume) => {
                if volume.len() != object.channels.len() {
                    return Err(Error::property(
                        path,
                        format!(
                            "expected {} volume values, got {}",
                            object.channels.len(),
                            volume.len()
                        ),
                    ));
                }
                object.volume = volume.clone();
                Notification::VolumeChanged {
                    kind,
                    path: path.clone(),
                    volume: volume.clone(),
                }
            }
            PropertyValue::Mute(muted) => {
                object.muted = *muted;
                Notification::MuteChanged {
                    kind,
                    path: path.clone(),
                    muted: *muted,
                }
            }
        };
        state.writes.push(RecordedWrite {
            path: path.clone(),
            value,
        });
        state.notify(notification);
        Ok(())
    }

    fn subscribe(&self) -> Result<Receiver<Notification>> {
        let (sender, receiver) = unbounded();
        self.state.lock().subscribers.push(sender);
        Ok(receiver)
    }
}

impl std::fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryServer")
            .field("objects", &state.objects.len())
            .field("writes", &state.writes.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}
