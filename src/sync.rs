//! Topology synchronizer: keeps the endpoint index and LEDs in step with
//! audio server notifications.
//!
//! Every appearance or removal ends in a full refresh. Incremental index
//! updates only bridge the gap until that refresh is published.

use crate::led::LedFeedback;
use crossbeam_channel::{select, Receiver};
use pamidi_pulse::{
    AudioServer, EndpointCategory, EndpointIndex, Notification, ObjectKind, ObjectPath,
    RefreshStats,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct TopologySynchronizer {
    server: Arc<dyn AudioServer>,
    index: Arc<EndpointIndex>,
    leds: Arc<LedFeedback>,
}

impl TopologySynchronizer {
    pub fn new(
        server: Arc<dyn AudioServer>,
        index: Arc<EndpointIndex>,
        leds: Arc<LedFeedback>,
    ) -> Self {
        Self {
            server,
            index,
            leds,
        }
    }

    pub fn handle(&self, notification: &Notification) {
        match notification {
            Notification::EndpointAppeared { category, path } => {
                self.endpoint_appeared(*category, path)
            }
            Notification::EndpointRemoved { category, path } => {
                self.endpoint_removed(*category, path)
            }
            Notification::MuteChanged { kind, path, muted } => {
                self.mute_changed(*kind, path, *muted)
            }
            Notification::VolumeChanged { kind, path, volume } => {
                info!("{} volume updated: {} {:?}", kind, path, volume);
            }
        }
    }

    fn endpoint_appeared(&self, category: EndpointCategory, path: &ObjectPath) {
        match self.server.display_name(path, category.object_kind()) {
            Ok(Some(name)) => {
                info!("{} {} appeared", category, name);
                self.leds.set_activity(&name, true);
                self.index.insert(category, name, path.clone());
            }
            Ok(None) => debug!("{} {} appeared without a name", category, path),
            Err(e) => warn!("Could not read properties of new {} {}: {}", category, path, e),
        }
        self.refresh();
    }

    fn endpoint_removed(&self, category: EndpointCategory, path: &ObjectPath) {
        match self.index.remove(category, path) {
            Some(removal) => {
                info!("{} {} removed", category, removal.name);
                if removal.was_last {
                    self.leds.set_activity(&removal.name, false);
                    self.leds.set_mute(&removal.name, false);
                }
            }
            None => debug!("Removed {} {} was not indexed", category, path),
        }
        self.refresh();
    }

    fn mute_changed(&self, kind: ObjectKind, path: &ObjectPath, muted: bool) {
        match self.server.display_name(path, kind) {
            Ok(Some(name)) => {
                info!("{} {} mute updated: {}", kind, name, muted);
                self.leds.set_mute(&name, muted);
            }
            Ok(None) => debug!("{} {} mute updated without a name", kind, path),
            Err(e) => warn!("Could not read properties of {} {}: {}", kind, path, e),
        }
    }

    /// Full refresh. Failures are logged and the previous index stays.
    pub fn refresh(&self) -> Option<RefreshStats> {
        match self.index.refresh(self.server.as_ref()) {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Endpoint refresh failed: {}", e);
                None
            }
        }
    }

    /// Notification loop. Returns when the stream ends or `shutdown` fires.
    pub fn run(&self, notifications: &Receiver<Notification>, shutdown: &Receiver<()>) {
        loop {
            select! {
                recv(notifications) -> notification => match notification {
                    Ok(notification) => self.handle(&notification),
                    Err(_) => {
                        info!("Audio server notification stream closed");
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    debug!("Topology synchronizer shutting down");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for TopologySynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologySynchronizer")
            .field("index", &self.index)
            .field("leds", &self.leds)
            .finish()
    }
}
