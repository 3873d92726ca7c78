//! Name-indexed cache of live audio objects.
//!
//! Readers get immutable snapshots via `ArcSwap`; a full refresh enumerates
//! without holding any lock and only takes the swap lock to publish.

use crate::endpoint::{EndpointCategory, ObjectPath};
use crate::error::Result;
use crate::server::AudioServer;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type NameMap = BTreeMap<String, Vec<ObjectPath>>;

/// Point-in-time view of every category's name mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSnapshot {
    by_category: [NameMap; 4],
}

impl EndpointSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate every category on `server` into a fresh snapshot.
    ///
    /// Objects whose properties cannot be read are skipped and counted.
    pub fn enumerate(server: &dyn AudioServer) -> Result<(Self, RefreshStats)> {
        let mut snapshot = Self::new();
        let mut stats = RefreshStats::default();

        for category in EndpointCategory::ALL {
            let paths = server.list_endpoints(category)?;
            for path in paths {
                match server.display_name(&path, category.object_kind()) {
                    Ok(Some(name)) => {
                        snapshot.insert(category, name, path);
                        stats.indexed += 1;
                    }
                    Ok(None) => stats.unnamed += 1,
                    Err(e) => {
                        warn!("Skipping {} {}: {}", category, path, e);
                        stats.failed += 1;
                    }
                }
            }
        }

        Ok((snapshot, stats))
    }

    /// References known under `name`, in enumeration order.
    pub fn lookup(&self, category: EndpointCategory, name: &str) -> &[ObjectPath] {
        self.by_category[category.index()]
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, category: EndpointCategory, name: &str) -> bool {
        !self.lookup(category, name).is_empty()
    }

    pub fn names(&self, category: EndpointCategory) -> impl Iterator<Item = &str> {
        self.by_category[category.index()].keys().map(String::as_str)
    }

    /// Names present in any category.
    pub fn all_names(&self) -> BTreeSet<&str> {
        EndpointCategory::ALL
            .into_iter()
            .flat_map(move |category| self.names(category))
            .collect()
    }

    /// Name a reference is filed under, if any.
    pub fn name_of(&self, category: EndpointCategory, path: &ObjectPath) -> Option<&str> {
        self.by_category[category.index()]
            .iter()
            .find(|(_, paths)| paths.contains(path))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_category
            .iter()
            .flat_map(|map| map.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, category: EndpointCategory, name: String, path: ObjectPath) {
        let paths = self.by_category[category.index()].entry(name).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    fn remove(&mut self, category: EndpointCategory, path: &ObjectPath) -> Option<Removal> {
        let name = self.name_of(category, path)?.to_string();
        let map = &mut self.by_category[category.index()];
        let paths = map.get_mut(&name)?;
        paths.retain(|p| p != path);
        let was_last = paths.is_empty();
        if was_last {
            map.remove(&name);
        }
        Some(Removal { name, was_last })
    }
}

/// Counters from one full refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Objects filed under a name.
    pub indexed: usize,
    /// Objects without a name property.
    pub unnamed: usize,
    /// Objects whose properties could not be read.
    pub failed: usize,
    /// A newer refresh was published first; this result was discarded.
    pub superseded: bool,
}

/// Result of removing a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub name: String,
    /// No references remain under `name` in that category.
    pub was_last: bool,
}

/// Shared, atomically replaced endpoint index.
pub struct EndpointIndex {
    current: ArcSwap<EndpointSnapshot>,
    /// Ticket handed to each refresh when it starts.
    next_generation: AtomicU64,
    /// Generation of the last published refresh. Held while publishing.
    published: Mutex<u64>,
}

impl EndpointIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(EndpointSnapshot::new()),
            next_generation: AtomicU64::new(0),
            published: Mutex::new(0),
        }
    }

    /// Current snapshot. Stays consistent however long it is held.
    pub fn snapshot(&self) -> Arc<EndpointSnapshot> {
        self.current.load_full()
    }

    /// References under `name`, cloned out of the current snapshot.
    pub fn lookup(&self, category: EndpointCategory, name: &str) -> Vec<ObjectPath> {
        self.current.load().lookup(category, name).to_vec()
    }

    /// Rebuild from a live enumeration and publish it.
    ///
    /// On enumeration failure the previous snapshot stays. A refresh that
    /// finishes after a newer one has been published is discarded.
    pub fn refresh(&self, server: &dyn AudioServer) -> Result<RefreshStats> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (snapshot, mut stats) = EndpointSnapshot::enumerate(server)?;

        let mut published = self.published.lock();
        if generation < *published {
            debug!(
                "Discarding refresh {} (refresh {} already published)",
                generation, *published
            );
            stats.superseded = true;
            return Ok(stats);
        }
        *published = generation;
        self.current.store(Arc::new(snapshot));
        debug!(
            "Published endpoint index {}: {} indexed, {} unnamed, {} failed",
            generation, stats.indexed, stats.unnamed, stats.failed
        );
        Ok(stats)
    }

    /// File one new reference without a full refresh.
    pub fn insert(&self, category: EndpointCategory, name: impl Into<String>, path: ObjectPath) {
        let _published = self.published.lock();
        let mut next = EndpointSnapshot::clone(&self.current.load());
        next.insert(category, name.into(), path);
        self.current.store(Arc::new(next));
    }

    /// Drop one reference without a full refresh.
    ///
    /// `None` if the reference was not indexed.
    pub fn remove(&self, category: EndpointCategory, path: &ObjectPath) -> Option<Removal> {
        let _published = self.published.lock();
        let mut next = EndpointSnapshot::clone(&self.current.load());
        let removal = next.remove(category, path)?;
        self.current.store(Arc::new(next));
        Some(removal)
    }
}

impl Default for EndpointIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EndpointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointIndex")
            .field("endpoints", &self.current.load().len())
            .field("published", &*self.published.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryServer;

    #[test]
    fn test_refresh_groups_by_name() {
        let server = MemoryServer::new();
        let first = server.add_playback_stream("Firefox");
        let second = server.add_playback_stream("Firefox");
        let sink = server.add_sink("Speakers");

        let index = EndpointIndex::new();
        let stats = index.refresh(&server).unwrap();
        assert_eq!(stats.indexed, 3);
        assert!(!stats.superseded);

        assert_eq!(
            index.lookup(EndpointCategory::PlaybackStream, "Firefox"),
            vec![first, second]
        );
        assert_eq!(
            index.lookup(EndpointCategory::PhysicalSink, "Speakers"),
            vec![sink]
        );
        // Names are per category.
        assert!(index
            .lookup(EndpointCategory::RecordStream, "Firefox")
            .is_empty());
    }

    #[test]
    fn test_unnamed_objects_not_indexed() {
        let server = MemoryServer::new();
        server.add_endpoint(EndpointCategory::PlaybackStream, Default::default(), 2);

        let index = EndpointIndex::new();
        let stats = index.refresh(&server).unwrap();
        assert_eq!(stats.unnamed, 1);
        assert!(index.snapshot().is_empty());
    }

    #[test]
    fn test_property_failure_skips_one_object() {
        let server = MemoryServer::new();
        let broken = server.add_playback_stream("spotify");
        server.add_playback_stream("Firefox");
        server.fail_properties(&broken);

        let index = EndpointIndex::new();
        let stats = index.refresh(&server).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.indexed, 1);
        assert!(index
            .snapshot()
            .contains(EndpointCategory::PlaybackStream, "Firefox"));
    }

    #[test]
    fn test_enumeration_failure_keeps_stale_index() {
        let server = MemoryServer::new();
        server.add_sink("Speakers");
        let index = EndpointIndex::new();
        index.refresh(&server).unwrap();

        server.add_sink("Headphones");
        server.fail_enumeration(true);
        assert!(index.refresh(&server).is_err());

        let snapshot = index.snapshot();
        assert!(snapshot.contains(EndpointCategory::PhysicalSink, "Speakers"));
        assert!(!snapshot.contains(EndpointCategory::PhysicalSink, "Headphones"));
    }

    #[test]
    fn test_remove_reports_last_reference() {
        let index = EndpointIndex::new();
        let a = ObjectPath::new("/stream/a");
        let b = ObjectPath::new("/stream/b");
        index.insert(EndpointCategory::PlaybackStream, "Firefox", a.clone());
        index.insert(EndpointCategory::PlaybackStream, "Firefox", b.clone());

        assert_eq!(
            index.snapshot().name_of(EndpointCategory::PlaybackStream, &b),
            Some("Firefox")
        );
        assert_eq!(index.snapshot().name_of(EndpointCategory::RecordStream, &b), None);

        let removal = index.remove(EndpointCategory::PlaybackStream, &a).unwrap();
        assert_eq!(removal.name, "Firefox");
        assert!(!removal.was_last);

        let removal = index.remove(EndpointCategory::PlaybackStream, &b).unwrap();
        assert!(removal.was_last);
        assert!(index.remove(EndpointCategory::PlaybackStream, &b).is_none());
        assert!(index.snapshot().is_empty());
    }

    #[test]
    fn test_insert_is_idempotent_per_path() {
        let index = EndpointIndex::new();
        let path = ObjectPath::new("/sink/0");
        index.insert(EndpointCategory::PhysicalSink, "Speakers", path.clone());
        index.insert(EndpointCategory::PhysicalSink, "Speakers", path.clone());
        assert_eq!(
            index.lookup(EndpointCategory::PhysicalSink, "Speakers"),
            vec![path]
        );
    }

    #[test]
    fn test_held_snapshot_unaffected_by_refresh() {
        let server = MemoryServer::new();
        server.add_sink("Speakers");
        let index = EndpointIndex::new();
        index.refresh(&server).unwrap();

        let before = index.snapshot();
        server.add_source("Microphone");
        index.refresh(&server).unwrap();

        assert!(!before.contains(EndpointCategory::PhysicalSource, "Microphone"));
        assert!(index
            .snapshot()
            .contains(EndpointCategory::PhysicalSource, "Microphone"));
    }

    #[test]
    fn test_all_names_spans_categories() {
        let server = MemoryServer::new();
        server.add_sink("Speakers");
        server.add_record_stream("Firefox");
        server.add_playback_stream("Firefox");

        let index = EndpointIndex::new();
        index.refresh(&server).unwrap();
        let snapshot = index.snapshot();
        let names: Vec<&str> = snapshot.all_names().into_iter().collect();
        assert_eq!(names, vec!["Firefox", "Speakers"]);

        let sinks: Vec<&str> = snapshot.names(EndpointCategory::PhysicalSink).collect();
        assert_eq!(sinks, vec!["Speakers"]);
        assert_eq!(snapshot.names(EndpointCategory::PhysicalSource).count(), 0);
    }
}
