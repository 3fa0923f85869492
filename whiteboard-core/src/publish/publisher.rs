//! Filtered publisher - tracks one registration per published entity

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::{PublisherConfig, DEFAULT_PUBLISHER_NAME};
use crate::error::Result;
use crate::filter::{Predicate, Properties};
use crate::publish::identity::EntityKey;
use crate::publish::registration::{Publish, Registration};

/// What `publish_if_matched` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    /// Publisher is closed; nothing happened
    Closed,
    /// Properties did not match; any existing registration was kept
    Filtered,
    /// Entity was published for the first time
    Published,
    /// Entity was re-published and its previous registration released
    Replaced,
}

/// Publisher statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherStats {
    /// Entities currently tracked
    pub tracked: usize,

    /// Registrations stored (first publish or replacement)
    pub published: u64,

    /// Publishes that superseded an existing registration
    pub replaced: u64,

    /// Publish requests rejected by the predicate
    pub filtered: u64,

    /// Entities removed by an explicit retract
    pub retracted: u64,

    /// Release attempts, successful or not
    pub released: u64,

    /// Release attempts that returned an error
    pub release_failures: u64,

    /// Whether the publisher has been closed
    pub closed: bool,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    replaced: AtomicU64,
    filtered: AtomicU64,
    retracted: AtomicU64,
    released: AtomicU64,
    release_failures: AtomicU64,
}

/// Publishes entities whose properties match a predicate and keeps the
/// resulting registrations until they are retracted or the publisher closes.
///
/// Entities are tracked by identity: two `Arc`s pointing at value-equal
/// entities are separate registrations.
///
/// Every registration stored here is released exactly once, by
/// [`retract`](Self::retract), by a replacing publish, or by
/// [`close`](Self::close). After close every operation is a no-op.
///
/// Collaborators (predicate, publish action, release) are never invoked
/// while the registration lock is held.
pub struct FilteredPublisher<T> {
    id: Uuid,
    name: String,
    publisher: Box<dyn Publish<T>>,
    predicate: Box<dyn Predicate>,
    closed: AtomicBool,
    registrations: Mutex<HashMap<EntityKey<T>, Box<dyn Registration>>>,
    counters: Counters,
}

impl<T> FilteredPublisher<T> {
    /// Create a publisher from a publish action and a predicate
    pub fn new<P, Q>(publisher: P, predicate: Q) -> Self
    where
        P: Publish<T> + 'static,
        Q: Predicate + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            name: DEFAULT_PUBLISHER_NAME.to_string(),
            publisher: Box::new(publisher),
            predicate: Box::new(predicate),
            closed: AtomicBool::new(false),
            registrations: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Create a publisher whose predicate is the configured property filter
    pub fn from_config<P>(config: PublisherConfig, publisher: P) -> Result<Self>
    where
        P: Publish<T> + 'static,
    {
        config.validate()?;
        let predicate = config.filter.unwrap_or_default();
        Ok(Self::new(publisher, predicate).with_name(config.name))
    }

    /// Set the name used in log events
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Publish `entity` if `properties` match, replacing any previous
    /// registration for the same entity.
    ///
    /// A non-matching update leaves an existing registration in place; only
    /// [`retract`](Self::retract) removes it.
    pub fn publish_if_matched(&self, entity: &Arc<T>, properties: &Properties) -> Result<PublishOutcome> {
        if self.is_closed() {
            trace!(publisher = %self.name, id = %self.id, "publish ignored, publisher closed");
            return Ok(PublishOutcome::Closed);
        }

        if !self.predicate.matches(properties)? {
            self.counters.filtered.fetch_add(1, Ordering::Relaxed);
            debug!(
                publisher = %self.name,
                id = %self.id,
                entity = ?Arc::as_ptr(entity),
                "properties did not match, skipping publish"
            );
            return Ok(PublishOutcome::Filtered);
        }

        let registration = self.publisher.publish(entity)?;

        // The closed check and the insert share the lock with close's drain,
        // so a registration is either drained by close or released here.
        let mut registrations = self.registrations.lock();
        if self.is_closed() {
            drop(registrations);
            debug!(
                publisher = %self.name,
                id = %self.id,
                entity = ?Arc::as_ptr(entity),
                "publisher closed during publish, releasing new registration"
            );
            self.release(registration)?;
            return Ok(PublishOutcome::Closed);
        }
        let previous = registrations.insert(EntityKey::new(entity), registration);
        drop(registrations);

        self.counters.published.fetch_add(1, Ordering::Relaxed);

        match previous {
            Some(old) => {
                self.counters.replaced.fetch_add(1, Ordering::Relaxed);
                debug!(
                    publisher = %self.name,
                    id = %self.id,
                    entity = ?Arc::as_ptr(entity),
                    "replaced registration"
                );
                self.release(old)?;
                Ok(PublishOutcome::Replaced)
            }
            None => {
                debug!(
                    publisher = %self.name,
                    id = %self.id,
                    entity = ?Arc::as_ptr(entity),
                    "published registration"
                );
                Ok(PublishOutcome::Published)
            }
        }
    }

    /// Release the registration held for `entity`, if any.
    ///
    /// Returns whether a registration was removed. The entry is untracked
    /// even when its release fails.
    pub fn retract(&self, entity: &Arc<T>) -> Result<bool> {
        if self.is_closed() {
            trace!(publisher = %self.name, id = %self.id, "retract ignored, publisher closed");
            return Ok(false);
        }

        let removed = self.registrations.lock().remove(&EntityKey::new(entity));

        match removed {
            Some(registration) => {
                self.counters.retracted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    publisher = %self.name,
                    id = %self.id,
                    entity = ?Arc::as_ptr(entity),
                    "retracted registration"
                );
                self.release(registration)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close the publisher and release every tracked registration.
    ///
    /// Only the first call does any work. All registrations are released
    /// even if some fail; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let drained = std::mem::take(&mut *self.registrations.lock());
        let count = drained.len();

        let mut first_error = None;
        let mut failures = 0usize;
        for registration in drained.into_values() {
            if let Err(err) = self.release(registration) {
                failures += 1;
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        info!(
            publisher = %self.name,
            id = %self.id,
            released = count,
            failures,
            "publisher closed"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether `entity` currently holds a registration
    pub fn contains(&self, entity: &Arc<T>) -> bool {
        self.registrations.lock().contains_key(&EntityKey::new(entity))
    }

    /// Snapshot of the tracked entities
    pub fn tracked_entities(&self) -> Vec<Arc<T>> {
        self.registrations
            .lock()
            .keys()
            .map(|key| Arc::clone(key.entity()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.lock().is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance id attached to every log event
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            tracked: self.len(),
            published: self.counters.published.load(Ordering::Relaxed),
            replaced: self.counters.replaced.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            retracted: self.counters.retracted.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            release_failures: self.counters.release_failures.load(Ordering::Relaxed),
            closed: self.is_closed(),
        }
    }

    fn release(&self, registration: Box<dyn Registration>) -> Result<()> {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        registration.release().map_err(|err| {
            self.counters.release_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                publisher = %self.name,
                id = %self.id,
                error = %err,
                "failed to release registration"
            );
            err
        })
    }
}

impl<T> Drop for FilteredPublisher<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(publisher = %self.name, id = %self.id, error = %err, "release failed while dropping publisher");
        }
    }
}

impl<T> fmt::Debug for FilteredPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredPublisher")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tracked", &self.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{to_properties, PropertyFilter};
    use crate::publish::mock::{HandleId, RecordedEvent, RecordingPublisher};
    use serde_json::json;

    fn active_filter() -> PropertyFilter {
        PropertyFilter::new().equals("active", json!(true))
    }

    #[test]
    fn test_walkthrough() {
        let recorder = RecordingPublisher::new();
        let publisher = FilteredPublisher::new(recorder.clone(), active_filter());
        let e1 = Arc::new("e1");

        let outcome = publisher
            .publish_if_matched(&e1, &to_properties(json!({"active": true})))
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Published);
        assert_eq!(recorder.published_count(), 1);
        assert!(publisher.contains(&e1));

        let outcome = publisher
            .publish_if_matched(&e1, &to_properties(json!({"active": false})))
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Filtered);
        assert_eq!(publisher.len(), 1);
        assert!(recorder.live().contains(&HandleId(1)));

        assert!(publisher.retract(&e1).unwrap());
        assert!(publisher.is_empty());
        assert!(recorder.is_released(HandleId(1)));

        publisher.close().unwrap();
        assert!(publisher.is_closed());
        assert_eq!(recorder.released_count(), 1);
    }

    #[test]
    fn test_replace_releases_after_insert() {
        let recorder = RecordingPublisher::new();
        let publisher = FilteredPublisher::new(recorder.clone(), |_: &Properties| true);
        let entity = Arc::new(7u32);

        publisher.publish_if_matched(&entity, &Properties::new()).unwrap();
        let outcome = publisher.publish_if_matched(&entity, &Properties::new()).unwrap();
        assert_eq!(outcome, PublishOutcome::Replaced);

        assert_eq!(
            recorder.events(),
            vec![
                RecordedEvent::Published(HandleId(1)),
                RecordedEvent::Published(HandleId(2)),
                RecordedEvent::Released(HandleId(1)),
            ]
        );
    }

    #[test]
    fn test_stats() {
        let recorder = RecordingPublisher::new();
        let publisher = FilteredPublisher::new(recorder, active_filter()).with_name("resources");
        let a = Arc::new(1u8);
        let b = Arc::new(2u8);

        publisher.publish_if_matched(&a, &to_properties(json!({"active": true}))).unwrap();
        publisher.publish_if_matched(&a, &to_properties(json!({"active": true}))).unwrap();
        publisher.publish_if_matched(&b, &to_properties(json!({"active": false}))).unwrap();
        publisher.retract(&a).unwrap();

        let stats = publisher.stats();
        assert_eq!(stats.tracked, 0);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.retracted, 1);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.release_failures, 0);
        assert!(!stats.closed);
        assert_eq!(publisher.name(), "resources");
    }

    #[test]
    fn test_drop_closes() {
        let recorder = RecordingPublisher::new();
        {
            let publisher = FilteredPublisher::new(recorder.clone(), |_: &Properties| true);
            publisher.publish_if_matched(&Arc::new(()), &Properties::new()).unwrap();
            publisher.publish_if_matched(&Arc::new(()), &Properties::new()).unwrap();
            assert_eq!(recorder.live().len(), 2);
        }
        assert!(recorder.live().is_empty());
        assert_eq!(recorder.released_count(), 2);
    }
}
