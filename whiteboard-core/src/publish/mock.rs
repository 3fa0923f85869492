//! Recording publish action for tests
//!
//! Hands out numbered registrations and logs every publish and release, so
//! tests can check that each registration was released exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, WhiteboardError};
use crate::publish::registration::{Publish, Registration};

/// Sequential id of a registration handed out by [`RecordingPublisher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

/// Recorded publish or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedEvent {
    Published(HandleId),
    Released(HandleId),
}

#[derive(Default)]
struct Shared {
    next_id: AtomicU64,
    events: Mutex<Vec<RecordedEvent>>,
    fail_next_publish: AtomicBool,
    failing_releases: Mutex<HashSet<HandleId>>,
}

/// Publish action that records what it did
///
/// Clones share the same log, so a test can keep one clone and hand the
/// other to a publisher.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    shared: Arc<Shared>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next publish fail with `PublishFailed`
    pub fn fail_next_publish(&self) {
        self.shared.fail_next_publish.store(true, Ordering::SeqCst);
    }

    /// Make the release of `id` fail with `ReleaseFailed`
    pub fn fail_release(&self, id: HandleId) {
        self.shared.failing_releases.lock().insert(id);
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.shared.events.lock().clone()
    }

    pub fn published_count(&self) -> usize {
        self.count(|e| matches!(e, RecordedEvent::Published(_)))
    }

    pub fn released_count(&self) -> usize {
        self.count(|e| matches!(e, RecordedEvent::Released(_)))
    }

    /// Number of release attempts recorded for `id`
    pub fn release_count_of(&self, id: HandleId) -> usize {
        self.count(|e| *e == RecordedEvent::Released(id))
    }

    pub fn is_released(&self, id: HandleId) -> bool {
        self.release_count_of(id) > 0
    }

    /// Registrations published and not yet released, in publish order
    pub fn live(&self) -> Vec<HandleId> {
        let events = self.shared.events.lock();
        let released: HashSet<HandleId> = events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Released(id) => Some(*id),
                RecordedEvent::Published(_) => None,
            })
            .collect();

        events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Published(id) if !released.contains(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn count(&self, f: impl Fn(&RecordedEvent) -> bool) -> usize {
        self.shared.events.lock().iter().filter(|e| f(e)).count()
    }
}

impl<T> Publish<T> for RecordingPublisher {
    fn publish(&self, _entity: &Arc<T>) -> Result<Box<dyn Registration>> {
        if self.shared.fail_next_publish.swap(false, Ordering::SeqCst) {
            return Err(WhiteboardError::PublishFailed {
                reason: "injected publish failure".to_string(),
            });
        }

        let id = HandleId(self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.shared.events.lock().push(RecordedEvent::Published(id));

        Ok(Box::new(RecordedRegistration {
            id,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct RecordedRegistration {
    id: HandleId,
    shared: Arc<Shared>,
}

impl Registration for RecordedRegistration {
    fn release(self: Box<Self>) -> Result<()> {
        self.shared.events.lock().push(RecordedEvent::Released(self.id));

        if self.shared.failing_releases.lock().contains(&self.id) {
            return Err(WhiteboardError::ReleaseFailed {
                reason: format!("injected release failure for handle {}", self.id.0),
            });
        }
        Ok(())
    }
}
