//! Registrations and publish actions supplied by the host framework

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Opaque handle to something the host published on behalf of an entity
///
/// `release` consumes the handle, so it can run at most once.
pub trait Registration: Send {
    /// Withdraw whatever the publish action advertised
    fn release(self: Box<Self>) -> Result<()>;
}

/// Publish action: turns a tracked entity into a live registration
pub trait Publish<T>: Send + Sync {
    fn publish(&self, entity: &Arc<T>) -> Result<Box<dyn Registration>>;
}

impl<T, F> Publish<T> for F
where
    F: Fn(&Arc<T>) -> Result<Box<dyn Registration>> + Send + Sync,
{
    fn publish(&self, entity: &Arc<T>) -> Result<Box<dyn Registration>> {
        self(entity)
    }
}

/// Registration backed by a release callback
pub struct CallbackRegistration {
    on_release: Box<dyn FnOnce() -> Result<()> + Send>,
}

impl CallbackRegistration {
    pub fn new<F>(on_release: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            on_release: Box::new(on_release),
        }
    }

    /// Box the registration, ready to be returned from a publish action
    pub fn boxed<F>(on_release: F) -> Box<dyn Registration>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Box::new(Self::new(on_release))
    }
}

impl Registration for CallbackRegistration {
    fn release(self: Box<Self>) -> Result<()> {
        (self.on_release)()
    }
}

impl fmt::Debug for CallbackRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistration").finish_non_exhaustive()
    }
}
