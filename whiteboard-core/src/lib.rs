//! # Whiteboard Core - filtered publication tracking
//!
//! A whiteboard registry announces entities (services, resources,
//! extensions) together with a property set. A [`FilteredPublisher`] decides
//! from those properties whether an entity should be published, keeps the
//! resulting [`Registration`] per entity, and releases it when the entity is
//! retracted, re-published, or the publisher is closed.
//!
//! ## Core Rules
//!
//! - Entities are tracked by identity (`Arc` pointer), never by value.
//! - A non-matching update does not retract an existing registration.
//! - Every stored registration is released exactly once.
//! - `close` runs once; afterwards publish and retract are no-ops.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use whiteboard_core::{FilteredPublisher, PropertyFilter, PublishOutcome};
//! use whiteboard_core::filter::to_properties;
//! use whiteboard_core::publish::mock::RecordingPublisher;
//!
//! let recorder = RecordingPublisher::new();
//! let publisher = FilteredPublisher::new(
//!     recorder.clone(),
//!     PropertyFilter::new().equals("active", json!(true)),
//! );
//!
//! let resource = Arc::new("users-resource");
//! let outcome = publisher
//!     .publish_if_matched(&resource, &to_properties(json!({"active": true})))
//!     .unwrap();
//! assert_eq!(outcome, PublishOutcome::Published);
//!
//! publisher.retract(&resource).unwrap();
//! publisher.close().unwrap();
//! assert_eq!(recorder.released_count(), 1);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod publish;

pub use config::PublisherConfig;
pub use error::{ErrorCategory, Result, WhiteboardError};
pub use filter::{Predicate, Properties, PropertyFilter};
pub use publish::{
    CallbackRegistration, FilteredPublisher, Publish, PublishOutcome, PublisherStats, Registration,
};
