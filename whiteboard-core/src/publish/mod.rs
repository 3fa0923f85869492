//! Publication tracking
//!
//! ## Architecture
//!
//! ```text
//!   owning registry                      host framework
//!  (announce / withdraw)               (publish / release)
//!          │                                   ▲
//!          ▼                                   │
//!    ┌──────────────────────────────────────────────┐
//!    │            FilteredPublisher<T>              │
//!    │                                              │
//!    │  1. Evaluate predicate against properties    │
//!    │  2. Publish matching entity → Registration   │
//!    │  3. Replace + release previous registration  │
//!    │  4. Retract → release                        │
//!    │  5. Close once → release everything          │
//!    └──────────────────────────────────────────────┘
//! ```

mod identity;
mod publisher;
mod registration;
pub mod mock;

pub use identity::EntityKey;
pub use publisher::{FilteredPublisher, PublishOutcome, PublisherStats};
pub use registration::{CallbackRegistration, Publish, Registration};
