//! Effizienz Praxis Calendar Core Library
//!
//! Calendar events of a practice, expansion of recurring events into virtual
//! instances, date queries over the expanded list, and access to the remote
//! event store.

pub mod cache;
pub mod config;
pub mod error;
pub mod ics;
pub mod import;
pub mod query;
pub mod recurrence;
pub mod service;
pub mod store;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        cache::{CacheBackend, CacheManager, MemoryCache},
        config::StoreConfig,
        ics::IcsGenerator,
        query::{EventFilter, SortOrder, instances_on_date, upcoming, upcoming_from},
        recurrence::{DateWindow, canonical_id, expand},
        service::CalendarService,
        store::{EventStore, HttpEventStore, MemoryEventStore},
        types::*,
    };
}
