//! # campus-shared
//!
//! Domain types shared by the live hub and the server: presence records,
//! chat messages, announcements, system statistics, the event vocabulary
//! and the error taxonomy.

pub mod constants;
pub mod error;
pub mod events;
pub mod models;

pub use error::{HubError, Result};
pub use events::{EventKind, HubEvent};
pub use models::*;
