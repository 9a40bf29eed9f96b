//! # forge-core
//!
//! Core types, traits, and abstractions for the forge planner.
//!
//! This crate provides the data model (goals, deliverables, calendar events,
//! info tags, provider API keys), the repository traits the database layer
//! implements, and the small pieces of domain logic shared by every other
//! crate: input validation and placeholder schedule planning.

pub mod datetime;
pub mod error;
pub mod models;
pub mod schedule;
pub mod traits;
pub mod uuid_utils;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use schedule::{plan_placeholder_slots, SlotAssignment, SlotRequest};
pub use traits::*;
pub use uuid_utils::new_v7;
