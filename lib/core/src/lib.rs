//! Core types shared by the roadfleet crates.
//!
//! Provides the rootcause-backed `Result` alias and the strongly-typed
//! identifiers the backend assigns to users and companies.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{CompanyId, ParseIdError, UserId};
