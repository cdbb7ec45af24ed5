//! Core library for the Revend backend
//!
//! This crate contains the domain models and business logic, including:
//! - Business, machine and bottle-event record stores
//! - The statistics engine (flat, per-business and day-wise rollups)

pub mod bottle;
pub mod business;
pub mod error;
pub mod machine;
pub mod stats;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
