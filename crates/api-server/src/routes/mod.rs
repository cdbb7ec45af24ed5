//! Route handlers

pub mod auth;
pub mod bottles;
pub mod businesses;
pub mod health;
pub mod machines;
pub mod stats;
