//! Bottle-deposit events logged by machines (append-only)

mod model;
mod store;

pub use model::{deposit_now, deposit_zone, BottleEvent, NewBottleEvent};
pub use store::BottleStore;
