//! Business records (tenant accounts that own machines)

mod model;
mod store;

pub use model::Business;
pub use store::BusinessStore;
