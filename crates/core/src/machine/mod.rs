//! Machine records (physical installs belonging to a business)

mod model;
mod store;

pub use model::{Machine, MachineSpec};
pub use store::MachineStore;
