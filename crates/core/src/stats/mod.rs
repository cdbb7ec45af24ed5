//! Statistics rollups over bottle events
//!
//! Aggregates are computed by a fresh read on every call; nothing here is
//! cached. Missing aggregates surface as 0 / 0.0, never as null or absence.

mod engine;
mod model;

pub use engine::StatsEngine;
pub use model::{
    BottleTotals, BusinessDayTotals, BusinessMachineCount, BusinessStats, DayBucket,
    FleetDayBucket, FleetSummary, MachineDayTotals,
};
