//! Aggregated statistics shapes

use chrono::NaiveDate;
use serde::Serialize;

/// Flat sums across a set of bottle events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleTotals {
    pub total_count: i64,
    pub total_weight: f64,
}

impl BottleTotals {
    pub fn zero() -> Self {
        Self {
            total_count: 0,
            total_weight: 0.0,
        }
    }
}

/// Headline numbers for one business
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStats {
    pub business_id: i64,
    pub business_name: String,
    pub total_machines: i64,
    pub total_bottle_count: i64,
    pub total_bottle_weight: f64,
}

/// Per-machine totals inside one day bucket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDayTotals {
    pub machine_id: i64,
    pub machine_name: String,
    pub total_bottles: i64,
    pub total_weight: f64,
}

/// One calendar date with the per-machine totals of a single business.
///
/// Buckets are emitted most-recent-first; machines are id-ordered and a
/// machine with no events that date is present with zero totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    pub machines: Vec<MachineDayTotals>,
}

/// One business's machine totals inside a fleet-wide day bucket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDayTotals {
    pub business_id: i64,
    pub business_name: String,
    pub machines: Vec<MachineDayTotals>,
}

/// One calendar date across every business (admin view)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetDayBucket {
    pub date: NaiveDate,
    pub businesses: Vec<BusinessDayTotals>,
}

/// Machine count for one business
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMachineCount {
    pub business_id: i64,
    pub business_name: String,
    pub machine_count: i64,
}

/// Fleet-wide dashboard counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total_businesses: i64,
    pub total_machines: i64,
    pub machines_per_business: Vec<BusinessMachineCount>,
}
