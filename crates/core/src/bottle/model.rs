//! Bottle-event model definitions

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Offset of the wall clock used when stamping deposit events (+05:30).
///
/// Events carry this offset in `created_at`, while day-wise rollups bucket
/// by the UTC date of the same instant. The two zones intentionally differ;
/// callers relying on bucket boundaries must not normalize either side.
const DEPOSIT_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

pub fn deposit_zone() -> FixedOffset {
    FixedOffset::east_opt(DEPOSIT_OFFSET_SECONDS).unwrap()
}

/// Current time on the deposit wall clock
pub fn deposit_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&deposit_zone())
}

/// One deposit logged by a machine: how many bottles and their total weight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleEvent {
    pub id: i64,
    pub machine_id: i64,
    pub bottle_count: i64,
    pub bottle_weight: f64,
    pub created_by: i64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_by: i64,
    pub updated_at: DateTime<FixedOffset>,
}

/// Input for recording a deposit
///
/// `created_at` defaults to the deposit clock's now; suppliers backfilling
/// delayed uploads may pass an explicit timestamp.
#[derive(Debug, Clone)]
pub struct NewBottleEvent {
    pub machine_id: i64,
    pub bottle_count: i64,
    pub bottle_weight: f64,
    pub recorded_by: i64,
    pub created_at: Option<DateTime<FixedOffset>>,
}
