//! Machine model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical reverse-vending machine installed at an address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: i64,
    pub name: String,
    /// Serial number printed on the machine; unique across the fleet
    pub number: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub business_id: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by: i64,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or replacing a machine record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    pub name: String,
    pub number: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub business_id: i64,
}
