//! Business model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business that owns recycling machines
///
/// `owner_user_id` is the account the business logs in with; `created_by`
/// and `updated_by` are weak references to the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub logo_image: Option<Vec<u8>>,
    pub owner_user_id: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by: i64,
    pub updated_at: DateTime<Utc>,
}
