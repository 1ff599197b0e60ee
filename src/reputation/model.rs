use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Review model. Unique per order, buyer to seller.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub order_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub rate: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
