use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Bid model. Append-only audit trail; the listing's current price is a
// cached projection of the maximum accepted bid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: i64,
    pub bid_amount: i64,
    pub bid_time: DateTime<Utc>,
}
