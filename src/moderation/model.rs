use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shared state machine for issues and applications:
/// INITIATED -> UNDER_REVIEW -> RESOLVED (terminal).
pub mod status {
    pub const INITIATED: &str = "INITIATED";
    pub const UNDER_REVIEW: &str = "UNDER_REVIEW";
    pub const RESOLVED: &str = "RESOLVED";
}

// Dispute ticket, optionally tied to an order
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issue {
    pub id: i64,
    pub issuer_id: i64,
    pub issuee_id: i64,
    pub order_id: Option<i64>,
    pub comments: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// One response in an issue thread; moderator responses are tagged
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IssueResponse {
    pub id: i64,
    pub issue_id: i64,
    pub author_id: i64,
    pub moderator: bool,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// Privilege-upgrade request; username/email are re-declared for verification
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
