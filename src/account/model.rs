use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account tiers, stored as TEXT
pub mod account_type {
    pub const VISITOR: &str = "VISITOR";
    pub const USER: &str = "USER";
    pub const VIP: &str = "VIP";
    pub const SUPER_USER: &str = "SUPER_USER";
}

// User account model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub balance: i64,
    pub rating: f64,
    pub account_type: String,
    pub suspended: bool,
    pub warning: bool,
    pub bad_reviews: i64,
    pub suspended_times: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_visitor(&self) -> bool {
        self.account_type == account_type::VISITOR
    }

    pub fn is_vip(&self) -> bool {
        self.account_type == account_type::VIP
    }

    pub fn is_moderator(&self) -> bool {
        self.account_type == account_type::SUPER_USER
    }
}
