use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Order model. One order per settled listing; shipping address is explicit
// columns rather than a JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub shipping_name: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
    pub created_at: DateTime<Utc>,
}

/// Shipping address captured at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
        ] {
            if value.trim().is_empty() {
                return Err(format!("shipping {field} must not be empty"));
            }
        }
        Ok(())
    }
}
