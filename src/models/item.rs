use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A wish on a wishlist. Reservation state lives on the row itself:
/// `is_reserved` is true exactly when `reserved_by` is set (enforced by a
/// CHECK constraint in the schema).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: String,
    pub wishlist_id: String,
    pub title: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_reserved: bool,
    pub reserved_by: Option<String>,
    pub reserved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    pub fn new(wishlist_id: String, title: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            wishlist_id,
            title,
            url: None,
            price: None,
            image: None,
            description: None,
            is_reserved: false,
            reserved_by: None,
            reserved_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
