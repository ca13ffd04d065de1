use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (wishlist, viewer) pair, recorded the first time a non-owner
/// views the public page. The pair is UNIQUE in the schema, so repeated views
/// insert nothing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Share {
    pub id: String,
    pub wishlist_id: String,
    pub user_id: String,
    pub shared_at: String,
}

impl Share {
    pub fn new(wishlist_id: String, user_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wishlist_id,
            user_id,
            shared_at: Utc::now().to_rfc3339(),
        }
    }
}
