use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wishlist {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Public URL-safe code. Assigned once before the first insert, never changed.
    pub code: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Wishlist {
    pub fn new(owner_id: String, name: String, code: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name,
            code,
            cover_image: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Derive a unique public code from the owner's email: the lowercased local
    /// part, with an incrementing numeric suffix until no existing wishlist
    /// uses it. The UNIQUE constraint on `code` backstops races.
    pub async fn assign_unique_code(db: &SqlitePool, owner_email: &str) -> Result<String, sqlx::Error> {
        let base = owner_email
            .split('@')
            .next()
            .unwrap_or(owner_email)
            .to_lowercase();

        let mut code = base.clone();
        let mut counter = 1;
        loop {
            let taken: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlists WHERE code = ?")
                .bind(&code)
                .fetch_one(db)
                .await?;
            if taken.0 == 0 {
                return Ok(code);
            }
            code = format!("{}{}", base, counter);
            counter += 1;
        }
    }

    pub fn public_path(&self) -> String {
        format!("/w/{}/{}", self.code, slugify(&self.name))
    }
}

/// Lowercased, URL-safe version of a display name. Cosmetic only: public
/// lookups go by code, a stale slug still resolves.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                slug.push(lc);
            }
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push('-');
    }
    slug
}
