use chrono::Utc;
use sqlx::SqlitePool;

/// Why a reservation transition was refused. Both cases are user-visible
/// messages, not server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationError {
    /// The item is already reserved, no matter by whom.
    Conflict,
    /// The acting user does not hold the reservation (including the case
    /// where the item is not reserved at all).
    Unauthorized,
}

impl ReservationError {
    pub fn message(&self) -> &'static str {
        match self {
            ReservationError::Conflict => "This item is already reserved.",
            ReservationError::Unauthorized => "This is not your reservation.",
        }
    }
}

/// `Available -> Reserved`. The single conditional UPDATE is the concurrency
/// guard: of two racing calls, only one matches `is_reserved = 0`, the other
/// observes zero affected rows and loses.
pub async fn reserve(
    db: &SqlitePool,
    item_id: &str,
    user_id: &str,
) -> Result<Result<(), ReservationError>, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE items
        SET is_reserved = 1, reserved_by = ?, reserved_at = ?, updated_at = ?
        WHERE id = ? AND is_reserved = 0
        "#,
    )
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .bind(item_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(Err(ReservationError::Conflict));
    }
    Ok(Ok(()))
}

/// `Reserved -> Available`, permitted only to the current holder. An
/// unreserved item has `reserved_by` NULL, which matches no user, so the
/// same UPDATE covers that case.
pub async fn cancel(
    db: &SqlitePool,
    item_id: &str,
    user_id: &str,
) -> Result<Result<(), ReservationError>, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE items
        SET is_reserved = 0, reserved_by = NULL, reserved_at = NULL, updated_at = ?
        WHERE id = ? AND reserved_by = ?
        "#,
    )
    .bind(&now)
    .bind(item_id)
    .bind(user_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(Err(ReservationError::Unauthorized));
    }
    Ok(Ok(()))
}
