use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = Uuid::new_v4().to_string();
    let email = email.trim().to_lowercase();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(&email)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    println!("Created user:");
    println!("  ID: {}", id);
    println!("  Name: {}", name);
    println!("  Email: {}", email);

    Ok(())
}
