/// User database operations for identity-service
use crate::error::Result;
use sqlx::PgPool;

/// Whether `user_id` names a live (not soft-deleted) user
pub async fn subject_exists(pool: &PgPool, user_id: i32) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
