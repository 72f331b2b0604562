//! Conversation memory: persisted chat turns per user.
//!
//! The reply path only needs two operations — append a turn and read
//! back the most recent N in chronological (oldest-first) order.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{ConversationTurn, Role};

/// Persist one conversation turn.
pub async fn append_turn(pool: &SqlitePool, user_id: i64, role: Role, content: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO chat_history (user_id, role, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(role.as_str())
    .bind(content)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// The most recent `limit` turns for `user_id`, oldest first.
pub async fn recent_turns(
    pool: &SqlitePool,
    user_id: i64,
    limit: usize,
) -> Result<Vec<ConversationTurn>> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, role, content
        FROM chat_history
        WHERE user_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut turns = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
        let role: String = row.get("role");
        turns.push(ConversationTurn {
            user_id: row.get("user_id"),
            role: role.parse()?,
            content: row.get("content"),
        });
    }
    Ok(turns)
}
