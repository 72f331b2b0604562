//! The reply path: history + retrieval → assembled prompt → generation.
//!
//! Ordering matters: history is read *before* the incoming message is
//! persisted, so the prompt carries the new message exactly once (as
//! the final user turn). Both sides of the exchange are persisted only
//! after generation succeeds; a failed call leaves no half-recorded
//! conversation behind.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::context::assemble;
use crate::embedding::Embedder;
use crate::generate::GenerationClient;
use crate::memory::{append_turn, recent_turns};
use crate::models::Role;
use crate::retrieve::retrieve;
use crate::store::VectorStore;

pub struct AskOptions {
    pub user_id: i64,
    pub k: usize,
    pub history_window: usize,
}

/// Answer one user message and record the exchange.
pub async fn run_ask(
    pool: &SqlitePool,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    generation: &GenerationClient,
    options: &AskOptions,
    message: &str,
) -> Result<String> {
    let history = recent_turns(pool, options.user_id, options.history_window).await?;
    let retrieved = retrieve(store, embedder, message, options.k).await;
    debug!(
        history = history.len(),
        retrieved = retrieved.len(),
        "assembling prompt"
    );

    let messages = assemble(&history, &retrieved, message);
    let reply = generation.complete(&messages).await?;

    append_turn(pool, options.user_id, Role::User, message).await?;
    append_turn(pool, options.user_id, Role::Assistant, &reply).await?;

    Ok(reply)
}
