#![deny(warnings)]

//! Persistence layer: SQLite-backed player rows.
//!
//! One row per player holding the serialized [`PlayerState`] JSON and
//! the last durable save time. Only the read/write contract lives here;
//! the in-memory authority over player states is sim-runtime's store,
//! and a failed write must never touch it.

use sim_core::{PlayerId, PlayerState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors from durable reads and writes. Callers log these and retry
/// on the next flush cycle.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// A stored row that no longer deserializes.
    #[error("corrupt player record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/players.db"
}

/// Opens the database behind `url`, creating file and schema when
/// missing. A single connection is enough here: SQLite serializes
/// writers anyway, and it keeps `sqlite::memory:` databases coherent
/// across calls in tests.
pub async fn init_db(url: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS player_states (
            player_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            last_saved_at TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;
    info!(url, "player database ready");
    Ok(pool)
}

/// Loads one player's state. Returns None when no row exists yet.
pub async fn load_player(
    pool: &SqlitePool,
    player_id: &PlayerId,
) -> Result<Option<PlayerState>, StorageError> {
    let row = sqlx::query("SELECT state FROM player_states WHERE player_id = ?")
        .bind(&player_id.0)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let raw: String = row.try_get("state")?;
            Ok(Some(serde_json::from_str(&raw)?))
        }
        None => Ok(None),
    }
}

/// Writes one player's state, inserting or replacing its row. The
/// stored `last_saved_at` column mirrors the state's own field.
pub async fn save_player(pool: &SqlitePool, state: &PlayerState) -> Result<(), StorageError> {
    let raw = serde_json::to_string(state)?;
    sqlx::query(
        "INSERT INTO player_states (player_id, state, last_saved_at)
         VALUES (?, ?, ?)
         ON CONFLICT(player_id) DO UPDATE SET
             state = excluded.state,
             last_saved_at = excluded.last_saved_at",
    )
    .bind(&state.player_id.0)
    .bind(raw)
    .bind(state.last_saved_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Number of stored player rows.
pub async fn count_players(pool: &SqlitePool) -> Result<u64, StorageError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM player_states")
        .fetch_one(pool)
        .await?;
    let n: i64 = row.try_get("n")?;
    Ok(n.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use sim_core::{Area, AreaId, Inventory, ItemId, ResourceFamily, Tool, ToolKind};
    use std::collections::BTreeMap;

    fn stamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sample_state(id: &str) -> PlayerState {
        let axe = ToolKind("axe".to_string());
        let mut tools = BTreeMap::new();
        tools.insert(
            axe.clone(),
            Tool {
                kind: axe,
                click_level: 2,
                collector_level: 1,
            },
        );
        let mut wood_areas = BTreeMap::new();
        wood_areas.insert(
            AreaId("forest".to_string()),
            Area {
                min_tool_level: 1,
                drop_table: [(ItemId("wood".to_string()), 1.0)].into_iter().collect(),
                active: true,
            },
        );
        let mut areas = BTreeMap::new();
        areas.insert(ResourceFamily("wood".to_string()), wood_areas);
        let mut inventory = Inventory::default();
        inventory.credit(ItemId::coins(), 17);
        inventory.credit(ItemId("wood".to_string()), 41);
        PlayerState {
            player_id: PlayerId(id.to_string()),
            inventory,
            tools,
            areas,
            last_saved_at: stamp(),
            last_seen_at: stamp(),
        }
    }

    #[tokio::test]
    async fn missing_player_loads_as_none() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let got = load_player(&pool, &PlayerId("nobody".to_string()))
            .await
            .unwrap();
        assert!(got.is_none());
        assert_eq!(count_players(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn save_then_load_round_trips_exactly() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let state = sample_state("p1");
        save_player(&pool, &state).await.unwrap();
        let back = load_player(&pool, &state.player_id).await.unwrap().unwrap();
        assert_eq!(back, state);
        assert_eq!(count_players(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let mut state = sample_state("p1");
        save_player(&pool, &state).await.unwrap();
        state.inventory.credit(ItemId("wood".to_string()), 9);
        save_player(&pool, &state).await.unwrap();
        let back = load_player(&pool, &state.player_id).await.unwrap().unwrap();
        assert_eq!(back.inventory.quantity(&ItemId("wood".to_string())), 50);
        assert_eq!(count_players(&pool).await.unwrap(), 1);
    }
}
