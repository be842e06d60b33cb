//! Authoritative in-memory ownership of every active player's state.
//!
//! The store mediates all reads and writes: one exclusive lock per
//! cached player serializes mutations for that player, while players
//! never contend with each other. Durable storage is only touched
//! outside player locks: loads happen before an entry is inserted,
//! and flushes write snapshot copies taken under brief locks.

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::{ItemId, PlayerId, PlayerState};
use sim_econ::{Catalog, EconError};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Store tunables.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base seed from which per-player RNG streams derive.
    pub rng_seed: u64,
    /// How long a mutation waits on a player's lock before giving up
    /// with [`StoreError::Busy`].
    pub lock_timeout: Duration,
    /// Minimum absence before offline catch-up applies on load.
    pub offline_threshold: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            lock_timeout: Duration::from_millis(250),
            offline_threshold: Duration::from_secs(5),
        }
    }
}

/// Failures surfaced to request handlers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another mutation holds this player's lock; retry with backoff.
    #[error("player {0} is busy, retry")]
    Busy(String),
    /// Expected economy outcome (insufficient funds, gated area, ...).
    #[error(transparent)]
    Econ(#[from] EconError),
    /// Durable read failure during load.
    #[error(transparent)]
    Storage(#[from] persistence::StorageError),
}

/// Cached per-player slot: the authoritative state and that player's
/// seeded RNG stream, both guarded by one lock so a mutation and its
/// dice rolls commit as a unit.
struct PlayerEntry {
    state: PlayerState,
    rng: ChaCha8Rng,
}

/// Outcome counters for one passive-production sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickSweep {
    /// Players that received production this round.
    pub ticked: u64,
    /// Players skipped because a client mutation held their lock.
    pub skipped: u64,
}

/// Outcome counters for one durable flush.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlushSummary {
    /// Players written successfully.
    pub saved: u64,
    /// Players whose write failed; retried on the next cycle.
    pub failed: u64,
}

/// The process-wide player cache. Shared as `Arc<StateStore>` between
/// request handlers and the scheduler; never a global.
pub struct StateStore {
    catalog: Arc<Catalog>,
    pool: SqlitePool,
    config: StoreConfig,
    players: RwLock<HashMap<PlayerId, Arc<Mutex<PlayerEntry>>>>,
}

/// Stable per-player seed so a player's drop stream is reproducible
/// across runs for a fixed base seed.
fn player_seed(base: u64, player_id: &PlayerId) -> u64 {
    let mut seed = base;
    for b in player_id.0.bytes() {
        seed = seed.rotate_left(8) ^ u64::from(b);
    }
    seed
}

impl StateStore {
    /// Creates an empty store over the given catalog and database pool.
    pub fn new(catalog: Arc<Catalog>, pool: SqlitePool, config: StoreConfig) -> StateStore {
        StateStore {
            catalog,
            pool,
            config,
            players: RwLock::new(HashMap::new()),
        }
    }

    /// The catalog this store resolves rules against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of players currently cached.
    pub async fn cached_players(&self) -> usize {
        self.players.read().await.len()
    }

    /// Returns the cached entry for `player_id`, loading from durable
    /// storage (or seeding catalog defaults) on miss. Loading happens
    /// before any player lock exists, so it never blocks other players.
    async fn entry(&self, player_id: &PlayerId) -> Result<Arc<Mutex<PlayerEntry>>, StoreError> {
        if let Some(entry) = self.players.read().await.get(player_id) {
            return Ok(entry.clone());
        }

        let loaded = persistence::load_player(&self.pool, player_id).await?;
        let now = Utc::now();
        let mut state = match loaded {
            Some(state) => state,
            None => {
                info!(player = %player_id.0, "seeding new player from catalog defaults");
                self.catalog.default_player_state(player_id.clone(), now)
            }
        };
        let mut rng = ChaCha8Rng::seed_from_u64(player_seed(self.config.rng_seed, player_id));

        // Legacy rows may flag several active areas; heal before anyone
        // sees the state, then catch up on passive income earned away.
        state.normalize_areas();
        if let Err(err) = sim_core::validate_player_state(&state) {
            warn!(player = %player_id.0, %err, "loaded state fails validation");
        }
        let away = now.signed_duration_since(state.last_seen_at).num_seconds();
        if away > self.config.offline_threshold.as_secs() as i64 {
            let out = sim_econ::apply_passive_tick(&state, &self.catalog, away as u64, &mut rng);
            if !out.credited.is_empty() {
                info!(
                    player = %player_id.0,
                    away_secs = away,
                    items = out.credited.len(),
                    "offline production reconciled"
                );
            }
            state = out.state;
        }
        state.last_seen_at = now;

        let mut players = self.players.write().await;
        // A concurrent miss may have inserted first; keep its entry.
        let entry = players
            .entry(player_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(PlayerEntry { state, rng })));
        Ok(entry.clone())
    }

    /// Runs one mutation under the player's lock: the pure rules
    /// closure sees the current state and the player's RNG, and its
    /// returned state replaces the cached one only on success. Returns
    /// the committed state alongside the closure's own output.
    async fn with_player<T, F>(
        &self,
        player_id: &PlayerId,
        f: F,
    ) -> Result<(PlayerState, T), StoreError>
    where
        F: FnOnce(&PlayerState, &mut ChaCha8Rng) -> Result<(PlayerState, T), EconError>,
    {
        let entry = self.entry(player_id).await?;
        let mut guard = timeout(self.config.lock_timeout, entry.lock())
            .await
            .map_err(|_| StoreError::Busy(player_id.0.clone()))?;
        let PlayerEntry { state, rng } = &mut *guard;
        let (mut next, out) = f(state, rng)?;
        next.last_seen_at = Utc::now();
        *state = next;
        Ok((state.clone(), out))
    }

    /// Current state for `player_id`, reconciled if the player was
    /// away. Waits on the player's lock like any other access.
    pub async fn get(&self, player_id: &PlayerId) -> Result<PlayerState, StoreError> {
        let entry = self.entry(player_id).await?;
        let guard = timeout(self.config.lock_timeout, entry.lock())
            .await
            .map_err(|_| StoreError::Busy(player_id.0.clone()))?;
        Ok(guard.state.clone())
    }

    /// Manual click against `family`'s active area.
    pub async fn click(
        &self,
        player_id: &PlayerId,
        family: &sim_core::ResourceFamily,
    ) -> Result<(PlayerState, BTreeMap<ItemId, u64>), StoreError> {
        self.with_player(player_id, |state, rng| {
            let out = sim_econ::resolve_click(state, &self.catalog, family, rng)?;
            Ok((out.state, out.drops))
        })
        .await
    }

    /// Upgrade purchase for one of the player's tools.
    pub async fn upgrade(
        &self,
        player_id: &PlayerId,
        tool: &sim_core::ToolKind,
        kind: sim_core::UpgradeKind,
    ) -> Result<PlayerState, StoreError> {
        let (state, ()) = self
            .with_player(player_id, |state, _| {
                Ok((sim_econ::resolve_upgrade(state, &self.catalog, tool, kind)?, ()))
            })
            .await?;
        Ok(state)
    }

    /// Sale of raw resources for coins.
    pub async fn sell(
        &self,
        player_id: &PlayerId,
        item: &ItemId,
        quantity: u64,
    ) -> Result<PlayerState, StoreError> {
        let (state, ()) = self
            .with_player(player_id, |state, _| {
                Ok((sim_econ::resolve_sell(state, &self.catalog, item, quantity)?, ()))
            })
            .await?;
        Ok(state)
    }

    /// Switches the active area within a family.
    pub async fn select_area(
        &self,
        player_id: &PlayerId,
        family: &sim_core::ResourceFamily,
        area: &sim_core::AreaId,
    ) -> Result<PlayerState, StoreError> {
        let (state, ()) = self
            .with_player(player_id, |state, _| {
                Ok((
                    sim_econ::resolve_select_area(state, &self.catalog, family, area)?,
                    (),
                ))
            })
            .await?;
        Ok(state)
    }

    /// One passive-production sweep over every cached player. A player
    /// whose lock is held by a client mutation is skipped this round
    /// rather than stalling the sweep; the next round picks them up.
    pub async fn tick_all(&self, elapsed_secs: u64) -> TickSweep {
        let entries: Vec<Arc<Mutex<PlayerEntry>>> =
            self.players.read().await.values().cloned().collect();
        let mut sweep = TickSweep::default();
        for entry in entries {
            match entry.try_lock() {
                Ok(mut guard) => {
                    let PlayerEntry { state, rng } = &mut *guard;
                    let out = sim_econ::apply_passive_tick(state, &self.catalog, elapsed_secs, rng);
                    let mut next = out.state;
                    next.last_seen_at = Utc::now();
                    *state = next;
                    sweep.ticked += 1;
                }
                Err(_) => {
                    sweep.skipped += 1;
                }
            }
        }
        sweep
    }

    /// Writes every cached player to durable storage. Snapshots are
    /// cloned under brief locks and written afterwards, so a slow disk
    /// write can race with, but never corrupt, subsequent commits. A
    /// failed write leaves the in-memory copy untouched and is retried
    /// on the next cycle.
    pub async fn flush_all(&self) -> FlushSummary {
        let entries: Vec<Arc<Mutex<PlayerEntry>>> =
            self.players.read().await.values().cloned().collect();
        let now = Utc::now();
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut guard = entry.lock().await;
            guard.state.last_saved_at = now;
            snapshots.push(guard.state.clone());
        }

        let mut summary = FlushSummary::default();
        for state in snapshots {
            match persistence::save_player(&self.pool, &state).await {
                Ok(()) => summary.saved += 1,
                Err(err) => {
                    warn!(player = %state.player_id.0, %err, "flush failed, retrying next cycle");
                    summary.failed += 1;
                }
            }
        }
        debug!(saved = summary.saved, failed = summary.failed, "flush complete");
        summary
    }
}
