#![deny(warnings)]

//! Headless CLI driving the economy engine end to end: seeds players,
//! scripts a harvesting session against the store while the scheduler
//! ticks, then flushes and prints a summary.

use anyhow::Result;
use sim_core::{ItemId, PlayerId, ResourceFamily, ToolKind, UpgradeKind};
use sim_econ::Catalog;
use sim_runtime::{SchedulerConfig, StateStore, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    db: Option<String>,
    players: u32,
    idle_seconds: u64,
    seed: u64,
}

fn parse_args() -> Args {
    let mut args = Args {
        db: None,
        players: 4,
        idle_seconds: 3,
        seed: 42,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--db" => args.db = it.next(),
            "--players" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.players = v;
                }
            }
            "--idle-seconds" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.idle_seconds = v;
                }
            }
            "--seed" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = v;
                }
            }
            _ => {}
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(git_sha = env!("GIT_SHA"), players = args.players, "starting engine CLI");

    let url = args
        .db
        .clone()
        .unwrap_or_else(|| persistence::default_sqlite_url().to_string());
    if let Some(path) = url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = persistence::init_db(&url).await?;

    let store = Arc::new(StateStore::new(
        Arc::new(Catalog::standard()),
        pool.clone(),
        StoreConfig {
            rng_seed: args.seed,
            ..StoreConfig::default()
        },
    ));
    let scheduler = sim_runtime::spawn(
        store.clone(),
        SchedulerConfig {
            flush_period: Duration::from_secs(10),
            ..SchedulerConfig::default()
        },
    );

    let wood = ResourceFamily("wood".to_string());
    let stone = ResourceFamily("stone".to_string());
    let axe = ToolKind("axe".to_string());
    for i in 0..args.players {
        let id = PlayerId(format!("player-{i}"));
        for _ in 0..30 {
            store.click(&id, &wood).await?;
            store.click(&id, &stone).await?;
        }
        let state = store.get(&id).await?;
        for item in ["wood", "stone", "iron", "gold"] {
            let item = ItemId(item.to_string());
            let held = state.inventory.quantity(&item);
            if held > 0 {
                store.sell(&id, &item, held).await?;
            }
        }
        // Odd players stay pure clickers; even players buy a collector
        // so the background production sweep has something to do.
        if i % 2 == 0 {
            let _ = store.upgrade(&id, &axe, UpgradeKind::AutoCollector).await;
        }
        while store.upgrade(&id, &axe, UpgradeKind::ClickPower).await.is_ok() {}
        info!(player = %id.0, "session scripted");
    }

    info!(seconds = args.idle_seconds, "idling so collectors can run");
    tokio::time::sleep(Duration::from_secs(args.idle_seconds)).await;
    scheduler.shutdown();
    let summary = store.flush_all().await;

    let stored = persistence::count_players(&pool).await?;
    println!(
        "Engine OK | players: {} | cached: {} | stored rows: {}",
        args.players,
        store.cached_players().await,
        stored
    );
    println!(
        "Flush | saved: {} | failed: {}",
        summary.saved, summary.failed
    );
    for i in 0..args.players {
        let id = PlayerId(format!("player-{i}"));
        let state = store.get(&id).await?;
        let tool = state.tool(&axe);
        println!(
            "{} | coins: {} | axe: click {} / collector {} | inventory: {}",
            id.0,
            state.inventory.coins(),
            tool.map(|t| t.click_level).unwrap_or(0),
            tool.map(|t| t.collector_level).unwrap_or(0),
            serde_json::to_string(&state.inventory)?
        );
    }

    Ok(())
}
