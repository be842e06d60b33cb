#![deny(warnings)]

//! Core domain models and invariants for the idle-harvest engine.
//!
//! This crate defines the serializable per-player state used across the
//! simulation with validation helpers to guarantee basic invariants.
//! Everything here is plain data: the rules that mutate a state live in
//! `sim-econ`, and ownership/locking lives in `sim-runtime`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Unique identifier for a player account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

/// Identifier for an inventory item, e.g. "wood", "iron", "coins".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    /// The currency item. Upgrade purchases debit it, sales credit it.
    pub fn coins() -> ItemId {
        ItemId("coins".to_string())
    }
}

/// A harvestable resource category, e.g. "wood" or "stone". Each family
/// is worked by exactly one tool kind and owns a set of areas of which
/// at most one may be active.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceFamily(pub String);

/// Identifier for a harvesting area within a family, e.g. "forest".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaId(pub String);

/// Identifier for a tool kind, e.g. "axe" or "pickaxe".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolKind(pub String);

/// Which of a tool's two levels an upgrade purchase raises.
///
/// Serialized camelCase ("clickPower" / "autoCollector") to match the
/// wire names the store page sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    /// Raises `click_level`: manual click yield.
    ClickPower,
    /// Raises `collector_level`: passive tick yield.
    AutoCollector,
}

/// A player's harvesting tool. One tool per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind, matching the catalog's family mapping.
    pub kind: ToolKind,
    /// Multiplies manual click yield and gates area access. Always >= 1.
    pub click_level: u32,
    /// Multiplies passive tick yield. 0 means no passive collection.
    pub collector_level: u32,
}

/// A harvesting location within a resource family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Minimum tool click level required to work this area.
    pub min_tool_level: u32,
    /// Independent per-attempt drop probability of each item, in [0, 1].
    pub drop_table: BTreeMap<ItemId, f64>,
    /// Whether clicks and ticks against the family resolve here.
    pub active: bool,
}

/// Item quantities held by a player. Quantities are whole units so the
/// persisted record round-trips exactly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(pub BTreeMap<ItemId, u64>);

impl Inventory {
    /// Held quantity of `item`, 0 when absent.
    pub fn quantity(&self, item: &ItemId) -> u64 {
        self.0.get(item).copied().unwrap_or(0)
    }

    /// Current coin balance.
    pub fn coins(&self) -> u64 {
        self.quantity(&ItemId::coins())
    }

    /// Adds `amount` units of `item`, saturating at u64::MAX.
    pub fn credit(&mut self, item: ItemId, amount: u64) {
        if amount == 0 {
            return;
        }
        let slot = self.0.entry(item).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    /// Removes `amount` units of `item`. Returns false (without any
    /// change) when fewer than `amount` units are held. Emptied slots
    /// are dropped from the map.
    pub fn debit(&mut self, item: &ItemId, amount: u64) -> bool {
        let held = self.quantity(item);
        if held < amount {
            return false;
        }
        if held == amount {
            self.0.remove(item);
        } else {
            self.0.insert(item.clone(), held - amount);
        }
        true
    }
}

/// The per-player aggregate. One `PlayerState` per player; every
/// mutation (click, upgrade, sell, tick) reads and writes it as one
/// atomic step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Owning player.
    pub player_id: PlayerId,
    /// Items held, including the "coins" currency.
    pub inventory: Inventory,
    /// Tools by kind.
    pub tools: BTreeMap<ToolKind, Tool>,
    /// Area graph: family -> area id -> area.
    pub areas: BTreeMap<ResourceFamily, BTreeMap<AreaId, Area>>,
    /// When this state was last written to durable storage.
    pub last_saved_at: DateTime<Utc>,
    /// When this state was last touched by a commit; offline
    /// reconciliation catches up from here.
    pub last_seen_at: DateTime<Utc>,
}

impl PlayerState {
    /// Areas currently flagged active for `family`, in id order.
    pub fn active_areas(&self, family: &ResourceFamily) -> Vec<(&AreaId, &Area)> {
        self.areas
            .get(family)
            .map(|areas| areas.iter().filter(|(_, a)| a.active).collect())
            .unwrap_or_default()
    }

    /// The tool of the given kind, if the player owns one.
    pub fn tool(&self, kind: &ToolKind) -> Option<&Tool> {
        self.tools.get(kind)
    }

    /// Repairs legacy states that flag more than one area active within
    /// a family. Keeps the area with the lowest gate (smallest id as
    /// tie-break) and deactivates the rest. Returns true when anything
    /// changed.
    pub fn normalize_areas(&mut self) -> bool {
        let mut changed = false;
        for (family, areas) in &mut self.areas {
            let mut active: Vec<&AreaId> = areas.iter().filter(|(_, a)| a.active).map(|(id, _)| id).collect();
            if active.len() <= 1 {
                continue;
            }
            active.sort_by_key(|id| (areas[*id].min_tool_level, (*id).clone()));
            let keep = active[0].clone();
            warn!(
                family = %family.0,
                keep = %keep.0,
                demoted = active.len() - 1,
                "multiple active areas in one family, normalizing"
            );
            for (id, area) in areas.iter_mut() {
                if area.active && *id != keep {
                    area.active = false;
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Player ids key the cache and the persisted rows.
    #[error("player id must not be empty")]
    EmptyPlayerId,
    /// Click levels start at 1; 0 would zero out every click.
    #[error("tool {0} has click level 0")]
    InvalidToolLevel(String),
    /// Drop probabilities are Bernoulli parameters.
    #[error("drop probability {probability} for item {item} is outside [0,1]")]
    InvalidProbability {
        /// Offending drop-table item.
        item: String,
        /// Offending probability value.
        probability: f64,
    },
    /// At most one area per family may be active.
    #[error("family {0} has more than one active area")]
    MultipleActiveAreas(String),
}

/// Validate a single tool.
pub fn validate_tool(tool: &Tool) -> Result<(), ValidationError> {
    if tool.click_level == 0 {
        return Err(ValidationError::InvalidToolLevel(tool.kind.0.clone()));
    }
    Ok(())
}

/// Validate a single area's drop table.
pub fn validate_area(area: &Area) -> Result<(), ValidationError> {
    for (item, &p) in &area.drop_table {
        if !(0.0..=1.0).contains(&p) || !p.is_finite() {
            return Err(ValidationError::InvalidProbability {
                item: item.0.clone(),
                probability: p,
            });
        }
    }
    Ok(())
}

/// Validate a full player state, including the single-active-area
/// invariant. States coming off disk should be run through
/// [`PlayerState::normalize_areas`] first; states produced by the rules
/// engine must already pass.
pub fn validate_player_state(state: &PlayerState) -> Result<(), ValidationError> {
    if state.player_id.0.trim().is_empty() {
        return Err(ValidationError::EmptyPlayerId);
    }
    for tool in state.tools.values() {
        validate_tool(tool)?;
    }
    for (family, areas) in &state.areas {
        let mut active = 0usize;
        for area in areas.values() {
            validate_area(area)?;
            if area.active {
                active += 1;
            }
        }
        if active > 1 {
            return Err(ValidationError::MultipleActiveAreas(family.0.clone()));
        }
    }
    Ok(())
}
