//! Request/response contract for the routing collaborator.
//!
//! The router owns HTTP, JSON framing and session auth; the engine sees
//! only these payloads, keyed by the player id the session resolved.
//! Malformed JSON never reaches the engine: it dies in the router's
//! deserialization as a validation error. Economy failures come back
//! as stable camelCase codes the client can branch on.

use crate::store::{StateStore, StoreError};
use serde::{Deserialize, Serialize};
use sim_core::{AreaId, ItemId, PlayerId, PlayerState, ResourceFamily, ToolKind, UpgradeKind};
use sim_econ::EconError;
use std::collections::BTreeMap;

/// One logical game request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum GameRequest {
    /// Current state, offline-reconciled if the player was away.
    FetchState,
    /// Manual harvest against one family's active area.
    Click {
        /// Family to harvest.
        family: ResourceFamily,
    },
    /// Purchase one level of a tool upgrade.
    Upgrade {
        /// Tool to upgrade.
        tool: ToolKind,
        /// Which level to raise.
        upgrade: UpgradeKind,
    },
    /// Sell raw resources for coins.
    Sell {
        /// Item offered.
        item: ItemId,
        /// Whole units offered. Zero is rejected by the rules engine;
        /// negative or fractional amounts cannot deserialize.
        quantity: u64,
    },
    /// Switch the active area within a family.
    SelectArea {
        /// Family to switch.
        family: ResourceFamily,
        /// Area to activate.
        area: AreaId,
    },
    /// Force a durable save of every cached player.
    Save,
}

/// Successful reply to a [`GameRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameResponse {
    /// The player's committed state.
    State {
        /// Updated state.
        state: PlayerState,
    },
    /// Click result: state plus what actually dropped.
    Clicked {
        /// Updated state.
        state: PlayerState,
        /// Items credited by this click.
        drops: BTreeMap<ItemId, u64>,
    },
    /// Save acknowledgement.
    Saved {
        /// Players written.
        players: u64,
    },
}

/// Wire error: a stable machine-readable code plus human-readable text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable camelCase code, e.g. "insufficientFunds".
    pub code: String,
    /// Display text for logs and debugging, not for branching.
    pub message: String,
}

fn error_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::Busy(_) => "busy",
        StoreError::Storage(_) => "storage",
        StoreError::Econ(e) => match e {
            EconError::NoActiveArea(_) => "noActiveArea",
            EconError::ToolMissing(_) => "toolMissing",
            EconError::ToolTooWeak { .. } => "toolTooWeak",
            EconError::InsufficientFunds { .. } => "insufficientFunds",
            EconError::InvalidQuantity(_) => "invalidQuantity",
            EconError::UnknownResource(_) => "unknownResource",
            EconError::InsufficientStock { .. } => "insufficientStock",
            EconError::UnknownArea { .. } => "unknownArea",
        },
    }
}

impl From<StoreError> for ErrorBody {
    fn from(err: StoreError) -> Self {
        ErrorBody {
            code: error_code(&err).to_string(),
            message: err.to_string(),
        }
    }
}

/// Executes one request against the store on behalf of `player_id`.
pub async fn dispatch(
    store: &StateStore,
    player_id: &PlayerId,
    request: GameRequest,
) -> Result<GameResponse, ErrorBody> {
    let result = match request {
        GameRequest::FetchState => store
            .get(player_id)
            .await
            .map(|state| GameResponse::State { state }),
        GameRequest::Click { family } => store
            .click(player_id, &family)
            .await
            .map(|(state, drops)| GameResponse::Clicked { state, drops }),
        GameRequest::Upgrade { tool, upgrade } => store
            .upgrade(player_id, &tool, upgrade)
            .await
            .map(|state| GameResponse::State { state }),
        GameRequest::Sell { item, quantity } => store
            .sell(player_id, &item, quantity)
            .await
            .map(|state| GameResponse::State { state }),
        GameRequest::SelectArea { family, area } => store
            .select_area(player_id, &family, &area)
            .await
            .map(|state| GameResponse::State { state }),
        GameRequest::Save => {
            let summary = store.flush_all().await;
            Ok(GameResponse::Saved {
                players: summary.saved,
            })
        }
    };
    result.map_err(ErrorBody::from)
}
