//! Messages exchanged with the transport collaborator.
//!
//! The session layer speaks in these envelopes; how they are framed and
//! delivered (websockets, channels, in-process) is the transport's concern.

use serde::{Deserialize, Serialize};

use hexfront_protocol::{GameResult, Order, RulesCatalog, Snapshot, WireError};

/// Client-to-server messages
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Submit one order for one unit.
    SubmitOrder { order: Order },
    /// Request the current full state (initial sync).
    RequestState,
    /// Request the loaded rules catalogs.
    RequestCatalog,
}

/// Server-to-client messages
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The order was committed; sent only to the submitter.
    OrderAccepted,
    /// The order was refused; sent only to the submitter.
    OrderRejected { reason: String },
    /// A turn resolved; broadcast to everyone.
    TurnUpdate {
        snapshot: Snapshot,
        /// Deterministic hash of the snapshot for desync detection.
        checksum: u64,
    },
    /// The rules catalogs, sent once on join.
    Catalog { catalog: RulesCatalog },
    /// The match ended; `winner` is `None` for a draw.
    GameOver { result: GameResult },
}

pub fn serialize_client_message(message: &ClientMessage) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::encode::to_vec(message)?)
}

pub fn deserialize_client_message(bytes: &[u8]) -> Result<ClientMessage, WireError> {
    Ok(rmp_serde::decode::from_slice(bytes)?)
}

pub fn serialize_server_message(message: &ServerMessage) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::encode::to_vec(message)?)
}

pub fn deserialize_server_message(bytes: &[u8]) -> Result<ServerMessage, WireError> {
    Ok(rmp_serde::decode::from_slice(bytes)?)
}
