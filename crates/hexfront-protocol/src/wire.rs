use rmp_serde::{decode, encode};
use thiserror::Error;

use crate::{Event, Order, RulesCatalog, Snapshot};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn serialize_order(order: &Order) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(order)?)
}

pub fn deserialize_order(bytes: &[u8]) -> Result<Order, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_events(events: &[Event]) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(events)?)
}

pub fn deserialize_events(bytes: &[u8]) -> Result<Vec<Event>, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(snapshot)?)
}

pub fn deserialize_snapshot(bytes: &[u8]) -> Result<Snapshot, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_catalog(catalog: &RulesCatalog) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(catalog)?)
}

pub fn deserialize_catalog(bytes: &[u8]) -> Result<RulesCatalog, WireError> {
    Ok(decode::from_slice(bytes)?)
}

/// Human-readable snapshot dump for debugging and match logs.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Deterministic snapshot hash for desync detection.
///
/// Hashes the MessagePack-serialized snapshot using FNV-1a 64-bit.
pub fn snapshot_hash(snapshot: &Snapshot) -> Result<u64, WireError> {
    let bytes = serialize_snapshot(snapshot)?;
    Ok(hash_bytes_fnv1a64(&bytes))
}

/// Deterministic, stable 64-bit hash for raw bytes (FNV-1a).
pub fn hash_bytes_fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionId, EntityId, Event, Hex};

    #[test]
    fn fnv1a_is_stable() {
        assert_eq!(hash_bytes_fnv1a64(b""), 0xcbf29ce484222325);
        assert_eq!(hash_bytes_fnv1a64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(hash_bytes_fnv1a64(b"hexfront"), hash_bytes_fnv1a64(b"hexfront"));
    }

    #[test]
    fn events_roundtrip() {
        let events = vec![
            Event::Moved {
                unit: EntityId::new(0, 0),
                action: ActionId::new(1),
                from: Hex { q: 0, r: 0 },
                to: Hex { q: 1, r: 0 },
            },
            Event::GameEnded { winner: None },
        ];
        let bytes = serialize_events(&events).unwrap();
        let decoded = deserialize_events(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(matches!(decoded[1], Event::GameEnded { winner: None }));
    }

    #[test]
    fn order_roundtrip() {
        let order = Order::with_path(
            EntityId::new(3, 1),
            ActionId::new(7),
            vec![Hex { q: 0, r: 0 }, Hex { q: 1, r: 0 }],
        );
        let bytes = serialize_order(&order).unwrap();
        let decoded = deserialize_order(&bytes).unwrap();
        assert_eq!(decoded.unit, order.unit);
        assert_eq!(decoded.action, order.action);
        assert_eq!(decoded.path, order.path);
        assert_eq!(decoded.amount, None);
    }
}
