//! Update-endpoint codec.
//!
//! Pure encode/decode between raw bodies and wire types. No checksum
//! work happens here: decoding a snapshot proves nothing about it.
//!
//! - `decode_request` / `encode_response`: endpoint bodies
//! - `decode_snapshot` / `encode_snapshot`: the snapshot JSON string
//! - `read_snapshot_file`: snapshot from disk, for inspection

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use wirestate_kernel::domain::Snapshot;
use wirestate_kernel::wire::{UpdateRequest, UpdateResponse};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CodecError {
    /// Request body malformed or carrying unknown fields.
    #[error("malformed update request: {0}")]
    Request(#[source] serde_json::Error),
    /// Snapshot string malformed or carrying unknown fields.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),
    #[error("encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

pub fn decode_request(body: &str) -> Result<UpdateRequest, CodecError> {
    serde_json::from_str(body).map_err(CodecError::Request)
}

pub fn encode_response(response: &UpdateResponse) -> Result<String, CodecError> {
    serde_json::to_string(response).map_err(CodecError::Encode)
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

pub fn decode_snapshot(raw: &str) -> Result<Snapshot, CodecError> {
    serde_json::from_str(raw).map_err(CodecError::Snapshot)
}

/// Compact JSON, keys in insertion order.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, CodecError> {
    serde_json::to_string(snapshot).map_err(CodecError::Encode)
}

pub fn read_snapshot_file(path: &Path) -> Result<Snapshot, CodecError> {
    let raw = fs::read_to_string(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_snapshot(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wirestate_kernel::domain::Effects;
    use wirestate_kernel::wire::ComponentResponse;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new(
            json!({"count": 1}).as_object().cloned().unwrap(),
            json!({"id": "a", "name": "counter"}).as_object().cloned().unwrap(),
        );
        snapshot.checksum = "00".into();
        snapshot
    }

    #[test]
    fn snapshot_encoding_keeps_key_order() {
        let raw = r#"{"data":{"z":1,"a":2},"memo":{"name":"x","id":"y"},"checksum":"ab"}"#;
        let snapshot = decode_snapshot(raw).unwrap();
        assert_eq!(encode_snapshot(&snapshot).unwrap(), raw);
    }

    #[test]
    fn request_decodes_snapshot_strings() {
        let body = json!({
            "components": [{
                "snapshot": encode_snapshot(&sample()).unwrap(),
                "updates": {"count": 5},
                "calls": [{"method": "increment", "params": []}]
            }]
        })
        .to_string();
        let request = decode_request(&body).unwrap();
        let entry = &request.components[0];
        assert_eq!(decode_snapshot(&entry.snapshot).unwrap(), sample());
        assert_eq!(entry.calls[0].method, "increment");
    }

    #[test]
    fn malformed_inputs_are_typed() {
        assert!(matches!(decode_request("{"), Err(CodecError::Request(_))));
        assert!(matches!(
            decode_snapshot(r#"{"data":{},"memo":{},"extra":1}"#),
            Err(CodecError::Snapshot(_))
        ));
        assert!(matches!(
            read_snapshot_file(Path::new("/definitely/not/here.json")),
            Err(CodecError::Io { .. })
        ));
    }

    #[test]
    fn response_shape() {
        let response = UpdateResponse {
            components: vec![ComponentResponse {
                snapshot: "{}".into(),
                effects: Effects::new(),
            }],
            assets: vec!["<link>".into()],
        };
        assert_eq!(
            encode_response(&response).unwrap(),
            r#"{"components":[{"snapshot":"{}","effects":{}}],"assets":["<link>"]}"#
        );
    }
}
