/// Wirestate — Snapshot Checksum
///
/// Canonical serialization + HMAC-SHA256 stamping of snapshots.
///
/// Rules:
///   - The signed payload is `{"data": .., "memo": ..}`, no whitespace
///   - Map key order is insertion order (serde_json `preserve_order`)
///   - The checksum itself is never part of the signed payload
///   - Verification is constant-time over the decoded digest

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::Snapshot;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("snapshot checksum does not match its payload")]
    Corrupt,
    #[error("signing key rejected: {0}")]
    InvalidKey(String),
    #[error("payload could not be serialized: {0}")]
    Serialize(String),
}

/// Canonical bytes of the signed part of a snapshot.
pub fn canonical_serialize(
    data: &Map<String, Value>,
    memo: &Map<String, Value>,
) -> Result<Vec<u8>, ChecksumError> {
    let mut root = Map::new();
    root.insert("data".to_string(), Value::Object(data.clone()));
    root.insert("memo".to_string(), Value::Object(memo.clone()));
    serde_json::to_vec(&Value::Object(root)).map_err(|e| ChecksumError::Serialize(e.to_string()))
}

/// Plain SHA-256 of arbitrary content. Lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Keyed checksum generator/verifier for snapshots.
#[derive(Clone)]
pub struct Checksum {
    key: Vec<u8>,
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checksum").field("key", &"<redacted>").finish()
    }
}

impl Checksum {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, ChecksumError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| ChecksumError::InvalidKey(e.to_string()))
    }

    /// Lowercase hex HMAC over `{data, memo}`.
    pub fn generate(
        &self,
        data: &Map<String, Value>,
        memo: &Map<String, Value>,
    ) -> Result<String, ChecksumError> {
        let mut mac = self.mac()?;
        mac.update(&canonical_serialize(data, memo)?);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Fill in `snapshot.checksum` for its current payload.
    pub fn stamp(&self, snapshot: &mut Snapshot) -> Result<(), ChecksumError> {
        snapshot.checksum = self.generate(&snapshot.data, &snapshot.memo)?;
        Ok(())
    }

    /// Reject any snapshot whose payload or checksum was altered.
    pub fn verify(&self, snapshot: &Snapshot) -> Result<(), ChecksumError> {
        let claimed = hex::decode(&snapshot.checksum).map_err(|_| ChecksumError::Corrupt)?;
        let mut mac = self.mac()?;
        mac.update(&canonical_serialize(&snapshot.data, &snapshot.memo)?);
        mac.verify_slice(&claimed).map_err(|_| ChecksumError::Corrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        let data = json!({"count": 1, "title": "hi"});
        let memo = json!({"id": "abc", "name": "counter"});
        Snapshot::new(
            data.as_object().cloned().unwrap_or_default(),
            memo.as_object().cloned().unwrap_or_default(),
        )
    }

    #[test]
    fn stamped_snapshot_verifies() {
        let checksum = Checksum::new("secret");
        let mut snap = sample();
        checksum.stamp(&mut snap).unwrap();
        assert_eq!(snap.checksum.len(), 64);
        assert!(checksum.verify(&snap).is_ok());
    }

    #[test]
    fn generation_is_deterministic() {
        let checksum = Checksum::new("secret");
        let snap = sample();
        let a = checksum.generate(&snap.data, &snap.memo).unwrap();
        let b = checksum.generate(&snap.data, &snap.memo).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_key_rejects() {
        let mut snap = sample();
        Checksum::new("one").stamp(&mut snap).unwrap();
        assert_eq!(Checksum::new("two").verify(&snap), Err(ChecksumError::Corrupt));
    }

    #[test]
    fn garbage_checksum_rejects() {
        let mut snap = sample();
        snap.checksum = "not-hex".to_string();
        assert_eq!(Checksum::new("k").verify(&snap), Err(ChecksumError::Corrupt));
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash(b"a"), content_hash(b"a"));
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    proptest! {
        #[test]
        fn any_data_tamper_is_rejected(original in any::<i64>(), tampered in any::<i64>()) {
            prop_assume!(original != tampered);
            let checksum = Checksum::new("secret");
            let mut snap = sample();
            snap.data.insert("count".into(), json!(original));
            checksum.stamp(&mut snap).unwrap();
            prop_assert!(checksum.verify(&snap).is_ok());

            snap.data.insert("count".into(), json!(tampered));
            prop_assert_eq!(checksum.verify(&snap), Err(ChecksumError::Corrupt));
        }

        #[test]
        fn any_memo_tamper_is_rejected(name in "[a-z]{1,12}") {
            prop_assume!(name != "counter");
            let checksum = Checksum::new("secret");
            let mut snap = sample();
            checksum.stamp(&mut snap).unwrap();
            snap.memo.insert("name".into(), json!(name));
            prop_assert_eq!(checksum.verify(&snap), Err(ChecksumError::Corrupt));
        }
    }
}
