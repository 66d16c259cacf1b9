/// Golden checksum test — verifies a frozen snapshot fixture against its
/// permanent checksum.
///
/// This test must NEVER be modified to match new behavior.
/// If it fails, previously issued snapshots would stop verifying.

use std::fs;

use wirestate_kernel::domain::Snapshot;
use wirestate_kernel::hashing::{Checksum, ChecksumError};
use wirestate_kernel::invariants::{contains_synthetic_shape, try_validate_snapshot};
use wirestate_kernel::PROTOCOL_VERSION;

const GOLDEN_KEY: &str = "golden-key";

fn load_snapshot(path: &str) -> Snapshot {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));
    serde_json::from_str(&data).expect("Failed to parse snapshot JSON")
}

fn load_expected_checksum(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
        .trim()
        .to_string()
}

#[test]
fn golden_checksum_matches() {
    let snap = load_snapshot("tests/golden/snapshot.json");
    let checksum = Checksum::new(GOLDEN_KEY)
        .generate(&snap.data, &snap.memo)
        .expect("checksum generation failed");

    let expected = load_expected_checksum("tests/golden/expected_checksum.txt");
    assert_eq!(
        checksum, expected,
        "GOLDEN TEST FAILED: the signed payload serialization has changed.\n\
         Got:      {}\n\
         Expected: {}",
        checksum, expected
    );
}

#[test]
fn golden_snapshot_verifies_and_is_well_formed() {
    let snap = load_snapshot("tests/golden/snapshot.json");
    Checksum::new(GOLDEN_KEY)
        .verify(&snap)
        .expect("golden snapshot must verify");
    try_validate_snapshot(&snap).expect("golden snapshot must be well formed");
    assert!(contains_synthetic_shape(&serde_json::Value::Object(snap.data.clone())));
}

#[test]
fn golden_snapshot_rejected_under_other_key() {
    let snap = load_snapshot("tests/golden/snapshot.json");
    assert_eq!(
        Checksum::new("another-key").verify(&snap),
        Err(ChecksumError::Corrupt)
    );
}

#[test]
fn reordered_memo_no_longer_verifies() {
    // Key order is part of the signed bytes.
    let mut snap = load_snapshot("tests/golden/snapshot.json");
    let locale = snap.memo.remove("locale").expect("fixture has locale");
    let mut reordered = serde_json::Map::new();
    reordered.insert("locale".to_string(), locale);
    reordered.extend(snap.memo);
    snap.memo = reordered;
    assert_eq!(
        Checksum::new(GOLDEN_KEY).verify(&snap),
        Err(ChecksumError::Corrupt)
    );
}

#[test]
fn protocol_version_is_one() {
    assert_eq!(PROTOCOL_VERSION, 1);
}
