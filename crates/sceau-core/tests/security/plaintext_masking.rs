//! Recovered plaintext and key material never appear in formatted output.

use sceau_core::{ExportMode, HsmError, SecretBuffer, Session, SimulatedFleet};

const MARKER: &[u8] = b"MARKER-7f3a9c-do-not-log";

#[test]
fn unlocked_plaintext_is_masked_in_debug_and_display() {
    let fleet = SimulatedFleet::from_seed(b"masking");
    let mut session = Session::from_transport(fleet.element("ZK-M1"));
    let envelope = session
        .lock(MARKER, ExportMode::BufferBound)
        .expect("lock should succeed");
    let plaintext: SecretBuffer = session
        .unlock_envelope(&envelope)
        .expect("unlock should succeed");

    let marker = std::str::from_utf8(MARKER).unwrap();
    assert!(!format!("{plaintext:?}").contains(marker));
    assert!(!format!("{plaintext}").contains(marker));
    assert_eq!(plaintext.expose(), MARKER);
}

#[test]
fn envelope_debug_does_not_contain_plaintext() {
    let fleet = SimulatedFleet::from_seed(b"masking");
    let mut session = Session::from_transport(fleet.element("ZK-M1"));
    let envelope = session
        .lock(MARKER, ExportMode::DeviceBound)
        .expect("lock should succeed");
    let marker = std::str::from_utf8(MARKER).unwrap();
    assert!(!format!("{envelope:?}").contains(marker));
}

#[test]
fn errors_do_not_carry_envelope_bytes() {
    let fleet = SimulatedFleet::from_seed(b"masking");
    let mut session = Session::from_transport(fleet.element("ZK-M1"));
    let mut tampered = session
        .lock(MARKER, ExportMode::DeviceBound)
        .expect("lock should succeed")
        .into_bytes();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;

    let err = session
        .unlock(&tampered, ExportMode::DeviceBound)
        .expect_err("tampered envelope must be rejected");
    assert!(matches!(err, HsmError::KeyMismatch));
    let rendered = format!("{err} {err:?}");
    assert!(!rendered.contains("MARKER"));
}
