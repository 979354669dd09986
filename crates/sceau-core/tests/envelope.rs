#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Envelope handling across sessions, modes, and persistence.

use sceau_core::{Envelope, ExportMode, HsmError, Operation, Session, SimulatedFleet};

#[test]
fn envelope_persists_as_json_and_unlocks_later() {
    let fleet = SimulatedFleet::from_seed(b"envelope integration");
    let json = {
        let mut session = Session::from_transport(fleet.element("ZK-E1"));
        let envelope = session
            .lock(b"{\"apiKey\":\"k-123\"}", ExportMode::BufferBound)
            .expect("lock should succeed");
        serde_json::to_string(&envelope).unwrap()
    };
    assert!(json.contains("\"mode\":\"buffer-bound\""));

    let envelope: Envelope = serde_json::from_str(&json).unwrap();
    let mut session = Session::from_transport(fleet.element("ZK-E2"));
    let recovered = session
        .unlock_envelope(&envelope)
        .expect("unlock should succeed");
    assert_eq!(recovered.expose(), b"{\"apiKey\":\"k-123\"}");
}

#[test]
fn unlocking_with_the_other_mode_fails() {
    let fleet = SimulatedFleet::from_seed(b"envelope integration");
    let mut session = Session::from_transport(fleet.element("ZK-E1"));
    for (locked, wrong) in [
        (ExportMode::DeviceBound, ExportMode::BufferBound),
        (ExportMode::BufferBound, ExportMode::DeviceBound),
    ] {
        let envelope = session.lock(b"mode matters", locked).expect("lock");
        assert_eq!(envelope.mode(), locked);
        let result = session.unlock(envelope.as_bytes(), wrong);
        assert!(matches!(result, Err(HsmError::KeyMismatch)), "{locked} -> {wrong}");
    }
}

#[test]
fn envelope_recorded_mode_is_used_by_unlock_envelope() {
    let fleet = SimulatedFleet::from_seed(b"envelope integration");
    let mut session = Session::from_transport(fleet.element("ZK-E1"));
    let envelope = session
        .lock(b"recorded mode", ExportMode::DeviceBound)
        .expect("lock should succeed");
    let relabelled = Envelope::from_parts(ExportMode::BufferBound, envelope.as_bytes().to_vec());
    assert!(session.unlock_envelope(&envelope).is_ok());
    assert!(matches!(
        session.unlock_envelope(&relabelled),
        Err(HsmError::KeyMismatch)
    ));
}

#[test]
fn arbitrary_bytes_are_not_an_envelope() {
    let fleet = SimulatedFleet::from_seed(b"envelope integration");
    let mut session = Session::from_transport(fleet.element("ZK-E1"));
    for garbage in [&b"x"[..], b"not an envelope at all", &[0xE5; 8]] {
        let result = session.unlock(garbage, ExportMode::DeviceBound);
        assert!(matches!(result, Err(HsmError::KeyMismatch)));
    }
}

#[test]
fn device_failure_during_lock_is_reported_with_code() {
    let fleet = SimulatedFleet::from_seed(b"envelope integration");
    let element = fleet.element("ZK-E1");
    let probe = element.probe();
    let mut session = Session::from_transport(element);

    probe.fail_next(Operation::Lock, -12);
    let err = session
        .lock(b"payload", ExportMode::DeviceBound)
        .expect_err("lock should fail");
    assert!(matches!(
        err,
        HsmError::Device {
            operation: Operation::Lock,
            code: -12
        }
    ));
    assert_eq!(err.to_string(), "zkLockDataB2B() failed with code -12");
    assert!(!err.invalidates_session());

    // Session stays usable after a device error.
    assert!(session.lock(b"payload", ExportMode::DeviceBound).is_ok());
}
