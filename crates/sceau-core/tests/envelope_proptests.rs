#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the lock/unlock round-trip law.

use proptest::prelude::*;
use sceau_core::{ExportMode, HsmError, Session, SimulatedFleet};

fn mode() -> impl Strategy<Value = ExportMode> {
    prop_oneof![Just(ExportMode::BufferBound), Just(ExportMode::DeviceBound)]
}

proptest! {
    /// unlock(lock(b, m), m) == b for every non-empty b and both modes.
    #[test]
    fn lock_unlock_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 1..4096),
        mode in mode(),
    ) {
        let fleet = SimulatedFleet::from_seed(b"envelope proptests");
        let mut session = Session::from_transport(fleet.element("ZK-P1"));
        let envelope = session.lock(&plaintext, mode).expect("lock should succeed");
        let recovered = session
            .unlock(envelope.as_bytes(), mode)
            .expect("unlock should succeed");
        prop_assert_eq!(recovered.expose(), plaintext.as_slice());
    }

    /// The envelope is never the plaintext itself.
    #[test]
    fn envelope_differs_from_plaintext(
        plaintext in proptest::collection::vec(any::<u8>(), 1..512),
        mode in mode(),
    ) {
        let fleet = SimulatedFleet::from_seed(b"envelope proptests");
        let mut session = Session::from_transport(fleet.element("ZK-P1"));
        let envelope = session.lock(&plaintext, mode).expect("lock should succeed");
        prop_assert_ne!(envelope.as_bytes(), plaintext.as_slice());
    }

    /// Flipping any single envelope byte makes unlock fail, never return data.
    #[test]
    fn any_bit_flip_is_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        mode in mode(),
    ) {
        let fleet = SimulatedFleet::from_seed(b"envelope proptests");
        let mut session = Session::from_transport(fleet.element("ZK-P1"));
        let mut bytes = session
            .lock(&plaintext, mode)
            .expect("lock should succeed")
            .into_bytes();
        let at = index.index(bytes.len());
        bytes[at] ^= 0x01;
        let result = session.unlock(&bytes, mode);
        prop_assert!(matches!(result, Err(HsmError::KeyMismatch)));
    }
}
