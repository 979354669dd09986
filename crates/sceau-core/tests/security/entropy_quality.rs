//! Statistical sanity checks on device-sourced randomness.
//!
//! These are not a substitute for a full NIST SP 800-22 run; they catch
//! gross failures (stuck bytes, repeated buffers, truncated output).

use std::collections::HashSet;

use sceau_core::{Session, SimulatedElement, SimulatedFleet};

fn session() -> Session<SimulatedElement> {
    let fleet = SimulatedFleet::from_seed(b"entropy quality");
    Session::from_transport(fleet.element("ZK-Q1"))
}

/// Shannon entropy in bits per byte (maximum 8.0).
#[allow(clippy::cast_precision_loss)]
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] = counts[b as usize].saturating_add(1);
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[test]
fn device_random_bytes_have_high_entropy() {
    let mut s = session();
    let bytes = s.random_bytes(1 << 20).expect("random_bytes should succeed");
    let h = shannon_entropy(&bytes);
    assert!(h > 7.99, "entropy too low: {h:.4} bits/byte");
}

#[test]
fn chunked_reads_have_high_entropy() {
    let mut s = session();
    let mut buf = vec![0u8; 256 * 1024];
    s.fill_random(&mut buf).expect("fill_random should succeed");
    let h = shannon_entropy(&buf);
    assert!(h > 7.99, "entropy too low: {h:.4} bits/byte");
}

#[test]
fn no_repeated_buffers() {
    let mut s = session();
    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let bytes = s.random_bytes(32).expect("random_bytes should succeed");
        assert!(seen.insert(bytes), "device returned a repeated 32-byte buffer");
    }
}

#[test]
fn envelopes_of_same_plaintext_differ() {
    let mut s = session();
    let a = s
        .lock(b"same input", sceau_core::ExportMode::DeviceBound)
        .expect("lock should succeed");
    let b = s
        .lock(b"same input", sceau_core::ExportMode::DeviceBound)
        .expect("lock should succeed");
    assert_ne!(a.as_bytes(), b.as_bytes());
}
