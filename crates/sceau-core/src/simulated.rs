//! Software secure element — a [`DeviceTransport`] that runs entirely on the
//! host.
//!
//! Used by the test suites and by the CLI's `--simulate` backend. It keeps
//! the device contract (opaque envelopes, device-chosen sizes, device-side
//! entropy, key mismatch detection) without any hardware.
//!
//! # Key hierarchy
//!
//! ```text
//! fleet seed ──► HKDF-SHA256("sceau-sim-fleet-v1")            ──► fleet key   (buffer-bound)
//!            └─► HKDF-SHA256("sceau-sim-device-v1", serial)  ──► device key  (device-bound)
//! ```
//!
//! # Envelope bytes
//!
//! `marker (0xE5) || nonce (12) || ciphertext || tag (16)`, AES-256-GCM with
//! the mode as associated data. Always [`ENVELOPE_OVERHEAD`] bytes longer than
//! the plaintext; callers must not rely on that, real devices differ.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use ring::{aead, hkdf};
use zeroize::{Zeroize, Zeroizing};

use crate::envelope::ExportMode;
use crate::error::{DeviceFault, Operation};
use crate::memory::SecretBytes;
use crate::transport::{DeviceTransport, TimePrecision};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// First byte of every simulated envelope.
pub const ENVELOPE_MARKER: u8 = 0xE5;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Bytes added to the plaintext by a simulated lock.
pub const ENVELOPE_OVERHEAD: usize = 1 + NONCE_LEN + TAG_LEN;

const FLEET_SALT: &[u8] = b"sceau-sim-fleet-v1";
const DEVICE_SALT: &[u8] = b"sceau-sim-device-v1";
const FLEET_INFO: &[u8] = b"fleet-envelope-key";

/// Generic I/O failure status.
const STATUS_EIO: i32 = -5;
/// Envelope not authentic under the selected key.
const STATUS_EBADMSG: i32 = -74;

const MODEL_NUMBER: &str = "SIM-ZK4i";

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

const KEY_LEN: usize = 32;

/// Requests a 256-bit output from `hkdf::Prk::expand`.
struct EnvelopeKeyType;

impl hkdf::KeyType for EnvelopeKeyType {
    fn len(&self) -> usize {
        KEY_LEN
    }
}

/// HKDF-SHA256(`ikm`, `salt`, `info`) written straight into pinned storage.
fn derive_key(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<SecretBytes<KEY_LEN>, DeviceFault> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(ikm);
    let info = [info];
    let okm = prk
        .expand(&info, EnvelopeKeyType)
        .map_err(|_| DeviceFault::Status(STATUS_EIO))?;
    SecretBytes::try_fill(|key| okm.fill(key).map_err(|_| DeviceFault::Status(STATUS_EIO)))
}

const fn mode_aad(mode: ExportMode) -> [u8; 1] {
    match mode {
        ExportMode::BufferBound => [0x01],
        ExportMode::DeviceBound => [0x02],
    }
}

// ---------------------------------------------------------------------------
// Fleet
// ---------------------------------------------------------------------------

/// A set of simulated elements sharing one fleet key.
///
/// Elements keep the seed and derive their keys on each lock/unlock, so a
/// derivation failure surfaces as a device fault on that call.
pub struct SimulatedFleet {
    seed: Arc<Zeroizing<Vec<u8>>>,
}

impl SimulatedFleet {
    /// Deterministic fleet: the same seed always yields the same keys, so
    /// envelopes survive process restarts.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        Self {
            seed: Arc::new(Zeroizing::new(seed.to_vec())),
        }
    }

    /// Fleet with a fresh seed from the OS CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let fleet = Self::from_seed(&seed);
        seed.zeroize();
        fleet
    }

    /// Create the element with the given serial number.
    #[must_use]
    pub fn element(&self, serial: &str) -> SimulatedElement {
        SimulatedElement {
            serial: serial.to_owned(),
            seed: Arc::clone(&self.seed),
            cpu_temperature: 42.0,
            battery_voltage: 3.1,
            probe: ElementProbe::default(),
        }
    }

    /// `Session::open`-compatible connector.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches hardware connectors.
    pub fn connect(&self, serial: &str) -> Result<SimulatedElement, DeviceFault> {
        Ok(self.element(serial))
    }
}

// ---------------------------------------------------------------------------
// Probe — shared view for tests and diagnostics
// ---------------------------------------------------------------------------

/// Status LED state of a simulated element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    Off,
    On,
    Flashing {
        on_ms: u32,
        off_ms: u32,
        count: u32,
    },
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: usize,
    released: bool,
    pending_failure: Option<(Operation, i32)>,
    malformed_output: bool,
    led: LedState,
}

/// Handle onto a simulated element's counters and fault injection.
///
/// Clones share state with the element, so a probe taken before the element
/// moves into a session keeps working afterwards.
#[derive(Debug, Clone, Default)]
pub struct ElementProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ElementProbe {
    fn state(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of transport calls made so far (including failed ones).
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    /// Whether the handle has been released by a successful close.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state().released
    }

    /// Make the next call of `operation` fail with `code`.
    pub fn fail_next(&self, operation: Operation, code: i32) {
        self.state().pending_failure = Some((operation, code));
    }

    /// When set, data-producing calls report success with bad output.
    pub fn set_malformed_output(&self, malformed: bool) {
        self.state().malformed_output = malformed;
    }

    #[must_use]
    pub fn led(&self) -> LedState {
        self.state().led
    }

    /// Record a call; returns the malformed-output flag or the injected failure.
    fn enter(&self, operation: Operation) -> Result<bool, DeviceFault> {
        let mut state = self.state();
        state.calls = state.calls.saturating_add(1);
        match state.pending_failure {
            Some((op, code)) if op == operation => {
                state.pending_failure = None;
                Err(DeviceFault::Status(code))
            }
            _ => Ok(state.malformed_output),
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// Output buffer staged by a simulated element; zeroized on release.
pub struct SimulatedBuffer(Zeroizing<Vec<u8>>);

impl AsRef<[u8]> for SimulatedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn staged(bytes: Vec<u8>) -> Option<SimulatedBuffer> {
    Some(SimulatedBuffer(Zeroizing::new(bytes)))
}

/// A host-only secure element.
pub struct SimulatedElement {
    serial: String,
    seed: Arc<Zeroizing<Vec<u8>>>,
    cpu_temperature: f32,
    battery_voltage: f32,
    probe: ElementProbe,
}

impl SimulatedElement {
    /// Override the sensor readings.
    #[must_use]
    pub fn with_sensors(mut self, cpu_temperature: f32, battery_voltage: f32) -> Self {
        self.cpu_temperature = cpu_temperature;
        self.battery_voltage = battery_voltage;
        self
    }

    /// Shared handle onto this element's counters.
    #[must_use]
    pub fn probe(&self) -> ElementProbe {
        self.probe.clone()
    }

    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn derived_key(&self, mode: ExportMode) -> Result<SecretBytes<KEY_LEN>, DeviceFault> {
        match mode {
            ExportMode::BufferBound => derive_key(&self.seed, FLEET_SALT, FLEET_INFO),
            ExportMode::DeviceBound => derive_key(&self.seed, DEVICE_SALT, self.serial.as_bytes()),
        }
    }

    fn key_for(&self, mode: ExportMode) -> Result<aead::LessSafeKey, DeviceFault> {
        let key = self.derived_key(mode)?;
        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose())
            .map_err(|_| DeviceFault::Status(STATUS_EIO))?;
        Ok(aead::LessSafeKey::new(unbound))
    }

    fn info(&self, operation: Operation, value: &str) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        if self.probe.enter(operation)? {
            return Ok(None);
        }
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        Ok(staged(bytes))
    }
}

impl DeviceTransport for SimulatedElement {
    type Staged = SimulatedBuffer;

    fn close(&mut self) -> Result<(), DeviceFault> {
        self.probe.enter(Operation::Close)?;
        self.probe.state().released = true;
        Ok(())
    }

    fn random_bytes(&mut self, len: usize) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        let malformed = self.probe.enter(Operation::RandomBytes)?;
        let produced = if malformed { len.saturating_sub(1) } else { len };
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(produced)
            .map_err(|_| DeviceFault::Status(STATUS_EIO))?;
        bytes.resize(produced, 0);
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| DeviceFault::Status(STATUS_EIO))?;
        Ok(staged(bytes))
    }

    fn lock(
        &mut self,
        plaintext: &[u8],
        mode: ExportMode,
    ) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        if self.probe.enter(Operation::Lock)? {
            return Ok(None);
        }
        let key = self.key_for(mode)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| DeviceFault::Status(STATUS_EIO))?;
        let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        let Ok(tag) = key.seal_in_place_separate_tag(
            nonce,
            aead::Aad::from(mode_aad(mode)),
            &mut in_out,
        ) else {
            in_out.zeroize();
            return Err(DeviceFault::Status(STATUS_EIO));
        };

        let mut out = Vec::with_capacity(plaintext.len().saturating_add(ENVELOPE_OVERHEAD));
        out.push(ENVELOPE_MARKER);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        out.extend_from_slice(tag.as_ref());
        Ok(staged(out))
    }

    fn unlock(
        &mut self,
        envelope: &[u8],
        mode: ExportMode,
    ) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        if self.probe.enter(Operation::Unlock)? {
            return Ok(None);
        }
        let Some((&marker, rest)) = envelope.split_first() else {
            return Err(DeviceFault::Rejected(STATUS_EBADMSG));
        };
        if marker != ENVELOPE_MARKER || rest.len() < NONCE_LEN.saturating_add(TAG_LEN) {
            return Err(DeviceFault::Rejected(STATUS_EBADMSG));
        }
        let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let key = self.key_for(mode)?;
        let mut in_out = Zeroizing::new(sealed.to_vec());
        let plaintext = key
            .open_in_place(
                aead::Nonce::assume_unique_for_key(nonce),
                aead::Aad::from(mode_aad(mode)),
                &mut in_out,
            )
            .map_err(|_| DeviceFault::Rejected(STATUS_EBADMSG))?;
        Ok(staged(plaintext.to_vec()))
    }

    fn time(&mut self, _precision: TimePrecision) -> Result<u32, DeviceFault> {
        self.probe.enter(Operation::Time)?;
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| DeviceFault::Status(STATUS_EIO))?
            .as_secs();
        u32::try_from(secs).map_err(|_| DeviceFault::Status(STATUS_EIO))
    }

    fn model_number(&mut self) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        self.info(Operation::ModelNumber, MODEL_NUMBER)
    }

    fn firmware_version(&mut self) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        let version = concat!("sim-", env!("CARGO_PKG_VERSION"));
        self.info(Operation::FirmwareVersion, version)
    }

    fn serial_number(&mut self) -> Result<Option<SimulatedBuffer>, DeviceFault> {
        self.info(Operation::SerialNumber, &self.serial)
    }

    fn led_on(&mut self) -> Result<(), DeviceFault> {
        self.probe.enter(Operation::LedOn)?;
        self.probe.state().led = LedState::On;
        Ok(())
    }

    fn led_off(&mut self) -> Result<(), DeviceFault> {
        self.probe.enter(Operation::LedOff)?;
        self.probe.state().led = LedState::Off;
        Ok(())
    }

    fn led_flash(&mut self, on_ms: u32, off_ms: u32, count: u32) -> Result<(), DeviceFault> {
        self.probe.enter(Operation::LedFlash)?;
        self.probe.state().led = LedState::Flashing {
            on_ms,
            off_ms,
            count,
        };
        Ok(())
    }

    fn cpu_temperature(&mut self) -> Result<f32, DeviceFault> {
        self.probe.enter(Operation::CpuTemperature)?;
        Ok(self.cpu_temperature)
    }

    fn battery_voltage(&mut self) -> Result<f32, DeviceFault> {
        self.probe.enter(Operation::BatteryVoltage)?;
        Ok(self.battery_voltage)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
