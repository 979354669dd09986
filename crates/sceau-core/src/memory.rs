//! Host-side homes for secret bytes.
//!
//! - [`SecretBuffer`]: plaintext handed back by unlock, any length.
//! - [`SecretBytes`]: fixed-size key material (the simulated element's
//!   AES keys).
//!
//! Each wipes its bytes when dropped, pins its heap pages with `mlock` when
//! the kernel allows it, and never prints its contents.

use std::fmt;

use secrecy::{ExposeSecret, SecretSlice};
use zeroize::Zeroize;

use crate::error::HsmError;

// ---------------------------------------------------------------------------
// Page pinning
// ---------------------------------------------------------------------------

/// Pins a heap range in RAM until dropped.
///
/// Only ever built over memory whose address is stable for the owner's
/// lifetime (a boxed slice or array), so the range released on drop is the
/// range that was pinned.
struct PinnedPages {
    addr: *const u8,
    len: usize,
    pinned: bool,
}

// SAFETY: `addr` is passed to mlock/munlock only and never read through.
unsafe impl Send for PinnedPages {}
unsafe impl Sync for PinnedPages {}

impl PinnedPages {
    fn pin(bytes: &[u8]) -> Self {
        let pinned = platform::try_mlock(bytes.as_ptr(), bytes.len());
        if !pinned && !bytes.is_empty() {
            static ONCE: std::sync::Once = std::sync::Once::new();
            ONCE.call_once(|| {
                tracing::warn!("mlock refused; secrets may reach swap (check RLIMIT_MEMLOCK)");
            });
        }
        Self {
            addr: bytes.as_ptr(),
            len: bytes.len(),
            pinned,
        }
    }
}

impl Drop for PinnedPages {
    fn drop(&mut self) {
        if self.pinned {
            platform::try_munlock(self.addr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer
// ---------------------------------------------------------------------------

/// Plaintext of arbitrary length; wiped on drop.
pub struct SecretBuffer {
    // Declared before `pages`: the bytes are wiped before they are unpinned.
    inner: SecretSlice<u8>,
    pages: PinnedPages,
}

impl SecretBuffer {
    /// Copy `data` into fresh heap memory owned by the buffer.
    ///
    /// `data` itself is left untouched; wiping it is the caller's job.
    ///
    /// # Errors
    ///
    /// [`HsmError::SecureMemory`] when the allocation is refused.
    pub fn new(data: &[u8]) -> Result<Self, HsmError> {
        let mut owned = Vec::new();
        owned
            .try_reserve_exact(data.len())
            .map_err(|e| HsmError::SecureMemory(format!("cannot allocate {} bytes: {e}", data.len())))?;
        owned.extend_from_slice(data);
        let inner: SecretSlice<u8> = owned.into();
        let pages = PinnedPages::pin(inner.expose_secret());
        Ok(Self { inner, pages })
    }

    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    /// Whether `mlock` accepted the buffer's pages.
    #[must_use]
    pub const fn is_mlocked(&self) -> bool {
        self.pages.pinned
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N>
// ---------------------------------------------------------------------------

/// `N` bytes of key material in a box that never moves; wiped on drop.
pub struct SecretBytes<const N: usize> {
    bytes: Box<[u8; N]>,
    pages: PinnedPages,
}

impl<const N: usize> SecretBytes<N> {
    /// Allocate zeroed storage, let `fill` write the key in place, then pin it.
    ///
    /// The key is never staged on the stack.
    ///
    /// # Errors
    ///
    /// Whatever `fill` returns; the storage is wiped before it is freed.
    pub fn try_fill<E>(fill: impl FnOnce(&mut [u8; N]) -> Result<(), E>) -> Result<Self, E> {
        let mut bytes = Box::new([0u8; N]);
        if let Err(e) = fill(&mut *bytes) {
            bytes.zeroize();
            return Err(e);
        }
        let pages = PinnedPages::pin(bytes.as_slice());
        Ok(Self { bytes, pages })
    }

    #[must_use]
    pub fn expose(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Whether `mlock` accepted the key's pages.
    #[must_use]
    pub const fn is_mlocked(&self) -> bool {
        self.pages.pinned
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

// ---------------------------------------------------------------------------
// Core dumps
// ---------------------------------------------------------------------------

/// Disable core dumps for the current process (`RLIMIT_CORE = 0` on Unix,
/// no-op elsewhere).
///
/// # Errors
///
/// Returns [`HsmError::SecureMemory`] if `setrlimit` fails.
pub fn disable_core_dumps() -> Result<(), HsmError> {
    platform::disable_core_dumps_impl()
}

#[cfg(unix)]
mod platform {
    use crate::error::HsmError;

    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock validates the range itself and reports ENOMEM.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: failure is non-critical and ignored.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }

    pub(super) fn disable_core_dumps_impl() -> Result<(), HsmError> {
        let limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: standard POSIX call with a valid rlimit pointer.
        let ret = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const limit) };
        if ret != 0 {
            return Err(HsmError::SecureMemory(
                "failed to disable core dumps via RLIMIT_CORE".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod platform {
    use crate::error::HsmError;

    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}

    pub(super) fn disable_core_dumps_impl() -> Result<(), HsmError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
