//! Output memory allocated by the vendor library.

use std::ptr::NonNull;

use zeroize::Zeroize;

/// A buffer the vendor library allocated with `malloc` and handed to us.
///
/// The contents are zeroized and the allocation `free`d on drop, so device
/// output (random bytes, recovered plaintext) never outlives its copy.
pub struct ForeignBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl ForeignBuffer {
    /// Take ownership of `len` bytes at `ptr`.
    ///
    /// Returns `None` for a null pointer. A non-null pointer is owned (and
    /// freed) even when `len` is zero.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a `malloc` allocation of at least
    /// `len` bytes that nothing else will free.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len })
    }

    /// Take ownership of a NUL-terminated string; the terminator is kept.
    ///
    /// # Safety
    ///
    /// Same as [`ForeignBuffer::from_raw`], with `ptr` NUL-terminated.
    pub unsafe fn from_c_string(ptr: *mut std::os::raw::c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let len = libc::strlen(ptr).saturating_add(1);
        Self::from_raw(ptr.cast::<u8>(), len)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for ForeignBuffer {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: `from_raw` contract guarantees `len` readable bytes owned by us.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for ForeignBuffer {
    fn drop(&mut self) {
        // SAFETY: we own the allocation; it is freed exactly once, here.
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len).zeroize();
            libc::free(self.ptr.as_ptr().cast::<libc::c_void>());
        }
    }
}

impl std::fmt::Debug for ForeignBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
