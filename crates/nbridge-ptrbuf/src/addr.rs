use std::fmt;

/// Opaque native address.
///
/// Carries the address and nothing else. No arithmetic is exposed; the only
/// way to turn it back into something usable is [`RawAddr::as_ptr`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawAddr(*mut u8);

// SAFETY: a `RawAddr` is a plain address value. Every dereference goes through
// an `unsafe` entry point whose contract covers cross-thread access.
unsafe impl Send for RawAddr {}
unsafe impl Sync for RawAddr {}

impl RawAddr {
    pub const fn from_ptr(ptr: *mut u8) -> Self {
        Self(ptr)
    }

    pub const fn as_ptr(self) -> *mut u8 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl<T> From<*mut T> for RawAddr {
    fn from(ptr: *mut T) -> Self {
        Self(ptr.cast())
    }
}

impl fmt::Debug for RawAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawAddr({:p})", self.0)
    }
}

/// A native memory region aliased by a buffer: base address, length in bytes
/// and whether the aliasing view may write.
///
/// Regions are only minted by [`crate::wrap_pointer_byte`], so a region seen
/// through [`crate::Provenance`] always came from the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRegion {
    base: RawAddr,
    len: usize,
    read_only: bool,
}

impl RawRegion {
    pub(crate) fn new(base: RawAddr, len: usize) -> Self {
        Self {
            base,
            len,
            read_only: false,
        }
    }

    pub fn base(&self) -> RawAddr {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn to_read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }

    /// Reads the byte at `index`. The caller checks `index < len`.
    pub(crate) unsafe fn read(&self, index: usize) -> u8 {
        debug_assert!(index < self.len);
        self.base.as_ptr().add(index).read()
    }

    /// Writes the byte at `index`. The caller checks `index < len` and that
    /// the region is writable.
    pub(crate) unsafe fn write(&self, index: usize, value: u8) {
        debug_assert!(index < self.len && !self.read_only);
        self.base.as_ptr().add(index).write(value)
    }

    pub(crate) unsafe fn copy_out(&self, start: usize, dst: &mut [u8]) {
        debug_assert!(start + dst.len() <= self.len);
        if dst.is_empty() {
            return;
        }
        std::ptr::copy(self.base.as_ptr().add(start), dst.as_mut_ptr(), dst.len());
    }

    pub(crate) unsafe fn copy_in(&self, start: usize, src: &[u8]) {
        debug_assert!(start + src.len() <= self.len && !self.read_only);
        if src.is_empty() {
            return;
        }
        std::ptr::copy(src.as_ptr(), self.base.as_ptr().add(start), src.len());
    }
}
