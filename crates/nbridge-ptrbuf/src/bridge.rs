use crate::addr::{RawAddr, RawRegion};
use crate::buffer::{Buffer, ByteBuffer, Provenance};

/// Address recovery is unsupported for this buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("unsupported for this buffer: not backed by a native pointer")]
    NotBridged,
    #[error("unsupported for this buffer: buffer is read-only")]
    ReadOnly,
}

/// Wraps `size` bytes of native memory at `ptr` as a [`ByteBuffer`].
///
/// The returned buffer has capacity `size`, position 0 and limit `size`, is
/// writable, and reads and writes `ptr` directly. Nothing is copied.
///
/// # Safety
///
/// `ptr` must point to `size` contiguous, allocated bytes that stay valid and
/// in place for as long as the returned buffer, or any buffer derived from it,
/// is used. Nothing here checks this. Reads and writes through buffers over
/// overlapping memory, from this or any other thread, must be synchronized by
/// the caller.
pub unsafe fn wrap_pointer_byte(ptr: RawAddr, size: usize) -> ByteBuffer {
    ByteBuffer::over_region(RawRegion::new(ptr, size))
}

/// Returns true iff `buffer` is backed by a native pointer.
///
/// Read-only views over a native region count. When this returns true and
/// the buffer is writable, [`pointer`] succeeds.
pub fn has_pointer<B: Buffer + ?Sized>(buffer: &B) -> bool {
    matches!(buffer.provenance(), Provenance::Region(_))
}

/// Returns the native address `buffer` aliases.
///
/// Fails for buffers that are not pointer-backed, and for read-only ones: the
/// address grants write access, which would defeat the read-only view.
pub fn pointer<B: Buffer + ?Sized>(buffer: &B) -> Result<RawAddr, CapabilityError> {
    match buffer.provenance() {
        Provenance::Region(region) if region.is_read_only() || buffer.is_read_only() => {
            tracing::trace!(base = ?region.base(), "refusing address of read-only buffer");
            Err(CapabilityError::ReadOnly)
        }
        Provenance::Region(region) => Ok(region.base()),
        Provenance::Array => Err(CapabilityError::NotBridged),
    }
}
