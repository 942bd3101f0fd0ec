//! C ABI for embedding hosts.
//!
//! Buffers cross the boundary as opaque `ByteBuffer` handles owned by the
//! caller until passed to [`nbridge_buffer_free`]. Nothing here unwinds into
//! the host; failures are reported as `NBRIDGE_ERR_*_V1` codes.

use crate::addr::RawAddr;
use crate::bridge::{has_pointer, pointer, wrap_pointer_byte, CapabilityError};
use crate::buffer::ByteBuffer;

pub const NBRIDGE_OK: u32 = 0;

// Keep these in sync with the header.
pub const NBRIDGE_ERR_NULL_V1: u32 = 61001;
pub const NBRIDGE_ERR_NOT_BRIDGED_V1: u32 = 61002;
pub const NBRIDGE_ERR_READ_ONLY_V1: u32 = 61003;
pub const NBRIDGE_ERR_INTERNAL_V1: u32 = 61015;

fn capability_err_code(err: CapabilityError) -> u32 {
    match err {
        CapabilityError::NotBridged => NBRIDGE_ERR_NOT_BRIDGED_V1,
        CapabilityError::ReadOnly => NBRIDGE_ERR_READ_ONLY_V1,
    }
}

/// Same contract as [`wrap_pointer_byte`]. Returns null on internal failure.
#[no_mangle]
pub unsafe extern "C" fn nbridge_wrap_pointer_byte(ptr: *mut u8, len: usize) -> *mut ByteBuffer {
    std::panic::catch_unwind(|| unsafe {
        Box::into_raw(Box::new(wrap_pointer_byte(RawAddr::from_ptr(ptr), len)))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Read-only view of `buf`, or null if `buf` is null.
#[no_mangle]
pub unsafe extern "C" fn nbridge_buffer_as_read_only(buf: *const ByteBuffer) -> *mut ByteBuffer {
    std::panic::catch_unwind(|| unsafe {
        match buf.as_ref() {
            Some(buf) => Box::into_raw(Box::new(buf.as_read_only())),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// 1 if `buf` is pointer-backed, 0 otherwise (including null).
#[no_mangle]
pub unsafe extern "C" fn nbridge_has_pointer(buf: *const ByteBuffer) -> u32 {
    std::panic::catch_unwind(|| unsafe {
        match buf.as_ref() {
            Some(buf) => u32::from(has_pointer(buf)),
            None => 0,
        }
    })
    .unwrap_or(0)
}

/// Stores the address `buf` aliases in `*out`.
///
/// A null `buf` is not pointer-backed; only a null `out` is
/// `NBRIDGE_ERR_NULL_V1`.
#[no_mangle]
pub unsafe extern "C" fn nbridge_pointer(buf: *const ByteBuffer, out: *mut *mut u8) -> u32 {
    std::panic::catch_unwind(|| unsafe {
        if out.is_null() {
            return NBRIDGE_ERR_NULL_V1;
        }
        let Some(buf) = buf.as_ref() else {
            return NBRIDGE_ERR_NOT_BRIDGED_V1;
        };
        match pointer(buf) {
            Ok(addr) => {
                out.write(addr.as_ptr());
                NBRIDGE_OK
            }
            Err(err) => capability_err_code(err),
        }
    })
    .unwrap_or(NBRIDGE_ERR_INTERNAL_V1)
}

#[no_mangle]
pub unsafe extern "C" fn nbridge_buffer_free(buf: *mut ByteBuffer) {
    if !buf.is_null() {
        drop(Box::from_raw(buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_are_not_bridged() {
        unsafe {
            assert_eq!(nbridge_has_pointer(std::ptr::null()), 0);
            let mut out = std::ptr::null_mut();
            assert_eq!(
                nbridge_pointer(std::ptr::null(), &mut out),
                NBRIDGE_ERR_NOT_BRIDGED_V1
            );
            assert!(out.is_null());
            assert!(nbridge_buffer_as_read_only(std::ptr::null()).is_null());
            nbridge_buffer_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn null_out_param_is_rejected() {
        let mut mem = [0u8; 4];
        unsafe {
            let buf = nbridge_wrap_pointer_byte(mem.as_mut_ptr(), mem.len());
            assert_eq!(
                nbridge_pointer(buf, std::ptr::null_mut()),
                NBRIDGE_ERR_NULL_V1
            );
            nbridge_buffer_free(buf);
        }
    }

    #[test]
    fn wrap_then_pointer_round_trips() {
        let mut mem = [0u8; 8];
        unsafe {
            let buf = nbridge_wrap_pointer_byte(mem.as_mut_ptr(), mem.len());
            assert!(!buf.is_null());
            assert_eq!(nbridge_has_pointer(buf), 1);

            let mut out = std::ptr::null_mut();
            assert_eq!(nbridge_pointer(buf, &mut out), NBRIDGE_OK);
            assert_eq!(out, mem.as_mut_ptr());

            let ro = nbridge_buffer_as_read_only(buf);
            assert_eq!(nbridge_has_pointer(ro), 1);
            assert_eq!(nbridge_pointer(ro, &mut out), NBRIDGE_ERR_READ_ONLY_V1);

            nbridge_buffer_free(ro);
            nbridge_buffer_free(buf);
        }
    }

    #[test]
    fn array_handle_reports_not_bridged() {
        let buf = Box::into_raw(Box::new(ByteBuffer::allocate(4)));
        unsafe {
            assert_eq!(nbridge_has_pointer(buf), 0);
            let mut out = std::ptr::null_mut();
            assert_eq!(nbridge_pointer(buf, &mut out), NBRIDGE_ERR_NOT_BRIDGED_V1);
            assert!(out.is_null());
            nbridge_buffer_free(buf);
        }
    }
}
