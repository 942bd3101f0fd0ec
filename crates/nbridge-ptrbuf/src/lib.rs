//! Byte buffers that alias native memory.
//!
//! A [`ByteBuffer`] is either backed by storage it owns, or by a raw native
//! region it merely aliases. Region-backed buffers are created with
//! [`wrap_pointer_byte`]; reads and writes through them go straight to the
//! native memory, and [`pointer`] hands the address back.
//!
//! The bridge never allocates, frees or validates native memory. Keeping the
//! region alive and coordinating concurrent access to it is the caller's job.

#![allow(clippy::missing_safety_doc)]

mod addr;
mod bridge;
mod buffer;
pub mod ffi;

pub use addr::{RawAddr, RawRegion};
pub use bridge::{has_pointer, pointer, wrap_pointer_byte, CapabilityError};
pub use buffer::{Buffer, BufferError, ByteBuffer, Provenance};
