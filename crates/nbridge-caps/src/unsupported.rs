//! Markers used to detect use of unsupported capabilities at link time.
//!
//! Call a marker only on a path guarded by a condition that is resolved from
//! the build configuration, e.g.
//!
//! ```ignore
//! fn spawn_worker(config: &LinkConfig) {
//!     if !config.multithreading {
//!         nbridge_caps::unsupported::threads(); // fails the build if reachable
//!     } else {
//!         run_worker();
//!     }
//! }
//! ```
//!
//! The reachability checker reports every marker that stays reachable once
//! guards are folded against the build configuration. Enforcement can be
//! turned off with `check_features = false`.
//!
//! Executed markers do nothing and return normally.
//!
//! Keep this list in sync with `Capability::marker_symbol` and the checker in
//! `nbridge-reach`; a new capability needs an entry on both sides.

use std::hint::black_box;

use crate::{Capability, LinkConfig};

// Distinct bodies keep the linker from folding the symbols together.

#[inline(never)]
#[no_mangle]
pub extern "C" fn nbridge_unsupported_threads() {
    black_box(Capability::Threads as u8);
}

#[inline(never)]
#[no_mangle]
pub extern "C" fn nbridge_unsupported_virtual_threads() {
    black_box(Capability::VirtualThreads as u8);
}

#[inline(never)]
#[no_mangle]
pub extern "C" fn nbridge_unsupported_continuations() {
    black_box(Capability::Continuations as u8);
}

#[inline(never)]
pub fn threads() {
    nbridge_unsupported_threads()
}

#[inline(never)]
pub fn virtual_threads() {
    nbridge_unsupported_virtual_threads()
}

#[inline(never)]
pub fn continuations() {
    nbridge_unsupported_continuations()
}

/// Returns whether `cap` is available under `config`, calling the marker
/// for `cap` on the unavailable arm.
pub fn guard(config: &LinkConfig, cap: Capability) -> bool {
    if config.supports(cap) {
        true
    } else {
        cap.mark();
        false
    }
}
