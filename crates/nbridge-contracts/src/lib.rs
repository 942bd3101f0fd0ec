//! Shared, version-pinned identifiers.
//!
//! These constants are the single source of truth for schema strings, marker
//! symbol names and diagnostic codes that appear in machine-readable I/O or
//! must match between the capability markers and the reachability checker.

pub const NBRIDGE_LINK_CONFIG_SCHEMA_VERSION: &str = "nbridge.link-config@0.1.0";
pub const NBRIDGE_CALL_GRAPH_SCHEMA_VERSION: &str = "nbridge.callgraph@0.1.0";
pub const NBRIDGE_DIAG_SCHEMA_VERSION: &str = "nbridge.diag@0.1.0";
pub const NBRIDGE_FEATURES_REPORT_SCHEMA_VERSION: &str = "nbridge.features.report@0.1.0";

// Keep in sync with the `#[no_mangle]` markers in `nbridge_caps::unsupported`.
pub const MARKER_SYMBOL_PREFIX: &str = "nbridge_unsupported_";
pub const MARKER_RUST_PATH_PREFIX: &str = "nbridge_caps::unsupported::";

pub const DIAG_UNSUPPORTED_FEATURE: &str = "NB-REACH-UNSUPPORTED-0001";
pub const DIAG_GRAPH_INVALID: &str = "NB-REACH-GRAPH-0001";
