//! Link-time check for reachable unsupported-feature markers.
//!
//! Given a call graph whose edges may be guarded by link-time capability
//! conditions, [`check_features`] folds the guards against a [`LinkConfig`],
//! walks everything reachable from the entry points and reports each marker
//! call for a capability the configuration does not provide.
//!
//! [`LinkConfig`]: nbridge_caps::LinkConfig

pub mod check;
pub mod diagnostics;
pub mod graph;

pub use check::{check_features, enforce, BuildAbort, GateOutcome, GateState, MarkerHit, ReachError};
pub use graph::{parse_call_graph, CallGraph, CallSite, FunctionNode, GraphError, LinkGuard, SourcePos};
