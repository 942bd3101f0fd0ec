//! Capability registry shared by runtime code and the reachability checker.
//!
//! This crate exists so both:
//! - code that must refuse to run without an optional runtime capability
//! - the link-time checker that looks for such refusals
//!
//! can share an authoritative list of capabilities and their marker symbols.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nbridge_contracts::{MARKER_RUST_PATH_PREFIX, MARKER_SYMBOL_PREFIX};

pub mod config;
pub mod unsupported;

pub use config::{resolve_link_config, ConfigError, LinkConfig, LinkConfigOverrides};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Threads,
    VirtualThreads,
    Continuations,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Threads,
        Capability::VirtualThreads,
        Capability::Continuations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Threads => "threads",
            Capability::VirtualThreads => "virtual-threads",
            Capability::Continuations => "continuations",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "threads" => Some(Capability::Threads),
            "virtual-threads" => Some(Capability::VirtualThreads),
            "continuations" => Some(Capability::Continuations),
            _ => None,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Capability::Threads => "multithreading",
            Capability::VirtualThreads => "virtual threads",
            Capability::Continuations => "continuations",
        }
    }

    /// Unmangled symbol of the marker, as seen by native linkers.
    pub fn marker_symbol(self) -> &'static str {
        match self {
            Capability::Threads => "nbridge_unsupported_threads",
            Capability::VirtualThreads => "nbridge_unsupported_virtual_threads",
            Capability::Continuations => "nbridge_unsupported_continuations",
        }
    }

    /// Rust path of the marker wrapper.
    pub fn marker_path(self) -> &'static str {
        match self {
            Capability::Threads => "nbridge_caps::unsupported::threads",
            Capability::VirtualThreads => "nbridge_caps::unsupported::virtual_threads",
            Capability::Continuations => "nbridge_caps::unsupported::continuations",
        }
    }

    /// Maps a call target back to the capability whose marker it names.
    ///
    /// Both the unmangled symbol and the Rust path are accepted.
    pub fn from_marker(target: &str) -> Option<Self> {
        let target = target.trim();
        if !target.starts_with(MARKER_SYMBOL_PREFIX) && !target.starts_with(MARKER_RUST_PATH_PREFIX)
        {
            return None;
        }
        Capability::ALL
            .into_iter()
            .find(|c| c.marker_symbol() == target || c.marker_path() == target)
    }

    /// Calls this capability's marker. Always a no-op.
    pub fn mark(self) {
        match self {
            Capability::Threads => unsupported::threads(),
            Capability::VirtualThreads => unsupported::virtual_threads(),
            Capability::Continuations => unsupported::continuations(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability {value:?} (expected one of: threads, virtual-threads, continuations)")]
pub struct CapabilityParseError {
    value: String,
}

impl FromStr for Capability {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::parse(s).ok_or_else(|| CapabilityParseError {
            value: s.to_string(),
        })
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for Capability {
    fn value_variants<'a>() -> &'a [Self] {
        &Capability::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}
