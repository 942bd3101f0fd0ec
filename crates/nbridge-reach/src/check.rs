use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use nbridge_caps::{Capability, LinkConfig};
use nbridge_contracts::DIAG_UNSUPPORTED_FEATURE;
use serde::Serialize;
use serde_json::json;

use crate::diagnostics::{Diagnostic, Location, Report, Stage};
use crate::graph::{CallGraph, GraphError, SourcePos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// No marker is reachable.
    Open,
    /// At least one is; the build must not proceed.
    Closed,
}

/// A reachable call to a capability marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerHit {
    pub capability: Capability,
    pub caller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<SourcePos>,
    /// Entry point first, marker symbol last.
    pub trail: Vec<String>,
    /// The capability is enabled, so the guard in front of the marker is
    /// missing or inverted.
    pub capability_enabled: bool,
}

impl fmt::Display for MarkerHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.capability_enabled {
            write!(
                f,
                "unsupported feature: {} (marker reachable although {} is enabled; guard missing or inverted)\n  at {}",
                self.capability,
                self.capability.describe(),
                self.caller
            )?;
        } else {
            write!(
                f,
                "unsupported feature: {} ({} is disabled)\n  at {}",
                self.capability,
                self.capability.describe(),
                self.caller
            )?;
        }
        if let Some(pos) = &self.pos {
            write!(f, " ({pos})")?;
        }
        write!(f, "\n  call path: {}", self.trail.join(" -> "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub state: GateState,
    /// Reachable marker calls. Non-empty iff the gate is closed.
    pub hits: Vec<MarkerHit>,
    pub checked: bool,
    pub reachable_functions: usize,
}

impl GateOutcome {
    fn skipped() -> Self {
        Self {
            state: GateState::Open,
            hits: Vec::new(),
            checked: false,
            reachable_functions: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    pub fn to_report(&self) -> Report {
        let mut diagnostics = Vec::new();
        for hit in &self.hits {
            let message = if hit.capability_enabled {
                format!(
                    "unsupported feature: marker for {} is reachable although {} is enabled",
                    hit.capability,
                    hit.capability.describe()
                )
            } else {
                format!(
                    "unsupported feature: {} is disabled in this build but reachable",
                    hit.capability.describe()
                )
            };
            let mut d = Diagnostic::error(DIAG_UNSUPPORTED_FEATURE, Stage::Link, message);
            d.loc = Some(call_site(hit));
            d.notes.push(format!("call path: {}", hit.trail.join(" -> ")));
            if hit.capability_enabled {
                d.notes
                    .push("the link-time guard in front of the marker is missing or inverted".to_string());
            } else {
                d.notes.push(format!(
                    "guard the call with a link-time check for {} or enable it in the link config",
                    hit.capability
                ));
            }
            d.data.insert("capability".to_string(), json!(hit.capability));
            d.data
                .insert("capability_enabled".to_string(), json!(hit.capability_enabled));
            d.data.insert("trail".to_string(), json!(hit.trail));
            diagnostics.push(d);
        }
        Report::ok()
            .with_diagnostics(diagnostics)
            .with_meta("check_features", json!(self.checked))
            .with_meta("gate", json!(self.state))
            .with_meta("reachable_functions", json!(self.reachable_functions))
    }

    pub fn into_result(self) -> Result<GateOutcome, BuildAbort> {
        match self.state {
            GateState::Open => Ok(self),
            GateState::Closed => Err(BuildAbort { hits: self.hits }),
        }
    }
}

fn call_site(hit: &MarkerHit) -> Location {
    Location::CallSite {
        function: hit.caller.clone(),
        pos: hit.pos.clone(),
    }
}

/// The build must stop: markers are reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAbort {
    pub hits: Vec<MarkerHit>,
}

impl fmt::Display for BuildAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hits = self.hits.iter();
        match hits.next() {
            Some(first) => write!(f, "{first}")?,
            None => f.write_str("unsupported feature detected")?,
        }
        let more = hits.count();
        if more > 0 {
            write!(f, "\n  ({more} more unsupported feature use(s))")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildAbort {}

#[derive(Debug, thiserror::Error)]
pub enum ReachError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Abort(#[from] BuildAbort),
}

/// Walks `graph` from its entry points, pruning edges whose link guard does
/// not hold under `config`, and collects reachable marker calls.
///
/// Every reachable marker closes the gate, whether or not `config` enables
/// its capability. Targets that name no function are external leaves. With
/// `config.check_features == false` the graph is still validated but nothing
/// is walked and the gate is open.
pub fn check_features(graph: &CallGraph, config: &LinkConfig) -> Result<GateOutcome, GraphError> {
    let functions = graph.index()?;
    if !config.check_features {
        tracing::info!("unsupported feature checking disabled");
        return Ok(GateOutcome::skipped());
    }

    // caller of each reached function; entry points map to None
    let mut parent: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut hits = Vec::new();

    for entry in &graph.entry_points {
        let entry = entry.as_str();
        if let Some(cap) = Capability::from_marker(entry) {
            hits.push(MarkerHit {
                capability: cap,
                caller: entry.to_string(),
                pos: None,
                trail: vec![entry.to_string()],
                capability_enabled: config.supports(cap),
            });
            continue;
        }
        if !functions.contains_key(entry) {
            tracing::warn!(entry, "entry point is not defined in the call graph");
        }
        if !parent.contains_key(entry) {
            parent.insert(entry, None);
            queue.push_back(entry);
        }
    }

    while let Some(name) = queue.pop_front() {
        let Some(node) = functions.get(name) else {
            continue;
        };
        for call in &node.calls {
            if let Some(guard) = &call.guard {
                if !guard.holds(config) {
                    continue;
                }
            }
            let target = call.target.as_str();
            if let Some(cap) = Capability::from_marker(target) {
                let mut trail = trail_to(&parent, name);
                trail.push(target.to_string());
                tracing::debug!(capability = %cap, caller = name, "marker reachable");
                hits.push(MarkerHit {
                    capability: cap,
                    caller: name.to_string(),
                    pos: call.pos.clone(),
                    trail,
                    capability_enabled: config.supports(cap),
                });
                continue;
            }
            if !parent.contains_key(target) {
                parent.insert(target, Some(name));
                queue.push_back(target);
            }
        }
    }

    let state = if hits.is_empty() {
        GateState::Open
    } else {
        GateState::Closed
    };
    tracing::info!(
        reachable = parent.len(),
        markers = hits.len(),
        "unsupported feature check finished"
    );
    Ok(GateOutcome {
        state,
        hits,
        checked: true,
        reachable_functions: parent.len(),
    })
}

/// [`check_features`], with a closed gate turned into [`BuildAbort`].
pub fn enforce(graph: &CallGraph, config: &LinkConfig) -> Result<GateOutcome, ReachError> {
    Ok(check_features(graph, config)?.into_result()?)
}

fn trail_to<'a>(parent: &BTreeMap<&'a str, Option<&'a str>>, mut name: &'a str) -> Vec<String> {
    let mut trail = vec![name.to_string()];
    while let Some(&Some(caller)) = parent.get(name) {
        trail.push(caller.to_string());
        name = caller;
    }
    trail.reverse();
    trail
}
