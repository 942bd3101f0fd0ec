use std::collections::BTreeMap;
use std::fmt;

use nbridge_caps::{Capability, LinkConfig};
use nbridge_contracts::NBRIDGE_CALL_GRAPH_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallGraph {
    pub schema_version: String,
    pub entry_points: Vec<String>,
    #[serde(default)]
    pub functions: Vec<FunctionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallSite {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<SourcePos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<LinkGuard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcePos {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub col: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Link-time condition on an edge: the call exists only when `capability`
/// is (or, with `enabled: false`, is not) provided by the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkGuard {
    pub capability: Capability,
    pub enabled: bool,
}

impl LinkGuard {
    pub fn holds(&self, config: &LinkConfig) -> bool {
        config.supports(self.capability) == self.enabled
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("parse call graph: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("call graph schema_version {found:?} (expected {:?})", NBRIDGE_CALL_GRAPH_SCHEMA_VERSION)]
    SchemaVersion { found: String },

    #[error("duplicate function in call graph: {0}")]
    DuplicateFunction(String),

    #[error("function name is empty (functions[{0}])")]
    EmptyName(usize),
}

pub fn parse_call_graph(bytes: &[u8]) -> Result<CallGraph, GraphError> {
    let graph: CallGraph = serde_json::from_slice(bytes)?;
    if graph.schema_version.trim() != NBRIDGE_CALL_GRAPH_SCHEMA_VERSION {
        return Err(GraphError::SchemaVersion {
            found: graph.schema_version,
        });
    }
    Ok(graph)
}

impl CallGraph {
    pub(crate) fn index(&self) -> Result<BTreeMap<&str, &FunctionNode>, GraphError> {
        let mut out = BTreeMap::new();
        for (idx, f) in self.functions.iter().enumerate() {
            if f.name.trim().is_empty() {
                return Err(GraphError::EmptyName(idx));
            }
            if out.insert(f.name.as_str(), f).is_some() {
                return Err(GraphError::DuplicateFunction(f.name.clone()));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_guarded_edges() {
        let raw = format!(
            r#"{{
  "schema_version": "{NBRIDGE_CALL_GRAPH_SCHEMA_VERSION}",
  "entry_points": ["app::main"],
  "functions": [
    {{"name": "app::main", "calls": [
      {{"target": "nbridge_unsupported_threads", "guard": {{"capability": "threads", "enabled": false}},
        "pos": {{"file": "src/main.rs", "line": 4, "col": 9}}}}
    ]}}
  ]
}}"#
        );
        let graph = parse_call_graph(raw.as_bytes()).unwrap();
        let call = &graph.functions[0].calls[0];
        let guard = call.guard.unwrap();
        assert_eq!(guard.capability, Capability::Threads);
        assert!(!guard.enabled);
        assert_eq!(call.pos.as_ref().unwrap().to_string(), "src/main.rs:4:9");
    }

    #[test]
    fn rejects_foreign_schema_and_unknown_capability() {
        let err = parse_call_graph(br#"{"schema_version":"other@1","entry_points":[]}"#)
            .unwrap_err();
        assert!(matches!(err, GraphError::SchemaVersion { .. }));

        let raw = format!(
            r#"{{"schema_version":"{NBRIDGE_CALL_GRAPH_SCHEMA_VERSION}","entry_points":["m"],
"functions":[{{"name":"m","calls":[{{"target":"x","guard":{{"capability":"gc","enabled":true}}}}]}}]}}"#
        );
        assert!(matches!(
            parse_call_graph(raw.as_bytes()),
            Err(GraphError::Parse(_))
        ));
    }

    #[test]
    fn guard_folds_against_config() {
        let config = LinkConfig {
            multithreading: true,
            virtual_threads: false,
            continuations: false,
            check_features: true,
        };
        let when_on = LinkGuard {
            capability: Capability::Threads,
            enabled: true,
        };
        let when_off = LinkGuard {
            enabled: false,
            ..when_on
        };
        assert!(when_on.holds(&config));
        assert!(!when_off.holds(&config));
    }

    #[test]
    fn index_rejects_duplicates() {
        let graph = CallGraph {
            schema_version: NBRIDGE_CALL_GRAPH_SCHEMA_VERSION.to_string(),
            entry_points: vec!["a".to_string()],
            functions: vec![
                FunctionNode {
                    name: "a".to_string(),
                    calls: Vec::new(),
                },
                FunctionNode {
                    name: "a".to_string(),
                    calls: Vec::new(),
                },
            ],
        };
        assert!(matches!(
            graph.index(),
            Err(GraphError::DuplicateFunction(name)) if name == "a"
        ));
    }
}
