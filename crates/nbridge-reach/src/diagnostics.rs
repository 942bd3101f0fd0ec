use std::collections::BTreeMap;

use nbridge_contracts::NBRIDGE_DIAG_SCHEMA_VERSION;
use serde::Serialize;
use serde_json::Value;

use crate::graph::SourcePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    CallSite {
        function: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pos: Option<SourcePos>,
    },
    File {
        path: String,
    },
}

impl Location {
    fn sort_key(&self) -> String {
        match self {
            Location::CallSite { function, pos } => match pos {
                Some(pos) => format!("{function}@{pos}"),
                None => function.clone(),
            },
            Location::File { path } => path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl Diagnostic {
    pub fn error(code: &str, stage: Stage, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, stage, message)
    }

    fn new(code: &str, severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity,
            stage,
            message: message.into(),
            loc: None,
            notes: Vec::new(),
            data: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub schema_version: String,
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl Report {
    pub fn ok() -> Self {
        Self {
            schema_version: NBRIDGE_DIAG_SCHEMA_VERSION.to_string(),
            ok: true,
            diagnostics: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_diagnostics(mut self, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| {
            let ak = a.loc.as_ref().map(Location::sort_key).unwrap_or_default();
            let bk = b.loc.as_ref().map(Location::sort_key).unwrap_or_default();
            ak.cmp(&bk)
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| a.message.cmp(&b.message))
        });
        self.ok = diagnostics.iter().all(|d| d.severity != Severity::Error);
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_clear_ok() {
        let report = Report::ok().with_diagnostics(Vec::new());
        assert!(report.ok);

        let report = report.with_diagnostics(vec![Diagnostic::error("E", Stage::Link, "boom")]);
        assert!(!report.ok);
    }

    #[test]
    fn diagnostics_sort_by_location_then_code() {
        let mut b = Diagnostic::error("B", Stage::Link, "b");
        b.loc = Some(Location::CallSite {
            function: "app::a".to_string(),
            pos: None,
        });
        let mut a = Diagnostic::error("A", Stage::Link, "a");
        a.loc = Some(Location::CallSite {
            function: "app::b".to_string(),
            pos: None,
        });
        let c = Diagnostic::error("C", Stage::Parse, "c");
        let report = Report::ok().with_diagnostics(vec![a, b, c]);
        let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, ["C", "B", "A"]);
    }

    #[test]
    fn location_serializes_with_kind_tag() {
        let loc = Location::CallSite {
            function: "app::main".to_string(),
            pos: Some(SourcePos {
                file: "src/main.rs".to_string(),
                line: 1,
                col: 2,
            }),
        };
        let v = serde_json::to_value(&loc).unwrap();
        assert_eq!(v["kind"], "call_site");
        assert_eq!(v["pos"]["line"], 1);
    }
}
