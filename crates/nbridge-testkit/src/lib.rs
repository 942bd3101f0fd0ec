//! Test-only façade over an external source compiler.
//!
//! Tests hand source text or a directory of sources to an
//! [`ArtifactCompiler`] and get back every file the compilation produced, in
//! path order. Compile failures come back as [`CompilerError`] with the point
//! of the reported position.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

/// Position used when the compiler did not report one.
pub const NO_POSITION: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileInput {
    Source(String),
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{position}: {message}")]
pub struct CompilerError {
    /// Offset of the reported position; a single point even for ranges.
    pub position: i32,
    pub message: String,
}

impl CompilerError {
    pub fn new(position: i32, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub trait ArtifactCompiler {
    /// Compiles `input` and returns all files produced, sorted by path.
    fn compile(&self, input: &CompileInput) -> Result<Vec<PathBuf>, CompilerError>;
}

impl<F> ArtifactCompiler for F
where
    F: Fn(&CompileInput) -> Result<Vec<PathBuf>, CompilerError>,
{
    fn compile(&self, input: &CompileInput) -> Result<Vec<PathBuf>, CompilerError> {
        let mut out = self(input)?;
        out.sort();
        Ok(out)
    }
}

/// Machine-readable error line a compiler may print on stderr.
#[derive(Debug, Deserialize)]
struct ErrorLine {
    position: i32,
    message: String,
}

/// Runs an external compiler as
/// `<program> <args>... --out <dir> <source>...`.
///
/// Each compilation gets a fresh directory under `out_root`. On failure the
/// first stderr line that parses as `{"position": N, "message": "..."}` is
/// returned; otherwise the whole stderr with [`NO_POSITION`].
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: PathBuf,
    args: Vec<String>,
    out_root: PathBuf,
    source_file_name: String,
}

impl CommandCompiler {
    pub fn new(program: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            out_root: out_root.into(),
            source_file_name: "main.src".to_string(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// File name used when compiling [`CompileInput::Source`].
    pub fn source_file_name(mut self, name: impl Into<String>) -> Self {
        self.source_file_name = name.into();
        self
    }

    fn fresh_run_dir(&self) -> Result<PathBuf, CompilerError> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = self
            .out_root
            .join(format!("run_{}_{n}", std::process::id()));
        std::fs::create_dir_all(dir.join("out")).map_err(|err| {
            CompilerError::new(NO_POSITION, format!("create {}: {err}", dir.display()))
        })?;
        Ok(dir)
    }

    fn stage_sources(&self, run_dir: &Path, input: &CompileInput) -> Result<Vec<PathBuf>, CompilerError> {
        match input {
            CompileInput::Source(text) => {
                let src_dir = run_dir.join("src");
                let path = src_dir.join(&self.source_file_name);
                std::fs::create_dir_all(&src_dir)
                    .and_then(|_| std::fs::write(&path, text))
                    .map_err(|err| {
                        CompilerError::new(NO_POSITION, format!("write {}: {err}", path.display()))
                    })?;
                Ok(vec![path])
            }
            CompileInput::Directory(base) => list_files(base),
        }
    }
}

impl ArtifactCompiler for CommandCompiler {
    fn compile(&self, input: &CompileInput) -> Result<Vec<PathBuf>, CompilerError> {
        let run_dir = self.fresh_run_dir()?;
        let out_dir = run_dir.join("out");
        let sources = self.stage_sources(&run_dir, input)?;

        tracing::debug!(
            program = %self.program.display(),
            sources = sources.len(),
            out = %out_dir.display(),
            "invoking compiler"
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--out")
            .arg(&out_dir)
            .args(&sources)
            .output()
            .map_err(|err| {
                CompilerError::new(
                    NO_POSITION,
                    format!("run {}: {err}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = %output.status, "compiler failed");
            return Err(parse_error(&stderr).unwrap_or_else(|| {
                let msg = stderr.trim();
                if msg.is_empty() {
                    CompilerError::new(
                        NO_POSITION,
                        format!("compiler exited with {}", output.status),
                    )
                } else {
                    CompilerError::new(NO_POSITION, msg)
                }
            }));
        }

        list_files(&out_dir)
    }
}

fn parse_error(stderr: &str) -> Option<CompilerError> {
    stderr.lines().find_map(|line| {
        let line = serde_json::from_str::<ErrorLine>(line.trim()).ok()?;
        Some(CompilerError::new(line.position, line.message))
    })
}

fn list_files(base: &Path) -> Result<Vec<PathBuf>, CompilerError> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            CompilerError::new(NO_POSITION, format!("walk {}: {err}", base.display()))
        })?;
        if entry.file_type().is_file() {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_takes_first_json_line() {
        let stderr = "warning: something\n{\"position\": 12, \"message\": \"type mismatch\"}\n{\"position\": 3, \"message\": \"later\"}\n";
        assert_eq!(
            parse_error(stderr),
            Some(CompilerError::new(12, "type mismatch"))
        );
        assert_eq!(parse_error("plain failure\n"), None);
    }

    #[test]
    fn closures_are_compilers() {
        let compiler = |input: &CompileInput| match input {
            CompileInput::Source(src) if src.contains("oops") => {
                Err(CompilerError::new(4, "not found: oops"))
            }
            _ => Ok(vec![PathBuf::from("b.nir"), PathBuf::from("a.nir")]),
        };
        let out = compiler
            .compile(&CompileInput::Source("object A".to_string()))
            .unwrap();
        assert_eq!(out, [PathBuf::from("a.nir"), PathBuf::from("b.nir")]);

        let err = compiler
            .compile(&CompileInput::Source("oops".to_string()))
            .unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.to_string(), "4: not found: oops");
    }
}
