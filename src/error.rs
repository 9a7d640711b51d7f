use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the prover's input artifacts is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Graph,
    Path,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Graph => f.write_str("graph description"),
            InputKind::Path => f.write_str("path description"),
        }
    }
}

/// Conditions that are reported but never stop a sweep or an extraction
#[derive(Debug, Error)]
pub enum SweepIssue {
    #[error("missing {kind} for {bench} (addr {addr}, size {size}): {path:?}")]
    MissingInputArtifact {
        kind: InputKind,
        bench: String,
        addr: u32,
        size: u32,
        path: PathBuf,
    },

    #[error("prover exited with {} for {trial}", exit_label(.code))]
    ProcessNonzeroExit { trial: String, code: Option<i32> },

    #[error("no log file at {0:?}")]
    MissingLogFile(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
