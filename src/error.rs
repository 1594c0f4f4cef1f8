use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// External helper binary (adb) failed to spawn
    #[error("failed to spawn {program} (is it installed and on PATH?): {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External helper binary exited with non-zero status
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Accessibility dump was not well-formed XML
    #[error("snapshot parse error: {0}")]
    SnapshotParse(#[from] roxmltree::Error),

    /// Accessibility dump parsed but had an unexpected shape
    #[error("unexpected snapshot structure: {0}")]
    SnapshotStructure(String),

    #[error("invalid bounds '{0}': expected [x1,y1][x2,y2]")]
    InvalidBounds(String),

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    /// Reconciliation invoked before the pub/sub context was populated
    #[error("pub/sub context is not initialized: missing {0}")]
    ContextNotInitialized(&'static str),

    #[error("device output could not be interpreted: {0}")]
    DeviceOutput(String),

    #[error("command queue worker died: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
