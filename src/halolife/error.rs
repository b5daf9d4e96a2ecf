//! Error types for configuration, transport and run failures.

use thiserror::Error;

use super::comm::Tag;

/// Invalid run parameters, rejected before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("row count must be positive")]
    ZeroRows,
    #[error("column count must be positive")]
    ZeroCols,
    #[error("worker count must be positive")]
    ZeroWorkers,
    #[error("thread count per worker must be positive")]
    ZeroThreads,
    #[error("cannot split {rows} rows across {workers} workers (every worker needs at least one row)")]
    TooManyWorkers { rows: usize, workers: usize },
    #[error("rank {rank} is out of range for {workers} workers")]
    RankOutOfRange { rank: usize, workers: usize },
    #[error("initial grid is {got_rows}x{got_cols}, expected {rows}x{cols}")]
    InitialShape {
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
    #[error("grid of {rows}x{cols} cells overflows the address space")]
    GridTooLarge { rows: usize, cols: usize },
}

/// Failure of a point-to-point or collective operation. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommError {
    #[error("rank {rank}: timed out waiting for {tag:?} from rank {peer}")]
    Timeout { rank: usize, peer: usize, tag: Tag },
    #[error("rank {rank}: peer {peer} is gone")]
    Disconnected { rank: usize, peer: usize },
    #[error("rank {rank}: run aborted by rank {peer}")]
    Aborted { rank: usize, peer: usize },
    #[error("rank {rank}: malformed {tag:?} message from rank {peer}: {reason}")]
    Malformed {
        rank: usize,
        peer: usize,
        tag: Tag,
        reason: String,
    },
}

/// Anything that stops a run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("unable to allocate {bytes} bytes for grid buffers")]
    Allocation { bytes: usize },
    #[error("failed to build thread pool for rank {rank}: {reason}")]
    ThreadPool { rank: usize, reason: String },
    #[error("communication failure: {0}")]
    Comm(#[from] CommError),
    #[error("failed to spawn worker {rank}: {reason}")]
    Spawn { rank: usize, reason: String },
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
}

impl SimError {
    /// Errors that merely echo another worker's failure.
    pub(crate) fn is_secondary(&self) -> bool {
        matches!(
            self,
            SimError::Comm(CommError::Aborted { .. }) | SimError::Comm(CommError::Disconnected { .. })
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
