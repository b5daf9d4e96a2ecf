//! Run configuration and its validation.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use super::band::partition;
use super::error::ConfigError;
use super::grid::Grid;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_FRAME_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_COMM_TIMEOUT: Duration = Duration::from_secs(60);

static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();

#[inline]
fn physical_core_count() -> usize {
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

/// Split the physical cores evenly across workers, at least one thread each.
fn auto_threads_per_worker(workers: usize) -> usize {
    (physical_core_count() / workers.max(1)).max(1)
}

/// How workers learn the rows adjacent to their band each generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExchangeStrategy {
    /// Point-to-point exchange of the two edge rows with the neighbors above
    /// and below, overlapped with interior computation.
    #[default]
    Halo,
    /// Every worker sends its whole band to every other worker after each
    /// generation. Simpler and slower; kept as the reference baseline.
    AllGather,
}

impl fmt::Display for ExchangeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExchangeStrategy::Halo => "halo",
            ExchangeStrategy::AllGather => "all-gather",
        })
    }
}

/// Parameters of one run.
///
/// `SimConfig::new` fills in defaults; adjust individual knobs with the
/// builder methods and check the result with [`SimConfig::validate`].
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub rows: usize,
    pub cols: usize,
    pub generations: u64,
    pub seed: u64,
    /// Render every generation on rank 0.
    pub visual: bool,
    /// Number of message-passing workers.
    pub workers: usize,
    /// Compute threads inside each worker.
    /// `None` means physical cores divided by `workers`.
    pub threads_per_worker: Option<usize>,
    pub strategy: ExchangeStrategy,
    /// Pause after each rendered frame.
    pub frame_delay: Duration,
    /// Longest a worker waits on any single receive before failing the run.
    pub comm_timeout: Duration,
    /// Explicit initial state; replaces the seeded generator when set.
    pub initial: Option<Grid>,
}

impl SimConfig {
    pub fn new(rows: usize, cols: usize, generations: u64, seed: u64) -> Self {
        Self {
            rows,
            cols,
            generations,
            seed,
            visual: false,
            workers: DEFAULT_WORKERS,
            threads_per_worker: None,
            strategy: ExchangeStrategy::default(),
            frame_delay: DEFAULT_FRAME_DELAY,
            comm_timeout: DEFAULT_COMM_TIMEOUT,
            initial: None,
        }
    }

    /// Start from an explicit grid instead of a seed.
    pub fn from_grid(initial: Grid, generations: u64) -> Self {
        let mut config = Self::new(initial.rows(), initial.cols(), generations, 0);
        config.initial = Some(initial);
        config
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn threads_per_worker(mut self, n: usize) -> Self {
        self.threads_per_worker = Some(n);
        self
    }

    pub fn strategy(mut self, strategy: ExchangeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn comm_timeout(mut self, timeout: Duration) -> Self {
        self.comm_timeout = timeout;
        self
    }

    /// Reject anything that cannot run before any worker is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 {
            return Err(ConfigError::ZeroRows);
        }
        if self.cols == 0 {
            return Err(ConfigError::ZeroCols);
        }
        if self.threads_per_worker == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(ConfigError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
            });
        }
        // The last rank's band is the only one that can come out empty.
        partition(self.rows, self.workers, self.workers.saturating_sub(1))?;
        if let Some(initial) = &self.initial {
            if (initial.rows(), initial.cols()) != (self.rows, self.cols) {
                return Err(ConfigError::InitialShape {
                    rows: self.rows,
                    cols: self.cols,
                    got_rows: initial.rows(),
                    got_cols: initial.cols(),
                });
            }
        }
        Ok(())
    }

    /// Thread count each worker's pool is built with.
    pub fn resolved_threads_per_worker(&self) -> usize {
        self.threads_per_worker
            .unwrap_or_else(|| auto_threads_per_worker(self.workers))
            .max(1)
    }

    /// Bytes held by both grid buffers of one worker.
    pub fn grid_footprint_bytes(&self) -> u64 {
        2 * self.rows as u64 * self.cols as u64 * std::mem::size_of::<super::cell::State>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SimConfig::new(16, 16, 10, 1);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert!(config.resolved_threads_per_worker() >= 1);
    }

    #[test]
    fn rejects_degenerate_shapes() {
        assert_eq!(SimConfig::new(0, 4, 1, 0).validate(), Err(ConfigError::ZeroRows));
        assert_eq!(SimConfig::new(4, 0, 1, 0).validate(), Err(ConfigError::ZeroCols));
        assert_eq!(
            SimConfig::new(4, 4, 1, 0).workers(0).validate(),
            Err(ConfigError::ZeroWorkers)
        );
        assert_eq!(
            SimConfig::new(4, 4, 1, 0).threads_per_worker(0).validate(),
            Err(ConfigError::ZeroThreads)
        );
        assert_eq!(
            SimConfig::new(3, 4, 1, 0).workers(4).validate(),
            Err(ConfigError::TooManyWorkers {
                rows: 3,
                workers: 4
            })
        );
    }

    #[test]
    fn zero_generations_is_valid() {
        assert_eq!(SimConfig::new(4, 4, 0, 0).workers(2).validate(), Ok(()));
    }

    #[test]
    fn initial_grid_must_match_shape() {
        let mut config = SimConfig::new(4, 4, 1, 0).workers(1);
        config.initial = Some(Grid::new(4, 5));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InitialShape { got_cols: 5, .. })
        ));
    }

    #[test]
    fn footprint_counts_both_buffers() {
        let config = SimConfig::new(100, 50, 1, 0);
        assert_eq!(config.grid_footprint_bytes(), 2 * 100 * 50 * 4);
    }

    #[test]
    fn auto_threads_never_zero() {
        assert!(auto_threads_per_worker(1_000_000) >= 1);
        assert!(auto_threads_per_worker(0) >= 1);
    }
}
