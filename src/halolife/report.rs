//! End-of-run performance summary, built on rank 0.

use std::fmt;
use std::time::Duration;

use super::config::{ExchangeStrategy, SimConfig};

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceReport {
    pub rows: usize,
    pub cols: usize,
    pub generations: u64,
    pub seed: u64,
    pub workers: usize,
    pub threads_per_worker: usize,
    pub strategy: ExchangeStrategy,
    /// Wall-clock time between the opening and closing barrier.
    pub elapsed: Duration,
    /// Both grid buffers of one worker.
    pub memory_bytes: u64,
    /// Live cells in the final generation.
    pub population: u64,
}

impl PerformanceReport {
    pub fn new(
        config: &SimConfig,
        threads_per_worker: usize,
        elapsed: Duration,
        population: u64,
    ) -> Self {
        Self {
            rows: config.rows,
            cols: config.cols,
            generations: config.generations,
            seed: config.seed,
            workers: config.workers,
            threads_per_worker,
            strategy: config.strategy,
            elapsed,
            memory_bytes: config.grid_footprint_bytes(),
            population,
        }
    }

    #[inline]
    pub fn logical_workers(&self) -> usize {
        self.workers * self.threads_per_worker
    }

    #[inline]
    pub fn memory_mib(&self) -> f64 {
        self.memory_bytes as f64 / MIB
    }

    /// Cell updates per second over the timed region.
    pub fn cells_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.generations as f64 * self.rows as f64 * self.cols as f64) / secs
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "===== PERFORMANCE REPORT =====")?;
        writeln!(f, "{:<19}: {} x {}", "Grid Size", self.rows, self.cols)?;
        writeln!(f, "{:<19}: {}", "Generations", self.generations)?;
        writeln!(f, "{:<19}: {}", "Seed", self.seed)?;
        writeln!(f, "{:<19}: {}", "Workers", self.workers)?;
        writeln!(f, "{:<19}: {}", "Threads per Worker", self.threads_per_worker)?;
        writeln!(
            f,
            "{:<19}: {} logical workers",
            "Total Hardware",
            self.logical_workers()
        )?;
        writeln!(f, "{:<19}: {}", "Exchange", self.strategy)?;
        writeln!(
            f,
            "{:<19}: {:.6} seconds",
            "Runtime",
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, "{:<19}: {:.3e} cells/s", "Throughput", self.cells_per_second())?;
        writeln!(f, "{:<19}: O(G * R * C)", "Time Complexity")?;
        writeln!(f, "{:<19}: O(R * C)", "Space Complexity")?;
        writeln!(f, "{:<19}: {:.2} MB", "Memory Used", self.memory_mib())?;
        writeln!(f, "{:<19}: {}", "Final Population", self.population)?;
        write!(f, "===============================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PerformanceReport {
        let config = SimConfig::new(1024, 512, 100, 42).workers(4);
        PerformanceReport::new(&config, 2, Duration::from_millis(1500), 1234)
    }

    #[test]
    fn derived_fields() {
        let report = sample();
        assert_eq!(report.logical_workers(), 8);
        assert_eq!(report.memory_bytes, 2 * 1024 * 512 * 4);
        assert!((report.memory_mib() - 4.0).abs() < 1e-9);
        let expected = 100.0 * 1024.0 * 512.0 / 1.5;
        assert!((report.cells_per_second() - expected).abs() < 1e-3);
    }

    #[test]
    fn display_lists_every_field() {
        let text = sample().to_string();
        for needle in [
            "Grid Size          : 1024 x 512",
            "Generations        : 100",
            "Seed               : 42",
            "Workers            : 4",
            "Threads per Worker : 2",
            "Total Hardware     : 8 logical workers",
            "Exchange           : halo",
            "Runtime            : 1.500000 seconds",
            "Time Complexity    : O(G * R * C)",
            "Space Complexity   : O(R * C)",
            "Memory Used        : 4.00 MB",
            "Final Population   : 1234",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in\n{text}");
        }
    }

    #[test]
    fn zero_elapsed_has_zero_throughput() {
        let config = SimConfig::new(4, 4, 0, 0);
        let report = PerformanceReport::new(&config, 1, Duration::ZERO, 0);
        assert_eq!(report.cells_per_second(), 0.0);
    }
}
