//! Run orchestration: allocate every rank, run them on their own threads,
//! collect the final grid and the report.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::band::{Topology, bands};
use super::buffer::DoubleBuffer;
use super::comm::{Cluster, CommStats};
use super::config::SimConfig;
use super::error::{ConfigError, SimError, SimResult};
use super::grid::Grid;
use super::halo::HaloExchanger;
use super::render::{FrameSink, TerminalRenderer};
use super::report::PerformanceReport;
use super::worker::{Snapshot, Worker, WorkerOutcome};

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: PerformanceReport,
    /// Global grid after the last generation, assembled from every band.
    pub final_grid: Grid,
    /// Traffic sent by each rank, in rank order.
    pub comm_stats: Vec<CommStats>,
}

/// A band-partitioned simulation: `workers` message-passing ranks, each
/// stepping its band on its own thread pool.
pub struct HaloLife {
    config: SimConfig,
    sink: Option<Box<dyn FrameSink>>,
}

impl HaloLife {
    /// Validate `config`; nothing is allocated until [`HaloLife::run`].
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, sink: None })
    }

    /// Render frames to `sink` instead of the terminal. Only used when the
    /// config has `visual` set.
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Allocate every rank's state, run all generations and gather the
    /// final grid.
    ///
    /// All buffers and thread pools are built before any rank starts, so an
    /// allocation failure never leaves a partial run behind.
    pub fn run(self) -> SimResult<RunOutcome> {
        let HaloLife { config, sink } = self;
        let threads = config.resolved_threads_per_worker();
        info!(
            rows = config.rows,
            cols = config.cols,
            generations = config.generations,
            workers = config.workers,
            threads_per_worker = threads,
            strategy = %config.strategy,
            "starting run"
        );

        let workers = build_workers(&config, threads, sink)?;
        let outcomes = launch(workers)?;

        let mut comm_stats = vec![CommStats::default(); config.workers];
        let mut root = None;
        for outcome in outcomes {
            comm_stats[outcome.rank] = outcome.stats;
            if outcome.rank == 0 {
                root = Some(outcome);
            }
        }
        let root = root.ok_or(SimError::WorkerPanicked { rank: 0 })?;
        let final_grid = root
            .final_grid
            .ok_or(SimError::WorkerPanicked { rank: 0 })?;

        let report =
            PerformanceReport::new(&config, threads, root.elapsed, final_grid.population());
        info!(
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            population = report.population,
            "run complete"
        );
        Ok(RunOutcome {
            report,
            final_grid,
            comm_stats,
        })
    }
}

fn initial_grid(config: &SimConfig) -> SimResult<Grid> {
    let mut grid = Grid::try_new(config.rows, config.cols)?;
    match &config.initial {
        Some(initial) => grid.cells_mut().copy_from_slice(initial.cells()),
        None => grid.fill_random(config.seed),
    }
    Ok(grid)
}

fn build_workers(
    config: &SimConfig,
    threads: usize,
    sink: Option<Box<dyn FrameSink>>,
) -> SimResult<Vec<Worker>> {
    let bands = bands(config.rows, config.workers)?;
    let comms = Cluster::connect(config.workers, config.comm_timeout);
    let mut sink = sink;

    let mut workers = Vec::with_capacity(config.workers);
    for (rank, comm) in comms.into_iter().enumerate() {
        let topology = Topology::new(config.rows, config.workers, rank)?;
        let current = if topology.is_root() {
            initial_grid(config)?
        } else {
            Grid::try_new(config.rows, config.cols)?
        };
        let next = Grid::try_new(config.rows, config.cols)?;
        let exchanger = HaloExchanger::try_new(topology, config.cols)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("rank{rank}-compute{i}"))
            .build()
            .map_err(|err| SimError::ThreadPool {
                rank,
                reason: err.to_string(),
            })?;

        let snapshot = if config.visual && topology.is_root() {
            let sink = sink.take().unwrap_or_else(|| {
                Box::new(TerminalRenderer::stdout(config.frame_delay)) as Box<dyn FrameSink>
            });
            Some(Snapshot {
                grid: Grid::try_new(config.rows, config.cols)?,
                sink: Some(sink),
            })
        } else {
            None
        };

        debug!(rank, start = topology.band.start, end = topology.band.end, "worker allocated");
        workers.push(Worker {
            topology,
            bands: bands.clone(),
            comm,
            buffers: DoubleBuffer::new(current, next),
            exchanger,
            pool,
            strategy: config.strategy,
            generations: config.generations,
            visual: config.visual,
            snapshot,
        });
    }
    Ok(workers)
}

/// Run every worker on its own named thread and wait for all of them.
///
/// When several ranks fail, the reported error is the first one that is not
/// just a reaction to another rank's abort.
fn launch(workers: Vec<Worker>) -> SimResult<Vec<WorkerOutcome>> {
    let results: Vec<SimResult<WorkerOutcome>> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers.len());
        for worker in workers {
            let rank = worker.topology.rank;
            let handle = thread::Builder::new()
                .name(format!("rank{rank}"))
                .spawn_scoped(scope, move || worker.run());
            handles.push((rank, handle));
        }
        handles
            .into_iter()
            .map(|(rank, handle)| match handle {
                Ok(handle) => handle
                    .join()
                    .unwrap_or(Err(SimError::WorkerPanicked { rank })),
                Err(err) => Err(SimError::Spawn {
                    rank,
                    reason: err.to_string(),
                }),
            })
            .collect()
    });

    let mut outcomes = Vec::with_capacity(results.len());
    let mut secondary = None;
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) if err.is_secondary() => {
                secondary.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    match secondary {
        Some(err) => Err(err),
        None => Ok(outcomes),
    }
}

/// Shorthand for a quick run with explicit worker and thread counts.
pub fn evolve(
    initial: &Grid,
    generations: u64,
    workers: usize,
    threads_per_worker: usize,
) -> SimResult<Grid> {
    let config = SimConfig::from_grid(initial.clone(), generations)
        .workers(workers)
        .threads_per_worker(threads_per_worker)
        .comm_timeout(Duration::from_secs(30));
    Ok(HaloLife::new(config)?.run()?.final_grid)
}
