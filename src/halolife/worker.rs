//! One rank's generation loop.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use super::band::{Band, Topology};
use super::buffer::DoubleBuffer;
use super::comm::{CommStats, Communicator, Tag};
use super::config::ExchangeStrategy;
use super::error::SimResult;
use super::grid::Grid;
use super::halo::HaloExchanger;
use super::render::FrameSink;
use super::stepper::{step_boundary, step_interior, step_rows};

/// Root-only visualization state: the assembled global grid and its sink.
///
/// The grid keeps draining the other ranks' frames even after the sink has
/// been dropped on failure.
pub(crate) struct Snapshot {
    pub grid: Grid,
    pub sink: Option<Box<dyn FrameSink>>,
}

/// Everything a rank owns for the duration of a run.
pub(crate) struct Worker {
    pub topology: Topology,
    pub bands: Vec<Band>,
    pub comm: Communicator,
    pub buffers: DoubleBuffer,
    pub exchanger: HaloExchanger,
    pub pool: rayon::ThreadPool,
    pub strategy: ExchangeStrategy,
    pub generations: u64,
    /// Whether the run renders frames. Non-root ranks stream their band to
    /// the root when set; only the root carries a `snapshot`.
    pub visual: bool,
    pub snapshot: Option<Snapshot>,
}

pub(crate) struct WorkerOutcome {
    pub rank: usize,
    /// Time between the opening and closing barrier as seen by this rank.
    pub elapsed: Duration,
    /// Global final grid, assembled on the root only.
    pub final_grid: Option<Grid>,
    pub stats: CommStats,
}

impl Worker {
    /// Run the rank to completion. Peers are told to stop on failure, and
    /// also when the rank panics, before the panic continues to the joiner.
    pub fn run(mut self) -> SimResult<WorkerOutcome> {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.run_inner())) {
            Ok(result) => result,
            Err(payload) => {
                error!(rank = self.topology.rank, "worker panicked");
                self.comm.abort();
                panic::resume_unwind(payload);
            }
        };
        match result {
            Ok(elapsed) => {
                let rank = self.topology.rank;
                let stats = self.comm.stats();
                debug!(
                    rank,
                    messages = stats.messages,
                    cells = stats.cells,
                    "worker finished"
                );
                let final_grid = if self.topology.is_root() {
                    Some(self.buffers.into_current())
                } else {
                    None
                };
                Ok(WorkerOutcome {
                    rank,
                    elapsed,
                    final_grid,
                    stats,
                })
            }
            Err(err) => {
                if err.is_secondary() {
                    debug!(rank = self.topology.rank, %err, "worker stopped");
                } else {
                    error!(rank = self.topology.rank, %err, "worker failed");
                }
                self.comm.abort();
                Err(err)
            }
        }
    }

    fn run_inner(&mut self) -> SimResult<Duration> {
        let rank = self.topology.rank;
        debug!(
            rank,
            start = self.topology.band.start,
            end = self.topology.band.end,
            up = ?self.topology.up,
            down = ?self.topology.down,
            threads = self.pool.current_num_threads(),
            "worker ready"
        );

        self.comm.broadcast(0, self.buffers.current_mut())?;

        self.comm.barrier()?;
        let started = Instant::now();

        for generation in 0..self.generations {
            trace!(rank, generation, "generation");
            match self.strategy {
                ExchangeStrategy::Halo => self.step_halo()?,
                ExchangeStrategy::AllGather => self.step_all_gather()?,
            }
            if self.visual {
                self.publish_frame(generation + 1)?;
            }
        }

        self.comm.barrier()?;
        let elapsed = started.elapsed();
        debug!(rank, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "timed region done");

        self.comm
            .gather_bands(0, Tag::Final, self.buffers.current_mut(), &self.bands)?;
        Ok(elapsed)
    }

    /// Post the halo exchange, compute interior rows while it is in flight,
    /// wait, then compute the two boundary rows from the received halos.
    fn step_halo(&mut self) -> SimResult<()> {
        let band = self.topology.band;
        let (current, next) = self.buffers.split();

        let pending = self.exchanger.start(&mut self.comm, current);
        step_interior(&self.pool, current, next, band);
        let halos = pending.wait()?;
        step_boundary(current, next, band, halos);

        self.buffers.swap();
        Ok(())
    }

    /// Compute the whole band, then replace every other band with the
    /// owners' fresh rows.
    fn step_all_gather(&mut self) -> SimResult<()> {
        let band = self.topology.band;
        let (current, next) = self.buffers.split();
        step_rows(&self.pool, current, next, band.rows());
        self.buffers.swap();
        self.comm
            .all_gather_bands(self.buffers.current_mut(), &self.bands)?;
        Ok(())
    }

    /// Stream this rank's band to the root; the root assembles and renders.
    fn publish_frame(&mut self, generation: u64) -> SimResult<()> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return Ok(self.comm.gather_bands(
                0,
                Tag::Snapshot,
                self.buffers.current_mut(),
                &self.bands,
            )?);
        };

        let band = self.topology.band;
        snapshot
            .grid
            .rows_slice_mut(band.start, band.end)
            .copy_from_slice(self.buffers.current().rows_slice(band.start, band.end));
        self.comm
            .gather_bands(0, Tag::Snapshot, &mut snapshot.grid, &self.bands)?;

        if let Some(sink) = snapshot.sink.as_mut() {
            if let Err(err) = sink.show(generation, &snapshot.grid) {
                warn!(%err, generation, "frame sink failed; disabling visualization");
                snapshot.sink = None;
            }
        }
        Ok(())
    }
}
