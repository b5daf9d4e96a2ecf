#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use halo_life::halolife::{ExchangeStrategy, HaloLife, SimConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Halo,
    AllGather,
}

impl From<StrategyArg> for ExchangeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Halo => ExchangeStrategy::Halo,
            StrategyArg::AllGather => ExchangeStrategy::AllGather,
        }
    }
}

/// Game of Life on a bounded grid, split into row bands across
/// message-passing workers.
#[derive(Parser, Debug)]
#[command(name = "halo-life", version)]
struct Args {
    /// Number of grid rows
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    rows: u32,

    /// Number of grid columns
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    cols: u32,

    /// Number of generations to simulate
    generations: u64,

    /// Seed for the initial random grid (any 64-bit integer)
    #[arg(allow_negative_numbers = true)]
    seed: i64,

    /// Render every generation on the terminal (0 or 1)
    #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
    visual: u8,

    /// Number of message-passing workers
    #[arg(short = 'w', long, default_value = "4")]
    workers: usize,

    /// Compute threads per worker (default: physical cores / workers)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// How workers exchange neighbor rows each generation
    #[arg(long, value_enum, default_value = "halo")]
    strategy: StrategyArg,

    /// Pause between rendered frames, in milliseconds
    #[arg(long, default_value = "1000")]
    frame_delay_ms: u64,

    /// Fail the run when any receive waits longer than this, in seconds
    #[arg(long, default_value = "60")]
    comm_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> SimConfig {
        let mut config = SimConfig::new(
            self.rows as usize,
            self.cols as usize,
            self.generations,
            self.seed as u64,
        )
        .workers(self.workers)
        .strategy(self.strategy.into())
        .visual(self.visual == 1)
        .frame_delay(Duration::from_millis(self.frame_delay_ms))
        .comm_timeout(Duration::from_secs(self.comm_timeout_secs));
        if let Some(threads) = self.threads {
            config = config.threads_per_worker(threads);
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,halo_life=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.into_config();

    let engine = match HaloLife::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match engine.run() {
        Ok(outcome) => {
            println!("{}", outcome.report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "run failed");
            ExitCode::FAILURE
        }
    }
}
