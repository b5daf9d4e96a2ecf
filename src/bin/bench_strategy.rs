#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::env;
use std::time::Duration;

use halo_life::halolife::{ExchangeStrategy, HaloLife, SimConfig};

#[derive(Clone, Debug)]
struct BenchConfig {
    size: usize,
    generations: u64,
    workers: usize,
    threads: usize,
    seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size: 2048,
            generations: 100,
            workers: 4,
            threads: 1,
            seed: 0x5EED_1234_ABCD_EF01,
        }
    }
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let value = args.next();
        let parsed = value.as_deref().and_then(|v| v.parse::<u64>().ok());
        match (arg.as_str(), parsed) {
            ("--size", Some(v)) => cfg.size = v as usize,
            ("--gens", Some(v)) => cfg.generations = v,
            ("--workers", Some(v)) => cfg.workers = v as usize,
            ("--threads", Some(v)) => cfg.threads = v as usize,
            ("--seed", Some(v)) => cfg.seed = v,
            _ => {
                eprintln!(
                    "usage: bench_strategy [--size N] [--gens N] [--workers N] [--threads N] [--seed N]"
                );
                std::process::exit(2);
            }
        }
    }
    cfg
}

struct Sample {
    ms: f64,
    messages: u64,
    cells: u64,
    population: u64,
}

fn run(cfg: &BenchConfig, strategy: ExchangeStrategy) -> Sample {
    let config = SimConfig::new(cfg.size, cfg.size, cfg.generations, cfg.seed)
        .workers(cfg.workers)
        .threads_per_worker(cfg.threads)
        .strategy(strategy)
        .comm_timeout(Duration::from_secs(600));
    let engine = match HaloLife::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    let outcome = match engine.run() {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("run failed: {err}");
            std::process::exit(1);
        }
    };
    Sample {
        ms: outcome.report.elapsed.as_secs_f64() * 1000.0,
        messages: outcome.comm_stats.iter().map(|s| s.messages).sum(),
        cells: outcome.comm_stats.iter().map(|s| s.cells).sum(),
        population: outcome.report.population,
    }
}

fn main() {
    let cfg = parse_args();
    println!(
        "grid {}x{}, {} generations, {} workers x {} threads",
        cfg.size, cfg.size, cfg.generations, cfg.workers, cfg.threads
    );
    println!(
        "{:<12} {:>12} {:>10} {:>12} {:>14} {:>12}",
        "Strategy", "Total(ms)", "Avg(ms)", "Messages", "Cells sent", "Population"
    );
    println!("{}", "-".repeat(77));

    let mut populations = Vec::new();
    for strategy in [ExchangeStrategy::Halo, ExchangeStrategy::AllGather] {
        let sample = run(&cfg, strategy);
        println!(
            "{:<12} {:>12.1} {:>10.4} {:>12} {:>14} {:>12}",
            strategy.to_string(),
            sample.ms,
            sample.ms / cfg.generations.max(1) as f64,
            sample.messages,
            sample.cells,
            sample.population
        );
        populations.push(sample.population);
    }
    if populations.windows(2).any(|w| w[0] != w[1]) {
        eprintln!("strategies disagree on final population");
        std::process::exit(1);
    }
}
