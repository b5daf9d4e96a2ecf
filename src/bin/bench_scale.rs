#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::Duration;

use halo_life::halolife::{HaloLife, SimConfig, SimResult};

const SEED: u64 = 0x5EED_1234_ABCD_EF01;

fn bench_layout(
    size: usize,
    generations: u64,
    workers: usize,
    threads: usize,
) -> SimResult<(f64, u64)> {
    let config = SimConfig::new(size, size, generations, SEED)
        .workers(workers)
        .threads_per_worker(threads)
        .comm_timeout(Duration::from_secs(600));
    let report = HaloLife::new(config)?.run()?.report;
    Ok((report.elapsed.as_secs_f64() * 1000.0, report.population))
}

fn main() {
    let cores = num_cpus::get_physical().max(1);
    let sizes: &[(usize, u64)] = &[
        (512, 200),  // fits in cache, dominated by exchange latency
        (2048, 100), // typical benchmark grid
        (4096, 40),
    ];
    // Same total parallelism spread differently between ranks and threads.
    let layouts: Vec<(usize, usize)> = [1, 2, 4, 8]
        .into_iter()
        .filter(|&w| w <= cores)
        .map(|w| (w, (cores / w).max(1)))
        .collect();

    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>12} {:>10} {:>12}",
        "Grid", "Workers", "Threads", "Iters", "Total(ms)", "Avg(ms)", "Population"
    );
    println!("{}", "-".repeat(74));

    for &(size, iters) in sizes {
        for &(workers, threads) in &layouts {
            let (total_ms, pop) = match bench_layout(size, iters, workers, threads) {
                Ok(sample) => sample,
                Err(err) => {
                    eprintln!("{size}x{size} workers={workers} threads={threads}: {err}");
                    continue;
                }
            };
            let avg_ms = total_ms / iters as f64;
            println!(
                "{:<10} {:>8} {:>8} {:>8} {:>12.1} {:>10.4} {:>12}",
                format!("{}x{}", size, size),
                workers,
                threads,
                iters,
                total_ms,
                avg_ms,
                pop
            );
        }
    }
}
