//! One-generation update of a band, split into interior and boundary rows.
//!
//! Interior rows read only rows of the band itself and can run while the
//! halo exchange is still in flight. Boundary rows read the halo rows in
//! place of the rows owned by neighboring workers.

use std::ops::Range;

use rayon::prelude::*;

use super::band::Band;
use super::cell::{State, next_state};
use super::grid::{Grid, RowWindow};
use super::halo::HaloRows;

/// Below this many cells a row range is stepped on the calling thread.
const PARALLEL_MIN_CELLS: usize = 16_384;
/// Minimum rows per rayon task.
const ROWS_PER_TASK_MIN: usize = 4;

/// Compute one output row from its stencil window.
#[inline]
pub fn step_row(window: RowWindow<'_>, out: &mut [State]) {
    debug_assert_eq!(window.center.len(), out.len());
    for (col, cell) in out.iter_mut().enumerate() {
        *cell = next_state(window.center[col], window.live_neighbors(col));
    }
}

/// Step `rows` of `current` into `next`, reading only from `current`.
///
/// Output rows are disjoint, so the pool's threads never write the same
/// cell.
pub fn step_rows(pool: &rayon::ThreadPool, current: &Grid, next: &mut Grid, rows: Range<usize>) {
    if rows.is_empty() {
        return;
    }
    let cols = current.cols();
    let first = rows.start;
    let out = next.rows_slice_mut(rows.start, rows.end);

    if out.len() < PARALLEL_MIN_CELLS || pool.current_num_threads() <= 1 {
        for (i, row_out) in out.chunks_mut(cols).enumerate() {
            step_row(RowWindow::in_grid(current, first + i), row_out);
        }
        return;
    }

    pool.install(|| {
        out.par_chunks_mut(cols)
            .with_min_len(ROWS_PER_TASK_MIN)
            .enumerate()
            .for_each(|(i, row_out)| step_row(RowWindow::in_grid(current, first + i), row_out));
    });
}

/// Step every row of `band` except its first and last.
#[inline]
pub fn step_interior(pool: &rayon::ThreadPool, current: &Grid, next: &mut Grid, band: Band) {
    step_rows(pool, current, next, band.interior());
}

/// Step the first and last row of `band`, taking the rows just outside the
/// band from `halos`.
///
/// A band of one row uses both halos for that row. A missing halo means the
/// band sits on the grid edge, where the outside row counts as dead.
pub fn step_boundary(current: &Grid, next: &mut Grid, band: Band, halos: HaloRows<'_>) {
    debug_assert_eq!(halos.top.is_none(), band.start == 0);
    debug_assert_eq!(halos.bottom.is_none(), band.end == current.rows());

    let first = band.first();
    let last = band.last();

    let first_window = RowWindow {
        above: halos.top,
        center: current.row(first),
        below: if first == last {
            halos.bottom
        } else {
            Some(current.row(first + 1))
        },
    };
    step_row(first_window, next.row_mut(first));

    if last != first {
        let last_window = RowWindow {
            above: Some(current.row(last - 1)),
            center: current.row(last),
            below: halos.bottom,
        };
        step_row(last_window, next.row_mut(last));
    }
}

/// Evolve a whole grid by one generation on the calling thread, with no
/// partitioning. Reference for every distributed run.
pub fn step_serial(current: &Grid, next: &mut Grid) {
    for row in 0..current.rows() {
        step_row(RowWindow::in_grid(current, row), next.row_mut(row));
    }
}

/// Evolve a whole grid by `generations` with [`step_serial`].
pub fn evolve_serial(initial: &Grid, generations: u64) -> Grid {
    let mut current = initial.clone();
    let mut next = Grid::new(initial.rows(), initial.cols());
    for _ in 0..generations {
        step_serial(&current, &mut next);
        std::mem::swap(&mut current, &mut next);
    }
    current
}
