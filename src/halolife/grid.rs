//! Row-major cell grid, the 3×3 stencil and the seeded initial state.

use rand::RngCore;
use rand::SeedableRng;

use super::cell::State;
use super::error::{ConfigError, SimError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<State>,
}

impl Grid {
    /// All-dead grid. Panics on allocation failure like any `Vec`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![State::Dead; rows * cols],
        }
    }

    /// All-dead grid, reporting allocation failure instead of aborting.
    pub fn try_new(rows: usize, cols: usize) -> Result<Self, SimError> {
        let len = rows
            .checked_mul(cols)
            .ok_or(ConfigError::GridTooLarge { rows, cols })?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|_| SimError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<State>()),
        })?;
        cells.resize(len, State::Dead);
        Ok(Self { rows, cols, cells })
    }

    /// Build a grid from rows of 0/1 values. Test and demo helper.
    pub fn from_rows<const C: usize>(rows: &[[u8; C]]) -> Self {
        let cells = rows
            .iter()
            .flat_map(|row| row.iter().map(|&v| State::from_bool(v != 0)))
            .collect();
        Self {
            rows: rows.len(),
            cols: C,
            cells,
        }
    }

    /// Seeded pseudo-random grid, each cell alive with probability 1/2.
    pub fn random(rows: usize, cols: usize, seed: u64) -> Self {
        let mut grid = Self::new(rows, cols);
        grid.fill_random(seed);
        grid
    }

    pub fn fill_random(&mut self, seed: u64) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        for cell in &mut self.cells {
            *cell = State::from_bool(rng.next_u32() & 1 == 1);
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> State {
        self.cells[row * self.cols + col]
    }

    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, state: State) {
        self.cells[row * self.cols + col] = state;
    }

    #[inline(always)]
    pub fn row(&self, row: usize) -> &[State] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    #[inline(always)]
    pub fn row_mut(&mut self, row: usize) -> &mut [State] {
        let start = row * self.cols;
        &mut self.cells[start..start + self.cols]
    }

    /// Contiguous cells of rows `[start, end)`.
    pub fn rows_slice(&self, start: usize, end: usize) -> &[State] {
        &self.cells[start * self.cols..end * self.cols]
    }

    pub fn rows_slice_mut(&mut self, start: usize, end: usize) -> &mut [State] {
        &mut self.cells[start * self.cols..end * self.cols]
    }

    pub fn cells(&self) -> &[State] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [State] {
        &mut self.cells
    }

    pub fn population(&self) -> u64 {
        self.cells.iter().filter(|c| c.is_alive()).count() as u64
    }

    pub fn for_each_live<F: FnMut(usize, usize)>(&self, mut f: F) {
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.is_alive() {
                f(i / self.cols, i % self.cols);
            }
        }
    }

    /// Memory held by the cell storage.
    pub fn footprint_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<State>()
    }
}

/// The three rows a stencil reads for one output row.
///
/// `None` stands for a row beyond the global grid edge, which contributes
/// nothing to any count.
#[derive(Clone, Copy, Debug)]
pub struct RowWindow<'a> {
    pub above: Option<&'a [State]>,
    pub center: &'a [State],
    pub below: Option<&'a [State]>,
}

impl<'a> RowWindow<'a> {
    /// Window for `row` reading only from `grid`.
    pub fn in_grid(grid: &'a Grid, row: usize) -> Self {
        Self {
            above: row.checked_sub(1).map(|r| grid.row(r)),
            center: grid.row(row),
            below: (row + 1 < grid.rows()).then(|| grid.row(row + 1)),
        }
    }

    /// Live neighbors of `center[col]`, clipped at the column edges.
    #[inline(always)]
    pub fn live_neighbors(&self, col: usize) -> u8 {
        let cols = self.center.len();
        let lo = col.saturating_sub(1);
        let hi = (col + 1).min(cols - 1);

        let mut count = 0u8;
        for row in [self.above, self.below].into_iter().flatten() {
            for c in lo..=hi {
                count += row[c].weight();
            }
        }
        if col > 0 {
            count += self.center[col - 1].weight();
        }
        if col + 1 < cols {
            count += self.center[col + 1].weight();
        }
        count
    }
}

/// Live neighbors of `(row, col)` in the 3×3 block around it, without
/// wraparound.
#[inline]
pub fn neighbor_count(grid: &Grid, row: usize, col: usize) -> u8 {
    RowWindow::in_grid(grid, row).live_neighbors(col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_count(grid: &Grid, row: usize, col: usize) -> u8 {
        let mut count = 0;
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i64 + dr;
                let c = col as i64 + dc;
                if r < 0 || c < 0 || r >= grid.rows() as i64 || c >= grid.cols() as i64 {
                    continue;
                }
                count += grid.get(r as usize, c as usize).weight();
            }
        }
        count
    }

    #[test]
    fn full_neighborhood_counts_eight() {
        let grid = Grid::from_rows(&[[1, 1, 1], [1, 0, 1], [1, 1, 1]]);
        assert_eq!(neighbor_count(&grid, 1, 1), 8);
        let grid = Grid::from_rows(&[[1, 1, 1], [1, 1, 1], [1, 1, 1]]);
        assert_eq!(neighbor_count(&grid, 1, 1), 8);
    }

    #[test]
    fn corners_and_edges_are_clipped() {
        let grid = Grid::from_rows(&[[1, 1, 1], [1, 1, 1], [1, 1, 1]]);
        assert_eq!(neighbor_count(&grid, 0, 0), 3);
        assert_eq!(neighbor_count(&grid, 2, 2), 3);
        assert_eq!(neighbor_count(&grid, 0, 1), 5);
        assert_eq!(neighbor_count(&grid, 1, 2), 5);
    }

    #[test]
    fn single_cell_and_single_column_grids() {
        let grid = Grid::from_rows(&[[1]]);
        assert_eq!(neighbor_count(&grid, 0, 0), 0);

        let column = Grid::from_rows(&[[1], [1], [1]]);
        assert_eq!(neighbor_count(&column, 1, 0), 2);
        assert_eq!(neighbor_count(&column, 0, 0), 1);
    }

    #[test]
    fn matches_brute_force_on_random_grid() {
        let grid = Grid::random(11, 13, 0xC0FFEE);
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                assert_eq!(
                    neighbor_count(&grid, row, col),
                    brute_force_count(&grid, row, col),
                    "mismatch at ({row},{col})"
                );
            }
        }
    }

    #[test]
    fn random_grid_is_deterministic_per_seed() {
        assert_eq!(Grid::random(16, 16, 7), Grid::random(16, 16, 7));
        assert_ne!(Grid::random(16, 16, 7), Grid::random(16, 16, 8));
    }

    #[test]
    fn try_new_rejects_overflowing_shape() {
        assert!(matches!(
            Grid::try_new(usize::MAX, 2),
            Err(SimError::Config(ConfigError::GridTooLarge { .. }))
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn try_new_reports_unallocatable_buffer() {
        match Grid::try_new(1 << 62, 1) {
            Err(SimError::Allocation { bytes }) => assert_eq!(bytes, usize::MAX),
            other => panic!("expected allocation failure, got {other:?}"),
        }
    }

    #[test]
    fn population_and_live_cells() {
        let grid = Grid::from_rows(&[[0, 1], [1, 0]]);
        assert_eq!(grid.population(), 2);
        let mut live = Vec::new();
        grid.for_each_live(|r, c| live.push((r, c)));
        assert_eq!(live, vec![(0, 1), (1, 0)]);
    }
}
