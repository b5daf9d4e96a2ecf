//! Row-band decomposition of the grid across worker ranks.

use std::ops::Range;

use super::error::ConfigError;

/// Half-open row range `[start, end)` owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Band {
    pub start: usize,
    pub end: usize,
}

impl Band {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// First row of the band; its stencil reaches the row above the band.
    #[inline]
    pub fn first(&self) -> usize {
        self.start
    }

    /// Last row of the band; its stencil reaches the row below the band.
    #[inline]
    pub fn last(&self) -> usize {
        self.end - 1
    }

    /// Rows computable from band-local data alone. Empty for bands of one
    /// or two rows.
    #[inline]
    pub fn interior(&self) -> Range<usize> {
        if self.len() <= 2 {
            self.start..self.start
        } else {
            self.start + 1..self.end - 1
        }
    }

    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        self.start <= row && row < self.end
    }
}

fn check_shape(rows: usize, workers: usize) -> Result<(), ConfigError> {
    if rows == 0 {
        return Err(ConfigError::ZeroRows);
    }
    if workers == 0 {
        return Err(ConfigError::ZeroWorkers);
    }
    if rows < workers {
        return Err(ConfigError::TooManyWorkers { rows, workers });
    }
    Ok(())
}

/// Band of `rank` when `rows` are split across `workers`.
///
/// Every worker gets `rows / workers` rows; the last worker also takes the
/// remainder.
pub fn partition(rows: usize, workers: usize, rank: usize) -> Result<Band, ConfigError> {
    check_shape(rows, workers)?;
    if rank >= workers {
        return Err(ConfigError::RankOutOfRange { rank, workers });
    }
    let rows_per_worker = rows / workers;
    let start = rank * rows_per_worker;
    let end = if rank == workers - 1 {
        rows
    } else {
        start + rows_per_worker
    };
    Ok(Band { start, end })
}

/// All bands in rank order.
pub fn bands(rows: usize, workers: usize) -> Result<Vec<Band>, ConfigError> {
    (0..workers).map(|rank| partition(rows, workers, rank)).collect()
}

/// A worker's band and the ranks owning the bands directly above and below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    pub rank: usize,
    pub workers: usize,
    pub band: Band,
    pub up: Option<usize>,
    pub down: Option<usize>,
}

impl Topology {
    pub fn new(rows: usize, workers: usize, rank: usize) -> Result<Self, ConfigError> {
        let band = partition(rows, workers, rank)?;
        Ok(Self {
            rank,
            workers,
            band,
            up: rank.checked_sub(1),
            down: (rank + 1 < workers).then_some(rank + 1),
        })
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_every_row_exactly_once() {
        for rows in 1..=40 {
            for workers in 1..=rows.min(9) {
                let bands = bands(rows, workers).unwrap();
                let mut hits = vec![0u32; rows];
                for band in &bands {
                    assert!(!band.is_empty());
                    for r in band.rows() {
                        hits[r] += 1;
                    }
                }
                assert!(
                    hits.iter().all(|&h| h == 1),
                    "rows={rows} workers={workers} hits={hits:?}"
                );
                for pair in bands.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                assert_eq!(bands[0].start, 0);
                assert_eq!(bands[workers - 1].end, rows);
            }
        }
    }

    #[test]
    fn last_worker_absorbs_remainder() {
        let bands = bands(10, 3).unwrap();
        assert_eq!(
            bands,
            vec![
                Band { start: 0, end: 3 },
                Band { start: 3, end: 6 },
                Band { start: 6, end: 10 },
            ]
        );
    }

    #[test]
    fn rejects_unpartitionable_shapes() {
        assert_eq!(partition(0, 1, 0), Err(ConfigError::ZeroRows));
        assert_eq!(partition(4, 0, 0), Err(ConfigError::ZeroWorkers));
        assert_eq!(
            partition(3, 4, 0),
            Err(ConfigError::TooManyWorkers {
                rows: 3,
                workers: 4
            })
        );
        assert_eq!(
            partition(8, 2, 2),
            Err(ConfigError::RankOutOfRange {
                rank: 2,
                workers: 2
            })
        );
    }

    #[test]
    fn topology_neighbors_stop_at_grid_edges() {
        let top = Topology::new(12, 3, 0).unwrap();
        assert_eq!((top.up, top.down), (None, Some(1)));
        let mid = Topology::new(12, 3, 1).unwrap();
        assert_eq!((mid.up, mid.down), (Some(0), Some(2)));
        let bottom = Topology::new(12, 3, 2).unwrap();
        assert_eq!((bottom.up, bottom.down), (Some(1), None));
        let only = Topology::new(12, 1, 0).unwrap();
        assert_eq!((only.up, only.down), (None, None));
    }

    #[test]
    fn interior_excludes_band_edges() {
        assert_eq!(Band { start: 4, end: 9 }.interior(), 5..8);
        assert!(Band { start: 4, end: 6 }.interior().is_empty());
        assert!(Band { start: 4, end: 5 }.interior().is_empty());
    }
}
