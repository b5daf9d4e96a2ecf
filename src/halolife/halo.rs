//! Per-generation halo exchange between vertically adjacent bands.
//!
//! [`HaloExchanger::start`] posts the four point-to-point operations of one
//! generation (send first row up, send last row down, receive the row above,
//! receive the row below) and returns immediately. The caller overlaps
//! interior work with the transfer and then calls
//! [`PendingExchange::wait`], the only point where the halo rows become
//! readable.

use tracing::trace;

use super::band::Topology;
use super::cell::State;
use super::comm::{Communicator, RecvRequest, SendRequest, Tag};
use super::error::{CommError, SimError};
use super::grid::Grid;

/// Owns the receive buffers for the rows bordering a worker's band.
pub struct HaloExchanger {
    topology: Topology,
    /// Last row of the band above; all-dead when there is no rank above.
    top: Vec<State>,
    /// First row of the band below; all-dead when there is no rank below.
    bottom: Vec<State>,
}

/// Halo rows of one generation. `None` where the band touches the grid edge.
#[derive(Clone, Copy, Debug)]
pub struct HaloRows<'a> {
    pub top: Option<&'a [State]>,
    pub bottom: Option<&'a [State]>,
}

/// The in-flight operations of one exchange.
#[must_use = "an exchange must be waited on before its halo rows are read"]
pub struct PendingExchange<'a> {
    comm: &'a mut Communicator,
    sends: [Option<SendRequest>; 2],
    top: Option<(RecvRequest, &'a mut [State])>,
    bottom: Option<(RecvRequest, &'a mut [State])>,
}

fn halo_buffer(cols: usize) -> Result<Vec<State>, SimError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(cols).map_err(|_| SimError::Allocation {
        bytes: cols.saturating_mul(std::mem::size_of::<State>()),
    })?;
    buf.resize(cols, State::Dead);
    Ok(buf)
}

impl HaloExchanger {
    pub fn try_new(topology: Topology, cols: usize) -> Result<Self, SimError> {
        Ok(Self {
            topology,
            top: halo_buffer(cols)?,
            bottom: halo_buffer(cols)?,
        })
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Post this generation's sends and receives for the band rows of `grid`.
    ///
    /// The sent rows are copied out of `grid` before this returns, so `grid`
    /// stays free for the interior computation.
    pub fn start<'a>(
        &'a mut self,
        comm: &'a mut Communicator,
        grid: &Grid,
    ) -> PendingExchange<'a> {
        let topology = self.topology;
        let band = topology.band;
        trace!(
            rank = topology.rank,
            up = ?topology.up,
            down = ?topology.down,
            "posting halo exchange"
        );

        let send_up = topology
            .up
            .map(|up| comm.isend(up, Tag::RowUp, grid.row(band.first())));
        let send_down = topology
            .down
            .map(|down| comm.isend(down, Tag::RowDown, grid.row(band.last())));

        let top = match topology.up {
            Some(up) => Some((comm.irecv(up, Tag::RowDown), self.top.as_mut_slice())),
            None => None,
        };
        let bottom = match topology.down {
            Some(down) => Some((comm.irecv(down, Tag::RowUp), self.bottom.as_mut_slice())),
            None => None,
        };

        PendingExchange {
            comm,
            sends: [send_up, send_down],
            top,
            bottom,
        }
    }
}

impl<'a> PendingExchange<'a> {
    /// Block until both sends and both receives have completed.
    pub fn wait(self) -> Result<HaloRows<'a>, CommError> {
        let PendingExchange {
            comm,
            sends,
            top,
            bottom,
        } = self;

        for send in sends.into_iter().flatten() {
            send.wait()?;
        }

        let top: Option<&'a [State]> = match top {
            Some((request, buf)) => {
                request.wait(comm, &mut *buf)?;
                Some(&*buf)
            }
            None => None,
        };
        let bottom: Option<&'a [State]> = match bottom {
            Some((request, buf)) => {
                request.wait(comm, &mut *buf)?;
                Some(&*buf)
            }
            None => None,
        };

        Ok(HaloRows { top, bottom })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::halolife::comm::Cluster;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_halo_buffers_fail_to_allocate() {
        let topology = Topology::new(4, 2, 0).unwrap();
        assert!(matches!(
            HaloExchanger::try_new(topology, 1 << 62),
            Err(SimError::Allocation { .. })
        ));
    }

    #[test]
    fn single_worker_exchange_is_a_no_op() {
        let topology = Topology::new(4, 1, 0).unwrap();
        let mut comm = Cluster::connect(1, Duration::from_millis(10)).pop().unwrap();
        let mut exchanger = HaloExchanger::try_new(topology, 3).unwrap();
        let grid = Grid::random(4, 3, 1);

        let halos = exchanger.start(&mut comm, &grid).wait().unwrap();
        assert!(halos.top.is_none());
        assert!(halos.bottom.is_none());
        assert_eq!(comm.stats().messages, 0);
    }

    #[test]
    fn neighbors_receive_each_others_edge_rows() {
        let rows = 9;
        let cols = 5;
        let workers = 3;
        let grid = Grid::random(rows, cols, 0xA5);

        let received: Vec<(Option<Vec<State>>, Option<Vec<State>>)> = thread::scope(|scope| {
            let handles: Vec<_> = Cluster::connect(workers, Duration::from_secs(5))
                .into_iter()
                .map(|mut comm| {
                    let grid = &grid;
                    scope.spawn(move || {
                        let topology = Topology::new(rows, workers, comm.rank()).unwrap();
                        let mut exchanger = HaloExchanger::try_new(topology, cols).unwrap();
                        let halos = exchanger.start(&mut comm, grid).wait().unwrap();
                        (
                            halos.top.map(<[State]>::to_vec),
                            halos.bottom.map(<[State]>::to_vec),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Bands: [0,3) [3,6) [6,9).
        assert_eq!(received[0].0, None);
        assert_eq!(received[0].1.as_deref(), Some(grid.row(3)));
        assert_eq!(received[1].0.as_deref(), Some(grid.row(2)));
        assert_eq!(received[1].1.as_deref(), Some(grid.row(6)));
        assert_eq!(received[2].0.as_deref(), Some(grid.row(5)));
        assert_eq!(received[2].1, None);
    }
}
