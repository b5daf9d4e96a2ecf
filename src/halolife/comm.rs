//! In-process message transport between worker ranks.
//!
//! Every rank owns one inbox. Envelopes carry the sender's rank and a
//! [`Tag`]; receives match on `(source, tag)` and park anything else in a
//! per-rank stash until a matching receive asks for it. Delivery from one
//! source is FIFO, so repeated traffic with the same tag is consumed in send
//! order. Workers share nothing but these channels.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{trace, warn};

use super::band::Band;
use super::cell::State;
use super::error::CommError;
use super::grid::Grid;
use super::wire;

/// Message class. Keeps row traffic travelling up apart from row traffic
/// travelling down, and both apart from collectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A band's first row, sent to the rank above.
    RowUp,
    /// A band's last row, sent to the rank below.
    RowDown,
    /// Full initial grid from the root.
    Initial,
    /// Band rows for the per-generation all-gather.
    Exchange,
    /// Band rows for the root's visualization snapshot.
    Snapshot,
    /// Band rows for the end-of-run gather.
    Final,
    BarrierArrive,
    BarrierRelease,
    Abort,
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    tag: Tag,
    payload: Box<[i32]>,
}

/// Counters for traffic a rank has sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommStats {
    pub messages: u64,
    pub cells: u64,
}

/// Builds the fully-connected set of communicators for one run.
pub struct Cluster;

impl Cluster {
    /// One communicator per rank, in rank order. A blocking receive that
    /// waits longer than `timeout` fails with [`CommError::Timeout`].
    pub fn connect(workers: usize, timeout: Duration) -> Vec<Communicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..workers).map(|_| channel::unbounded::<Envelope>()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Communicator {
                rank,
                size: workers,
                outboxes: senders.clone(),
                inbox,
                stash: VecDeque::new(),
                timeout,
                stats: CommStats::default(),
            })
            .collect()
    }
}

/// A rank's endpoint into the cluster.
pub struct Communicator {
    rank: usize,
    size: usize,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    stash: VecDeque<Envelope>,
    timeout: Duration,
    stats: CommStats,
}

/// Handle for a posted send.
///
/// Sends are buffered: the payload is copied into the transport when the
/// send is posted, so the caller may reuse its buffer immediately. Any
/// delivery failure surfaces from [`SendRequest::wait`].
#[must_use = "a send request must be waited on"]
#[derive(Debug)]
pub struct SendRequest {
    outcome: Result<(), CommError>,
}

impl SendRequest {
    pub fn wait(self) -> Result<(), CommError> {
        self.outcome
    }
}

/// Handle for a posted receive of one row-shaped message.
#[must_use = "a receive request must be waited on"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvRequest {
    pub source: usize,
    pub tag: Tag,
}

impl RecvRequest {
    /// Block until the matching message arrives and decode it into `out`.
    pub fn wait(self, comm: &mut Communicator, out: &mut [State]) -> Result<(), CommError> {
        let envelope = comm.recv_matching(self.source, self.tag)?;
        comm.decode(&envelope, out)
    }
}

impl Communicator {
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn stats(&self) -> CommStats {
        self.stats
    }

    fn send(&mut self, dest: usize, tag: Tag, payload: Box<[i32]>) -> Result<(), CommError> {
        self.stats.messages += 1;
        self.stats.cells += payload.len() as u64;
        self.outboxes[dest]
            .send(Envelope {
                source: self.rank,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected {
                rank: self.rank,
                peer: dest,
            })
    }

    /// Post a non-blocking send of `cells` to `dest`.
    pub fn isend(&mut self, dest: usize, tag: Tag, cells: &[State]) -> SendRequest {
        trace!(rank = self.rank, dest, ?tag, len = cells.len(), "isend");
        SendRequest {
            outcome: self.send(dest, tag, wire::encode(cells)),
        }
    }

    /// Post a non-blocking receive from `source`.
    pub fn irecv(&self, source: usize, tag: Tag) -> RecvRequest {
        trace!(rank = self.rank, source, ?tag, "irecv");
        RecvRequest { source, tag }
    }

    fn take_stashed(&mut self, source: usize, tag: Tag) -> Option<Envelope> {
        let pos = self
            .stash
            .iter()
            .position(|e| e.source == source && e.tag == tag)?;
        self.stash.remove(pos)
    }

    fn recv_matching(&mut self, source: usize, tag: Tag) -> Result<Envelope, CommError> {
        if let Some(envelope) = self.take_stashed(source, tag) {
            return Ok(envelope);
        }
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(envelope) if envelope.tag == Tag::Abort => {
                    return Err(CommError::Aborted {
                        rank: self.rank,
                        peer: envelope.source,
                    });
                }
                Ok(envelope) if envelope.source == source && envelope.tag == tag => {
                    return Ok(envelope);
                }
                Ok(envelope) => self.stash.push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CommError::Timeout {
                        rank: self.rank,
                        peer: source,
                        tag,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CommError::Disconnected {
                        rank: self.rank,
                        peer: source,
                    });
                }
            }
        }
    }

    fn decode(&self, envelope: &Envelope, out: &mut [State]) -> Result<(), CommError> {
        wire::decode_into(&envelope.payload, out).map_err(|reason| CommError::Malformed {
            rank: self.rank,
            peer: envelope.source,
            tag: envelope.tag,
            reason,
        })
    }

    /// Block until every rank has called `barrier`.
    ///
    /// Ranks report to rank 0, which releases everyone once all have arrived.
    pub fn barrier(&mut self) -> Result<(), CommError> {
        if self.rank == 0 {
            for source in 1..self.size {
                self.recv_matching(source, Tag::BarrierArrive)?;
            }
            for dest in 1..self.size {
                self.send(dest, Tag::BarrierRelease, Box::default())?;
            }
        } else {
            self.send(0, Tag::BarrierArrive, Box::default())?;
            self.recv_matching(0, Tag::BarrierRelease)?;
        }
        Ok(())
    }

    /// Copy `root`'s grid into every other rank's `grid`.
    pub fn broadcast(&mut self, root: usize, grid: &mut Grid) -> Result<(), CommError> {
        if self.rank == root {
            for dest in (0..self.size).filter(|&d| d != root) {
                self.send(dest, Tag::Initial, wire::encode(grid.cells()))?;
            }
            Ok(())
        } else {
            let envelope = self.recv_matching(root, Tag::Initial)?;
            self.decode(&envelope, grid.cells_mut())
        }
    }

    /// Collect every rank's band into `grid` on `root`.
    ///
    /// Non-root ranks only post their send and return without waiting.
    pub fn gather_bands(
        &mut self,
        root: usize,
        tag: Tag,
        grid: &mut Grid,
        bands: &[Band],
    ) -> Result<(), CommError> {
        if self.rank != root {
            let own = bands[self.rank];
            let payload = wire::encode(grid.rows_slice(own.start, own.end));
            return self.send(root, tag, payload);
        }
        for (source, band) in bands.iter().enumerate() {
            if source == root {
                continue;
            }
            let envelope = self.recv_matching(source, tag)?;
            self.decode(&envelope, grid.rows_slice_mut(band.start, band.end))?;
        }
        Ok(())
    }

    /// Give every rank every other rank's band.
    pub fn all_gather_bands(&mut self, grid: &mut Grid, bands: &[Band]) -> Result<(), CommError> {
        let rank = self.rank;
        let own = bands[rank];
        let payload = wire::encode(grid.rows_slice(own.start, own.end));
        for dest in (0..self.size).filter(|&d| d != rank) {
            self.send(dest, Tag::Exchange, payload.clone())?;
        }
        for (source, band) in bands.iter().enumerate() {
            if source == rank {
                continue;
            }
            let envelope = self.recv_matching(source, Tag::Exchange)?;
            self.decode(&envelope, grid.rows_slice_mut(band.start, band.end))?;
        }
        Ok(())
    }

    /// Tell every other rank to stop waiting on this one.
    pub fn abort(&mut self) {
        let rank = self.rank;
        warn!(rank, "aborting run");
        for dest in (0..self.size).filter(|&d| d != rank) {
            // Peers that already exited have dropped their inbox.
            let _ = self.send(dest, Tag::Abort, Box::default());
        }
    }
}
