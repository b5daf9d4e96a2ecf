//! Conway's Game of Life (B3/S23, bounded grid) partitioned into row bands
//! across message-passing workers, with halo exchange between neighbors.

pub mod halolife;
pub use halolife::{ExchangeStrategy, Grid, HaloLife, SimConfig, State};
