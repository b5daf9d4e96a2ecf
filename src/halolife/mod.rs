//! Band-partitioned Game of Life over message-passing workers.

pub mod band;
mod buffer;
mod cell;
pub mod comm;
mod config;
mod engine;
mod error;
mod grid;
pub mod halo;
mod render;
mod report;
pub mod stepper;
mod wire;
mod worker;

pub use band::{Band, Topology, bands, partition};
pub use buffer::DoubleBuffer;
pub use cell::{State, next_state};
pub use config::{ExchangeStrategy, SimConfig};
pub use engine::{HaloLife, RunOutcome, evolve};
pub use error::{CommError, ConfigError, SimError, SimResult};
pub use grid::{Grid, RowWindow, neighbor_count};
pub use render::{FrameSink, TerminalRenderer, render_frame};
pub use report::PerformanceReport;
pub use stepper::{evolve_serial, step_serial};
