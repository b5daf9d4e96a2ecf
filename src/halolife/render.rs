//! Frame sinks for the root rank's per-generation snapshots.

use std::io::{self, Write};
use std::time::Duration;

use super::grid::Grid;

/// Receives the assembled global grid once per generation on rank 0.
pub trait FrameSink: Send {
    fn show(&mut self, generation: u64, grid: &Grid) -> io::Result<()>;
}

/// Clear-screen escape followed by cursor-home.
const CLEAR: &str = "\x1b[2J\x1b[H";

/// Text rendering of `grid`: `X` for alive, blank for dead, one line per row.
pub fn render_frame(grid: &Grid) -> String {
    let mut out = String::with_capacity(grid.rows() * (grid.cols() + 1));
    for row in 0..grid.rows() {
        out.extend(
            grid.row(row)
                .iter()
                .map(|c| if c.is_alive() { 'X' } else { ' ' }),
        );
        out.push('\n');
    }
    out
}

/// Redraws the terminal for each frame, then pauses for `delay`.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    delay: Duration,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout(delay: Duration) -> Self {
        Self::new(io::stdout(), delay)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W, delay: Duration) -> Self {
        Self { out, delay }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> FrameSink for TerminalRenderer<W> {
    fn show(&mut self, _generation: u64, grid: &Grid) -> io::Result<()> {
        self.out.write_all(CLEAR.as_bytes())?;
        self.out.write_all(render_frame(grid).as_bytes())?;
        self.out.flush()?;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_alive_as_x() {
        let grid = Grid::from_rows(&[[1, 0, 1], [0, 1, 0]]);
        assert_eq!(render_frame(&grid), "X X\n X \n");
    }

    #[test]
    fn terminal_frame_starts_with_clear() {
        let grid = Grid::from_rows(&[[1, 1]]);
        let mut renderer = TerminalRenderer::new(Vec::new(), Duration::ZERO);
        renderer.show(0, &grid).unwrap();
        let bytes = renderer.into_inner();
        assert_eq!(String::from_utf8(bytes).unwrap(), format!("{CLEAR}XX\n"));
    }
}
