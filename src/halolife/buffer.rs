//! Two same-shaped grids with a phase bit selecting which one is current.

use super::grid::Grid;

pub struct DoubleBuffer {
    /// `slots[phase]` = current (read), `slots[1 - phase]` = next (write).
    slots: [Grid; 2],
    phase: usize,
}

impl DoubleBuffer {
    /// Wrap `current` with a same-shaped `next` slot.
    ///
    /// # Panics
    /// If the two grids differ in shape.
    pub fn new(current: Grid, next: Grid) -> Self {
        assert_eq!(
            (current.rows(), current.cols()),
            (next.rows(), next.cols()),
            "double buffer slots must have the same shape"
        );
        Self {
            slots: [current, next],
            phase: 0,
        }
    }

    #[inline(always)]
    pub fn current(&self) -> &Grid {
        &self.slots[self.phase]
    }

    #[inline(always)]
    pub fn current_mut(&mut self) -> &mut Grid {
        &mut self.slots[self.phase]
    }

    /// Read-only current and writable next, borrowed together.
    #[inline(always)]
    pub fn split(&mut self) -> (&Grid, &mut Grid) {
        let [a, b] = &mut self.slots;
        if self.phase == 0 { (a, b) } else { (b, a) }
    }

    /// Make next the current generation. O(1); no cells move.
    #[inline(always)]
    pub fn swap(&mut self) {
        self.phase ^= 1;
    }

    pub fn footprint_bytes(&self) -> usize {
        self.slots.iter().map(Grid::footprint_bytes).sum()
    }

    pub fn into_current(self) -> Grid {
        let [a, b] = self.slots;
        if self.phase == 0 { a } else { b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halolife::cell::State;

    #[test]
    fn swap_exchanges_roles_without_copying() {
        let mut buffers = DoubleBuffer::new(Grid::new(2, 2), Grid::new(2, 2));
        let before = buffers.current().cells().as_ptr();
        {
            let (current, next) = buffers.split();
            assert_eq!(current.population(), 0);
            next.set(0, 1, State::Alive);
        }
        buffers.swap();
        assert_eq!(buffers.current().get(0, 1), State::Alive);
        assert_ne!(buffers.current().cells().as_ptr(), before);

        buffers.swap();
        assert_eq!(buffers.current().cells().as_ptr(), before);
        assert_eq!(buffers.footprint_bytes(), 2 * 2 * 2 * 4);
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn rejects_mismatched_slots() {
        let _ = DoubleBuffer::new(Grid::new(2, 2), Grid::new(2, 3));
    }
}
