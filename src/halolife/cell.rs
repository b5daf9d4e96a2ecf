//! Cell state and the B3/S23 transition table.

/// State of a single cell.
///
/// `repr(i32)` keeps the in-memory cell the same width as its wire encoding,
/// so the memory footprint reported for a run is `2 * R * C * 4` bytes.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Dead = 0,
    Alive = 1,
}

impl State {
    #[inline(always)]
    pub fn is_alive(self) -> bool {
        self == State::Alive
    }

    #[inline(always)]
    pub fn from_bool(alive: bool) -> Self {
        if alive { State::Alive } else { State::Dead }
    }

    /// Contribution of this cell to a neighbor count.
    #[inline(always)]
    pub fn weight(self) -> u8 {
        self as u8
    }
}

/// Next state for `[current][live_neighbors]`.
const RULE_TABLE: [[State; 9]; 2] = build_rule_table();

const fn build_rule_table() -> [[State; 9]; 2] {
    let mut table = [[State::Dead; 9]; 2];
    let mut current = 0;
    while current < 2 {
        let mut n = 0;
        while n < 9 {
            table[current][n] = match n {
                2 => {
                    if current == 1 {
                        State::Alive
                    } else {
                        State::Dead
                    }
                }
                3 => State::Alive,
                _ => State::Dead,
            };
            n += 1;
        }
        current += 1;
    }
    table
}

/// Apply the transition rule to one cell.
///
/// `live_neighbors` must be in `[0, 8]`.
#[inline(always)]
pub fn next_state(current: State, live_neighbors: u8) -> State {
    debug_assert!(live_neighbors <= 8);
    RULE_TABLE[current as usize][live_neighbors as usize]
}

#[cfg(test)]
mod tests {
    use super::{State, next_state};

    fn expected(current: State, n: u8) -> State {
        match (current, n) {
            (State::Alive, 2) | (State::Alive, 3) => State::Alive,
            (State::Dead, 3) => State::Alive,
            _ => State::Dead,
        }
    }

    #[test]
    fn rule_table_matches_reference() {
        for current in [State::Dead, State::Alive] {
            for n in 0u8..=8 {
                assert_eq!(
                    next_state(current, n),
                    expected(current, n),
                    "current {current:?} with {n} live neighbors"
                );
            }
        }
    }

    #[test]
    fn two_neighbors_preserve_state() {
        assert_eq!(next_state(State::Alive, 2), State::Alive);
        assert_eq!(next_state(State::Dead, 2), State::Dead);
    }

    #[test]
    fn cell_is_four_bytes() {
        assert_eq!(std::mem::size_of::<State>(), 4);
        assert_eq!(State::Alive as i32, 1);
        assert_eq!(State::Dead as i32, 0);
    }
}
