//! Wire encoding of cell rows: one 4-byte signed integer per cell, 0 or 1.

use super::cell::State;

#[inline]
pub fn encode(cells: &[State]) -> Box<[i32]> {
    cells.iter().map(|&c| c as i32).collect()
}

/// Decode `payload` into `out`, which fixes the expected length.
pub fn decode_into(payload: &[i32], out: &mut [State]) -> Result<(), String> {
    if payload.len() != out.len() {
        return Err(format!(
            "expected {} cells, got {}",
            out.len(),
            payload.len()
        ));
    }
    for (i, (&raw, cell)) in payload.iter().zip(out.iter_mut()).enumerate() {
        *cell = match raw {
            0 => State::Dead,
            1 => State::Alive,
            other => return Err(format!("cell {i} has invalid state {other}")),
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        let mut out = [State::Dead; 3];
        assert!(decode_into(&[0, 1], &mut out).is_err());
    }

    #[test]
    fn rejects_out_of_range_state() {
        let mut out = [State::Dead; 3];
        let err = decode_into(&[0, 2, 1], &mut out).unwrap_err();
        assert!(err.contains("cell 1"), "{err}");
    }

    #[test]
    fn encodes_alive_as_one() {
        let payload = encode(&[State::Alive, State::Dead, State::Alive]);
        assert_eq!(&*payload, &[1, 0, 1]);
        let mut out = [State::Dead; 3];
        decode_into(&payload, &mut out).unwrap();
        assert_eq!(out, [State::Alive, State::Dead, State::Alive]);
    }
}
