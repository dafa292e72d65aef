//! Snapping note times and lengths onto a tick grid.

use crate::error::FixError;
use crate::note::Note;

/// Rounds `value` to the nearest multiple of `interval`, ties away from
/// zero. `interval` must be positive.
pub fn round_to_nearest(value: i64, interval: i64) -> i64 {
    (value as f64 / interval as f64).round() as i64 * interval
}

/// Rounds a note's start time and sustain length independently to the
/// nearest multiple of `interval`, mutating the note in place.
///
/// Already-aligned values are left untouched, so quantization is
/// idempotent. Values outside any musical range are accepted as-is.
pub fn quantize(note: &mut Note, interval: i64) -> Result<(), FixError> {
    if interval <= 0 {
        return Err(FixError::InvalidInterval(interval));
    }

    if note.time % interval != 0 {
        note.time = round_to_nearest(note.time, interval);
    }
    if note.length % interval != 0 {
        note.length = round_to_nearest(note.length, interval);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_nearest_multiple() {
        assert_eq!(round_to_nearest(473, 10), 470);
        assert_eq!(round_to_nearest(477, 10), 480);
        assert_eq!(round_to_nearest(0, 10), 0);
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(round_to_nearest(475, 10), 480);
        assert_eq!(round_to_nearest(5, 10), 10);
    }

    #[test]
    fn test_quantize_mutates_both_fields() {
        let mut note = Note::new(473, 0, 236);
        quantize(&mut note, 10).unwrap();
        assert_eq!(note.time, 470);
        assert_eq!(note.length, 240);
    }

    #[test]
    fn test_quantize_is_idempotent_on_aligned_notes() {
        let mut note = Note::new(480, 2, 240);
        quantize(&mut note, 10).unwrap();
        assert_eq!(note, Note::new(480, 2, 240));

        quantize(&mut note, 10).unwrap();
        assert_eq!(note, Note::new(480, 2, 240));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut note = Note::new(480, 0, 240);
        assert!(matches!(
            quantize(&mut note, 0),
            Err(FixError::InvalidInterval(0))
        ));
    }

    #[test]
    fn test_negative_interval_is_rejected() {
        let mut note = Note::new(480, 0, 240);
        assert!(matches!(
            quantize(&mut note, -10),
            Err(FixError::InvalidInterval(-10))
        ));
    }
}
