//! Tempo-adaptive shortening of sustains that run into a following note.
//!
//! A sustain whose end lands within a small threshold of another note's
//! start is first snapped so it ends exactly on that note, then shortened by
//! a tempo-dependent amount. Faster tempos need smaller absolute gaps
//! because the same tick gap represents less real time; the three-tier BPM
//! bucketing is a deliberately coarse, designer-tuned heuristic.

use crate::note::{Note, Resolution};
use crate::tempo::TempoContext;

/// Tick amount to trim off an adjacent sustain at the given tempo.
///
/// BPM >= 140 trims a sixteenth, 100 <= BPM < 140 a twenty-fourth, and
/// anything slower a thirty-second.
pub fn shorten_amount(resolution: Resolution, bpm: f32) -> i64 {
    if bpm >= 140.0 {
        resolution.sixteenth()
    } else if bpm >= 100.0 {
        resolution.twenty_fourth()
    } else {
        resolution.thirty_second()
    }
}

/// First start time in `positions` within `threshold` ticks of `end_time`.
///
/// `positions` is scanned in insertion order and the first qualifying entry
/// wins, matching the order notes were read from the source.
fn adjacent_start(positions: &[i64], end_time: i64, threshold: i64) -> Option<i64> {
    positions
        .iter()
        .copied()
        .find(|pos| (pos - end_time).abs() < threshold)
}

/// Shortens `note` when its end lands within `threshold` ticks of any start
/// time in `positions`, mutating it in place.
///
/// Notes with a length of 0 or 1 tick are not meaningfully sustained and
/// are left alone. When an adjacent start is found the length is first
/// snapped so the note ends exactly on it (exact collision elimination
/// takes priority), then the tempo-bucketed amount is subtracted if the
/// remaining length covers it. The final length never goes negative and
/// never exceeds the length the note came in with.
pub fn shorten_if_adjacent(
    note: &mut Note,
    positions: &[i64],
    threshold: i64,
    resolution: Resolution,
    tempo: &TempoContext,
) {
    if note.length <= 1 {
        return;
    }

    let original_length = note.length;
    let next = match adjacent_start(positions, note.end_time(), threshold) {
        Some(next) => next,
        None => return,
    };

    if next != note.end_time() {
        note.length = next - note.time;
    }

    let amount = shorten_amount(resolution, tempo.bpm_at(note.time));
    if note.length >= amount {
        note.length -= amount;
    }

    note.length = note.length.clamp(0, original_length);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::{Tempo, TempoMap};

    const RES: Resolution = Resolution(480);

    fn constant_tempo(bpm: f32) -> TempoContext {
        TempoContext::new(TempoMap::new(vec![Tempo::new(0, bpm)]))
    }

    #[test]
    fn test_bucket_boundaries() {
        // Exactly 140 selects the sixteenth bucket, exactly 100 the
        // twenty-fourth, and anything below 100 the thirty-second.
        assert_eq!(shorten_amount(RES, 140.0), 120);
        assert_eq!(shorten_amount(RES, 150.0), 120);
        assert_eq!(shorten_amount(RES, 100.0), 80);
        assert_eq!(shorten_amount(RES, 139.9), 80);
        assert_eq!(shorten_amount(RES, 99.9), 60);
    }

    #[test]
    fn test_snap_then_shorten() {
        // End at 470, neighbor at 480, threshold wide enough to cover the
        // gap: length snaps to 480, then loses a sixteenth at 150 BPM.
        let mut note = Note::new(0, 0, 470);
        shorten_if_adjacent(
            &mut note,
            &[0, 480],
            RES.one_twenty_eighth(),
            RES,
            &constant_tempo(150.0),
        );
        assert_eq!(note.length, 360);
    }

    #[test]
    fn test_exact_touch_shortens_without_snap() {
        let mut note = Note::new(0, 0, 480);
        shorten_if_adjacent(
            &mut note,
            &[0, 480],
            RES.one_ninety_second(),
            RES,
            &constant_tempo(120.0),
        );
        assert_eq!(note.length, 400);
    }

    #[test]
    fn test_no_adjacency_means_no_change() {
        let mut note = Note::new(0, 0, 240);
        shorten_if_adjacent(
            &mut note,
            &[0, 960],
            RES.one_ninety_second(),
            RES,
            &constant_tempo(120.0),
        );
        assert_eq!(note.length, 240);
    }

    #[test]
    fn test_unsustained_notes_are_untouched() {
        for length in [0, 1] {
            let mut note = Note::new(0, 0, length);
            shorten_if_adjacent(
                &mut note,
                &[0, 1],
                RES.one_ninety_second(),
                RES,
                &constant_tempo(120.0),
            );
            assert_eq!(note.length, length);
        }
    }

    #[test]
    fn test_too_short_to_shorten_is_left_alone() {
        // Length below the shorten amount: the subtraction is skipped.
        let mut note = Note::new(0, 0, 50);
        shorten_if_adjacent(
            &mut note,
            &[0, 50],
            RES.one_ninety_second(),
            RES,
            &constant_tempo(120.0),
        );
        assert_eq!(note.length, 50);
    }

    #[test]
    fn test_length_never_increases() {
        // Snapping up to the neighbor and then failing the subtraction
        // guard must not leave the note longer than it started.
        let mut note = Note::new(0, 0, 4);
        shorten_if_adjacent(&mut note, &[12], 15, RES, &constant_tempo(120.0));
        assert!(note.length <= 4);
        assert!(note.length >= 0);
    }

    #[test]
    fn test_first_match_in_insertion_order_wins() {
        // Both 475 and 485 qualify; 485 comes first in insertion order, so
        // the note snaps to it.
        let mut note = Note::new(0, 0, 480);
        shorten_if_adjacent(&mut note, &[485, 475], 15, RES, &constant_tempo(150.0));
        assert_eq!(note.length, 485 - 120);
    }

    #[test]
    fn test_per_note_tempo_lookup_when_inconsistent() {
        let tempo = TempoContext::new(TempoMap::new(vec![
            Tempo::new(0, 90.0),
            Tempo::new(960, 180.0),
        ]));
        assert_eq!(tempo.consistent_bpm(), None);

        // Note in the 90 BPM region: thirty-second bucket.
        let mut slow = Note::new(480, 0, 480);
        shorten_if_adjacent(&mut slow, &[960], RES.one_ninety_second(), RES, &tempo);
        assert_eq!(slow.length, 420);

        // Note in the 180 BPM region: sixteenth bucket.
        let mut fast = Note::new(1920, 0, 480);
        shorten_if_adjacent(&mut fast, &[2400], RES.one_ninety_second(), RES, &tempo);
        assert_eq!(fast.length, 360);
    }
}
