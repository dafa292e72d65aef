//! Applies the quantize-then-shorten passes across one grouping of notes.
//!
//! A grouping is either a named section of a `.chart` file or a
//! difficulty-specific pitch window within a MIDI track. Both run the same
//! two full passes: quantize every note to the 1/192 grid, snapshot the
//! start times once, then shorten every note against that single snapshot.
//! Shortening one note never changes another note's adjacency decision
//! within the same pass.

use log::debug;

use crate::error::FixError;
use crate::note::{Note, Resolution};
use crate::quantize::quantize;
use crate::shorten::shorten_if_adjacent;
use crate::tempo::TempoContext;

/// Metadata and non-performance groupings that must never be mutated:
/// global song info, the synchronization track, event markers, and the
/// vocal lane of MIDI charts.
pub const EXCLUDED_GROUPINGS: [&str; 4] = ["song", "synctrack", "events", "part vocals"];

/// Case-insensitive exact-name check against [`EXCLUDED_GROUPINGS`].
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_GROUPINGS
        .iter()
        .any(|excluded| name.eq_ignore_ascii_case(excluded))
}

/// An ordered grouping of notes sharing a name, e.g. an
/// instrument-difficulty pair. Order is insertion order from the source and
/// is preserved on write-back.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub notes: Vec<Note>,
}

impl Section {
    pub fn new(name: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            name: name.into(),
            notes,
        }
    }

    pub fn start_times(&self) -> Vec<i64> {
        self.notes.iter().map(|n| n.time).collect()
    }
}

/// Difficulty lanes of a rhythm-game MIDI track. Each difficulty occupies a
/// seven-key window starting at its base pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn base_key(self) -> u8 {
        match self {
            Difficulty::Easy => 60,
            Difficulty::Medium => 72,
            Difficulty::Hard => 84,
            Difficulty::Expert => 96,
        }
    }

    /// Whether a MIDI key belongs to this difficulty's lane window.
    pub fn contains(self, key: u8) -> bool {
        key >= self.base_key() && key <= self.base_key() + 6
    }
}

/// Normalizes one named chart section in place: quantize to the 1/192 grid,
/// then shorten sustains that run into a neighboring note. Excluded
/// groupings are skipped untouched.
pub fn normalize_section(
    section: &mut Section,
    resolution: Resolution,
    tempo: &TempoContext,
) -> Result<(), FixError> {
    if is_excluded(&section.name) {
        return Ok(());
    }

    debug!("normalizing section [{}]", section.name);

    let grid = resolution.one_ninety_second();
    for note in &mut section.notes {
        quantize(note, grid)?;
    }

    // Start times are cached once, after quantization and before any
    // shortening, so every adjacency check sees the same snapshot.
    let positions = section.start_times();
    for note in &mut section.notes {
        shorten_if_adjacent(note, &positions, grid, resolution, tempo);
    }

    Ok(())
}

/// Normalizes the notes of one MIDI track in place. Quantization runs once
/// over the whole track; the shortener then runs once per difficulty window
/// with that window's own start-time snapshot.
pub fn normalize_track(
    notes: &mut [Note],
    resolution: Resolution,
    tempo: &TempoContext,
) -> Result<(), FixError> {
    let grid = resolution.one_ninety_second();
    for note in notes.iter_mut() {
        quantize(note, grid)?;
    }

    for difficulty in Difficulty::ALL {
        let positions: Vec<i64> = notes
            .iter()
            .filter(|n| difficulty.contains(n.lane))
            .map(|n| n.time)
            .collect();

        for note in notes.iter_mut() {
            if difficulty.contains(note.lane) {
                shorten_if_adjacent(note, &positions, grid, resolution, tempo);
            }
        }
    }

    Ok(())
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
    fn test_exclusion_set_is_case_insensitive() {
        assert!(is_excluded("Song"));
        assert!(is_excluded("SyncTrack"));
        assert!(is_excluded("EVENTS"));
        assert!(is_excluded("PART VOCALS"));
        assert!(!is_excluded("ExpertSingle"));
    }

    #[test]
    fn test_excluded_sections_are_never_mutated() {
        let mut section = Section::new(
            "SyncTrack",
            vec![Note::new(3, 0, 477), Note::new(481, 1, 0)],
        );
        let before = section.notes.clone();
        normalize_section(&mut section, RES, &constant_tempo(120.0)).unwrap();
        assert_eq!(section.notes, before);
    }

    #[test]
    fn test_order_and_count_are_preserved() {
        let mut section = Section::new(
            "ExpertSingle",
            vec![
                Note::new(963, 2, 0),
                Note::new(0, 0, 477),
                Note::new(480, 1, 0),
            ],
        );
        normalize_section(&mut section, RES, &constant_tempo(120.0)).unwrap();

        assert_eq!(section.notes.len(), 3);
        // Relative order is untouched even though the file was not sorted
        // by time.
        assert_eq!(section.notes[0].time, 960);
        assert_eq!(section.notes[1].time, 0);
        assert_eq!(section.notes[2].time, 480);
        assert_eq!(section.notes[0].lane, 2);
        assert_eq!(section.notes[1].lane, 0);
        assert_eq!(section.notes[2].lane, 1);
    }

    #[test]
    fn test_quantize_then_shorten_against_one_snapshot() {
        // 477 quantizes to 480, landing the sustain exactly on the next
        // note; at 120 BPM a twenty-fourth (80 ticks) comes off.
        let mut section = Section::new(
            "ExpertSingle",
            vec![Note::new(0, 0, 477), Note::new(480, 1, 0)],
        );
        normalize_section(&mut section, RES, &constant_tempo(120.0)).unwrap();
        assert_eq!(section.notes[0].length, 400);
        assert_eq!(section.notes[1].time, 480);
    }

    #[test]
    fn test_far_neighbor_leaves_quantized_length() {
        let mut section = Section::new(
            "ExpertSingle",
            vec![Note::new(0, 0, 238), Note::new(960, 1, 0)],
        );
        normalize_section(&mut section, RES, &constant_tempo(120.0)).unwrap();
        assert_eq!(section.notes[0].length, 240);
    }

    #[test]
    fn test_lengths_stay_non_negative_and_never_grow() {
        let mut section = Section::new(
            "HardSingle",
            vec![
                Note::new(0, 0, 480),
                Note::new(480, 1, 2),
                Note::new(490, 2, 0),
            ],
        );
        let before = section.notes.clone();
        normalize_section(&mut section, RES, &constant_tempo(150.0)).unwrap();
        for (after, before) in section.notes.iter().zip(&before) {
            assert!(after.length >= 0);
            assert!(after.length <= before.length);
        }
    }

    #[test]
    fn test_coarse_resolution_reports_invalid_interval() {
        // resolution/48 collapses to zero ticks.
        let mut section = Section::new("ExpertSingle", vec![Note::new(0, 0, 10)]);
        let result = normalize_section(&mut section, Resolution(24), &constant_tempo(120.0));
        assert!(matches!(result, Err(FixError::InvalidInterval(0))));
    }

    #[test]
    fn test_difficulty_windows() {
        assert!(Difficulty::Expert.contains(96));
        assert!(Difficulty::Expert.contains(102));
        assert!(!Difficulty::Expert.contains(103));
        assert!(!Difficulty::Expert.contains(95));
        assert!(Difficulty::Easy.contains(60));
    }

    #[test]
    fn test_normalize_track_shortens_within_one_difficulty_only() {
        // Expert pair touches end-to-start; the Easy note sitting at the
        // same ticks as the Expert neighbor must not affect other lanes.
        let mut notes = vec![
            Note::new(0, 96, 480),
            Note::new(480, 97, 0),
            Note::new(0, 60, 480),
        ];
        normalize_track(&mut notes, RES, &constant_tempo(120.0)).unwrap();

        assert_eq!(notes[0].length, 400);
        // No Easy note starts near tick 480, so the Easy sustain is kept.
        assert_eq!(notes[2].length, 480);
    }

    #[test]
    fn test_normalize_track_quantizes_marker_notes_outside_windows() {
        // Overdrive-style markers above the difficulty windows still get
        // snapped to the grid, but are never shortened.
        let mut notes = vec![Note::new(3, 116, 957), Note::new(960, 116, 0)];
        normalize_track(&mut notes, RES, &constant_tempo(120.0)).unwrap();
        assert_eq!(notes[0].time, 0);
        assert_eq!(notes[0].length, 960);
    }
}
