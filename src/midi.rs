//! Binary `.mid` decode, normalize, and in-place write-back via `midly`.
//!
//! MIDI stores notes as paired on/off events with delta timing. Each track
//! is flattened to absolute ticks, on/off pairs are matched per
//! (channel, key) to recover timed notes, the normalizer mutates the notes,
//! and the paired events are re-timestamped from the result. Everything
//! that is not a matched note pair (meta events, controllers, unpaired
//! notes) keeps its original timing.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use midly::num::u28;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::FixError;
use crate::normalize::{is_excluded, normalize_track};
use crate::note::{Note, Resolution};
use crate::tempo::{Tempo, TempoContext, TempoMap};

/// Normalizes the MIDI file at `path` in place.
///
/// The first track is the conductor track and is left untouched; every
/// following track is processed unless its name is in the exclusion set.
pub fn process_midi_file(path: &Path) -> Result<(), FixError> {
    info!("processing MIDI file {}", path.display());

    let bytes = fs::read(path)?;
    let mut smf = Smf::parse(&bytes)?;

    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => Resolution(ticks.as_int() as u32),
        Timing::Timecode(..) => return Err(FixError::UnsupportedTimeDivision),
    };
    let tempo = TempoContext::new(collect_tempo_map(&smf));

    for track in smf.tracks.iter_mut().skip(1) {
        process_track(track, resolution, &tempo)?;
    }

    smf.save(path)?;
    Ok(())
}

/// Gathers every tempo meta event across all tracks into one ordered map.
fn collect_tempo_map(smf: &Smf) -> TempoMap {
    let mut events = Vec::new();
    for track in &smf.tracks {
        let mut at = 0i64;
        for event in track {
            at += event.delta.as_int() as i64;
            if let TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) = event.kind {
                let bpm = 60_000_000.0 / us_per_quarter.as_int() as f32;
                events.push(Tempo::new(at, bpm));
            }
        }
    }
    TempoMap::new(events)
}

/// Track name from the first sequence-name meta event, if any.
fn track_name(track: &[TrackEvent]) -> Option<String> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
            Some(String::from_utf8_lossy(raw).into_owned())
        }
        _ => None,
    })
}

/// Indices of the on/off events backing one recovered note.
struct NotePair {
    on: usize,
    off: usize,
}

fn process_track<'a>(
    track: &mut Vec<TrackEvent<'a>>,
    resolution: Resolution,
    tempo: &TempoContext,
) -> Result<(), FixError> {
    let name = track_name(track).unwrap_or_default();
    if is_excluded(&name) {
        debug!("skipping excluded track {:?}", name);
        return Ok(());
    }
    debug!("processing track {:?}", name);

    // Flatten deltas into absolute tick times.
    let mut at = 0i64;
    let mut timed: Vec<(i64, TrackEvent<'a>)> = Vec::with_capacity(track.len());
    for event in track.drain(..) {
        at += event.delta.as_int() as i64;
        timed.push((at, event));
    }

    // Pair note-on with the next note-off (or zero-velocity note-on) per
    // channel and key, first-on first-off.
    let mut open: HashMap<(u8, u8), VecDeque<(usize, i64)>> = HashMap::new();
    let mut recovered: Vec<(NotePair, Note)> = Vec::new();

    for (index, (time, event)) in timed.iter().enumerate() {
        if let TrackEventKind::Midi { channel, message } = event.kind {
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    open.entry((channel.as_int(), key.as_int()))
                        .or_default()
                        .push_back((index, *time));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    if let Some(starts) = open.get_mut(&(channel.as_int(), key.as_int())) {
                        if let Some((on_index, start)) = starts.pop_front() {
                            recovered.push((
                                NotePair {
                                    on: on_index,
                                    off: index,
                                },
                                Note::new(start, key.as_int(), time - start),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let dangling: usize = open.values().map(VecDeque::len).sum();
    if dangling > 0 {
        warn!("track {:?} has {} unpaired note-on events", name, dangling);
    }

    // Restore source order: notes are grouped by when they start, not by
    // when their off event happened to arrive.
    recovered.sort_by_key(|(pair, _)| pair.on);
    let (pairs, mut notes): (Vec<NotePair>, Vec<Note>) = recovered.into_iter().unzip();

    normalize_track(&mut notes, resolution, tempo)?;

    // Re-timestamp the paired events from the mutated notes.
    for (pair, note) in pairs.iter().zip(&notes) {
        timed[pair.on].0 = note.time;
        timed[pair.off].0 = note.end_time();
    }

    // Keep the end-of-track marker after everything else.
    let last = timed.iter().map(|(time, _)| *time).max().unwrap_or(0);
    for (time, event) in &mut timed {
        if matches!(event.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)) {
            *time = last;
        }
    }

    // Back to delta timing.
    timed.sort_by_key(|(time, _)| *time);
    let mut previous = 0i64;
    for (time, event) in &mut timed {
        let delta = (*time - previous).max(0) as u32;
        event.delta = u28::new(delta);
        previous = *time;
    }

    *track = timed.into_iter().map(|(_, event)| event).collect();
    Ok(())
}
