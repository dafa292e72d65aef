//! Tempo events and the piecewise-constant tempo function derived from them.

pub const DEFAULT_BPM: f32 = 120.0;

/// How far apart the fastest and slowest tempo events may be (in BPM) while
/// still treating the whole piece as having one representative tempo.
pub const CONSISTENT_BPM_BAND: f32 = 20.0;

/// A tempo change: from `time` onward the piece runs at `bpm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub time: i64,
    pub bpm: f32,
}

impl Tempo {
    pub fn new(time: i64, bpm: f32) -> Self {
        Self { time, bpm }
    }
}

/// Ordered list of tempo changes defining a piecewise-constant tempo
/// function over the whole piece.
#[derive(Debug, Clone, Default)]
pub struct TempoMap {
    events: Vec<Tempo>,
}

impl TempoMap {
    pub fn new(mut events: Vec<Tempo>) -> Self {
        events.sort_by_key(|t| t.time);
        Self { events }
    }

    pub fn events(&self) -> &[Tempo] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tempo in effect at `time`: the latest event strictly before `time`,
    /// or [`DEFAULT_BPM`] when none precedes it.
    pub fn bpm_at(&self, time: i64) -> f32 {
        self.events
            .iter()
            .take_while(|t| t.time < time)
            .last()
            .map(|t| t.bpm)
            .unwrap_or(DEFAULT_BPM)
    }

    /// Representative BPM when every tempo event falls within `band` BPM of
    /// the others, `None` otherwise. An empty map reports the default tempo.
    pub fn consistent_bpm(&self, band: f32) -> Option<f32> {
        if self.events.is_empty() {
            return Some(DEFAULT_BPM);
        }

        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0f32;
        for tempo in &self.events {
            min = min.min(tempo.bpm);
            max = max.max(tempo.bpm);
            sum += tempo.bpm;
        }

        if max - min < band {
            Some(sum / self.events.len() as f32)
        } else {
            None
        }
    }
}

/// A tempo map together with its consistent-BPM summary, computed once per
/// file so per-note lookups can short-circuit when the tempo never strays.
#[derive(Debug, Clone, Default)]
pub struct TempoContext {
    map: TempoMap,
    consistent: Option<f32>,
}

impl TempoContext {
    pub fn new(map: TempoMap) -> Self {
        let consistent = map.consistent_bpm(CONSISTENT_BPM_BAND);
        Self { map, consistent }
    }

    pub fn map(&self) -> &TempoMap {
        &self.map
    }

    pub fn consistent_bpm(&self) -> Option<f32> {
        self.consistent
    }

    /// BPM to use for a note starting at `time`.
    pub fn bpm_at(&self, time: i64) -> f32 {
        self.consistent.unwrap_or_else(|| self.map.bpm_at(time))
    }
}
