pub mod batch;
pub mod chart;
pub mod error;
pub mod midi;
pub mod normalize;
pub mod note;
pub mod quantize;
pub mod shorten;
pub mod tempo;

pub use batch::{BatchReport, Dispatch};
pub use chart::{process_chart_file, ChartFile};
pub use error::FixError;
pub use midi::process_midi_file;
pub use normalize::{is_excluded, normalize_section, normalize_track, Difficulty, Section};
pub use note::{Note, Resolution};
pub use quantize::quantize;
pub use shorten::{shorten_amount, shorten_if_adjacent};
pub use tempo::{Tempo, TempoContext, TempoMap};

use std::path::Path;

/// Normalize a single chart or MIDI file in place, dispatching on the
/// file's extension. This is the main entry point for the library.
pub fn fix_file(path: &Path) -> Result<(), FixError> {
    match Dispatch::standard().handler_for(path) {
        Some(handler) => handler(path),
        None => Err(FixError::UnrecognizedExtension(path.to_path_buf())),
    }
}
