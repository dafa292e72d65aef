//! # Error Types
//!
//! All error types for the sustain fixer.
//!
//! Per-file errors are caught at the batch boundary and aggregated into the
//! final report; they never abort the whole run. Everything below the file
//! level is designed to be total: malformed chart lines pass through
//! verbatim, and notes with no qualifying neighbor or insufficient length
//! degrade to no-ops instead of signaling errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixError {
    /// Quantizer was handed a non-positive tick interval. Fatal to the file
    /// being processed; typically means the chart declared a resolution too
    /// coarse to derive the 1/192 grid from.
    #[error("invalid quantization interval {0}: interval must be positive")]
    InvalidInterval(i64),

    /// The MIDI file uses SMPTE timecode division, which has no
    /// ticks-per-quarter-note to derive a musical grid from.
    #[error("unsupported MIDI time division: only ticks-per-quarter-note files are supported")]
    UnsupportedTimeDivision,

    /// Library-level decode error from the MIDI parser.
    #[error("MIDI decode error: {0}")]
    MidiDecode(#[from] midly::Error),

    /// No handler is registered for the file's extension.
    #[error("no handler registered for {}", .0.display())]
    UnrecognizedExtension(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
