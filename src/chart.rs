//! Line-oriented `.chart` parsing and surgical write-back.
//!
//! A chart file is a sequence of named blocks:
//!
//! ```text
//! [ExpertSingle]
//! {
//!   0 = N 0 480
//!   480 = N 1 0
//! }
//! ```
//!
//! Parsing runs a line-by-line state machine that decodes note and tempo
//! events into the data model while recording, for every rewrite-eligible
//! block, the byte span of its body and of each line inside it. Write-back
//! rebuilds the file by slicing the original text: only note lines whose
//! note was actually mutated are re-rendered (keeping their original
//! indentation and line terminator), so every other byte of the file
//! round-trips untouched. Blocks in the exclusion set, and blocks with no
//! notes, are never rewritten.

use std::fs;
use std::ops::Range;
use std::path::Path;

use log::{debug, info};
use regex::Regex;

use crate::error::FixError;
use crate::normalize::{is_excluded, normalize_section, Section};
use crate::note::{Note, Resolution};
use crate::tempo::{Tempo, TempoContext, TempoMap};

/// Lanes a note line may legally name. Values 5 and 6 are forced/tap
/// modifier lines in some chart dialects and pass through as plain text.
const NOTE_LANES: [u8; 6] = [0, 1, 2, 3, 4, 7];

/// One line inside a rewrite-eligible block body.
#[derive(Debug, Clone)]
enum BlockLine {
    /// A decoded note line: the index of its note within the owning
    /// section, the time and length it was read with, and its byte span.
    Note {
        note: usize,
        time: i64,
        length: i64,
        span: Range<usize>,
    },
    /// Anything else: comments, modifier lines, blank lines. Copied
    /// through verbatim.
    Other { span: Range<usize> },
}

/// Byte span of one block body slated for rewrite, tied to its section.
#[derive(Debug, Clone)]
struct BlockSpan {
    section: usize,
    body: Range<usize>,
    lines: Vec<BlockLine>,
}

/// In-memory representation of a `.chart` file: the decoded sections and
/// tempo map plus the original text and the byte spans needed to rebuild
/// it.
#[derive(Debug)]
pub struct ChartFile {
    text: String,
    pub resolution: Resolution,
    pub sections: Vec<Section>,
    pub tempo: TempoContext,
    blocks: Vec<BlockSpan>,
}

/// Parser state. A header line names the next block; an opening brace
/// starts accumulating its body.
enum State {
    Idle,
    HaveName(String),
    InBlock(OpenBlock),
}

struct OpenBlock {
    name: String,
    body_start: usize,
    lines: Vec<BlockLine>,
    notes: Vec<Note>,
}

impl ChartFile {
    /// Reads and parses the chart file at `path`.
    pub fn read(path: &Path) -> Result<ChartFile, FixError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(text))
    }

    /// Parses chart text. Parsing is total: lines that match no known
    /// grammar are retained verbatim and never rejected.
    pub fn parse(text: String) -> ChartFile {
        let integer = Regex::new(r"\d+").expect("static pattern");

        let mut resolution = Resolution::DEFAULT;
        let mut sections: Vec<Section> = Vec::new();
        let mut tempo_events: Vec<Tempo> = Vec::new();
        let mut blocks: Vec<BlockSpan> = Vec::new();

        let mut state = State::Idle;
        let mut offset = 0usize;

        for raw in text.split_inclusive('\n') {
            let span = offset..offset + raw.len();
            offset = span.end;
            let line = raw.trim();

            state = match state {
                State::Idle => match header_name(line) {
                    Some(name) => State::HaveName(name.to_string()),
                    None => State::Idle,
                },
                State::HaveName(name) => {
                    if line == "{" {
                        State::InBlock(OpenBlock {
                            name,
                            body_start: span.end,
                            lines: Vec::new(),
                            notes: Vec::new(),
                        })
                    } else if let Some(next) = header_name(line) {
                        State::HaveName(next.to_string())
                    } else {
                        State::HaveName(name)
                    }
                }
                State::InBlock(mut block) => {
                    if line == "}" {
                        // A block is only slated for rewrite when its name
                        // survives the exclusion set and it decoded at
                        // least one note.
                        if !is_excluded(&block.name) && !block.notes.is_empty() {
                            blocks.push(BlockSpan {
                                section: sections.len(),
                                body: block.body_start..span.start,
                                lines: block.lines,
                            });
                        }
                        sections.push(Section::new(block.name, block.notes));
                        State::Idle
                    } else {
                        if let Some(note) = parse_note_line(line) {
                            block.lines.push(BlockLine::Note {
                                note: block.notes.len(),
                                time: note.time,
                                length: note.length,
                                span: span.clone(),
                            });
                            block.notes.push(note);
                        } else {
                            if let Some(tempo) = parse_tempo_line(line) {
                                tempo_events.push(tempo);
                            } else if line.to_ascii_lowercase().contains("resolution") {
                                if let Some(m) = integer.find(line) {
                                    if let Ok(value) = m.as_str().parse::<u32>() {
                                        resolution = Resolution(value);
                                    }
                                }
                            }
                            block.lines.push(BlockLine::Other { span: span.clone() });
                        }
                        State::InBlock(block)
                    }
                }
            };
        }

        debug!(
            "parsed chart: {} sections, {} tempo events, resolution {}",
            sections.len(),
            tempo_events.len(),
            resolution.0
        );

        ChartFile {
            text,
            resolution,
            sections,
            tempo: TempoContext::new(TempoMap::new(tempo_events)),
            blocks,
        }
    }

    /// Runs the normalizer over every section. Excluded sections are
    /// skipped inside [`normalize_section`].
    pub fn normalize(&mut self) -> Result<(), FixError> {
        let tempo = &self.tempo;
        for section in &mut self.sections {
            normalize_section(section, self.resolution, tempo)?;
        }
        Ok(())
    }

    /// Rebuilds the chart text, substituting re-rendered note lines for
    /// every note that was mutated and copying every other byte through
    /// unchanged.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0usize;

        for block in &self.blocks {
            out.push_str(&self.text[cursor..block.body.start]);
            let section = &self.sections[block.section];

            for line in &block.lines {
                match line {
                    BlockLine::Other { span } => out.push_str(&self.text[span.clone()]),
                    BlockLine::Note {
                        note,
                        time,
                        length,
                        span,
                    } => {
                        let current = &section.notes[*note];
                        if current.time == *time && current.length == *length {
                            // Untouched notes round-trip byte-identically.
                            out.push_str(&self.text[span.clone()]);
                        } else {
                            let raw = &self.text[span.clone()];
                            let indent = &raw[..raw.len() - raw.trim_start().len()];
                            let eol = if raw.ends_with("\r\n") {
                                "\r\n"
                            } else if raw.ends_with('\n') {
                                "\n"
                            } else {
                                ""
                            };
                            out.push_str(indent);
                            out.push_str(&format!(
                                "{} = N {} {}",
                                current.time, current.lane, current.length
                            ));
                            out.push_str(eol);
                        }
                    }
                }
            }
            cursor = block.body.end;
        }

        out.push_str(&self.text[cursor..]);
        out
    }

    /// Writes the (normalized) chart back over `path`.
    pub fn write(&self, path: &Path) -> Result<(), FixError> {
        fs::write(path, self.render())?;
        Ok(())
    }
}

/// Block name when the trimmed line has the form `[name]`.
fn header_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

/// Decodes a `<tick> = N <lane> <length>` line. Lane values outside the
/// playable set (e.g. forced/tap modifiers 5 and 6) do not qualify.
fn parse_note_line(line: &str) -> Option<Note> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [tick, "=", "N", lane, length] => {
            let time = tick.parse::<i64>().ok()?;
            let lane = lane.parse::<u8>().ok()?;
            if !NOTE_LANES.contains(&lane) {
                return None;
            }
            let length = length.parse::<i64>().ok()?;
            Some(Note::new(time, lane, length))
        }
        _ => None,
    }
}

/// Decodes a `<tick> = B <bpm*1000>` line.
fn parse_tempo_line(line: &str) -> Option<Tempo> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.as_slice() {
        [tick, "=", "B", bpm] => {
            let time = tick.parse::<i64>().ok()?;
            let milli_bpm = bpm.parse::<i64>().ok()?;
            Some(Tempo::new(time, milli_bpm as f32 / 1000.0))
        }
        _ => None,
    }
}

/// Normalizes the chart file at `path` in place.
pub fn process_chart_file(path: &Path) -> Result<(), FixError> {
    info!("processing chart file {}", path.display());
    let mut chart = ChartFile::read(path)?;
    chart.normalize()?;
    chart.write(path)?;
    Ok(())
}
