//! Batch processing of files and directory trees.
//!
//! Dispatch is an explicit table from extension to handler, built once at
//! startup and passed in. A failing file is logged, recorded in the report,
//! and never aborts the rest of the batch.

use std::path::{Path, PathBuf};

use log::{error, warn};
use walkdir::WalkDir;

use crate::chart::process_chart_file;
use crate::error::FixError;
use crate::midi::process_midi_file;

/// A file handler: normalizes the file at the given path in place.
pub type Handler = fn(&Path) -> Result<(), FixError>;

/// Extension-to-handler table. Extensions are compared case-insensitively
/// and without the leading dot.
pub struct Dispatch {
    handlers: Vec<(&'static str, Handler)>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// The table used by the command-line tool: `.chart` and `.mid`.
    pub fn standard() -> Self {
        Self::new()
            .register("chart", process_chart_file)
            .register("mid", process_midi_file)
    }

    pub fn register(mut self, extension: &'static str, handler: Handler) -> Self {
        self.handlers.push((extension, handler));
        self
    }

    pub fn handler_for(&self, path: &Path) -> Option<Handler> {
        let extension = path.extension()?.to_str()?;
        self.handlers
            .iter()
            .find(|(known, _)| extension.eq_ignore_ascii_case(known))
            .map(|(_, handler)| *handler)
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<(PathBuf, FixError)>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Expands the argument paths into the ordered list of processable files:
/// plain files with a registered extension, plus every matching file found
/// by walking argument directories recursively. Paths that are neither file
/// nor directory are logged and skipped.
pub fn collect_targets(paths: &[PathBuf], dispatch: &Dispatch) -> Vec<PathBuf> {
    let mut targets = Vec::new();

    for path in paths {
        if path.is_file() {
            if dispatch.handler_for(path).is_some() {
                targets.push(path.clone());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() && dispatch.handler_for(entry.path()).is_some() {
                    targets.push(entry.path().to_path_buf());
                }
            }
        } else {
            warn!("{} is not a valid file or directory", path.display());
        }
    }

    targets
}

/// Processes every matching file under the argument paths, sequentially.
/// Failures are collected into the report rather than propagated.
pub fn run(paths: &[PathBuf], dispatch: &Dispatch) -> BatchReport {
    let targets = collect_targets(paths, dispatch);
    let total = targets.len();
    let mut report = BatchReport::default();

    for (index, path) in targets.iter().enumerate() {
        println!("Processing file {}/{}: {}", index + 1, total, path.display());
        report.processed += 1;

        let handler = match dispatch.handler_for(path) {
            Some(handler) => handler,
            None => continue,
        };
        match handler(path) {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                error!("failed to process {}: {}", path.display(), err);
                report.failures.push((path.clone(), err));
            }
        }
    }

    report
}
