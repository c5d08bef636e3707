//! High-level API for turning folders of roster photos into structured rosters.
//!
//! `Rollcall` wires recognition → parsing → merging:
//! - We own one `TextRecognizer` and reuse it for every image.
//! - Each image is read, recognized, and parsed on its own; a failure only costs that image
//!   unless `BatchOpts::fail_fast` is set.
//! - Per-image rosters merge into one aggregate with last-write-wins per room.
//!
//! Listing the input directory and writing the output are the only failures that always
//! end a run.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::aggregate::BatchAggregator;
use crate::json_encoder::write_rosters_to_path;
use crate::opts::BatchOpts;
use crate::parser::parse_roster;
use crate::recognizer::{Recognition, TextRecognizer};
use crate::roster::RosterMap;
use crate::scan::{list_files, list_images};
use crate::{Error, Result};

/// One image (or text file) that was skipped because of an error.
#[derive(Debug)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// The merged rosters across every input.
    pub rosters: RosterMap,

    /// Inputs that yielded text and were parsed.
    pub processed: usize,

    /// Inputs where the recognizer found nothing to read.
    pub no_text: Vec<PathBuf>,

    /// Inputs skipped because reading or recognition failed.
    pub failures: Vec<ImageFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The main batch entry point.
///
/// Typical usage:
/// - Construct once with a recognizer (e.g. `VisionRecognizer`).
/// - Call `process_dir` or `run` for each folder of images.
pub struct Rollcall<R: TextRecognizer> {
    recognizer: R,
    opts: BatchOpts,
}

impl<R: TextRecognizer> Rollcall<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_opts(recognizer, BatchOpts::default())
    }

    pub fn with_opts(recognizer: R, opts: BatchOpts) -> Self {
        Self { recognizer, opts }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn opts(&self) -> &BatchOpts {
        &self.opts
    }

    /// Recognize and parse a single image.
    ///
    /// Returns `Ok(None)` when the recognizer found no text.
    pub fn extract(&self, image: &[u8]) -> Result<Option<RosterMap>> {
        let recognition = self.recognizer.recognize(image)?;
        Ok(recognition.text().map(parse_roster))
    }

    /// Recognize, parse, and merge every image in `paths`, in the given order.
    pub fn process_paths<I, P>(&self, paths: I) -> Result<BatchReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        run_batch(paths, self.opts.fail_fast, |path| {
            info!(path = %path.display(), "processing image");
            let image = std::fs::read(path).map_err(|err| Error::io(path, err))?;
            self.recognizer.recognize(&image)
        })
    }

    /// Process every image found directly inside `dir`.
    pub fn process_dir(&self, dir: &Path) -> Result<BatchReport> {
        let images = list_images(dir, self.opts.sort_inputs)?;
        info!(dir = %dir.display(), images = images.len(), "found images");
        self.process_paths(images)
    }

    /// Process `dir` and persist the merged rosters as JSON at `output`.
    pub fn run(&self, dir: &Path, output: &Path) -> Result<BatchReport> {
        let report = self.process_dir(dir)?;
        write_rosters_to_path(&report.rosters, output)?;
        info!(output = %output.display(), rooms = report.rosters.len(), "results saved");
        Ok(report)
    }
}

/// Parse and merge already-recognized text files (`.txt`) found directly inside `dir`.
///
/// This skips OCR entirely, which is handy for re-running the parser over saved output.
pub fn process_text_dir(dir: &Path, opts: &BatchOpts) -> Result<BatchReport> {
    let files = list_files(dir, &["txt"], opts.sort_inputs)?;
    run_batch(files, opts.fail_fast, |path| {
        info!(path = %path.display(), "processing text file");
        let text = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Ok(Recognition::from_text(Some(text)))
    })
}

fn run_batch<I, P, F>(paths: I, fail_fast: bool, mut recognize: F) -> Result<BatchReport>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    F: FnMut(&Path) -> Result<Recognition>,
{
    let mut agg = BatchAggregator::new();
    let mut report = BatchReport::default();

    for path in paths {
        let path = path.as_ref();
        match recognize(path) {
            Ok(Recognition::Text(text)) => {
                info!(path = %path.display(), text = %text, "text detected");
                agg.merge_text(&text);
                report.processed += 1;
            }
            Ok(Recognition::NoText) => {
                info!(path = %path.display(), "no text detected");
                report.no_text.push(path.to_path_buf());
            }
            Err(error) if !fail_fast => {
                warn!(path = %path.display(), error = %error, "skipping input");
                report.failures.push(ImageFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    report.rosters = agg.into_inner();
    Ok(report)
}
