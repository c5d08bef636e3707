//! `rollcall` — extract room/student rosters from photographed lists.
//!
//! This crate provides:
//! - A best-effort parser from recognized roster text to structured records
//! - Last-write-wins merging of per-image rosters
//! - A pluggable OCR seam, with a Google Cloud Vision implementation
//! - A batch driver over folders of images, plus JSON output
//!
//! The parser is pure and dependency-light; OCR, CLI, and server pieces sit behind
//! feature flags so library consumers only pay for what they use.

// High-level API (most consumers should start here).
pub mod opts;
pub mod rollcall;

// Data model and parsing.
pub mod aggregate;
pub mod parser;
pub mod roster;

// OCR providers.
pub mod backends;
pub mod recognizer;

// Input discovery and output encoding.
pub mod json_encoder;
pub mod scan;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use aggregate::{BatchAggregator, aggregate_texts};
pub use error::{Error, Result};
pub use opts::{BatchOpts, Credentials, VisionConfig};
pub use parser::{RosterTextParser, parse_roster};
pub use recognizer::{Recognition, TextRecognizer};
pub use rollcall::{BatchReport, ImageFailure, Rollcall, process_text_dir};
pub use roster::{RoomRoster, RosterMap, StudentRecord};

#[cfg(feature = "vision")]
pub use backends::vision::VisionRecognizer;

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
