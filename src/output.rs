//! CLI output formatting.
//!
//! Every file is shown by its positional index and the name it was uploaded
//! under, with what happened to it on indented context lines:
//!
//! ```text
//! 001 holiday.png
//!     convert-target → 2026/03/0018a3c2f1e4b7d09c41f2ab.webp
//! 002 notes.txt
//!     error: file validation failed: unsupported file type: text/plain
//!
//! Ingested 1 file, 1 failed
//! ```
//!
//! Format functions return `Vec<String>` and do no I/O, so they can be
//! asserted on directly; `main` does the printing.

use crate::imaging::DecodedImage;
use crate::pipeline::IngestEvent;
use crate::policy::TranscodeDecision;
use crate::store::ImageRecord;

/// Format a 0-based batch position as a 1-based, 3-digit index.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Lines for one progress event. `Started` prints nothing; only the outcome
/// of a file is shown.
pub fn format_ingest_event(event: &IngestEvent) -> Vec<String> {
    match event {
        IngestEvent::Started { .. } => Vec::new(),
        IngestEvent::Processed {
            index,
            filename,
            decision,
            relative_path,
        } => vec![
            format!("{} {}", format_index(*index), filename),
            format!("{}{} → {}", indent(1), decision, relative_path),
        ],
        IngestEvent::Failed {
            index,
            filename,
            error,
        } => vec![
            format!("{} {}", format_index(*index), filename),
            format!("{}error: {}", indent(1), error),
        ],
    }
}

/// Lines for a stored record.
pub fn format_record(record: &ImageRecord) -> Vec<String> {
    vec![
        format!("{}URL: {}", indent(1), record.url),
        format!("{}Thumbnail: {}", indent(1), record.thumbnail_url),
        format!(
            "{}{} {}x{}, {} bytes",
            indent(1),
            record.mime_type,
            record.width,
            record.height,
            record.file_size
        ),
    ]
}

/// Lines for a file that passed `check`.
pub fn format_check_ok(
    index: usize,
    filename: &str,
    decoded: &DecodedImage,
    decision: TranscodeDecision,
) -> Vec<String> {
    vec![
        format!("{} {}", format_index(index), filename),
        format!(
            "{}{} {}x{} → {}",
            indent(1),
            decoded.format,
            decoded.width(),
            decoded.height(),
            decision
        ),
    ]
}

/// Lines for a file that failed `check`.
pub fn format_check_error(index: usize, filename: &str, error: &str) -> Vec<String> {
    vec![
        format!("{} {}", format_index(index), filename),
        format!("{}error: {}", indent(1), error),
    ]
}

/// Closing line of a batch.
pub fn format_summary(verb: &str, ok: usize, failed: usize) -> String {
    if failed == 0 {
        format!("{verb} {}", plural(ok, "file"))
    } else {
        format!("{verb} {}, {failed} failed", plural(ok, "file"))
    }
}
