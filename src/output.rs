//! CLI output formatting.
//!
//! Every result leads with the backend and the file it produced, with
//! details as indented context lines:
//!
//! ```text
//! external  input.jpg → result_ext.jpg
//!     Size: 48.2 KiB → 12.1 KiB
//!     Time: 0.35s
//!
//! internal  input.jpg ✗ failed
//!     Error: Processing failed: Unrecognized image data: ...
//! ```
//!
//! Pipeline failures get a `Hint:` line naming the remedy for their class,
//! and a `Stderr:` line when the converter said anything.
//!
//! Each `format_*` function returns `Vec<String>` for testability; the
//! `print_*` wrappers write to stdout.

use crate::imaging::BackendError;
use crate::pipeline::FailureKind;
use crate::resize::{ResizeError, ResizeOutcome};
use crate::storage::BlobLocation;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human-readable byte count: `512 B`, `48.2 KiB`, `3.1 MiB`.
fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// What to try next for each failure class.
fn hint(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Start => "check external.executable exists and is executable",
        FailureKind::Deadline => "raise external.deadline_secs or check system load",
        FailureKind::Pump => "check the input is readable and the output disk has space",
        FailureKind::NonZeroExit => "the converter rejected the input, see Stderr",
        FailureKind::Wait => "the OS lost track of the converter process, retry",
    }
}

/// Format a successful resize.
pub fn format_outcome(outcome: &ResizeOutcome) -> Vec<String> {
    vec![
        format!(
            "{:<9} {} → {}",
            outcome.backend,
            file_name(&outcome.input),
            file_name(&outcome.output)
        ),
        format!(
            "{}Size: {} → {}",
            indent(1),
            format_bytes(outcome.input_bytes),
            format_bytes(outcome.output_bytes)
        ),
        format!("{}Time: {:.2}s", indent(1), outcome.elapsed.as_secs_f64()),
    ]
}

/// Format a failed resize.
pub fn format_failure(backend: &str, input: &Path, error: &ResizeError) -> Vec<String> {
    let mut lines = vec![
        format!("{:<9} {} ✗ failed", backend, file_name(input)),
        format!("{}Error: {}", indent(1), error),
    ];
    if let ResizeError::Backend(BackendError::Pipeline(pipeline_error)) = error {
        if let Some(diagnostics) = pipeline_error.diagnostics().filter(|d| !d.is_empty()) {
            lines.push(format!("{}Stderr: {}", indent(1), diagnostics));
        }
        lines.push(format!("{}Hint: {}", indent(1), hint(pipeline_error.kind())));
    }
    lines
}

/// Format a resolved blob location. The account key is never shown.
pub fn format_blob_location(location: &BlobLocation) -> Vec<String> {
    vec![
        location.blob_url(),
        format!("{}Account: {}", indent(1), location.credentials.account_name),
        format!(
            "{}Retry: {} tries, {}ms base delay",
            indent(1),
            location.retry.max_tries,
            location.retry.base_delay.as_millis()
        ),
    ]
}

/// Print a resize result to stdout.
pub fn print_result(backend: &str, input: &Path, result: &Result<ResizeOutcome, ResizeError>) {
    let lines = match result {
        Ok(outcome) => format_outcome(outcome),
        Err(e) => format_failure(backend, input, e),
    };
    for line in lines {
        println!("{}", line);
    }
}

/// Print a blob location to stdout.
pub fn print_blob_location(location: &BlobLocation) {
    for line in format_blob_location(location) {
        println!("{}", line);
    }
}
