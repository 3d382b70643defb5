//! File-to-file resizing on top of a [`ResizeBackend`].
//!
//! This is the layer that owns the files. [`resize_file`] opens the input,
//! creates the output, lends both to the backend for the duration of one
//! call, and drops them on every exit path. Backends, and the pipeline
//! beneath the external one, only ever see borrowed streams.
//!
//! A failed resize leaves whatever the backend managed to write in the
//! output file; nothing is rolled back.

use crate::imaging::{BackendError, ResizeBackend};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Failed to open input {}: {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create output {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to finish writing {}: {source}", path.display())]
    Finish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What one successful resize did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub backend: &'static str,
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

/// Resize `input` into `output` with `backend`.
pub fn resize_file(
    backend: &dyn ResizeBackend,
    input: &Path,
    output: &Path,
) -> Result<ResizeOutcome, ResizeError> {
    let started = Instant::now();

    let open_input = |source: std::io::Error| ResizeError::OpenInput {
        path: input.to_path_buf(),
        source,
    };
    let input_file = File::open(input).map_err(open_input)?;
    let input_bytes = input_file.metadata().map_err(open_input)?.len();
    let output_file = File::create(output).map_err(|source| ResizeError::CreateOutput {
        path: output.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(input_file);
    let mut writer = BufWriter::new(output_file);
    backend.resize(&mut reader, &mut writer)?;

    let finish = |source: std::io::Error| ResizeError::Finish {
        path: output.to_path_buf(),
        source,
    };
    writer.flush().map_err(finish)?;
    let output_file = writer.into_inner().map_err(|e| finish(e.into_error()))?;
    let output_bytes = output_file.metadata().map_err(finish)?.len();

    let outcome = ResizeOutcome {
        backend: backend.name(),
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        input_bytes,
        output_bytes,
        elapsed: started.elapsed(),
    };
    info!(
        backend = outcome.backend,
        input = %input.display(),
        output = %output.display(),
        output_bytes,
        elapsed = ?outcome.elapsed,
        "resized"
    );
    Ok(outcome)
}

/// Output path next to `input`: `result_<tag>.<input extension>`.
///
/// ```text
/// photos/input.jpg, "ext" → photos/result_ext.jpg
/// ```
pub fn sibling_output(input: &Path, tag: &str) -> PathBuf {
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("result_{tag}.{ext}"),
        None => format!("result_{tag}"),
    };
    input.with_file_name(name)
}
