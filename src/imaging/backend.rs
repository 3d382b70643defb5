//! Resize backend trait and shared error type.
//!
//! The [`ResizeBackend`] trait is the one seam between callers and the two
//! ways of producing a resized image:
//!
//! - [`ExternalBackend`](super::external_backend::ExternalBackend) pipes the
//!   bytes through an external converter via [`pipeline::execute`](crate::pipeline::execute).
//! - [`RustBackend`](super::rust_backend::RustBackend) decodes, resizes and
//!   encodes in process.
//!
//! Backends stream from a borrowed source into a borrowed sink. They never
//! open or close either; that stays with the caller.

use crate::pipeline::PipelineError;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("External converter failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for resize backends.
pub trait ResizeBackend: Sync {
    /// Short label for reports and logs.
    fn name(&self) -> &'static str;

    /// Read an encoded image from `source` and write the resized, encoded
    /// image to `sink`.
    fn resize(
        &self,
        source: &mut (dyn Read + Send),
        sink: &mut (dyn Write + Send),
    ) -> Result<(), BackendError>;
}
