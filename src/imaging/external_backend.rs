//! Resize by piping the image through an external converter.
//!
//! The stock command is ImageMagick's `convert - -resize 50% -`: read the
//! image from stdin, write the result to stdout in the same format. Any
//! program following that stdin/stdout contract works; the argument list is
//! passed through untouched.

use super::backend::{BackendError, ResizeBackend};
use crate::config::ExternalConfig;
use crate::pipeline::{self, CommandSpec};
use std::io::{Read, Write};
use tracing::debug;

pub struct ExternalBackend {
    spec: CommandSpec,
}

impl ExternalBackend {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn from_config(config: &ExternalConfig) -> Self {
        Self::new(CommandSpec::from_config(config))
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

impl ResizeBackend for ExternalBackend {
    fn name(&self) -> &'static str {
        "external"
    }

    fn resize(
        &self,
        source: &mut (dyn Read + Send),
        sink: &mut (dyn Write + Send),
    ) -> Result<(), BackendError> {
        let report = pipeline::execute(&self.spec, source, sink)?;
        debug!(
            executable = %self.spec.executable.display(),
            bytes_in = report.bytes_in,
            bytes_out = report.bytes_out,
            elapsed = ?report.elapsed,
            "external resize finished"
        );
        Ok(())
    }
}
