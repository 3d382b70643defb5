//! # resize-pipe
//!
//! Resize images either by streaming them through an external converter
//! (ImageMagick `convert` by default) or in process with the `image` crate.
//!
//! # Architecture
//!
//! ```text
//! resize::resize_file      opens input, creates output, owns both
//!        │
//!        ▼
//! imaging::ResizeBackend   ExternalBackend ──▶ pipeline::execute ──▶ child process
//!                          RustBackend     ──▶ decode → Lanczos3 → encode
//! ```
//!
//! The interesting part is [`pipeline`]: three concurrent pumps around one
//! child process, bounded by a single deadline that kills the child when it
//! passes. Everything above it only deals in borrowed `Read`/`Write` streams,
//! so the same backend works on files, buffers, or network bodies.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Run a child process as a byte filter under a hard deadline |
//! | [`imaging`] | The [`ResizeBackend`](imaging::ResizeBackend) trait and its two implementations |
//! | [`resize`] | File-to-file resizing; owns opening and closing files |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`storage`] | Object-storage blob location and credentials resolved from the environment |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Threads, Not Async
//!
//! One invocation needs exactly three blocking copies and one bounded wait.
//! Scoped threads express that directly, let the pumps borrow the caller's
//! streams without `'static` bounds, and guarantee that no pump outlives
//! [`pipeline::execute`].
//!
//! ## The Deadline Kills
//!
//! A deadline that is only checked after the child exits does not bound
//! anything. Here, the deadline governs both waits, and expiry kills and
//! reaps the child, which closes its pipes and releases the pumps.
//!
//! ## Callers Own the Streams
//!
//! Neither backends nor the pipeline open or close anything. That keeps
//! file handles in one place ([`resize`]) and rules out double closes.

pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod resize;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
