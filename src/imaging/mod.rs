//! Image resizing — two interchangeable backends behind one trait.
//!
//! | Backend | How |
//! |---|---|
//! | [`ExternalBackend`] | Pipes the bytes through `convert` (or any stdin→stdout filter) |
//! | [`RustBackend`] | Lanczos3 resize + re-encode with the `image` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and scale value types
//! - **Backend**: [`ResizeBackend`] trait + the two implementations

pub mod backend;
mod calculations;
pub mod external_backend;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ResizeBackend};
pub use calculations::{resize_geometry, scale_dimensions};
pub use external_backend::ExternalBackend;
pub use params::{Quality, ScalePercent};
pub use rust_backend::RustBackend;
