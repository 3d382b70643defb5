//! Parameter types for the in-process resize path.
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`ScalePercent`] — Output size relative to the input (1–100, default 50). Clamped on construction.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the encoders take it.
    pub fn as_u8(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Output width and height as a percentage of the input's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePercent(u32);

impl ScalePercent {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for ScalePercent {
    fn default() -> Self {
        Self(50)
    }
}
