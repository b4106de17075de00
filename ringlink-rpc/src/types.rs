use derive_more::Display;
use std::fmt;

/// A remote track's opaque, stable identifier.
///
/// Stable across the lifetime of the track (survives reordering, folding, and ring movement) —
/// this is what lets the core key its caches and subscription groups by something cheaper and more
/// durable than a ring index.
#[derive(Clone, Eq, PartialEq, Hash, Display, Debug)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An RGB triple, 0–255 per channel.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// The DAW's color field, normalized.
///
/// Some DAW versions report track/clip color as a single packed integer, others as a structured
/// RGB object. The core never guesses which one it got wrong; it just accepts both shapes at the
/// RPC boundary and normalizes here. A third shape would need a new branch.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DawColor {
    Packed(u32),
    Rgb(RgbColor),
}

impl DawColor {
    pub fn to_rgb(self) -> RgbColor {
        match self {
            Self::Rgb(rgb) => rgb,
            Self::Packed(packed) => RgbColor::new(
                ((packed >> 16) & 0xFF) as u8,
                ((packed >> 8) & 0xFF) as u8,
                (packed & 0xFF) as u8,
            ),
        }
    }
}

impl fmt::Display for DawColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rgb = self.to_rgb();
        write!(f, "#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
    }
}

/// A value already known to be clamped to its native `[0, 1]` or `[-1, 1]` range.
///
/// Using a newtype instead of a bare `f64` at the RPC boundary keeps "did I already normalize
/// this" from becoming a guessing game at call sites throughout the builder and focus subsystem.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct NormalizedValue(f64);

impl NormalizedValue {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// A bipolar value in `[-1, 1]`, e.g. panning.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BipolarValue(f64);

impl BipolarValue {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(-1.0, 1.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Maps to `[0, 1]`, the normalization the surface's panning event carries alongside the
    /// native value.
    pub fn to_normalized(self) -> NormalizedValue {
        NormalizedValue::new((self.0 + 1.0) / 2.0)
    }
}
