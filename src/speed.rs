use crate::error::{NarrationError, NarrationResult};

/// Narration speed multiplier. Drives both the synthesis rate and the
/// duration estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speed {
    value: f32,
}

impl Speed {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 2.0;
    pub const DEFAULT: f32 = 1.0;

    pub fn new(value: f32) -> NarrationResult<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(NarrationError::InvalidSpeed(value));
        }
        Ok(Self { value })
    }

    /// Nearest valid speed; non-finite input maps to normal speed.
    pub fn clamped(value: f32) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self {
            value: value.clamp(Self::MIN, Self::MAX),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_normal(&self) -> bool {
        (self.value - Self::DEFAULT).abs() < f32::EPSILON
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self {
            value: Self::DEFAULT,
        }
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}x", self.value)
    }
}

impl TryFrom<f32> for Speed {
    type Error = NarrationError;

    fn try_from(value: f32) -> NarrationResult<Self> {
        Self::new(value)
    }
}
