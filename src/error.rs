use thiserror::Error;

/// Failures surfaced by the narration engine.
///
/// Cancellations the controller issues itself (pause, stop, seek, speed
/// change) never show up here; they are consumed in
/// `NarrationController::on_synthesis_event`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrationError {
    #[error("Speech synthesis is not supported in this environment")]
    UnsupportedCapability,

    #[error("Nothing to narrate: post has no readable text")]
    EmptyContent,

    #[error("Speech synthesis failed: {0}")]
    SynthesisError(String),

    #[error("Invalid speed: {0} (expected 0.5 to 2.0)")]
    InvalidSpeed(f32),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

pub type NarrationResult<T> = Result<T, NarrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_error_keeps_reason() {
        let err = NarrationError::SynthesisError("audio-busy".to_string());
        assert!(err.to_string().contains("audio-busy"));
    }

    #[test]
    fn invalid_speed_mentions_value() {
        assert!(NarrationError::InvalidSpeed(2.5).to_string().contains("2.5"));
    }
}
