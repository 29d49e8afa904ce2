//! Configuration errors surfaced to the caller.
//!
//! Only malformed configuration is an error. "Nothing found" is a valid
//! result (`VerificationResult::count == 0`, an empty circle list,
//! `CalibrationResult::converged == false`) and must be checked by the
//! caller, not caught.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Radius bounds where `max <= min`.
    #[error("invalid radius bounds: max_radius ({max}) must exceed min_radius ({min})")]
    InvalidRadiusBounds { min: u32, max: u32 },

    /// Malformed palette specification string.
    #[error("invalid palette specification `{spec}`: {reason}")]
    InvalidPalette { spec: String, reason: String },
}
