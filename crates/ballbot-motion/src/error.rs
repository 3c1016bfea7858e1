//! This module defines the error types used by the `ballbot-motion` crate.

#![warn(missing_docs)]

/// Error type for motion controller operations.
///
/// The control cycle itself never fails; these errors are only produced when
/// the controller is configured with parameters it cannot run with.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Error for a tuning parameter that would make the control law divide by
    /// zero or produce non-finite output.
    InvalidTuning(&'static str),
}

impl core::fmt::Display for MotionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MotionError::InvalidTuning(msg) => write!(f, "Invalid tuning parameter: {}", msg),
        }
    }
}

impl core::error::Error for MotionError {}
