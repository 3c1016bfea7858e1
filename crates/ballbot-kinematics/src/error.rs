#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines error types that can occur while turning raw motor
//! readings into the encoder samples consumed by the pose tracker.

use core::fmt;

/// Errors that can occur in kinematic calculations.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for an empty motor group.
    /// This variant is returned when a side of the drivetrain has no motors,
    /// so its average encoder position is undefined.
    EmptyMotorGroup(&'static str),
    /// Error for a non-finite encoder reading.
    /// This variant is returned when a motor reports NaN or an infinite position.
    NonFiniteReading(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::EmptyMotorGroup(msg) => write!(f, "Empty motor group: {}", msg),
            KinematicsError::NonFiniteReading(msg) => write!(f, "Non-finite encoder reading: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
