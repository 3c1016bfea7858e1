//! The autonomous objective the controller is currently pursuing.
//!
//! Exactly one [`MotionGoal`] is active at a time. Setting a new goal replaces
//! the previous one wholesale, so no field of an old mode can leak into a new
//! one.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timeout value that disables the timeout check.
pub const NO_TIMEOUT: f64 = -1.0;

/// Default timeout of a distance drive, in milliseconds.
pub const DEFAULT_DISTANCE_TIMEOUT_MS: f64 = 10_000.0;

/// Default timeout of a custom drive and of a point seek, in seconds.
pub const DEFAULT_CUSTOM_TIMEOUT_S: f64 = 10.0;

/// Where a turn measures its angular error from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnSource {
    /// Error is the target heading minus the tracked heading.
    Absolute,
    /// Error is measured on the drive encoders against a captured target.
    EncoderRelative {
        /// Target half-difference `(right - left) / 2` in ticks, already offset
        /// by the half-difference at the time the turn was set.
        target_half_diff: f64,
    },
}

/// The active autonomous objective.
///
/// Timeouts are in milliseconds; a value `<= 0` means no timeout.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MotionGoal {
    /// No autonomous objective; manual control (if any) drives the robot.
    #[default]
    Idle,
    /// Drive at `speed` holding `heading` until the timeout.
    TimedDrive {
        /// Forward power in percent, signed.
        speed: f64,
        /// Heading to hold, in degrees on the pose accumulator.
        heading: f64,
        /// Timeout in milliseconds.
        timeout_ms: f64,
    },
    /// Drive holding `heading` until the mean encoder position crosses `target_ticks`.
    DistanceDrive {
        /// Forward power scale in percent, signed.
        speed: f64,
        /// Heading to hold, in degrees on the pose accumulator.
        heading: f64,
        /// Absolute mean encoder position that ends the drive.
        target_ticks: f64,
        /// Timeout in milliseconds.
        timeout_ms: f64,
    },
    /// Drive at `speed` holding `heading`; the timeout was given in seconds.
    CustomDrive {
        /// Forward power in percent, signed.
        speed: f64,
        /// Heading to hold, in degrees on the pose accumulator.
        heading: f64,
        /// Timeout in milliseconds.
        timeout_ms: f64,
    },
    /// Turn in place until the turn output settles.
    TurnTo {
        /// Heading to reach, in degrees on the pose accumulator.
        target_heading: f64,
        /// Timeout in milliseconds.
        timeout_ms: f64,
        /// Error measurement used by the turn law.
        source: TurnSource,
    },
}

impl MotionGoal {
    /// Returns `true` when no objective is active.
    pub fn is_idle(&self) -> bool {
        matches!(self, MotionGoal::Idle)
    }

    /// Returns `true` for the pure-turn mode.
    pub fn is_turn(&self) -> bool {
        matches!(self, MotionGoal::TurnTo { .. })
    }

    /// Configured forward speed; zero for idle and pure turns.
    pub fn speed(&self) -> f64 {
        match *self {
            MotionGoal::TimedDrive { speed, .. }
            | MotionGoal::DistanceDrive { speed, .. }
            | MotionGoal::CustomDrive { speed, .. } => speed,
            MotionGoal::Idle | MotionGoal::TurnTo { .. } => 0.0,
        }
    }

    /// Heading the turn law seeks, if any.
    pub fn seek_heading(&self) -> Option<f64> {
        match *self {
            MotionGoal::TimedDrive { heading, .. }
            | MotionGoal::DistanceDrive { heading, .. }
            | MotionGoal::CustomDrive { heading, .. } => Some(heading),
            MotionGoal::TurnTo { target_heading, .. } => Some(target_heading),
            MotionGoal::Idle => None,
        }
    }

    /// Timeout in milliseconds; [`NO_TIMEOUT`] when idle.
    pub fn timeout_ms(&self) -> f64 {
        match *self {
            MotionGoal::TimedDrive { timeout_ms, .. }
            | MotionGoal::DistanceDrive { timeout_ms, .. }
            | MotionGoal::CustomDrive { timeout_ms, .. }
            | MotionGoal::TurnTo { timeout_ms, .. } => timeout_ms,
            MotionGoal::Idle => NO_TIMEOUT,
        }
    }

    /// Turn error source; drives always hold their heading absolutely.
    pub fn turn_source(&self) -> TurnSource {
        match *self {
            MotionGoal::TurnTo { source, .. } => source,
            _ => TurnSource::Absolute,
        }
    }

    /// Returns `true` once `elapsed_ms` exceeds a positive timeout.
    pub fn timed_out(&self, elapsed_ms: f64) -> bool {
        let timeout = self.timeout_ms();
        timeout > 0.0 && elapsed_ms > timeout
    }

    /// Short mode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MotionGoal::Idle => "idle",
            MotionGoal::TimedDrive { .. } => "timed_drive",
            MotionGoal::DistanceDrive { .. } => "distance_drive",
            MotionGoal::CustomDrive { .. } => "custom_drive",
            MotionGoal::TurnTo { source: TurnSource::Absolute, .. } => "turn_to",
            MotionGoal::TurnTo { source: TurnSource::EncoderRelative { .. }, .. } => "turn_encoder",
        }
    }
}

impl fmt::Display for MotionGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MotionGoal::Idle => write!(f, "idle"),
            MotionGoal::TimedDrive { speed, heading, timeout_ms }
            | MotionGoal::CustomDrive { speed, heading, timeout_ms } => write!(
                f,
                "{} (speed: {:.1}, heading: {:.1} deg, timeout: {:.0} ms)",
                self.name(),
                speed,
                heading,
                timeout_ms
            ),
            MotionGoal::DistanceDrive { speed, heading, target_ticks, timeout_ms } => write!(
                f,
                "distance_drive (speed: {:.1}, heading: {:.1} deg, target: {:.1} ticks, timeout: {:.0} ms)",
                speed, heading, target_ticks, timeout_ms
            ),
            MotionGoal::TurnTo { target_heading, timeout_ms, .. } => write!(
                f,
                "{} (target: {:.1} deg, timeout: {:.0} ms)",
                self.name(),
                target_heading,
                timeout_ms
            ),
        }
    }
}

/// A drive-to-point objective that re-derives its distance goal every cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSeek {
    /// Forward power scale in percent.
    pub speed: f64,
    /// Target field x (tiles).
    pub x: f64,
    /// Target field y (tiles).
    pub y: f64,
    /// Timeout in milliseconds, measured from the first request.
    pub timeout_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_has_no_seek_or_timeout() {
        let goal = MotionGoal::default();
        assert!(goal.is_idle());
        assert_eq!(goal.seek_heading(), None);
        assert_eq!(goal.speed(), 0.0);
        assert!(!goal.timed_out(1e9));
    }

    #[test]
    fn test_turn_has_zero_speed() {
        let goal = MotionGoal::TurnTo { target_heading: 90.0, timeout_ms: NO_TIMEOUT, source: TurnSource::Absolute };
        assert!(goal.is_turn());
        assert_eq!(goal.speed(), 0.0);
        assert_eq!(goal.seek_heading(), Some(90.0));
        assert_eq!(goal.name(), "turn_to");
    }

    #[test]
    fn test_timeout_disabled_when_not_positive() {
        let goal = MotionGoal::TimedDrive { speed: 50.0, heading: 0.0, timeout_ms: 0.0 };
        assert!(!goal.timed_out(1e9));
        let goal = MotionGoal::TimedDrive { speed: 50.0, heading: 0.0, timeout_ms: -1000.0 };
        assert!(!goal.timed_out(1e9));
    }

    #[test]
    fn test_timeout_is_strict() {
        let goal = MotionGoal::CustomDrive { speed: 50.0, heading: 0.0, timeout_ms: 100.0 };
        assert!(!goal.timed_out(100.0));
        assert!(goal.timed_out(100.5));
    }

    #[test]
    fn test_drives_hold_heading_absolutely() {
        let goal = MotionGoal::DistanceDrive { speed: -30.0, heading: 15.0, target_ticks: 0.0, timeout_ms: 1.0 };
        assert_eq!(goal.turn_source(), TurnSource::Absolute);
        assert_eq!(goal.speed(), -30.0);
    }
}
