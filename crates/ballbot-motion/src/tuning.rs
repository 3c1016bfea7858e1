//! Tuning constants read by the controller every cycle.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Full-scale unit of the turn command before clamping.
pub const FULL_SCALE: f64 = 127.0;

/// Limit of a wheel power command, in percent of full scale.
pub const MAX_POWER: f64 = 100.0;

/// Hand-tuned constants for the drive.
///
/// All values are supplied by the caller; the controller never derives or
/// mutates them. Defaults reproduce an untuned drive: unit scales, no slewing,
/// no dead zone and no minimum turn power.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningParameters {
    /// Encoder ticks per field tile, used by distance goals.
    pub ticks_per_tile: f64,
    /// Encoder ticks of half-difference per degree, used by encoder turns.
    pub ticks_per_degree: f64,
    /// Odometry linear scale (tiles per tick of mean encoder change).
    pub tracking_ticks_per_tile: f64,
    /// Odometry angular scale (degrees per tick of half-difference change).
    pub tracking_ticks_per_degree: f64,
    /// Degrees of error that map to half of full-scale turn output.
    pub turn_rate: f64,
    /// Turn output magnitude below which a turn counts as settled.
    pub turn_accepted: f64,
    /// Smallest turn output that moves the robot in place.
    pub min_turn_speed: f64,
    /// Saturation of the turn output.
    pub max_turn_speed: f64,
    /// Cycles of each pulse spent at `min_turn_speed`.
    pub pulse_time: f64,
    /// Cycle count after which the pulse counter restarts.
    pub pulse_pause: f64,
    /// Offset (tiles) added to the remaining distance when shaping forward power.
    pub min_forward_speed: f64,
    /// Divisor of the first-order output filter; 1 disables smoothing.
    pub slew_rate: f64,
    /// Manual stick magnitude below which input is ignored.
    pub dead_zone: f64,
    /// Remaining distance (tiles) at which a point seek is considered arrived; 0 disables.
    pub point_accepted: f64,
}

impl Default for TuningParameters {
    fn default() -> Self {
        TuningParameters {
            ticks_per_tile: 1.0,
            ticks_per_degree: 1.0,
            tracking_ticks_per_tile: 1.0,
            tracking_ticks_per_degree: 1.0,
            turn_rate: 1.0,
            turn_accepted: 1.0,
            min_turn_speed: 0.0,
            max_turn_speed: 100.0,
            pulse_time: 1.0,
            pulse_pause: 0.0,
            min_forward_speed: 0.0,
            slew_rate: 1.0,
            dead_zone: 0.0,
            point_accepted: 0.0,
        }
    }
}

impl TuningParameters {
    /// Checks that the parameters keep every division in the control law finite.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotionError::InvalidTuning)` naming the first offending parameter.
    pub fn validate(&self) -> Result<(), MotionError> {
        let all = [
            self.ticks_per_tile,
            self.ticks_per_degree,
            self.tracking_ticks_per_tile,
            self.tracking_ticks_per_degree,
            self.turn_rate,
            self.turn_accepted,
            self.min_turn_speed,
            self.max_turn_speed,
            self.pulse_time,
            self.pulse_pause,
            self.min_forward_speed,
            self.slew_rate,
            self.dead_zone,
            self.point_accepted,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(MotionError::InvalidTuning("all parameters must be finite"));
        }
        if self.ticks_per_tile == 0.0 {
            return Err(MotionError::InvalidTuning("ticks_per_tile must be non-zero"));
        }
        if self.ticks_per_degree == 0.0 {
            return Err(MotionError::InvalidTuning("ticks_per_degree must be non-zero"));
        }
        if self.turn_rate == 0.0 {
            return Err(MotionError::InvalidTuning("turn_rate must be non-zero"));
        }
        if self.slew_rate < 1.0 {
            return Err(MotionError::InvalidTuning("slew_rate must be at least 1"));
        }
        if self.max_turn_speed < 0.0 {
            return Err(MotionError::InvalidTuning("max_turn_speed must be non-negative"));
        }
        Ok(())
    }
}
