//! Proportional turn law with a driving dead zone and a pulsed in-place mode.
//!
//! One call to [`TurnLaw::step`] per cycle turns an angular error in degrees
//! into a signed turn command:
//!
//! 1. The error is folded into `(-180, 180]` by [`normalize_error`].
//! 2. It is scaled to the command range by [`scale_error`] and saturated.
//! 3. While driving, small commands snap to zero or to a minimum of 4
//!    ([`driving_dead_zone`]).
//! 4. While turning in place, commands below `min_turn_speed` are either
//!    zeroed (the sign flipped since last cycle), lifted to `min_turn_speed`,
//!    or handed to the [`TurnPulse`] state machine.
//!
//! The law also reports whether the turn has settled, which needs this cycle's
//! and the previous cycle's output both inside `turn_accepted`.

use crate::tuning::{FULL_SCALE, TuningParameters};

/// Folds an angular error into `(-180, 180]` with a single correction step.
///
/// Only correct for errors within `[-360, 360)`; larger errors are not folded
/// further.
pub fn normalize_error(error: f64) -> f64 {
    let mut error = error;
    if error < 0.0 {
        error += 360.0;
    }
    if error > 180.0 {
        error -= 360.0;
    }
    error
}

/// Scales an error in degrees to turn command units.
pub fn scale_error(error: f64, turn_rate: f64) -> f64 {
    error / (2.0 * turn_rate) * FULL_SCALE
}

/// Saturates `angle` to `[-limit, limit]`.
pub fn saturate(angle: f64, limit: f64) -> f64 {
    if angle < -limit {
        -limit
    } else if angle > limit {
        limit
    } else {
        angle
    }
}

/// Dead zone applied while the robot is driving.
///
/// Commands with magnitude below 2 become 0 and commands below 4 become 4, so
/// a correction is either absent or large enough to move the motors.
pub fn driving_dead_zone(angle: f64) -> f64 {
    if angle < 0.0 {
        if angle > -2.0 {
            0.0
        } else if angle > -4.0 {
            -4.0
        } else {
            angle
        }
    } else if angle < 2.0 {
        0.0
    } else if angle < 4.0 {
        4.0
    } else {
        angle
    }
}

/// Pulse sub-state used when the in-place turn command is too small to move
/// the robot continuously.
///
/// Each pulse-cycle advances the counter by one. The output is
/// `min_turn_speed` while the counter is below `pulse_time` and a near-zero
/// coast value afterwards; the counter restarts once it exceeds `pulse_pause`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnPulse {
    /// Next advance may push at `min_turn_speed`.
    Pulsing {
        /// Pulse-cycles counted so far.
        count: u32,
    },
    /// Coasting between pushes.
    Coasting {
        /// Pulse-cycles counted so far.
        count: u32,
    },
}

/// Output while coasting between pulses.
pub const COAST_OUTPUT: f64 = 1.0;

impl Default for TurnPulse {
    fn default() -> Self {
        TurnPulse::Pulsing { count: 0 }
    }
}

impl TurnPulse {
    /// Pulse-cycles counted since the last restart.
    pub fn count(&self) -> u32 {
        match *self {
            TurnPulse::Pulsing { count } | TurnPulse::Coasting { count } => count,
        }
    }

    /// Advances one pulse-cycle and returns the turn magnitude to apply.
    pub fn advance(&mut self, tuning: &TuningParameters) -> f64 {
        let count = self.count() + 1;
        if (count as f64) < tuning.pulse_time {
            *self = TurnPulse::Pulsing { count };
            tuning.min_turn_speed
        } else {
            *self = if count as f64 > tuning.pulse_pause {
                TurnPulse::Pulsing { count: 0 }
            } else {
                TurnPulse::Coasting { count }
            };
            COAST_OUTPUT
        }
    }
}

/// Result of one turn law evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnOutput {
    /// Signed turn command.
    pub angle: f64,
    /// Whether this and the previous command are both inside `turn_accepted`.
    pub settled: bool,
}

/// Cross-cycle state of the turn law.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TurnLaw {
    last_angle: f64,
    pulse: TurnPulse,
}

impl TurnLaw {
    /// Signed command produced by the previous step.
    pub fn last_angle(&self) -> f64 {
        self.last_angle
    }

    /// Current pulse sub-state.
    pub fn pulse(&self) -> TurnPulse {
        self.pulse
    }

    /// Evaluates the law for one cycle.
    ///
    /// # Arguments
    ///
    /// * `error`: Raw angular error in degrees (target minus current).
    /// * `forward_magnitude`: Absolute forward command of the goal; zero for pure turns.
    /// * `tuning`: Controller tuning.
    pub fn step(&mut self, error: f64, forward_magnitude: f64, tuning: &TuningParameters) -> TurnOutput {
        let scaled = scale_error(normalize_error(error), tuning.turn_rate);
        let mut angle = saturate(scaled, tuning.max_turn_speed);

        if forward_magnitude > tuning.min_turn_speed {
            angle = driving_dead_zone(angle);
        } else {
            angle = self.in_place(angle, tuning);
        }

        let settled = angle.abs() < tuning.turn_accepted && self.last_angle.abs() < tuning.turn_accepted;
        self.last_angle = angle;
        TurnOutput { angle, settled }
    }

    fn in_place(&mut self, turn: f64, tuning: &TuningParameters) -> f64 {
        let mut magnitude = turn.abs();
        if magnitude < tuning.min_turn_speed {
            let flipped = (self.last_angle > 0.0 && turn < 0.0) || (self.last_angle < 0.0 && turn > 0.0);
            if flipped {
                magnitude = 0.0;
            } else if magnitude > tuning.min_turn_speed / 5.0 {
                magnitude = tuning.min_turn_speed;
            } else {
                magnitude = self.pulse.advance(tuning);
            }
        }
        if turn < 0.0 { -magnitude } else { magnitude }
    }
}
