//! Output shaping: manual input mixing, dead zone and first-order slewing.

use core::fmt;

use crate::turn::saturate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Left and right power commands, in percent of full scale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPower {
    /// Left side power (%).
    pub left: f64,
    /// Right side power (%).
    pub right: f64,
}

impl WheelPower {
    /// Construct a power pair.
    pub const fn new(left: f64, right: f64) -> Self {
        WheelPower { left, right }
    }

    /// Mixes a forward and a turn command: `(forward - turn, forward + turn)`.
    pub fn mix(forward: f64, turn: f64) -> Self {
        WheelPower::new(forward - turn, forward + turn)
    }

    /// Clamps each side to `[-limit, limit]`.
    pub fn saturated(self, limit: f64) -> Self {
        WheelPower::new(saturate(self.left, limit), saturate(self.right, limit))
    }
}

impl fmt::Display for WheelPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L: {:.1}%, R: {:.1}%)", self.left, self.right)
    }
}

/// Zeroes a stick value whose magnitude is below `dead_zone`.
pub fn apply_dead_zone(speed: f64, dead_zone: f64) -> f64 {
    if speed * speed < dead_zone * dead_zone { 0.0 } else { speed }
}

/// First-order filter applied to every output command.
///
/// Each call moves the stored power `1 / slew_rate` of the way towards the
/// target, independently per side. A slew rate of 1 passes the target through.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Slew {
    power: WheelPower,
}

impl Slew {
    /// Last shaped output.
    pub fn power(&self) -> WheelPower {
        self.power
    }

    /// Advances the filter one cycle towards `target`.
    pub fn shape(&mut self, target: WheelPower, slew_rate: f64) -> WheelPower {
        self.power.left += (target.left - self.power.left) / slew_rate;
        self.power.right += (target.right - self.power.right) / slew_rate;
        self.power
    }
}

/// A single joystick axis read as a percentage in `[-100, 100]`.
pub trait Axis {
    /// Current axis position (%).
    fn position(&self) -> f64;
}

impl<F: Fn() -> f64> Axis for F {
    fn position(&self) -> f64 {
        self()
    }
}

/// Manual control bindings, consumed whenever no goal is active.
pub enum ManualControls {
    /// Each axis drives one side directly.
    Tank {
        /// Left side axis.
        left: Box<dyn Axis + Send>,
        /// Right side axis.
        right: Box<dyn Axis + Send>,
    },
    /// One axis for forward power, one for turning.
    Arcade {
        /// Forward power axis.
        power: Box<dyn Axis + Send>,
        /// Turn axis; positive turns left.
        turn: Box<dyn Axis + Send>,
    },
}

impl ManualControls {
    /// Reads the bound axes, mixes them and applies the dead zone per side.
    pub fn read(&self, dead_zone: f64) -> WheelPower {
        let raw = match self {
            ManualControls::Tank { left, right } => WheelPower::new(left.position(), right.position()),
            ManualControls::Arcade { power, turn } => {
                let (p, t) = (power.position(), turn.position());
                WheelPower::new(p - t, p + t)
            }
        };
        WheelPower::new(apply_dead_zone(raw.left, dead_zone), apply_dead_zone(raw.right, dead_zone))
    }

    /// Mode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ManualControls::Tank { .. } => "tank",
            ManualControls::Arcade { .. } => "arcade",
        }
    }
}

impl fmt::Debug for ManualControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManualControls::{}", self.name())
    }
}

/// Receives the shaped command once per cycle.
pub trait PowerSink {
    /// Applies the command to the actuators.
    fn apply(&mut self, power: WheelPower);
}

impl<F: FnMut(WheelPower)> PowerSink for F {
    fn apply(&mut self, power: WheelPower) {
        self(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_slew_converges_without_overshoot() {
        let mut slew = Slew::default();
        let target = WheelPower::new(100.0, 100.0);
        let mut previous = 0.0;
        for _ in 0..50 {
            let out = slew.shape(target, 4.0);
            let expected = previous + (100.0 - previous) / 4.0;
            assert!((out.left - expected).abs() < EPSILON);
            assert!((out.right - expected).abs() < EPSILON);
            assert!(out.left > previous && out.left <= 100.0);
            previous = out.left;
        }
        assert!((previous - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_slew_first_steps() {
        let mut slew = Slew::default();
        let target = WheelPower::new(100.0, -100.0);
        assert_eq!(slew.shape(target, 4.0), WheelPower::new(25.0, -25.0));
        assert_eq!(slew.shape(target, 4.0), WheelPower::new(43.75, -43.75));
    }

    #[test]
    fn test_slew_rate_one_passes_through() {
        let mut slew = Slew::default();
        assert_eq!(slew.shape(WheelPower::new(37.0, -12.0), 1.0), WheelPower::new(37.0, -12.0));
        assert_eq!(slew.power(), WheelPower::new(37.0, -12.0));
    }

    #[test]
    fn test_dead_zone_is_symmetric() {
        assert_eq!(apply_dead_zone(4.9, 5.0), 0.0);
        assert_eq!(apply_dead_zone(-4.9, 5.0), 0.0);
        assert_eq!(apply_dead_zone(5.0, 5.0), 5.0);
        assert_eq!(apply_dead_zone(-5.0, 5.0), -5.0);
        assert_eq!(apply_dead_zone(0.1, 0.0), 0.1);
    }

    #[test]
    fn test_tank_controls() {
        let controls = ManualControls::Tank { left: Box::new(|| 60.0), right: Box::new(|| -3.0) };
        assert_eq!(controls.read(5.0), WheelPower::new(60.0, 0.0));
        assert_eq!(controls.name(), "tank");
    }

    #[test]
    fn test_arcade_controls() {
        let controls = ManualControls::Arcade { power: Box::new(|| 50.0), turn: Box::new(|| 20.0) };
        assert_eq!(controls.read(0.0), WheelPower::new(30.0, 70.0));
        let controls = ManualControls::Arcade { power: Box::new(|| 2.0), turn: Box::new(|| 1.0) };
        assert_eq!(controls.read(5.0), WheelPower::new(0.0, 0.0));
    }

    #[test]
    fn test_mix() {
        assert_eq!(WheelPower::mix(50.0, 10.0), WheelPower::new(40.0, 60.0));
    }

    #[test]
    fn test_saturated() {
        let power = WheelPower::mix(100.0, 80.0).saturated(100.0);
        assert_eq!(power, WheelPower::new(20.0, 100.0));
        assert_eq!(WheelPower::new(-150.0, 30.0).saturated(100.0), WheelPower::new(-100.0, 30.0));
    }

    #[test]
    fn test_closure_sink() {
        let mut received = Vec::new();
        let mut sink = |p: WheelPower| received.push(p);
        sink.apply(WheelPower::new(1.0, 2.0));
        assert_eq!(received, vec![WheelPower::new(1.0, 2.0)]);
    }
}
