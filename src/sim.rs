//! Simulated drivetrain hardware: motor groups with encoders and joystick axes.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use ballbot_kinematics::{EncoderSample, KinematicsError};
use ballbot_motion::{Axis, PowerSink, WheelPower};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::SimConfig;

/// Two motor groups whose encoders advance in proportion to the applied power.
pub struct SimPlant {
    left: Vec<f64>,
    right: Vec<f64>,
    cfg: SimConfig,
    rng: StdRng,
}

impl SimPlant {
    pub fn new(motors_per_side: usize, cfg: &SimConfig) -> Self {
        SimPlant {
            left: vec![cfg.start_ticks; motors_per_side],
            right: vec![cfg.start_ticks; motors_per_side],
            cfg: cfg.clone(),
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }

    /// Average encoder position of each side.
    pub fn sample(&self) -> Result<EncoderSample, KinematicsError> {
        EncoderSample::from_motor_groups(&self.left, &self.right)
    }
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 { rng.random_range(-amplitude..=amplitude) } else { 0.0 }
}

impl PowerSink for SimPlant {
    fn apply(&mut self, power: WheelPower) {
        let left_step = power.left * self.cfg.ticks_per_percent * (1.0 - self.cfg.side_mismatch);
        let right_step = power.right * self.cfg.ticks_per_percent * (1.0 + self.cfg.side_mismatch);
        for p in self.left.iter_mut() {
            *p += left_step + jitter(&mut self.rng, self.cfg.noise_ticks);
        }
        for p in self.right.iter_mut() {
            *p += right_step + jitter(&mut self.rng, self.cfg.noise_ticks);
        }
    }
}

/// A joystick axis that another thread can move.
#[derive(Debug, Clone, Default)]
pub struct SimAxis(Arc<AtomicU64>);

impl SimAxis {
    pub fn set(&self, position: f64) {
        self.0.store(position.to_bits(), Ordering::Relaxed);
    }
}

impl Axis for SimAxis {
    fn position(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Power and turn axes of an arcade stick.
#[derive(Debug, Clone, Default)]
pub struct ArcadeStick {
    pub power: SimAxis,
    pub turn: SimAxis,
}

impl ArcadeStick {
    pub fn set(&self, power: f64, turn: f64) {
        self.power.set(power);
        self.turn.set(turn);
    }
}
