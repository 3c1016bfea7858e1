//! The per-cycle drive controller.
//!
//! [`Drive`] owns all controller state. An external loop calls
//! [`Drive::run`] once per control tick with a monotonic timestamp and the
//! current encoder sample; goal-setting calls made between ticks take effect
//! on the next one.
//!
//! A cycle runs in this order:
//!
//! 1. Integrate the encoder sample into the pose.
//! 2. If a goal is active: re-aim a point seek, shape the forward command,
//!    test distance and timeout completion, run the turn law and test turn
//!    completion.
//! 3. Pick the target command: manual controls when idle, otherwise the goal
//!    output; a fixed-speed override wins over both.
//! 4. Clamp the target to `[-100, 100]`, slew it and return it.

use ballbot_kinematics::{EncoderSample, Pose, PoseTracker};
use tracing::{debug, info, trace};

use crate::error::MotionError;
use crate::goal::{MotionGoal, PointSeek, TurnSource};
use crate::shaper::{Axis, ManualControls, PowerSink, Slew, WheelPower};
use crate::turn::{TurnLaw, saturate};
use crate::tuning::{MAX_POWER, TuningParameters};

/// Why the active goal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The mean encoder position crossed the distance target.
    Distance,
    /// The turn output settled inside `turn_accepted`.
    Settled,
    /// The point seek came within `point_accepted`.
    Arrived,
    /// The goal ran past its timeout.
    TimedOut,
}

/// Differential drive controller.
///
/// # Example
///
/// ```
/// use ballbot_kinematics::EncoderSample;
/// use ballbot_motion::{Drive, TuningParameters, goal::DEFAULT_DISTANCE_TIMEOUT_MS};
///
/// let tuning = TuningParameters { ticks_per_tile: 100.0, ..Default::default() };
/// let mut drive = Drive::new(tuning).unwrap();
/// drive.drive_for_distance(50.0, 0.0, 2.0, DEFAULT_DISTANCE_TIMEOUT_MS);
///
/// let power = drive.run(10.0, EncoderSample::new(0.0, 0.0));
/// assert!(power.left > 0.0 && power.right > 0.0);
/// ```
#[derive(Debug)]
pub struct Drive {
    tuning: TuningParameters,
    tracker: PoseTracker,
    goal: MotionGoal,
    goal_started_ms: f64,
    point_seek: Option<PointSeek>,
    turn: TurnLaw,
    slew: Slew,
    manual: Option<ManualControls>,
    speed_override: Option<WheelPower>,
    complete: bool,
    last_completion: Option<Completion>,
    now_ms: f64,
    sample: EncoderSample,
}

impl Drive {
    /// Creates an idle controller at the origin.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotionError::InvalidTuning)` if `tuning` fails validation.
    pub fn new(tuning: TuningParameters) -> Result<Self, MotionError> {
        tuning.validate()?;
        Ok(Drive {
            tracker: PoseTracker::new(tuning.tracking_ticks_per_tile, tuning.tracking_ticks_per_degree),
            tuning,
            goal: MotionGoal::Idle,
            goal_started_ms: 0.0,
            point_seek: None,
            turn: TurnLaw::default(),
            slew: Slew::default(),
            manual: None,
            speed_override: None,
            complete: false,
            last_completion: None,
            now_ms: 0.0,
            sample: EncoderSample::default(),
        })
    }

    /// Returns the tuning in use.
    pub fn tuning(&self) -> &TuningParameters {
        &self.tuning
    }

    /// Replaces the tuning.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotionError::InvalidTuning)` and keeps the old tuning if
    /// `tuning` fails validation.
    pub fn set_tuning(&mut self, tuning: TuningParameters) -> Result<(), MotionError> {
        tuning.validate()?;
        self.tracker.set_scales(tuning.tracking_ticks_per_tile, tuning.tracking_ticks_per_degree);
        self.tuning = tuning;
        Ok(())
    }

    /// Current pose estimate.
    pub fn pose(&self) -> Pose {
        self.tracker.pose()
    }

    /// Active goal.
    pub fn goal(&self) -> MotionGoal {
        self.goal
    }

    /// Active point seek, if `drive_to_point` is steering.
    pub fn point_seek(&self) -> Option<PointSeek> {
        self.point_seek
    }

    /// Whether the most recent goal has finished.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// How the most recent goal finished.
    pub fn last_completion(&self) -> Option<Completion> {
        self.last_completion
    }

    /// Last shaped output.
    pub fn power(&self) -> WheelPower {
        self.slew.power()
    }

    /// Turn law state, for telemetry.
    pub fn turn_law(&self) -> &TurnLaw {
        &self.turn
    }

    /// Overwrites the pose estimate.
    pub fn set_position(&mut self, x: f64, y: f64, heading: f64) {
        self.tracker.set_position(x, y, heading);
    }

    /// Overwrites the heading estimate.
    pub fn set_heading(&mut self, heading: f64) {
        self.tracker.set_heading(heading);
    }

    /// Records a sample and timestamp without running a cycle.
    ///
    /// The sample becomes the odometry baseline, so encoders that start at a
    /// non-zero position do not register as motion on the first cycle.
    pub fn prime(&mut self, now_ms: f64, sample: EncoderSample) {
        self.now_ms = now_ms;
        self.sample = sample;
        self.tracker.rebase(sample);
    }

    /// Binds tank controls: each axis drives one side.
    pub fn set_tank_joy(&mut self, left: impl Axis + Send + 'static, right: impl Axis + Send + 'static) {
        self.manual = Some(ManualControls::Tank { left: Box::new(left), right: Box::new(right) });
    }

    /// Binds arcade controls: one power axis and one turn axis.
    pub fn set_arcade_joy(&mut self, power: impl Axis + Send + 'static, turn: impl Axis + Send + 'static) {
        self.manual = Some(ManualControls::Arcade { power: Box::new(power), turn: Box::new(turn) });
    }

    /// Removes the manual control bindings.
    pub fn clear_manual_controls(&mut self) {
        self.manual = None;
    }

    fn begin(&mut self, goal: MotionGoal) {
        self.goal = goal;
        self.goal_started_ms = self.now_ms;
        self.complete = false;
        self.last_completion = None;
        info!(goal = %goal, started_ms = self.now_ms, "Goal set");
    }

    /// Drives at `speed` holding `heading` for `timeout_ms`.
    pub fn drive_for_time(&mut self, speed: f64, heading: f64, timeout_ms: f64) {
        self.point_seek = None;
        self.begin(MotionGoal::TimedDrive { speed, heading, timeout_ms });
    }

    /// Drives `distance_tiles` holding `heading`.
    ///
    /// The target is an absolute mean encoder position: the distance in ticks
    /// plus the mean position at the time of the call.
    pub fn drive_for_distance(&mut self, speed: f64, heading: f64, distance_tiles: f64, timeout_ms: f64) {
        self.point_seek = None;
        self.begin(self.distance_goal(speed, heading, distance_tiles, timeout_ms));
    }

    fn distance_goal(&self, speed: f64, heading: f64, distance_tiles: f64, timeout_ms: f64) -> MotionGoal {
        MotionGoal::DistanceDrive {
            speed,
            heading,
            target_ticks: distance_tiles * self.tuning.ticks_per_tile + self.sample.mean(),
            timeout_ms,
        }
    }

    /// Drives at `speed` holding `heading` for `timeout_s` seconds.
    pub fn drive_custom(&mut self, speed: f64, heading: f64, timeout_s: f64) {
        self.point_seek = None;
        self.begin(MotionGoal::CustomDrive { speed, heading, timeout_ms: timeout_s * 1000.0 });
    }

    /// Turns in place to an absolute heading.
    pub fn turn_to(&mut self, heading: f64, timeout_s: f64) {
        self.point_seek = None;
        self.begin(MotionGoal::TurnTo {
            target_heading: heading,
            timeout_ms: timeout_s * 1000.0,
            source: TurnSource::Absolute,
        });
    }

    /// Turns in place by `delta` degrees from the current heading.
    pub fn turn_relative(&mut self, delta: f64, timeout_s: f64) {
        let heading = self.tracker.pose().heading + delta;
        self.turn_to(heading, timeout_s);
    }

    /// Turns in place by `delta` degrees measured on the drive encoders.
    pub fn turn_relative_by_encoder(&mut self, delta: f64, timeout_s: f64) {
        self.point_seek = None;
        let target_half_diff = delta * self.tuning.ticks_per_degree + self.sample.half_difference();
        self.begin(MotionGoal::TurnTo {
            target_heading: self.tracker.pose().heading + delta,
            timeout_ms: timeout_s * 1000.0,
            source: TurnSource::EncoderRelative { target_half_diff },
        });
    }

    /// Turns in place to face the field point `(x, y)`.
    pub fn turn_to_point(&mut self, x: f64, y: f64, timeout_s: f64) {
        let heading = self.tracker.pose().heading_towards(x, y);
        self.turn_to(heading, timeout_s);
    }

    /// Drives to the field point `(x, y)`, re-aiming every cycle.
    pub fn drive_to_point(&mut self, speed: f64, x: f64, y: f64, timeout_s: f64) {
        let seek = PointSeek { speed, x, y, timeout_ms: timeout_s * 1000.0 };
        self.point_seek = Some(seek);
        self.begin(self.aim(seek));
    }

    fn aim(&self, seek: PointSeek) -> MotionGoal {
        let pose = self.tracker.pose();
        self.distance_goal(
            seek.speed,
            pose.heading_towards(seek.x, seek.y),
            pose.distance_to(seek.x, seek.y),
            seek.timeout_ms,
        )
    }

    /// Runs both sides at `speed` until [`Drive::stop`], bypassing goals.
    pub fn run_at_speed(&mut self, speed: f64) {
        self.run_at_speeds(speed, speed);
    }

    /// Runs each side at a fixed power until [`Drive::stop`], bypassing goals.
    pub fn run_at_speeds(&mut self, left: f64, right: f64) {
        self.speed_override = Some(WheelPower::new(left, right));
        info!(left, right, "Fixed speed override set");
    }

    /// Clears the goal, the override and any point seek.
    pub fn stop(&mut self) {
        if !self.goal.is_idle() || self.speed_override.is_some() {
            info!(goal = %self.goal, "Drive stopped");
        }
        self.goal = MotionGoal::Idle;
        self.speed_override = None;
        self.point_seek = None;
    }

    /// Runs one control cycle and returns the shaped command.
    ///
    /// # Arguments
    ///
    /// * `now_ms`: Monotonic timestamp in milliseconds.
    /// * `sample`: Average encoder position of each side.
    pub fn run(&mut self, now_ms: f64, sample: EncoderSample) -> WheelPower {
        self.now_ms = now_ms;
        self.sample = sample;
        let pose = self.tracker.track(sample);

        let (forward, turn) = if self.goal.is_idle() { (0.0, 0.0) } else { self.pursue(pose) };

        let mut target = match (&self.manual, self.goal.is_idle()) {
            (Some(manual), true) => manual.read(self.tuning.dead_zone),
            _ => WheelPower::mix(forward, turn),
        };
        if let Some(fixed) = self.speed_override {
            target = fixed;
        }

        let power = self.slew.shape(target.saturated(MAX_POWER), self.tuning.slew_rate);
        trace!(now_ms, %pose, %power, "Cycle");
        power
    }

    /// Runs one control cycle and hands the command to `sink`.
    pub fn run_into(&mut self, now_ms: f64, sample: EncoderSample, sink: &mut impl PowerSink) -> WheelPower {
        let power = self.run(now_ms, sample);
        sink.apply(power);
        power
    }

    fn pursue(&mut self, pose: Pose) -> (f64, f64) {
        let mut completion = None;

        if let Some(seek) = self.point_seek {
            let remaining = pose.distance_to(seek.x, seek.y);
            if self.tuning.point_accepted > 0.0 && remaining <= self.tuning.point_accepted {
                completion = Some(Completion::Arrived);
            }
            self.goal = self.aim(seek);
        }

        let speed = self.goal.speed();
        let mut forward = speed;
        let current = self.sample.mean();

        if let MotionGoal::DistanceDrive { target_ticks, .. } = self.goal {
            forward *= ((target_ticks - current) / self.tuning.ticks_per_tile + self.tuning.min_forward_speed).abs();
            forward = saturate(forward, MAX_POWER);
            let reached = if speed > 0.0 { current >= target_ticks } else { current <= target_ticks };
            if reached {
                completion = completion.or(Some(Completion::Distance));
            }
        }

        if self.goal.timed_out(self.now_ms - self.goal_started_ms) {
            completion = completion.or(Some(Completion::TimedOut));
        }

        let error = match (self.goal.turn_source(), self.goal.seek_heading()) {
            (TurnSource::EncoderRelative { target_half_diff }, _) => {
                (target_half_diff - self.sample.half_difference()) / self.tuning.ticks_per_degree
            }
            (TurnSource::Absolute, Some(seek)) => seek - pose.heading,
            (TurnSource::Absolute, None) => 0.0,
        };
        let out = self.turn.step(error, speed.abs(), &self.tuning);
        debug!(goal = self.goal.name(), error, forward, turn = out.angle, "Goal evaluated");

        if (speed == 0.0 || self.goal.is_turn()) && out.settled {
            completion = completion.or(Some(Completion::Settled));
        }

        match completion {
            Some(reason) => {
                self.finish(reason);
                (0.0, 0.0)
            }
            None => (forward, out.angle),
        }
    }

    fn finish(&mut self, reason: Completion) {
        info!(
            goal = %self.goal,
            ?reason,
            elapsed_ms = self.now_ms - self.goal_started_ms,
            pose = %self.tracker.pose(),
            "Goal complete"
        );
        self.goal = MotionGoal::Idle;
        self.point_seek = None;
        self.complete = true;
        self.last_completion = Some(reason);
    }
}
