#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for encoder-based odometry of a two-wheel differential-drive robot."]
#![doc = ""]
#![doc = "This crate provides the pose and encoder sample types and a tracker that integrates"]
#![doc = "incremental wheel displacement into a cumulative `(x, y, heading)` estimate."]

use core::f64::consts::PI;
use core::fmt;
use libm::{atan2, cos, hypot, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// A 2‑D pose `(x, y, heading)` in field tiles and degrees.
///
/// The heading is an accumulator: it grows past 360 and below 0 as the robot
/// keeps turning and is never wrapped. Consumers that need an angular error
/// normalize the difference themselves.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Field x position (tiles).
    pub x: f64,
    /// Field y position (tiles).
    pub y: f64,
    /// Heading (degrees), counter‑clockwise positive, unbounded.
    pub heading: f64,
}

impl Pose {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: Field x position in tiles.
    /// * `y`: Field y position in tiles.
    /// * `heading`: Heading in degrees.
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Pose { x, y, heading }
    }

    /// Wrap an angle in degrees into `(-180, 180]`.
    ///
    /// Unlike the single-step correction used by the turn controller, this
    /// handles any number of full rotations.
    pub fn wrap_degrees(angle: f64) -> f64 {
        let a = angle % 360.0;
        if a > 180.0 {
            a - 360.0
        } else if a <= -180.0 {
            a + 360.0
        } else {
            a
        }
    }

    /// Straight-line distance from this pose to the point `(x, y)`.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        hypot(x - self.x, y - self.y)
    }

    /// Field bearing from this pose to the point `(x, y)`, in degrees within `(-180, 180]`.
    pub fn bearing_to(&self, x: f64, y: f64) -> f64 {
        atan2(y - self.y, x - self.x) * 180.0 / PI
    }

    /// The bearing to `(x, y)` expressed on this pose's heading accumulator.
    ///
    /// The result lies within 180 degrees of `self.heading`, so subtracting the
    /// current heading from it always yields an error inside one rotation.
    pub fn heading_towards(&self, x: f64, y: f64) -> f64 {
        self.heading + Pose::wrap_degrees(self.bearing_to(x, y) - self.heading)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, heading: {:.2} deg)", self.x, self.y, self.heading)
    }
}

/// Average encoder position of each drivetrain side, in raw ticks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncoderSample {
    /// Average position of the left motors (ticks).
    pub left: f64,
    /// Average position of the right motors (ticks).
    pub right: f64,
}

impl EncoderSample {
    /// Construct an encoder sample.
    ///
    /// # Arguments
    ///
    /// * `left`: Average left side position in ticks.
    /// * `right`: Average right side position in ticks.
    pub const fn new(left: f64, right: f64) -> Self {
        EncoderSample { left, right }
    }

    /// Build a sample by averaging the positions of every motor on each side.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::EmptyMotorGroup)` if either side has no motors.
    /// Returns `Err(KinematicsError::NonFiniteReading)` if any position is NaN or infinite.
    pub fn from_motor_groups(left: &[f64], right: &[f64]) -> Result<Self, KinematicsError> {
        Ok(EncoderSample {
            left: average(left, "left side has no motors")?,
            right: average(right, "right side has no motors")?,
        })
    }

    /// Mean of both sides, the linear travel of the chassis centre in ticks.
    pub fn mean(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Half the right-minus-left difference, the rotational travel in ticks.
    pub fn half_difference(&self) -> f64 {
        (self.right - self.left) / 2.0
    }
}

impl fmt::Display for EncoderSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L: {:.1} ticks, R: {:.1} ticks)", self.left, self.right)
    }
}

fn average(positions: &[f64], empty_msg: &'static str) -> Result<f64, KinematicsError> {
    if positions.is_empty() {
        return Err(KinematicsError::EmptyMotorGroup(empty_msg));
    }
    let mut total = 0.0;
    for &p in positions {
        if !p.is_finite() {
            return Err(KinematicsError::NonFiniteReading("motor position must be finite"));
        }
        total += p;
    }
    Ok(total / positions.len() as f64)
}

/// Encoder odometry for a differential drive.
///
/// The tracker keeps the previous encoder sample as a baseline and, on every
/// call to [`PoseTracker::track`], integrates the displacement since that
/// baseline into the cumulative pose.
///
/// The two scale factors convert ticks to tiles and ticks to degrees. Both are
/// caller-supplied calibration constants and are used as multipliers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTracker {
    /// Tiles of linear travel per tick of mean encoder change.
    tracking_ticks_per_tile: f64,
    /// Degrees of rotation per tick of half-difference encoder change.
    tracking_ticks_per_degree: f64,
    /// Baseline sample for the next update.
    previous: EncoderSample,
    /// Cumulative pose.
    pose: Pose,
}

impl PoseTracker {
    /// Construct a tracker at the origin with a zero encoder baseline.
    ///
    /// # Arguments
    ///
    /// * `tracking_ticks_per_tile`: Linear scale applied to the mean encoder change.
    /// * `tracking_ticks_per_degree`: Angular scale applied to the half-difference encoder change.
    pub const fn new(tracking_ticks_per_tile: f64, tracking_ticks_per_degree: f64) -> Self {
        PoseTracker {
            tracking_ticks_per_tile,
            tracking_ticks_per_degree,
            previous: EncoderSample::new(0.0, 0.0),
            pose: Pose::new(0.0, 0.0, 0.0),
        }
    }

    /// Returns the current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Returns the encoder baseline the next update is measured against.
    pub fn previous(&self) -> EncoderSample {
        self.previous
    }

    /// Replaces both scale factors. The pose and baseline are kept.
    pub fn set_scales(&mut self, tracking_ticks_per_tile: f64, tracking_ticks_per_degree: f64) {
        self.tracking_ticks_per_tile = tracking_ticks_per_tile;
        self.tracking_ticks_per_degree = tracking_ticks_per_degree;
    }

    /// Overwrites the pose. The encoder baseline is untouched.
    pub fn set_position(&mut self, x: f64, y: f64, heading: f64) {
        self.pose = Pose::new(x, y, heading);
    }

    /// Overwrites the heading only.
    pub fn set_heading(&mut self, heading: f64) {
        self.pose.heading = heading;
    }

    /// Sets the encoder baseline without moving the pose.
    pub fn rebase(&mut self, sample: EncoderSample) {
        self.previous = sample;
    }

    /// Integrates the displacement from the stored baseline to `sample`.
    ///
    /// The heading is advanced first and the linear displacement is then
    /// projected along the new heading. The baseline advances to `sample`.
    ///
    /// # Returns
    ///
    /// The updated cumulative pose.
    pub fn track(&mut self, sample: EncoderSample) -> Pose {
        let left_diff = sample.left - self.previous.left;
        let right_diff = sample.right - self.previous.right;

        let angle_change = (right_diff - left_diff) / 2.0 * self.tracking_ticks_per_degree;
        let dist_change = (left_diff + right_diff) / 2.0 * self.tracking_ticks_per_tile;

        self.pose.heading += angle_change;
        let heading_rad = self.pose.heading * PI / 180.0;
        self.pose.x += dist_change * cos(heading_rad);
        self.pose.y += dist_change * sin(heading_rad);

        self.previous = sample;
        self.pose
    }
}

impl fmt::Display for PoseTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoseTracker (tile scale: {:.4}, degree scale: {:.4}) at {}",
            self.tracking_ticks_per_tile, self.tracking_ticks_per_degree, self.pose
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-6;

    #[test]
    fn test_wrap_degrees() {
        assert!((Pose::wrap_degrees(0.0) - 0.0).abs() < EPSILON);
        assert!((Pose::wrap_degrees(180.0) - 180.0).abs() < EPSILON); // 180 stays, range is (-180, 180]
        assert!((Pose::wrap_degrees(-180.0) - 180.0).abs() < EPSILON);
        assert!((Pose::wrap_degrees(190.0) - (-170.0)).abs() < EPSILON);
        assert!((Pose::wrap_degrees(-200.0) - 160.0).abs() < EPSILON);
        assert!((Pose::wrap_degrees(725.0) - 5.0).abs() < EPSILON); // two full turns plus 5
        assert!((Pose::wrap_degrees(-725.0) - (-5.0)).abs() < EPSILON);
    }

    #[test]
    fn test_bearing_and_distance() {
        let pose = Pose::new(1.0, 1.0, 0.0);
        assert!((pose.distance_to(4.0, 5.0) - 5.0).abs() < EPSILON);
        assert!((pose.bearing_to(1.0, 3.0) - 90.0).abs() < EPSILON);
        assert!((pose.bearing_to(0.0, 1.0) - 180.0).abs() < EPSILON);
        assert!((pose.bearing_to(1.0, 0.0) - (-90.0)).abs() < EPSILON);
    }

    #[test]
    fn test_heading_towards_stays_on_accumulator() {
        // Robot has spun two full turns; the point straight ahead is at bearing 0.
        let pose = Pose::new(0.0, 0.0, 720.0);
        assert!((pose.heading_towards(1.0, 0.0) - 720.0).abs() < EPSILON);
        // Point to the left (bearing 90) is 90 degrees further on the accumulator.
        assert!((pose.heading_towards(0.0, 1.0) - 810.0).abs() < EPSILON);
        // Point behind-right from a heading of -350 (which is +10 on the compass).
        let pose = Pose::new(0.0, 0.0, -350.0);
        assert!((pose.heading_towards(0.0, -1.0) - (-450.0)).abs() < EPSILON);
    }

    #[test]
    fn test_from_motor_groups() {
        let sample = EncoderSample::from_motor_groups(&[100.0, 200.0], &[30.0, 40.0, 50.0]).unwrap();
        assert!((sample.left - 150.0).abs() < EPSILON);
        assert!((sample.right - 40.0).abs() < EPSILON);
        assert!((sample.mean() - 95.0).abs() < EPSILON);
        assert!((sample.half_difference() - (-55.0)).abs() < EPSILON);
    }

    #[test]
    fn test_from_motor_groups_empty_side() {
        let result = EncoderSample::from_motor_groups(&[], &[1.0]);
        assert!(matches!(result, Err(KinematicsError::EmptyMotorGroup("left side has no motors"))));
        let result = EncoderSample::from_motor_groups(&[1.0], &[]);
        assert!(matches!(result, Err(KinematicsError::EmptyMotorGroup("right side has no motors"))));
    }

    #[test]
    fn test_from_motor_groups_non_finite() {
        let result = EncoderSample::from_motor_groups(&[f64::NAN], &[1.0]);
        assert!(matches!(result, Err(KinematicsError::NonFiniteReading(_))));
    }

    #[test]
    fn test_track_straight_line_accumulates_x() {
        let mut tracker = PoseTracker::new(0.01, 0.5);
        for i in 1..=10 {
            let ticks = 100.0 * i as f64;
            tracker.track(EncoderSample::new(ticks, ticks));
        }
        // 10 cycles of 100 ticks at 0.01 tiles per tick
        let pose = tracker.pose();
        assert!((pose.x - 10.0).abs() < EPSILON);
        assert!(pose.y.abs() < EPSILON);
        assert!(pose.heading.abs() < EPSILON);
    }

    #[test]
    fn test_track_pivot_turn_no_translation() {
        let mut tracker = PoseTracker::new(0.01, 0.5);
        // Right forward, left backward: pure rotation
        let pose = tracker.track(EncoderSample::new(-90.0, 90.0));
        // angle change = (90 - (-90)) / 2 * 0.5 = 45
        assert!((pose.heading - 45.0).abs() < EPSILON);
        assert!(pose.x.abs() < EPSILON);
        assert!(pose.y.abs() < EPSILON);
    }

    #[test]
    fn test_track_heading_is_not_wrapped() {
        let mut tracker = PoseTracker::new(0.01, 1.0);
        let mut right = 0.0;
        for _ in 0..5 {
            right += 90.0; // (90 - (-90)) / 2 = 90 degrees per cycle
            tracker.track(EncoderSample::new(-right, right));
        }
        assert!((tracker.pose().heading - 450.0).abs() < EPSILON);
    }

    #[test]
    fn test_track_projects_along_updated_heading() {
        let mut tracker = PoseTracker::new(1.0, 1.0);
        tracker.set_heading(90.0);
        let pose = tracker.track(EncoderSample::new(2.0, 2.0));
        assert!(pose.x.abs() < EPSILON);
        assert!((pose.y - 2.0).abs() < EPSILON);

        // Combined motion: heading advances by 1 before the 2-tick move is projected
        let mut tracker = PoseTracker::new(1.0, 1.0);
        tracker.set_heading(44.0);
        let pose = tracker.track(EncoderSample::new(1.0, 3.0));
        let expected = 2.0 * (45.0_f64).to_radians().cos();
        assert!((pose.heading - 45.0).abs() < EPSILON);
        assert!((pose.x - expected).abs() < EPSILON);
        assert!((pose.y - expected).abs() < EPSILON);
    }

    #[test]
    fn test_rebase_and_set_position() {
        let mut tracker = PoseTracker::new(0.01, 0.5);
        tracker.rebase(EncoderSample::new(5000.0, 5000.0));
        tracker.set_position(2.0, -1.0, 180.0);
        let pose = tracker.track(EncoderSample::new(5100.0, 5100.0));
        // Only the 100-tick delta since the baseline counts, projected along 180 degrees
        assert!((pose.x - 1.0).abs() < EPSILON);
        assert!((pose.y - (-1.0)).abs() < EPSILON);
        assert_eq!(tracker.previous(), EncoderSample::new(5100.0, 5100.0));
    }
}
