#![warn(missing_docs)]
//! Motion control for a two-wheel differential-drive robot.
//!
//! The crate is built around [`Drive`], a controller that is stepped once per
//! control tick. Each step integrates odometry through
//! [`ballbot_kinematics::PoseTracker`], evaluates the active [`MotionGoal`],
//! runs the [`turn::TurnLaw`] and smooths the result with [`shaper::Slew`].
//!
//! Goals are set between steps:
//!
//! * timed, distance and custom drives that hold a heading,
//! * absolute, relative and encoder-measured turns in place,
//! * turning towards and driving to a field point.
//!
//! When no goal is active the controller forwards manual tank or arcade
//! input, if any is bound. A fixed-speed override bypasses both.
//!
//! Timing and hardware stay outside: callers pass a monotonic timestamp and an
//! [`ballbot_kinematics::EncoderSample`] to [`Drive::run`] and apply the
//! returned [`WheelPower`] themselves or through a [`PowerSink`].

pub mod drive;
pub mod error;
pub mod goal;
pub mod shaper;
pub mod turn;
pub mod tuning;

pub use drive::{Completion, Drive};
pub use error::MotionError;
pub use goal::{MotionGoal, PointSeek, TurnSource};
pub use shaper::{Axis, ManualControls, PowerSink, WheelPower};
pub use tuning::TuningParameters;
