//! Runs a configured list of steps against the drive, one step at a time.

use std::collections::VecDeque;

use ballbot_motion::Drive;
use tracing::info;

use crate::config::RoutineStep;
use crate::sim::ArcadeStick;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Wait {
    /// Until the drive goes idle.
    Goal,
    /// Until the timestamp, in milliseconds.
    Until(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Release {
    Nothing,
    Stop,
    Manual,
}

#[derive(Debug)]
struct Active {
    wait: Wait,
    release: Release,
}

#[derive(Debug)]
pub struct Routine {
    steps: VecDeque<RoutineStep>,
    active: Option<Active>,
    started: usize,
}

impl Routine {
    pub fn new(steps: Vec<RoutineStep>) -> Self {
        Routine { steps: steps.into(), active: None, started: 0 }
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty() && self.active.is_none()
    }

    /// Finishes the active step if it is done and starts the next ones.
    ///
    /// Call between cycles. Steps without a wait are chained within one call.
    pub fn poll(&mut self, now_ms: f64, drive: &mut Drive, stick: &ArcadeStick) {
        if let Some(active) = &self.active {
            let done = match active.wait {
                Wait::Goal => drive.goal().is_idle(),
                Wait::Until(end_ms) => now_ms >= end_ms,
            };
            if !done {
                return;
            }
            match active.release {
                Release::Nothing => {}
                Release::Stop => drive.stop(),
                Release::Manual => {
                    stick.set(0.0, 0.0);
                    drive.clear_manual_controls();
                }
            }
            self.active = None;
        }

        while let Some(step) = self.steps.pop_front() {
            self.started += 1;
            info!(step = self.started, ?step, "Routine step started");
            if let Some(active) = start(&step, now_ms, drive, stick) {
                self.active = Some(active);
                return;
            }
        }
    }
}

fn start(step: &RoutineStep, now_ms: f64, drive: &mut Drive, stick: &ArcadeStick) -> Option<Active> {
    let goal = Some(Active { wait: Wait::Goal, release: Release::Nothing });
    match *step {
        RoutineStep::DriveForTime { speed, heading, timeout_ms } => {
            drive.drive_for_time(speed, heading, timeout_ms);
            goal
        }
        RoutineStep::DriveForDistance { speed, heading, tiles, timeout_ms } => {
            drive.drive_for_distance(speed, heading, tiles, timeout_ms);
            goal
        }
        RoutineStep::DriveCustom { speed, heading, timeout_s } => {
            drive.drive_custom(speed, heading, timeout_s);
            goal
        }
        RoutineStep::TurnTo { heading, timeout_s } => {
            drive.turn_to(heading, timeout_s);
            goal
        }
        RoutineStep::TurnRelative { delta, timeout_s } => {
            drive.turn_relative(delta, timeout_s);
            goal
        }
        RoutineStep::TurnRelativeByEncoder { delta, timeout_s } => {
            drive.turn_relative_by_encoder(delta, timeout_s);
            goal
        }
        RoutineStep::TurnToPoint { x, y, timeout_s } => {
            drive.turn_to_point(x, y, timeout_s);
            goal
        }
        RoutineStep::DriveToPoint { speed, x, y, timeout_s } => {
            drive.drive_to_point(speed, x, y, timeout_s);
            goal
        }
        RoutineStep::RunAtSpeed { left, right, duration_ms } => {
            drive.run_at_speeds(left, right);
            Some(Active { wait: Wait::Until(now_ms + duration_ms), release: Release::Stop })
        }
        RoutineStep::Manual { power, turn, duration_ms } => {
            stick.set(power, turn);
            drive.set_arcade_joy(stick.power.clone(), stick.turn.clone());
            Some(Active { wait: Wait::Until(now_ms + duration_ms), release: Release::Manual })
        }
        RoutineStep::SetPosition { x, y, heading } => {
            drive.set_position(x, y, heading);
            None
        }
        RoutineStep::Pause { duration_ms } => {
            Some(Active { wait: Wait::Until(now_ms + duration_ms), release: Release::Nothing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballbot_kinematics::EncoderSample;
    use ballbot_motion::{TuningParameters, WheelPower};

    fn drive() -> Drive {
        Drive::new(TuningParameters { ticks_per_tile: 100.0, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_empty_routine_is_finished() {
        let mut routine = Routine::new(Vec::new());
        routine.poll(0.0, &mut drive(), &ArcadeStick::default());
        assert!(routine.is_finished());
    }

    #[test]
    fn test_immediate_steps_chain_into_goal() {
        let mut drive = drive();
        let stick = ArcadeStick::default();
        let mut routine = Routine::new(vec![
            RoutineStep::SetPosition { x: 1.0, y: 2.0, heading: 90.0 },
            RoutineStep::DriveForDistance { speed: 50.0, heading: 90.0, tiles: 1.0, timeout_ms: 1000.0 },
        ]);
        routine.poll(0.0, &mut drive, &stick);
        assert_eq!(drive.pose().heading, 90.0);
        assert_eq!(drive.goal().name(), "distance_drive");
        assert!(!routine.is_finished());

        // Goal still running: nothing changes
        drive.run(10.0, EncoderSample::new(50.0, 50.0));
        routine.poll(10.0, &mut drive, &stick);
        assert!(!routine.is_finished());

        drive.run(20.0, EncoderSample::new(100.0, 100.0));
        assert!(drive.is_complete());
        routine.poll(20.0, &mut drive, &stick);
        assert!(routine.is_finished());
    }

    #[test]
    fn test_run_at_speed_step_stops_after_duration() {
        let mut drive = drive();
        let stick = ArcadeStick::default();
        let mut routine = Routine::new(vec![RoutineStep::RunAtSpeed { left: 30.0, right: 30.0, duration_ms: 50.0 }]);
        routine.poll(0.0, &mut drive, &stick);
        assert_eq!(drive.run(0.0, EncoderSample::default()), WheelPower::new(30.0, 30.0));

        routine.poll(40.0, &mut drive, &stick);
        assert_eq!(drive.run(40.0, EncoderSample::default()), WheelPower::new(30.0, 30.0));

        routine.poll(50.0, &mut drive, &stick);
        assert!(routine.is_finished());
        assert_eq!(drive.run(50.0, EncoderSample::default()), WheelPower::new(0.0, 0.0));
    }

    #[test]
    fn test_manual_step_binds_and_releases_stick() {
        let mut drive = drive();
        let stick = ArcadeStick::default();
        let mut routine = Routine::new(vec![
            RoutineStep::Manual { power: 40.0, turn: 10.0, duration_ms: 20.0 },
            RoutineStep::Pause { duration_ms: 10.0 },
        ]);
        routine.poll(0.0, &mut drive, &stick);
        assert_eq!(drive.run(0.0, EncoderSample::default()), WheelPower::new(30.0, 50.0));

        routine.poll(20.0, &mut drive, &stick);
        assert_eq!(drive.run(20.0, EncoderSample::default()), WheelPower::new(0.0, 0.0));
        assert!(!routine.is_finished()); // pausing

        routine.poll(30.0, &mut drive, &stick);
        assert!(routine.is_finished());
    }
}
