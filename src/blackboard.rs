use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use ballbot_kinematics::Pose;
use ballbot_motion::{Drive, MotionGoal, WheelPower};

/// Latest controller state, written by the control thread once per cycle.
#[derive(Clone)]
pub struct State {
    pub pose: Pose,
    pub power: WheelPower,
    pub goal: MotionGoal,
    pub complete: bool,
    pub cycles: u64,
    pub last_cycle_ts: Instant,
    pub finished: bool,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            pose: Pose::default(),
            power: WheelPower::default(),
            goal: MotionGoal::Idle,
            complete: false,
            cycles: 0,
            last_cycle_ts: Instant::now(),
            finished: false,
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_cycle(bb: &Blackboard, drive: &Drive) {
    let mut g = bb.write();
    g.pose = drive.pose();
    g.power = drive.power();
    g.goal = drive.goal();
    g.complete = drive.is_complete();
    g.cycles += 1;
    g.last_cycle_ts = Instant::now();
}

pub fn mark_finished(bb: &Blackboard) {
    bb.write().finished = true;
}

/// Marks the run finished when dropped, also when the owning thread panics.
pub struct FinishGuard(pub Blackboard);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            raise_fault(&self.0, "control thread panicked");
        }
        mark_finished(&self.0);
    }
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballbot_kinematics::EncoderSample;
    use ballbot_motion::TuningParameters;

    #[test]
    fn test_record_cycle_copies_drive_state() {
        let bb: Blackboard = Arc::default();
        let mut drive = Drive::new(TuningParameters::default()).unwrap();
        drive.run_at_speed(25.0);
        drive.run(0.0, EncoderSample::new(3.0, 3.0));
        record_cycle(&bb, &drive);
        record_cycle(&bb, &drive);

        let state = snapshot(&bb);
        assert_eq!(state.power, WheelPower::new(25.0, 25.0));
        assert_eq!(state.pose.x, 3.0);
        assert_eq!(state.cycles, 2);
        assert!(state.goal.is_idle());
    }

    #[test]
    fn test_finish_guard_marks_finished_on_panic() {
        let bb: Blackboard = Arc::default();
        let handle = std::thread::spawn({
            let bb = Arc::clone(&bb);
            move || {
                let _finish = FinishGuard(bb);
                panic!("control loop blew up");
            }
        });
        assert!(handle.join().is_err());

        let state = snapshot(&bb);
        assert!(state.finished);
        assert_eq!(state.faults, vec!["control thread panicked".to_string()]);
    }

    #[test]
    fn test_finish_guard_marks_finished_on_return() {
        let bb: Blackboard = Arc::default();
        drop(FinishGuard(Arc::clone(&bb)));
        let state = snapshot(&bb);
        assert!(state.finished);
        assert!(state.faults.is_empty());
    }

    #[test]
    fn test_raise_fault_deduplicates() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "control loop stalled");
        raise_fault(&bb, "control loop stalled");
        raise_fault(&bb, "encoder read failed");
        assert_eq!(snapshot(&bb).faults.len(), 2);
    }
}
