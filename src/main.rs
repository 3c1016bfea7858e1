mod blackboard; // shared controller state for observers
mod bus; // broadcast telemetry
mod config; // config/default.toml + BALLBOT_* overrides
mod routine; // autonomous step runner
mod sim; // simulated motor groups and joystick

use crate::blackboard::{Blackboard, FinishGuard, raise_fault, record_cycle, snapshot};
use crate::bus::{Telemetry, Topic};
use crate::config::AppConfig;
use crate::routine::Routine;
use crate::sim::{ArcadeStick, SimPlant};

use anyhow::{Context, anyhow};
use ballbot_motion::Drive;
use spin_sleep::SpinSleeper;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Ballbot drive controller started");
    let cfg = config::load_config().context("loading configuration")?;

    let bb: Blackboard = Arc::default();
    let telemetry: Topic<Telemetry> = Topic::new(16);
    let telemetry_rx = telemetry.subscribe();

    info!("Spawning control thread...");
    let control = std::thread::Builder::new().name("control".into()).spawn({
        let bb = Arc::clone(&bb);
        let cfg = cfg.clone();
        move || {
            let _finish = FinishGuard(Arc::clone(&bb));
            let result = control_loop(&cfg, &bb, telemetry);
            if let Err(e) = &result {
                error!("Control loop failed: {:#}", e);
                raise_fault(&bb, &e.to_string());
            }
            result
        }
    })?;

    tokio::try_join!(watchdog(bb.clone(), cfg.drive.watchdog_ms), telemetry_task(telemetry_rx))?;

    control.join().map_err(|_| anyhow!("control thread panicked"))??;

    let state = snapshot(&bb);
    info!(pose = %state.pose, cycles = state.cycles, "Run finished");
    if !state.faults.is_empty() {
        warn!(faults = ?state.faults, "Faults raised during run");
    }
    Ok(())
}

/// Fixed-period control cycle. Owns the drive for the whole run.
fn control_loop(cfg: &AppConfig, bb: &Blackboard, telemetry: Topic<Telemetry>) -> anyhow::Result<()> {
    info!("Control thread started.");
    let sleeper = SpinSleeper::new(1_000);
    let period = Duration::from_millis(cfg.drive.cycle_ms);
    let telemetry_every = (cfg.drive.telemetry_ms / cfg.drive.cycle_ms).max(1);

    let mut plant = SimPlant::new(cfg.drive.motors_per_side, &cfg.sim);
    let mut drive = Drive::new(cfg.tuning)?;
    let stick = ArcadeStick::default();
    let mut routine = Routine::new(cfg.routine.clone());

    let start = Instant::now();
    drive.prime(0.0, plant.sample()?);
    let mut cycle: u64 = 0;

    loop {
        let now_ms = start.elapsed().as_secs_f64() * 1000.0;
        routine.poll(now_ms, &mut drive, &stick);

        let sample = plant.sample()?;
        let power = drive.run_into(now_ms, sample, &mut plant);
        record_cycle(bb, &drive);

        if cycle % telemetry_every == 0 {
            telemetry.publish(Telemetry {
                now_ms,
                sample,
                pose: drive.pose(),
                power,
                goal: drive.goal().name(),
                complete: drive.is_complete(),
            });
        }
        cycle += 1;

        if routine.is_finished() && power.left.abs() < 0.5 && power.right.abs() < 0.5 {
            info!(cycles = cycle, elapsed_ms = now_ms, "Routine finished");
            return Ok(());
        }
        if now_ms > cfg.drive.max_runtime_ms {
            drive.stop();
            raise_fault(bb, "routine exceeded max runtime");
            warn!(elapsed_ms = now_ms, goal = %drive.goal(), "Max runtime reached, stopping drive");
            return Ok(());
        }

        sleeper.sleep(period);
    }
}

async fn watchdog(bb: Blackboard, limit_ms: u64) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let limit = Duration::from_millis(limit_ms);
    let mut tick = tokio::time::interval(Duration::from_millis(25));
    loop {
        tick.tick().await;
        let state = snapshot(&bb);
        if state.finished {
            info!("Watchdog task finished.");
            return Ok(());
        }
        let age = Instant::now() - state.last_cycle_ts;
        if age > limit {
            warn!(?age, cycles = state.cycles, "Control cycle overdue");
            raise_fault(&bb, "control loop stalled");
        }
    }
}

async fn telemetry_task(mut rx: tokio::sync::broadcast::Receiver<Arc<Telemetry>>) -> anyhow::Result<()> {
    loop {
        match rx.recv().await {
            Ok(t) => info!(
                t_ms = t.now_ms.round(),
                goal = t.goal,
                complete = t.complete,
                pose = %t.pose,
                power = %t.power,
                encoders = %t.sample,
                "Telemetry"
            ),
            Err(RecvError::Lagged(n)) => debug!(skipped = n, "Telemetry lagged"),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
