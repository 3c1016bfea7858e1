use ballbot_kinematics::EncoderSample;
use ballbot_motion::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let tuning = TuningParameters {
        ticks_per_degree: 4.0,
        tracking_ticks_per_degree: 0.25,
        turn_rate: 45.0,
        turn_accepted: 2.0,
        min_turn_speed: 15.0,
        max_turn_speed: 80.0,
        pulse_time: 3.0,
        pulse_pause: 6.0,
        slew_rate: 2.0,
        ..Default::default()
    };

    let mut drive = match Drive::new(tuning) {
        Ok(drive) => drive,
        Err(e) => {
            eprintln!("Failed to initialize drive: {}", e);
            return;
        }
    };

    // Crude plant: each side moves 0.4 ticks per cycle per percent of power
    let gain = 0.4;
    let cycle_ms = 10.0;
    let num_steps = 200;
    let mut sample = EncoderSample::default();

    drive.turn_to(90.0, 5.0);
    println!("Goal: {}", drive.goal());
    println!("\nSimulating...");

    for i in 0..num_steps {
        let power = drive.run(i as f64 * cycle_ms, sample);
        sample.left += power.left * gain;
        sample.right += power.right * gain;
        if i % 10 == 0 {
            println!("Step {:>3}: Power: {} Pose: {}", i, power, drive.pose());
        }
        if drive.is_complete() {
            println!("Step {:>3}: complete ({:?})", i, drive.last_completion());
            break;
        }
    }

    println!("\nSimulation complete.");
    println!("Final Pose: {}", drive.pose());
}
