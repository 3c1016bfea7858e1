use ballbot_kinematics::*;

fn main() {
    let tiles_per_tick = 1.0 / 600.0;
    let degrees_per_tick = 0.25;
    let mut tracker = PoseTracker::new(tiles_per_tick, degrees_per_tick);

    let ticks_per_cycle = 60.0; // both sides advance equally: straight line
    let num_steps = 10;

    println!("Initializing simulation...");
    println!("  Tracker:        {}", tracker);
    println!("  Ticks/cycle:    {}", ticks_per_cycle);
    println!("  Num Steps:      {}", num_steps);
    println!("\nSimulating...");

    let mut left = vec![0.0, 0.0];
    let mut right = vec![0.0, 0.0];

    for i in 0..num_steps {
        for ticks in left.iter_mut().chain(right.iter_mut()) {
            *ticks += ticks_per_cycle;
        }
        match EncoderSample::from_motor_groups(&left, &right) {
            Ok(sample) => {
                let pose = tracker.track(sample);
                println!("Step {:>2}: Encoders: {} Pose: {}", i + 1, sample, pose);
            }
            Err(e) => {
                eprintln!("Error during simulation step {}: {}", i + 1, e);
                break; // Stop loop on error
            }
        }
    }

    println!("\nSimulation complete.");
    println!("Final Pose: {:?}", tracker.pose());
}
