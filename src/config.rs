use ballbot_motion::{
    TuningParameters,
    goal::{DEFAULT_CUSTOM_TIMEOUT_S, DEFAULT_DISTANCE_TIMEOUT_MS, NO_TIMEOUT},
};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "BALLBOT";

/// Whole application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tuning: TuningParameters,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub routine: Vec<RoutineStep>,
}

/// Control loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub cycle_ms: u64,
    pub motors_per_side: usize,
    /// Age of the last cycle after which the watchdog raises a fault.
    pub watchdog_ms: u64,
    pub telemetry_ms: u64,
    /// Hard stop for the whole run, in case a goal never completes.
    pub max_runtime_ms: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig { cycle_ms: 10, motors_per_side: 2, watchdog_ms: 100, telemetry_ms: 250, max_runtime_ms: 60_000.0 }
    }
}

/// Simulated drivetrain.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Encoder ticks each motor advances per cycle per percent of power.
    pub ticks_per_percent: f64,
    /// Fractional speed difference between the sides; positive makes the right side faster.
    pub side_mismatch: f64,
    /// Amplitude of the uniform noise added to every motor step, in ticks.
    pub noise_ticks: f64,
    pub seed: u64,
    /// Encoder position every motor reports at power-on.
    pub start_ticks: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig { ticks_per_percent: 0.06, side_mismatch: 0.0, noise_ticks: 0.0, seed: 0, start_ticks: 0.0 }
    }
}

fn distance_timeout() -> f64 {
    DEFAULT_DISTANCE_TIMEOUT_MS
}

fn custom_timeout() -> f64 {
    DEFAULT_CUSTOM_TIMEOUT_S
}

fn no_timeout() -> f64 {
    NO_TIMEOUT
}

/// One step of an autonomous routine.
///
/// Goal steps last until the goal completes; the others last `duration_ms`
/// or finish immediately.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutineStep {
    DriveForTime {
        speed: f64,
        heading: f64,
        timeout_ms: f64,
    },
    DriveForDistance {
        speed: f64,
        heading: f64,
        tiles: f64,
        #[serde(default = "distance_timeout")]
        timeout_ms: f64,
    },
    DriveCustom {
        speed: f64,
        heading: f64,
        #[serde(default = "custom_timeout")]
        timeout_s: f64,
    },
    TurnTo {
        heading: f64,
        #[serde(default = "no_timeout")]
        timeout_s: f64,
    },
    TurnRelative {
        delta: f64,
        #[serde(default = "no_timeout")]
        timeout_s: f64,
    },
    TurnRelativeByEncoder {
        delta: f64,
        #[serde(default = "no_timeout")]
        timeout_s: f64,
    },
    TurnToPoint {
        x: f64,
        y: f64,
        #[serde(default = "no_timeout")]
        timeout_s: f64,
    },
    DriveToPoint {
        speed: f64,
        x: f64,
        y: f64,
        #[serde(default = "custom_timeout")]
        timeout_s: f64,
    },
    RunAtSpeed {
        left: f64,
        right: f64,
        duration_ms: f64,
    },
    Manual {
        power: f64,
        turn: f64,
        duration_ms: f64,
    },
    SetPosition {
        x: f64,
        y: f64,
        heading: f64,
    },
    Pause {
        duration_ms: f64,
    },
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    match settings.and_then(parse) {
        Ok(cfg) => {
            info!(steps = cfg.routine.len(), cycle_ms = cfg.drive.cycle_ms, "Successfully loaded configuration");
            Ok(cfg)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn parse(settings: Config) -> Result<AppConfig, ConfigError> {
    let cfg: AppConfig = settings.try_deserialize()?;
    cfg.tuning.validate().map_err(|e| ConfigError::Message(e.to_string()))?;
    if cfg.drive.cycle_ms == 0 {
        return Err(ConfigError::Message("drive.cycle_ms must be at least 1".into()));
    }
    if cfg.drive.motors_per_side == 0 {
        return Err(ConfigError::Message("drive.motors_per_side must be at least 1".into()));
    }
    if cfg.sim.noise_ticks.is_nan() || cfg.sim.noise_ticks < 0.0 {
        return Err(ConfigError::Message("sim.noise_ticks must be non-negative".into()));
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build().and_then(parse)
    }

    #[test]
    fn test_shipped_config_loads() {
        let cfg = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml))
            .build()
            .and_then(parse)
            .unwrap();
        assert!(!cfg.routine.is_empty());
        assert!(cfg.tuning.slew_rate >= 1.0);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let cfg = from_toml("").unwrap();
        assert_eq!(cfg.tuning, TuningParameters::default());
        assert_eq!(cfg.drive.cycle_ms, 10);
        assert!(cfg.routine.is_empty());
    }

    #[test]
    fn test_partial_tuning_keeps_other_defaults() {
        let cfg = from_toml("[tuning]\nslew_rate = 4.0\nturn_rate = 45\n").unwrap();
        assert_eq!(cfg.tuning.slew_rate, 4.0);
        assert_eq!(cfg.tuning.turn_rate, 45.0);
        assert_eq!(cfg.tuning.ticks_per_tile, 1.0);
    }

    #[test]
    fn test_routine_steps_and_timeout_defaults() {
        let toml = r#"
            [[routine]]
            kind = "drive_for_distance"
            speed = 60.0
            heading = 0.0
            tiles = 2.0

            [[routine]]
            kind = "turn_to"
            heading = 90.0

            [[routine]]
            kind = "drive_to_point"
            speed = 50.0
            x = 1.0
            y = 2.0
        "#;
        let cfg = from_toml(toml).unwrap();
        assert_eq!(
            cfg.routine,
            vec![
                RoutineStep::DriveForDistance { speed: 60.0, heading: 0.0, tiles: 2.0, timeout_ms: 10_000.0 },
                RoutineStep::TurnTo { heading: 90.0, timeout_s: -1.0 },
                RoutineStep::DriveToPoint { speed: 50.0, x: 1.0, y: 2.0, timeout_s: 10.0 },
            ]
        );
    }

    #[test]
    fn test_rejects_invalid_tuning() {
        let err = from_toml("[tuning]\nslew_rate = 0.5\n").unwrap_err();
        assert!(err.to_string().contains("slew_rate"));
    }

    #[test]
    fn test_rejects_empty_drivetrain() {
        assert!(from_toml("[drive]\nmotors_per_side = 0\n").is_err());
    }
}
