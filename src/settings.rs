use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::Deserialize;
use swerve_module::ModuleConfig;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Everything the runner needs, read from `config/default.toml` and `SWERVE__*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub module: ModuleConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

/// Timing of the control thread and its supervisors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub period_ms: u64,
    /// Commands older than this are treated as stale and the wheel is stopped.
    pub watchdog_timeout_ms: u64,
    pub telemetry_period_ms: u64,
    /// Periodic steering encoder resync. `None` only synchronizes at start-up.
    pub resync_period_s: Option<u64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            period_ms: 20,
            watchdog_timeout_ms: 100,
            telemetry_period_ms: 100,
            resync_period_s: None,
        }
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = load_from(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true));

    match settings {
        Ok(config) => {
            info!(module = %config.module.name, control = ?config.control, "Successfully loaded configuration");
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn load_from<S>(source: S) -> Result<AppConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    Config::builder()
        .add_source(source)
        .add_source(
            Environment::with_prefix("SWERVE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
