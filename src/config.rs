use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for flightstage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlightstageConfig {
    /// Path-finding simulation settings
    pub simulation: SimulationConfig,
    /// Scene transition latencies
    pub transition: TransitionTimings,
    /// Single-flight gate bounds
    pub flight: FlightConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Frames simulated per second
    pub frame_rate: u32,
    /// Number of units requesting a path
    pub unit_count: usize,
    /// Frames each path must run before the unit is done
    pub frames_per_path: u32,
    /// Latency of one path computation
    pub path_compute_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransitionTimings {
    /// Time to acquire the loading screen before it can be shown
    pub curtain_acquire_ms: u64,
    /// Fade in or fade out of the loading screen
    pub curtain_fade_ms: u64,
    pub scene_load_ms: u64,
    pub scene_activate_ms: u64,
    pub scene_unload_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlightConfig {
    /// Upper bound for waiting on a single computation
    pub completion_timeout_ms: u64,
    /// Upper bound for draining in-flight computations on shutdown
    pub drain_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

impl Default for FlightstageConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            transition: TransitionTimings::default(),
            flight: FlightConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            unit_count: 10,
            frames_per_path: 60,
            path_compute_ms: 2000,
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: 10_000,
            drain_timeout_ms: 5_000,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            curtain_acquire_ms: 500,
            curtain_fade_ms: 150,
            scene_load_ms: 600,
            scene_activate_ms: 300,
            scene_unload_ms: 300,
        }
    }
}

impl SimulationConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

impl FlightConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl FlightstageConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (flightstage.toml)
    /// 3. Environment variables (prefixed with FLIGHTSTAGE__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("flightstage.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default()).context("Failed to seed default configuration")?,
        );

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Double underscore keeps snake_case keys intact, e.g.
        // FLIGHTSTAGE__SIMULATION__UNIT_COUNT=4
        builder = builder.add_source(
            Environment::with_prefix("FLIGHTSTAGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let flightstage_config: FlightstageConfig = config.try_deserialize()?;
        Ok(flightstage_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<FlightstageConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = FlightstageConfig::load_env_file();
        FlightstageConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static FlightstageConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
