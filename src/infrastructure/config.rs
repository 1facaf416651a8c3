use serde::Deserialize;
use std::fmt::Display;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub analysis: AnalysisSettings,
    pub replay: ReplaySettings,
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl AnalysisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Cadence and window size of the replay. Both values have been used in
/// practice (100ms and 150ms ticks), so neither is hardcoded.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ReplaySettings {
    pub tick_interval_ms: u64,
    pub window_cap: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 150,
            window_cap: 60,
        }
    }
}

impl ReplaySettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Inclusive range for one request parameter
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy + Display> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, name: &str) -> anyhow::Result<()> {
        if self.min > self.max {
            anyhow::bail!("validation.{name}: min {} exceeds max {}", self.min, self.max);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub window_size: Bounds<u32>,
    pub z_threshold: Bounds<f64>,
    pub prediction_horizon: Bounds<u32>,
    pub max_records: Bounds<u32>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            window_size: Bounds::new(10, 1000),
            z_threshold: Bounds::new(0.1, 10.0),
            prediction_horizon: Bounds::new(1, 1000),
            max_records: Bounds::new(100, 5000),
        }
    }
}

impl AppConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        if self.replay.tick_interval_ms == 0 {
            anyhow::bail!("replay.tick_interval_ms must be positive");
        }
        if self.replay.window_cap == 0 {
            anyhow::bail!("replay.window_cap must be positive");
        }
        self.validation.window_size.check("window_size")?;
        self.validation.z_threshold.check("z_threshold")?;
        self.validation.prediction_horizon.check("prediction_horizon")?;
        self.validation.max_records.check("max_records")?;
        Ok(())
    }
}

/// `config/backtest.*` if present, then `BACKTEST__SECTION__KEY` overrides
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/backtest").required(false))
        .add_source(
            config::Environment::with_prefix("BACKTEST")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = settings.try_deserialize()?;
    app_config.check()?;
    Ok(app_config)
}
