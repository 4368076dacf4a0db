use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub presence: PresenceConfig,
    pub viewer: ViewerConfig,
    pub broadcaster: BroadcasterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Viewer presence tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// A viewer is counted while its last heartbeat is at most this old
    pub ttl_secs: u64,
    /// How often the background sweeper drops expired entries
    pub sweep_interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 40,
            sweep_interval_secs: 60,
        }
    }
}

impl PresenceConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Viewer-side polling and reconciliation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Local animation frame cadence
    pub frame_interval_ms: u64,
    /// Quiet period after a fade before a slot may load a new video
    pub fade_cooldown_ms: i64,
    /// Drift tolerated before a corrective seek
    pub drift_threshold_secs: f64,
    /// Minimum gap between two drift seeks on the same slot
    pub seek_cooldown_ms: i64,
    /// Where the viewer token is persisted
    pub viewer_id_path: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            poll_interval_ms: 2_000,
            heartbeat_interval_ms: 15_000,
            frame_interval_ms: 16,
            fade_cooldown_ms: 2_000,
            drift_threshold_secs: 20.0,
            seek_cooldown_ms: 10_000,
            viewer_id_path: ".fadecast/viewer_id".to_string(),
        }
    }
}

/// Broadcaster-side deck behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    pub fade_duration_ms: i64,
    /// Start an automatic crossfade when the audible track has this little left
    pub auto_fade_lead_secs: f64,
    pub sync_interval_ms: u64,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            fade_duration_ms: 8_000,
            auto_fade_lead_secs: 10.0,
            sync_interval_ms: 1_000,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (FADECAST_SERVER__HTTP_PORT, etc.)
        builder = builder.add_source(
            Environment::with_prefix("FADECAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// Check for misconfigurations, returning every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }
        if self.presence.ttl_secs == 0 {
            errors.push("presence.ttl_secs must be positive".to_string());
        }
        if self.presence.sweep_interval_secs == 0 {
            errors.push("presence.sweep_interval_secs must be positive".to_string());
        }

        let viewer = &self.viewer;
        if viewer.poll_interval_ms == 0 {
            errors.push("viewer.poll_interval_ms must be positive".to_string());
        }
        if viewer.heartbeat_interval_ms == 0 {
            errors.push("viewer.heartbeat_interval_ms must be positive".to_string());
        }
        if viewer.heartbeat_interval_ms >= self.presence.ttl_secs.saturating_mul(1000) {
            errors.push(format!(
                "viewer.heartbeat_interval_ms ({}) must be shorter than presence.ttl_secs ({}s)",
                viewer.heartbeat_interval_ms, self.presence.ttl_secs
            ));
        }
        if viewer.frame_interval_ms == 0 {
            errors.push("viewer.frame_interval_ms must be positive".to_string());
        }
        if viewer.fade_cooldown_ms < 0 || viewer.seek_cooldown_ms < 0 {
            errors.push("viewer cooldowns must be non-negative".to_string());
        }
        if !(viewer.drift_threshold_secs.is_finite() && viewer.drift_threshold_secs > 0.0) {
            errors.push("viewer.drift_threshold_secs must be a positive number".to_string());
        }

        if self.broadcaster.fade_duration_ms <= 0 {
            errors.push("broadcaster.fade_duration_ms must be positive".to_string());
        }
        if self.broadcaster.auto_fade_lead_secs < 0.0 {
            errors.push("broadcaster.auto_fade_lead_secs must be non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
