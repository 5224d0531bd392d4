//! Configuration for the admission pipeline.
//!
//! Sources in order of precedence (later sources override earlier):
//! 1. Bundled defaults (`gatehouse.toml` shipped with the library)
//! 2. User config in the home directory (`~/.config/gatehouse/gatehouse.toml`)
//! 3. User config in the current directory (`./gatehouse.toml`)
//!
//! ```toml
//! superusers = ["10001"]
//! default_permission_level = 0
//!
//! [flood]
//! window_ms = 1000
//! threshold = 5
//! ban_secs = 1800
//!
//! [plugins.pixiv]
//! required_level = 20
//! required_node = "pixiv.basic"
//! cooldown_group_secs = 60
//! cooldown_user_secs = 30
//! ```

use crate::{AdmissionResult, PluginPolicy, validate_node};
use config::{Config, File, FileFormat};
use derive_getters::Getters;
use derive_setters::Setters;
use gatehouse_core::LogFormat;
use gatehouse_error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Flood detector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct FloodConfig {
    /// Whether the detector runs at all
    #[serde(default = "default_flood_enabled")]
    enabled: bool,

    /// Messages closer together than this count as fast
    #[serde(default = "default_flood_window_ms")]
    window_ms: u64,

    /// Number of messages a burst may contain before the sender is banned
    #[serde(default = "default_flood_threshold")]
    threshold: u32,

    /// Length of the automatic global-user ban
    #[serde(default = "default_flood_ban_secs")]
    ban_secs: u64,
}

fn default_flood_enabled() -> bool {
    true
}

fn default_flood_window_ms() -> u64 {
    1000
}

fn default_flood_threshold() -> u32 {
    5
}

fn default_flood_ban_secs() -> u64 {
    1800
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            enabled: default_flood_enabled(),
            window_ms: default_flood_window_ms(),
            threshold: default_flood_threshold(),
            ban_secs: default_flood_ban_secs(),
        }
    }
}

impl FloodConfig {
    /// Fast-message window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Automatic ban length.
    pub fn ban(&self) -> Duration {
        Duration::from_secs(self.ban_secs)
    }
}

/// Multi-turn conversation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct ConversationConfig {
    /// Idle time after which an abandoned conversation stops admitting follow-ups
    #[serde(default = "default_conversation_ttl_secs")]
    ttl_secs: u64,
}

fn default_conversation_ttl_secs() -> u64 {
    300
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_conversation_ttl_secs(),
        }
    }
}

impl ConversationConfig {
    /// Default conversation lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Housekeeping task settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct ReaperConfig {
    /// Time between sweeps
    #[serde(default = "default_reaper_interval_secs")]
    interval_secs: u64,

    /// Flood counters idle longer than this are dropped
    #[serde(default = "default_idle_counter_secs")]
    idle_counter_secs: u64,
}

fn default_reaper_interval_secs() -> u64 {
    300
}

fn default_idle_counter_secs() -> u64 {
    3600
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reaper_interval_secs(),
            idle_counter_secs: default_idle_counter_secs(),
        }
    }
}

impl ReaperConfig {
    /// Time between sweeps.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Idle horizon for flood counters.
    pub fn idle_counter(&self) -> Duration {
        Duration::from_secs(self.idle_counter_secs)
    }
}

/// Top-level admission configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct AdmissionConfig {
    /// User ids that bypass cooldowns and flood detection
    #[serde(default)]
    superusers: Vec<String>,

    /// Level given to entities on first interaction
    #[serde(default)]
    default_permission_level: i32,

    /// Log output format
    #[serde(default)]
    log_format: LogFormat,

    /// Flood detector settings
    #[serde(default)]
    flood: FloodConfig,

    /// Conversation settings
    #[serde(default)]
    conversation: ConversationConfig,

    /// Housekeeping settings
    #[serde(default)]
    reaper: ReaperConfig,

    /// Declared plugin policies keyed by plugin name
    #[serde(default)]
    plugins: HashMap<String, PluginPolicy>,
}

impl AdmissionConfig {
    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> AdmissionResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    #[instrument]
    pub fn load() -> AdmissionResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../gatehouse.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/gatehouse/gatehouse.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("gatehouse").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending setting.
    pub fn validate(&self) -> AdmissionResult<()> {
        if self.flood.window_ms == 0 {
            return Err(ConfigError::new("flood.window_ms must be positive").into());
        }
        if self.flood.threshold == 0 {
            return Err(ConfigError::new("flood.threshold must be positive").into());
        }
        if self.flood.ban_secs == 0 {
            return Err(ConfigError::new("flood.ban_secs must be positive").into());
        }
        if self.conversation.ttl_secs == 0 {
            return Err(ConfigError::new("conversation.ttl_secs must be positive").into());
        }
        if self.reaper.interval_secs == 0 {
            return Err(ConfigError::new("reaper.interval_secs must be positive").into());
        }

        for (name, policy) in &self.plugins {
            if let Some(node) = policy.required_node() {
                validate_node(node)?;
            }
            let (user_secs, group_secs) = policy.cooldown_secs();
            if user_secs == Some(0) || group_secs == Some(0) {
                return Err(ConfigError::new(format!(
                    "plugins.{}: cooldown seconds must be positive; omit the key to disable",
                    name
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Policy for a plugin: the declared one, or an unrestricted default.
    pub fn plugin_policy(&self, name: &str) -> PluginPolicy {
        self.plugins
            .get(name)
            .map(|policy| policy.clone().named(name))
            .unwrap_or_else(|| PluginPolicy::new(name))
    }

    /// Superuser ids as a lookup set.
    pub fn superuser_set(&self) -> Superusers {
        Superusers::new(self.superusers.iter().cloned())
    }
}

/// Set of user ids exempt from cooldowns and flood detection.
#[derive(Debug, Clone, Default)]
pub struct Superusers(Arc<HashSet<String>>);

impl Superusers {
    /// Build from user ids.
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self(Arc::new(ids.into_iter().collect()))
    }

    /// Whether the user id is a superuser.
    pub fn contains(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }
}
