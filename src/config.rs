//! Server configuration module
//!
//! Loads the server configuration from a TOML file and `VOXEL_*` environment
//! variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Server name shown in logs
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Maximum concurrent players
    #[serde(default = "default_max_players")]
    pub max_players: u32,

    /// Environment step interval in milliseconds
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,

    /// Interval between object position updates in seconds
    #[serde(default = "default_send_interval")]
    pub send_interval_secs: f32,

    #[serde(default)]
    pub creative_mode: bool,

    #[serde(default = "default_true")]
    pub enable_damage: bool,

    #[serde(default = "default_true")]
    pub enable_pvp: bool,

    #[serde(default = "default_true")]
    pub enable_hunger: bool,

    /// Trust client-reported positions without speed checks
    #[serde(default)]
    pub disable_anticheat: bool,

    /// Send players to clients regardless of distance
    #[serde(default = "default_true")]
    pub unlimited_player_transfer_distance: bool,

    /// Lifetime of dropped items in seconds
    #[serde(default = "default_item_entity_ttl")]
    pub item_entity_ttl_secs: f32,

    #[serde(default)]
    pub hunger: HungerConfig,

    #[serde(default)]
    pub oxygen: OxygenConfig,
}

/// Hunger rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HungerConfig {
    /// Seconds per hunger point lost
    #[serde(default = "default_hunger_interval")]
    pub interval_secs: f32,

    /// Seconds between starvation damage or satiety healing
    #[serde(default = "default_hurt_heal_interval")]
    pub hurt_heal_interval_secs: f32,

    /// Minimum hunger for healing
    #[serde(default = "default_heal_threshold")]
    pub heal_threshold: i16,

    /// Exhaustion that costs one hunger point
    #[serde(default = "default_exhaustion_per_point")]
    pub exhaustion_per_point: f32,
}

/// Breath rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenConfig {
    /// Seconds per breath point lost under water, or regained above it
    #[serde(default = "default_oxygen_interval")]
    pub interval_secs: f32,

    /// Seconds between drowning damage
    #[serde(default = "default_oxygen_hurt_interval")]
    pub hurt_interval_secs: f32,

    /// Drowning damage per hit
    #[serde(default = "default_oxygen_damage")]
    pub damage: i16,
}

fn default_server_name() -> String {
    "Voxel Server".to_string()
}

fn default_max_players() -> u32 {
    256
}

fn default_tick_rate() -> u64 {
    100
}

fn default_send_interval() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_item_entity_ttl() -> f32 {
    900.0
}

fn default_hunger_interval() -> f32 {
    60.0
}

fn default_hurt_heal_interval() -> f32 {
    4.0
}

fn default_heal_threshold() -> i16 {
    16
}

fn default_exhaustion_per_point() -> f32 {
    4.0
}

fn default_oxygen_interval() -> f32 {
    2.0
}

fn default_oxygen_hurt_interval() -> f32 {
    1.0
}

fn default_oxygen_damage() -> i16 {
    1
}

impl Default for HungerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_hunger_interval(),
            hurt_heal_interval_secs: default_hurt_heal_interval(),
            heal_threshold: default_heal_threshold(),
            exhaustion_per_point: default_exhaustion_per_point(),
        }
    }
}

impl Default for OxygenConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_oxygen_interval(),
            hurt_interval_secs: default_oxygen_hurt_interval(),
            damage: default_oxygen_damage(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/server.toml"),
            server_name: default_server_name(),
            max_players: default_max_players(),
            tick_rate_ms: default_tick_rate(),
            send_interval_secs: default_send_interval(),
            creative_mode: false,
            enable_damage: true,
            enable_pvp: true,
            enable_hunger: true,
            disable_anticheat: false,
            unlimited_player_transfer_distance: true,
            item_entity_ttl_secs: default_item_entity_ttl(),
            hunger: HungerConfig::default(),
            oxygen: OxygenConfig::default(),
        }
    }
}

fn env_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl ServerConfig {
    /// Load configuration from file and environment variables
    pub async fn load() -> Result<Self> {
        let config_path = env::var("VOXEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/server.toml"));

        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| {
                    format!("Failed to read config file: {}", config_path.display())
                })?;
            Self::from_toml(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.config_path = config_path;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration document
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("VOXEL_SERVER_NAME") {
            self.server_name = val;
        }
        if let Ok(val) = env::var("VOXEL_MAX_PLAYERS") {
            if let Ok(max) = val.parse() {
                self.max_players = max;
            }
        }
        if let Ok(val) = env::var("VOXEL_TICK_RATE_MS") {
            if let Ok(rate) = val.parse() {
                self.tick_rate_ms = rate;
            }
        }
        if let Ok(val) = env::var("VOXEL_CREATIVE_MODE") {
            self.creative_mode = env_flag(&val);
        }
        if let Ok(val) = env::var("VOXEL_ENABLE_DAMAGE") {
            self.enable_damage = env_flag(&val);
        }
        if let Ok(val) = env::var("VOXEL_ENABLE_PVP") {
            self.enable_pvp = env_flag(&val);
        }
        if let Ok(val) = env::var("VOXEL_ENABLE_HUNGER") {
            self.enable_hunger = env_flag(&val);
        }
        if let Ok(val) = env::var("VOXEL_DISABLE_ANTICHEAT") {
            self.disable_anticheat = env_flag(&val);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_players == 0 || self.max_players > 10000 {
            anyhow::bail!("Max players must be between 1 and 10000");
        }

        if self.tick_rate_ms < 10 || self.tick_rate_ms > 5000 {
            anyhow::bail!("Tick rate must be between 10ms and 5000ms");
        }

        if !(self.send_interval_secs > 0.0 && self.send_interval_secs <= 10.0) {
            anyhow::bail!("Send interval must be between 0 and 10 seconds");
        }

        if self.item_entity_ttl_secs <= 0.0 {
            anyhow::bail!("Item entity TTL must be positive");
        }

        if self.hunger.interval_secs <= 0.0 || self.hunger.hurt_heal_interval_secs <= 0.0 {
            anyhow::bail!("Hunger intervals must be positive");
        }

        if !(0..=crate::game::player::PLAYER_MAX_HUNGER).contains(&self.hunger.heal_threshold) {
            anyhow::bail!("Hunger heal threshold must be between 0 and 20");
        }

        if self.oxygen.interval_secs <= 0.0 || self.oxygen.hurt_interval_secs <= 0.0 {
            anyhow::bail!("Oxygen intervals must be positive");
        }

        if self.oxygen.damage < 0 {
            anyhow::bail!("Drowning damage must not be negative");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server_name, "Voxel Server");
        assert_eq!(config.tick_rate_ms, 100);
        assert_eq!(config.send_interval_secs, 0.1);
        assert!(config.enable_damage);
        assert!(!config.disable_anticheat);
        assert_eq!(config.hunger.heal_threshold, 16);
        assert_eq!(config.oxygen.interval_secs, 2.0);
    }

    #[test]
    fn test_parse_partial_document() {
        let config = ServerConfig::from_toml(
            r#"
            server_name = "test"
            enable_pvp = false

            [oxygen]
            damage = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.server_name, "test");
        assert!(!config.enable_pvp);
        assert_eq!(config.oxygen.damage, 2);
        assert_eq!(config.oxygen.hurt_interval_secs, 1.0);
        assert_eq!(config.hunger, HungerConfig::default());
        assert_eq!(config.item_entity_ttl_secs, 900.0);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.tick_rate_ms = 0;
        assert!(config.validate().is_err());
        config.tick_rate_ms = 100;

        config.send_interval_secs = 0.0;
        assert!(config.validate().is_err());
        config.send_interval_secs = 0.1;

        config.hunger.heal_threshold = 21;
        assert!(config.validate().is_err());
    }
}
