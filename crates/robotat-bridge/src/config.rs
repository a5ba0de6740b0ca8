// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Bridge configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration. The
//! defaults match the lab deployment: one wildcard mocap subscription, one
//! telemetry topic, one fixed command topic, all at QoS 0.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,

    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// MQTT keepalive interval (seconds).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Client ID presented to the broker.
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

/// Topic layout. The command topic addresses one fixed physical target per
/// deployment; multi-target addressing is not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Motion-capture wildcard subscription.
    #[serde(default = "default_mocap_topic")]
    pub mocap: String,

    /// Robot telemetry subscription (exact topic).
    #[serde(default = "default_telemetry_topic")]
    pub telemetry: String,

    /// Outbound command topic.
    #[serde(default = "default_command_topic")]
    pub command: String,

    /// MQTT QoS for subscriptions and publishes (0 = at most once).
    #[serde(default)]
    pub qos: u8,
}

/// WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Maximum concurrent viewer connections.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

/// Bounded channel capacities; one slow participant must never stall the
/// others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Broker receive loop → hub.
    #[serde(default = "default_capacity")]
    pub ingest_capacity: usize,

    /// Hub → each viewer session.
    #[serde(default = "default_capacity")]
    pub session_capacity: usize,
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    60
}

fn default_client_id() -> String {
    "robotat-bridge".to_string()
}

fn default_mocap_topic() -> String {
    "mocap/#".to_string()
}

fn default_telemetry_topic() -> String {
    "pololu01/tel".to_string()
}

fn default_command_topic() -> String {
    "pololu01/cmd".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    9090
}

fn default_max_clients() -> usize {
    100
}

fn default_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            keepalive_secs: default_keepalive(),
            client_id: default_client_id(),
        }
    }
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            mocap: default_mocap_topic(),
            telemetry: default_telemetry_topic(),
            command: default_command_topic(),
            qos: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_server_port(),
            max_clients: default_max_clients(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: default_capacity(),
            session_capacity: default_capacity(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topics: TopicsConfig::default(),
            server: ServerConfig::default(),
            channels: ChannelConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The fixed subscription set, resubscribed on every (re)connect.
    pub fn subscriptions(&self) -> [&str; 2] {
        [&self.topics.mocap, &self.topics.telemetry]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.host.is_empty() {
            return Err(ConfigError::Invalid("broker.host must not be empty".into()));
        }
        if self.topics.qos > 2 {
            return Err(ConfigError::Invalid(format!(
                "topics.qos must be 0, 1 or 2 (got {})",
                self.topics.qos
            )));
        }
        for (name, topic) in [
            ("topics.mocap", &self.topics.mocap),
            ("topics.telemetry", &self.topics.telemetry),
            ("topics.command", &self.topics.command),
        ] {
            if topic.is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.server.max_clients == 0 {
            return Err(ConfigError::Invalid(
                "server.max_clients must be at least 1".into(),
            ));
        }
        if self.channels.ingest_capacity == 0 || self.channels.session_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel capacities must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.topics.mocap, "mocap/#");
        assert_eq!(config.topics.telemetry, "pololu01/tel");
        assert_eq!(config.topics.command, "pololu01/cmd");
        assert_eq!(config.topics.qos, 0);
        assert_eq!(config.broker.keepalive_secs, 60);
    }

    #[test]
    fn subscriptions_cover_mocap_and_telemetry() {
        let config = BridgeConfig::default();
        assert_eq!(config.subscriptions(), ["mocap/#", "pololu01/tel"]);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
log_level = "debug"

[broker]
host = "192.168.50.200"
port = 1880

[topics]
command = "pololu07/cmd"

[server]
port = 8080
"#
        )
        .expect("write");

        let config = BridgeConfig::from_file(file.path()).expect("load");
        assert_eq!(config.broker.host, "192.168.50.200");
        assert_eq!(config.broker.port, 1880);
        assert_eq!(config.topics.command, "pololu07/cmd");
        // Unspecified sections keep their defaults.
        assert_eq!(config.topics.mocap, "mocap/#");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_clients, 100);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_qos_is_rejected() {
        let config = BridgeConfig {
            topics: TopicsConfig {
                qos: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = BridgeConfig {
            channels: ChannelConfig {
                ingest_capacity: 0,
                session_capacity: 256,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
