// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Robotat Telemetry Bridge
//!
//! Maintains a persistent subscription to the lab's MQTT broker (motion
//! capture + robot telemetry), decodes and normalizes the packets, and fans
//! them out to any number of concurrently connected WebSocket viewers.
//! Viewers can also submit command packets which are republished onto the
//! broker.
//!
//! # Data flow
//!
//! ```text
//! broker -> BrokerClient -> codec::decode + translate -> BroadcastHub
//!                                                          |-> viewer A
//!                                                          |-> viewer B
//! viewer -> send_command -> BroadcastHub -> BrokerClient::publish_command -> broker
//! ```
//!
//! # Quick Start
//!
//! ```bash
//! # Bridge the default lab topics on port 9090
//! robotat-bridge --broker-host 192.168.50.200 --broker-port 1880
//!
//! # Using a config file
//! robotat-bridge --config bridge.toml
//! ```
//!
//! # Viewer protocol
//!
//! Messages are JSON-encoded:
//!
//! ```json
//! // Ask for the set of topics seen so far
//! {"action": "list_topics"}
//!
//! // Republish a command packet onto the broker
//! {"action": "send_command", "packet": {"pid": 11}}
//!
//! // Pushed on every broker message
//! {"type": "mqtt_message", "topic": "pololu01/tel", "packet": {...}}
//! ```

pub mod broker;
pub mod codec;
pub mod config;
pub mod hub;
pub mod labels;
pub mod packet;
pub mod protocol;
pub mod server;
pub mod session;
pub mod topics;

pub use broker::{BrokerClient, BrokerError, BrokerSupervisor, ConnectionState, InboundMessage};
pub use codec::{decode, decode_and_translate, translate, truncate_checksum};
pub use config::{BridgeConfig, ConfigError};
pub use hub::BroadcastHub;
pub use packet::{checksum_value, verify_value, Packet, Payload, Pose, PosePayload};
pub use protocol::{ClientRequest, ServerMessage};
pub use topics::TopicRegistry;
