// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Viewer-facing wire protocol.
//!
//! JSON-based, bidirectional. Inbound requests are tagged by `action`,
//! outbound messages by `type`. Serialization is compact (no extraneous
//! whitespace) and preserves construction order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Viewer → bridge requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Ask for the sorted set of topics seen so far.
    ListTopics,

    /// Republish a command packet onto the broker's command topic.
    SendCommand { packet: Value },
}

/// Bridge → viewer messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pushed for every decoded broker message.
    MqttMessage { topic: String, packet: Value },

    /// Reply to `list_topics`, sent to the requesting viewer only.
    TopicsList { topics: Vec<String> },

    /// Reply to `send_command`: the publish call itself succeeded. Says
    /// nothing about whether a device acted on it.
    CommandAck { ok: bool },

    /// Scoped error, sent to the requesting viewer only.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_list_topics() {
        let msg: ClientRequest = serde_json::from_str(r#"{"action": "list_topics"}"#)
            .expect("parse");
        assert!(matches!(msg, ClientRequest::ListTopics));
    }

    #[test]
    fn parse_send_command() {
        let msg: ClientRequest =
            serde_json::from_str(r#"{"action": "send_command", "packet": {"pid": 11}}"#)
                .expect("parse");
        match msg {
            ClientRequest::SendCommand { packet } => assert_eq!(packet["pid"], json!(11)),
            other => panic!("expected SendCommand, got {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let value: Value = serde_json::from_str(r#"{"action": "dance"}"#).expect("valid JSON");
        assert!(serde_json::from_value::<ClientRequest>(value).is_err());
    }

    #[test]
    fn serialize_mqtt_message() {
        let msg = ServerMessage::MqttMessage {
            topic: "pololu01/tel".into(),
            packet: json!({"src": "POLOLU_00"}),
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        assert_eq!(
            json,
            r#"{"type":"mqtt_message","topic":"pololu01/tel","packet":{"src":"POLOLU_00"}}"#
        );
    }

    #[test]
    fn serialize_topics_list() {
        let msg = ServerMessage::TopicsList {
            topics: vec!["b".into(), "mocap/1".into()],
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        assert_eq!(json, r#"{"type":"topics_list","topics":["b","mocap/1"]}"#);
    }

    #[test]
    fn serialize_command_ack_and_error() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::CommandAck { ok: true }).expect("serialize"),
            r#"{"type":"command_ack","ok":true}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::error("nope")).expect("serialize"),
            r#"{"type":"error","message":"nope"}"#
        );
    }
}
