// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Broadcast hub: one inbound packet, N viewer copies.
//!
//! Each joined session owns a bounded outbound queue; delivery uses
//! `try_send` so one slow viewer can never stall the broadcast. A session
//! whose queue is full is dropped from membership instead. Decoding and
//! translation happen once per broker message, not once per viewer.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, InboundMessage};
use crate::codec;
use crate::protocol::{ClientRequest, ServerMessage};
use crate::topics::TopicRegistry;
use std::sync::Arc;

/// Fan-out hub shared by the broker ingest loop and all viewer sessions.
pub struct BroadcastHub {
    sessions: DashMap<String, mpsc::Sender<ServerMessage>>,
    topics: Arc<TopicRegistry>,
    broker: Arc<BrokerClient>,
    session_capacity: usize,
}

impl BroadcastHub {
    pub fn new(
        topics: Arc<TopicRegistry>,
        broker: Arc<BrokerClient>,
        session_capacity: usize,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            topics,
            broker,
            session_capacity,
        }
    }

    /// Add a session to the membership set and hand back its outbound queue.
    pub fn join(&self, session_id: &str) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.session_capacity);
        self.sessions.insert(session_id.to_string(), tx);
        debug!("[{}] joined hub ({} sessions)", session_id, self.sessions.len());
        rx
    }

    /// Remove a session. Idempotent; called from every disconnect path.
    pub fn leave(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            debug!(
                "[{}] left hub ({} sessions)",
                session_id,
                self.sessions.len()
            );
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Deliver a decoded packet to every joined session.
    ///
    /// A session that cannot keep up (queue full) or is already gone is
    /// dropped from membership; the remaining deliveries are unaffected.
    pub fn publish(&self, topic: &str, packet: Value) {
        let message = ServerMessage::MqttMessage {
            topic: topic.to_string(),
            packet,
        };

        let mut stalled = Vec::new();
        for entry in self.sessions.iter() {
            match entry.value().try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("[{}] viewer cannot keep up, dropping session", entry.key());
                    stalled.push(entry.key().clone());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stalled.push(entry.key().clone());
                }
            }
        }
        // Removal happens outside the iteration; removing a shard entry
        // while holding its iterator guard would deadlock.
        for session_id in stalled {
            self.leave(&session_id);
        }
    }

    /// Dispatch one inbound viewer request.
    ///
    /// Replies (topic lists, acks, errors) go to the requesting session
    /// only. Unknown actions are logged and ignored; malformed JSON is
    /// logged and dropped.
    pub async fn handle_request(&self, session_id: &str, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("[{}] malformed viewer request, dropping: {}", session_id, e);
                return;
            }
        };

        let request: ClientRequest = match serde_json::from_value(value.clone()) {
            Ok(request) => request,
            Err(_) => {
                info!("[{}] unknown viewer action ignored: {}", session_id, value);
                return;
            }
        };

        match request {
            ClientRequest::ListTopics => {
                let topics = self.topics.snapshot();
                self.reply(session_id, ServerMessage::TopicsList { topics })
                    .await;
            }
            ClientRequest::SendCommand { packet } => {
                self.dispatch_command(session_id, &packet).await;
            }
        }
    }

    async fn dispatch_command(&self, session_id: &str, packet: &Value) {
        if !packet.is_object() || packet.get("pid").is_none() {
            self.reply(
                session_id,
                ServerMessage::error("invalid command packet: expected an object with a 'pid' field"),
            )
            .await;
            return;
        }

        // The ack reflects the publish call only, not device behavior.
        let reply = match self.broker.publish_command(packet) {
            Ok(()) => ServerMessage::CommandAck { ok: true },
            Err(e) => ServerMessage::error(format!("command publish failed: {e}")),
        };
        self.reply(session_id, reply).await;
    }

    async fn reply(&self, session_id: &str, message: ServerMessage) {
        let tx = match self.sessions.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => return,
        };
        if tx.send(message).await.is_err() {
            self.leave(session_id);
        }
    }

    /// Consume the broker ingest channel: decode and translate once, then
    /// fan out. Runs until the broker supervisor drops its sender.
    pub fn run(self: &Arc<Self>, mut ingest_rx: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = ingest_rx.recv().await {
                let packet = codec::decode_and_translate(&message.payload);
                hub.publish(&message.topic, packet);
            }
            debug!("ingest channel closed, fan-out loop exiting");
        })
    }
}
