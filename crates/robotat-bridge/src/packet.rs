// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Wire packet model and integrity checksum.
//!
//! A packet is checksummed over the canonical JSON form of every field
//! except `cks`, in the exact order the fields were constructed. Canonical
//! means compact separators and non-ASCII preserved, so producers and
//! consumers in any language agree byte-for-byte. Packets are immutable
//! once sealed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A Robotat wire packet.
///
/// Field declaration order is the canonical serialization order; the
/// checksum depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Source ID (see [`crate::labels::source_label`]).
    pub src: i64,
    /// UNIX timestamp, seconds (UTC).
    pub pts: f64,
    /// Packet type code.
    pub ptp: i64,
    /// Packet ID code.
    pub pid: i64,
    /// Payload size in bytes of the compact-JSON payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psb: Option<u64>,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pld: Option<Payload>,
    /// SHA-256 hex digest over all preceding fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cks: Option<String>,
}

/// Structured packet payload.
///
/// MOCAP packets carry a rigid-body pose; everything else is a free-form
/// key/value map. Untagged: the shape on the wire decides the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Pose(PosePayload),
    Map(serde_json::Map<String, Value>),
}

/// `{"pose": {...}}` wrapper used by MOCAP packets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosePayload {
    pub pose: Pose,
}

/// Rigid-body pose: position plus orientation quaternion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl Pose {
    pub fn new(position: [f64; 3], rotation: [f64; 4]) -> Self {
        Self {
            position: Position {
                x: position[0],
                y: position[1],
                z: position[2],
            },
            rotation: Rotation {
                qx: rotation[0],
                qy: rotation[1],
                qz: rotation[2],
                qw: rotation[3],
            },
        }
    }
}

impl Packet {
    /// Build an unsealed MOCAP packet for one rigid body.
    ///
    /// `psb` is the byte length of the compact-JSON payload, computed the
    /// same way any conforming producer computes it.
    pub fn mocap(src: i64, rigid_body_id: i64, pose: Pose, pts: f64) -> Result<Self, serde_json::Error> {
        let payload = Payload::Pose(PosePayload { pose });
        let psb = serde_json::to_string(&payload)?.len() as u64;
        Ok(Self {
            src,
            pts,
            ptp: crate::labels::PacketType::Mocap.code(),
            pid: rigid_body_id,
            psb: Some(psb),
            pld: Some(payload),
            cks: None,
        })
    }

    /// Canonical JSON form: compact separators, `cks` excluded.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        let unsealed = Self {
            cks: None,
            ..self.clone()
        };
        serde_json::to_string(&unsealed)
    }

    /// SHA-256 hex digest of the canonical JSON form.
    pub fn checksum(&self) -> Result<String, serde_json::Error> {
        Ok(sha256_hex(self.canonical_json()?.as_bytes()))
    }

    /// Compute and attach the checksum, consuming the unsealed packet.
    pub fn seal(mut self) -> Result<Self, serde_json::Error> {
        self.cks = Some(self.checksum()?);
        Ok(self)
    }

    /// Recompute the checksum and compare with the stored one.
    ///
    /// Detects mutation of any field other than `cks`. A packet without a
    /// checksum never verifies.
    pub fn verify(&self) -> Result<bool, serde_json::Error> {
        match &self.cks {
            Some(stored) => Ok(*stored == self.checksum()?),
            None => Ok(false),
        }
    }
}

/// Checksum of an arbitrary JSON packet object, `cks` key excluded.
///
/// Operates on the received value directly so the original field order and
/// number formatting survive re-serialization (an integer `pts` stays an
/// integer, which a round-trip through [`Packet`] would not preserve).
pub fn checksum_value(packet: &Value) -> Result<String, serde_json::Error> {
    let mut without_cks = packet.clone();
    if let Value::Object(map) = &mut without_cks {
        map.shift_remove("cks");
    }
    Ok(sha256_hex(serde_json::to_string(&without_cks)?.as_bytes()))
}

/// Verify the `cks` field of an arbitrary JSON packet object.
pub fn verify_value(packet: &Value) -> bool {
    let stored = match packet.get("cks").and_then(Value::as_str) {
        Some(s) => s,
        None => return false,
    };
    match checksum_value(packet) {
        Ok(computed) => computed == stored,
        Err(_) => false,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_packet() -> Packet {
        Packet::mocap(0, 7, Pose::new([1.5, -2.0, 0.25], [0.0, 0.0, 0.0, 1.0]), 1700000000.5)
            .expect("build packet")
    }

    #[test]
    fn canonical_form_is_compact_and_ordered() {
        let packet = sample_packet();
        let json = packet.canonical_json().expect("canonical");
        assert_eq!(
            json,
            "{\"src\":0,\"pts\":1700000000.5,\"ptp\":2,\"pid\":7,\"psb\":98,\
             \"pld\":{\"pose\":{\"position\":{\"x\":1.5,\"y\":-2.0,\"z\":0.25},\
             \"rotation\":{\"qx\":0.0,\"qy\":0.0,\"qz\":0.0,\"qw\":1.0}}}}"
        );
    }

    #[test]
    fn psb_matches_compact_payload_length() {
        let packet = sample_packet();
        let payload_json = serde_json::to_string(packet.pld.as_ref().expect("payload")).unwrap();
        assert_eq!(packet.psb, Some(payload_json.len() as u64));
    }

    #[test]
    fn checksum_round_trip() {
        let sealed = sample_packet().seal().expect("seal");
        assert!(sealed.cks.is_some());
        assert_eq!(sealed.cks.as_ref().map(String::len), Some(64));
        assert!(sealed.verify().expect("verify"));
    }

    #[test]
    fn unsealed_packet_never_verifies() {
        assert!(!sample_packet().verify().expect("verify"));
    }

    #[test]
    fn mutation_breaks_verification() {
        let mut sealed = sample_packet().seal().expect("seal");
        sealed.src = 1;
        assert!(!sealed.verify().expect("verify"));
    }

    #[test]
    fn checksum_excludes_cks_field() {
        let unsealed = sample_packet();
        let sealed = unsealed.clone().seal().expect("seal");
        assert_eq!(
            unsealed.checksum().expect("checksum"),
            sealed.checksum().expect("checksum")
        );
    }

    #[test]
    fn value_checksum_preserves_field_order() {
        // Same fields, different construction order: different digests.
        let a = json!({"src": 10, "pid": 0});
        let b = json!({"pid": 0, "src": 10});
        assert_ne!(
            checksum_value(&a).expect("checksum"),
            checksum_value(&b).expect("checksum")
        );
    }

    #[test]
    fn value_round_trip_with_integer_timestamp() {
        let mut packet = json!({"src": 10, "pts": 1700000000, "ptp": 2, "pid": 0});
        let digest = checksum_value(&packet).expect("checksum");
        packet["cks"] = Value::String(digest);
        assert!(verify_value(&packet));

        packet["pid"] = json!(1);
        assert!(!verify_value(&packet));
    }

    #[test]
    fn value_without_checksum_fails_verification() {
        assert!(!verify_value(&json!({"src": 10})));
    }

    #[test]
    fn wire_round_trip_parses_pose_payload() {
        let sealed = sample_packet().seal().expect("seal");
        let wire = serde_json::to_string(&sealed).expect("serialize");
        let parsed: Packet = serde_json::from_str(&wire).expect("parse");
        assert_eq!(parsed, sealed);
        match parsed.pld {
            Some(Payload::Pose(ref p)) => assert_eq!(p.pose.position.x, 1.5),
            other => panic!("expected pose payload, got {:?}", other),
        }
    }

    #[test]
    fn generic_map_payload_round_trips() {
        let wire = r#"{"src":10,"pts":1.0,"ptp":0,"pid":1,"pld":{"battery":87}}"#;
        let parsed: Packet = serde_json::from_str(wire).expect("parse");
        match parsed.pld {
            Some(Payload::Map(ref m)) => assert_eq!(m["battery"], json!(87)),
            other => panic!("expected map payload, got {:?}", other),
        }
    }
}
