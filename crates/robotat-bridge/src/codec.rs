// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Consumer-side packet decoding and display translation.
//!
//! [`decode`] never fails: anything that is not a JSON object degrades to a
//! `{"raw": <text>}` fallback instead of crashing the pipeline.
//! [`translate`] rewrites numeric codes to labels, formats the timestamp,
//! and abbreviates long checksums. It is a display transform only; the
//! result is never re-checksummed or republished.

use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::trace;

use crate::labels::{packet_id_label, packet_type_label, source_label};

/// Checksums longer than this are abbreviated for display.
const CHECKSUM_DISPLAY_MAX: usize = 12;

/// Parse a raw broker payload into a packet object.
///
/// Non-UTF8 bytes are replaced lossily; non-JSON (or JSON that is not an
/// object) becomes `{"raw": <text>}`.
pub fn decode(raw: &[u8]) -> Map<String, Value> {
    let text = String::from_utf8_lossy(raw);
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        _ => {
            trace!("payload is not a JSON object, passing through raw");
            let mut fallback = Map::new();
            fallback.insert("raw".to_string(), Value::String(text.into_owned()));
            fallback
        }
    }
}

/// Apply the display transform in place.
///
/// Codes without a label and fields that are absent stay untouched; an
/// unmapped `src` of 9999 remains the integer 9999.
pub fn translate(packet: &mut Map<String, Value>) {
    relabel(packet, "src", |code| source_label(code));
    relabel(packet, "ptp", |code| packet_type_label(code).map(String::from));
    relabel(packet, "pid", |code| packet_id_label(code).map(String::from));

    if let Some(pts) = packet.get("pts") {
        if let Some(formatted) = format_timestamp(pts) {
            packet.insert("pts".to_string(), Value::String(formatted));
        }
    }

    if let Some(Value::String(cks)) = packet.get("cks") {
        let short = truncate_checksum(cks);
        if short != *cks {
            packet.insert("cks".to_string(), Value::String(short));
        }
    }
}

/// Decode and translate in one step; the shape delivered to viewers.
pub fn decode_and_translate(raw: &[u8]) -> Value {
    let mut packet = decode(raw);
    translate(&mut packet);
    Value::Object(packet)
}

/// Abbreviate a long checksum to `first8…last4` for display.
///
/// Strings of 12 characters or fewer are returned unchanged. Operates on
/// characters, not bytes, so arbitrary strings cannot split a code point.
pub fn truncate_checksum(cks: &str) -> String {
    let chars: Vec<char> = cks.chars().collect();
    if chars.len() <= CHECKSUM_DISPLAY_MAX {
        return cks.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

fn relabel<F>(packet: &mut Map<String, Value>, field: &str, label: F)
where
    F: Fn(i64) -> Option<String>,
{
    let code = match packet.get(field).and_then(Value::as_i64) {
        Some(code) => code,
        None => return,
    };
    if let Some(text) = label(code) {
        packet.insert(field.to_string(), Value::String(text));
    }
}

/// Format a UNIX-seconds timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Numbers outside chrono's range and non-numeric values fall back to their
/// plain string rendering; strings are left as-is (`None` here means "do
/// not rewrite the field").
fn format_timestamp(pts: &Value) -> Option<String> {
    match pts {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            if !secs.is_finite() {
                return Some(n.to_string());
            }
            match DateTime::from_timestamp(secs.floor() as i64, 0) {
                Some(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => Some(n.to_string()),
            }
        }
        Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json_degrades_to_raw() {
        let packet = decode(b"{not json");
        assert_eq!(Value::Object(packet), json!({"raw": "{not json"}));
    }

    #[test]
    fn non_object_json_degrades_to_raw() {
        let packet = decode(b"[1,2,3]");
        assert_eq!(Value::Object(packet), json!({"raw": "[1,2,3]"}));
    }

    #[test]
    fn invalid_utf8_is_replaced_lossily() {
        let packet = decode(&[0xff, 0xfe, b'x']);
        let raw = packet["raw"].as_str().expect("raw string");
        assert!(raw.ends_with('x'));
    }

    #[test]
    fn translate_maps_known_codes() {
        let mut packet = object(json!({"src": 10, "ptp": 2, "pid": 0}));
        translate(&mut packet);
        assert_eq!(packet["src"], "POLOLU_00");
        assert_eq!(packet["ptp"], "MOCAP");
        assert_eq!(packet["pid"], "STATE");
    }

    #[test]
    fn unmapped_codes_pass_through() {
        let mut packet = object(json!({"src": 9999, "ptp": 7, "pid": 42}));
        translate(&mut packet);
        assert_eq!(packet["src"], json!(9999));
        assert_eq!(packet["ptp"], json!(7));
        assert_eq!(packet["pid"], json!(42));
    }

    #[test]
    fn timestamp_formats_as_utc() {
        let mut packet = object(json!({"pts": 1700000000}));
        translate(&mut packet);
        assert_eq!(packet["pts"], "2023-11-14 22:13:20");
    }

    #[test]
    fn fractional_timestamp_truncates_to_seconds() {
        let mut packet = object(json!({"pts": 1700000000.9}));
        translate(&mut packet);
        assert_eq!(packet["pts"], "2023-11-14 22:13:20");
    }

    #[test]
    fn non_numeric_timestamp_does_not_raise() {
        let mut packet = object(json!({"pts": "soon", "other": true}));
        translate(&mut packet);
        assert_eq!(packet["pts"], "soon");

        let mut packet = object(json!({"pts": null}));
        translate(&mut packet);
        assert_eq!(packet["pts"], "null");
    }

    #[test]
    fn missing_timestamp_stays_missing() {
        let mut packet = object(json!({"src": 10}));
        translate(&mut packet);
        assert!(!packet.contains_key("pts"));
    }

    #[test]
    fn long_checksum_is_abbreviated() {
        let cks = format!("abcdefgh{}1234", "x".repeat(52));
        assert_eq!(cks.len(), 64);
        assert_eq!(truncate_checksum(&cks), "abcdefgh…1234");
    }

    #[test]
    fn barely_long_checksum_is_abbreviated() {
        // 13 to 15 characters: longer than the display limit, but the
        // abbreviated form is not shorter in bytes than the original.
        assert_eq!(truncate_checksum("1234567890123"), "12345678…0123");

        let mut packet = object(json!({"cks": "123456789012345"}));
        translate(&mut packet);
        assert_eq!(packet["cks"], "12345678…2345");
    }

    #[test]
    fn short_checksum_is_unchanged() {
        assert_eq!(truncate_checksum("abc123"), "abc123");
        assert_eq!(truncate_checksum("123456789012"), "123456789012");
    }

    #[test]
    fn translate_abbreviates_checksum_field() {
        let digest = "a".repeat(64);
        let mut packet = object(json!({"cks": digest}));
        translate(&mut packet);
        assert_eq!(packet["cks"], "aaaaaaaa…aaaa");
    }

    #[test]
    fn field_order_is_preserved() {
        let packet = decode(br#"{"src":10,"ptp":2,"pid":0,"pts":1700000000,"cks":"x"}"#);
        let mut packet = packet;
        translate(&mut packet);
        let out = serde_json::to_string(&Value::Object(packet)).expect("serialize");
        assert_eq!(
            out,
            r#"{"src":"POLOLU_00","ptp":"MOCAP","pid":"STATE","pts":"2023-11-14 22:13:20","cks":"x"}"#
        );
    }
}
