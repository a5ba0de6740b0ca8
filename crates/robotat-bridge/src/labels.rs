// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Numeric code to human-readable label mappings.
//!
//! The wire packets carry numeric `src`/`ptp`/`pid` codes; viewers see the
//! labels. Codes outside the known ranges have no label and pass through the
//! display transform unchanged.
//!
//! The consumer-side `pid` map (10-14) and the producer-side command
//! enumeration (100-108) use different numeric schemes. Both are kept as-is;
//! they belong to two independently evolving ends of the wire contract.

/// Source IDs of the two fixed infrastructure nodes.
pub const SOURCE_ROBOTAT_SERVER: i64 = 0;
pub const SOURCE_USER_PC: i64 = 1;

/// Label for a packet source ID.
///
/// Fleet ranges are offset-encoded: 10-42 Pololu, 50-70 Crazyflie,
/// 80-100 MaxArm.
pub fn source_label(code: i64) -> Option<String> {
    match code {
        SOURCE_ROBOTAT_SERVER => Some("ROBOTAT_SERVER".to_string()),
        SOURCE_USER_PC => Some("USER_PC".to_string()),
        10..=42 => Some(format!("POLOLU_{:02}", code - 10)),
        50..=70 => Some(format!("CRAZYFLIE_{:02}", code - 50)),
        80..=100 => Some(format!("MAXARM_{:02}", code - 80)),
        _ => None,
    }
}

/// Label for a packet type code.
pub fn packet_type_label(code: i64) -> Option<&'static str> {
    match code {
        0 => Some("DATA"),
        1 => Some("COMMAND"),
        2 => Some("MOCAP"),
        _ => None,
    }
}

/// Label for a packet ID code (consumer-side display map).
pub fn packet_id_label(code: i64) -> Option<&'static str> {
    match code {
        0 => Some("STATE"),
        1 => Some("SENSOR"),
        2 => Some("MESSAGE"),
        10 => Some("FORCE_STOP"),
        11 => Some("FORWARD"),
        12 => Some("BACKWARD"),
        13 => Some("LEFT"),
        14 => Some("RIGHT"),
        _ => None,
    }
}

/// Packet type (`ptp` field) as constructed by producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum PacketType {
    Data = 0,
    Command = 1,
    Mocap = 2,
}

impl PacketType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Producer-side command IDs (`pid` field of COMMAND packets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum CommandId {
    ForceStop = 100,
    FwdPress = 101,
    FwdRelease = 102,
    BwdPress = 103,
    BwdRelease = 104,
    LftPress = 105,
    LftRelease = 106,
    RgtPress = 107,
    RgtRelease = 108,
}

impl CommandId {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Producer-side data IDs (`pid` field of DATA packets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum DataId {
    State = 0,
    Sensor = 1,
    Message = 2,
}

impl DataId {
    pub fn code(self) -> i64 {
        self as i64
    }
}
