//! Common types used throughout the protocol

use thiserror::Error;

/// Manufacturer-specific cluster id used by Tuya MCU devices
pub const TUYA_MCU_CLUSTER: u16 = 0xEF00;

/// Legacy manufacturer cluster id used by older Tuya devices
/// (Basic-cluster based variant)
pub const TUYA_LEGACY_CLUSTER: u16 = 0x0000;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    #[error("Bad payload length for {dp_type:?}: expected {expected}, got {actual}")]
    PayloadLength {
        dp_type: DpType,
        expected: usize,
        actual: usize,
    },

    #[error("Non-ASCII byte {0:#04X} in string datapoint")]
    NonAscii(u8),

    #[error("Unknown command ID: {0:#04X}")]
    UnknownCommand(u8),
}

/// Datapoint types carried on the wire
///
/// The ordinal is the `dp_type` byte of a datapoint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DpType {
    Raw = 0x00,
    Bool = 0x01,
    Value = 0x02,
    String = 0x03,
    Enum = 0x04,
    Bitmap = 0x05,
}

impl DpType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(DpType::Raw),
            0x01 => Some(DpType::Bool),
            0x02 => Some(DpType::Value),
            0x03 => Some(DpType::String),
            0x04 => Some(DpType::Enum),
            0x05 => Some(DpType::Bitmap),
            _ => None,
        }
    }
}

/// Command IDs of the Tuya MCU cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TuyaCommand {
    /// Set data request (coordinator -> device)
    SetData = 0x00,
    /// Reply to a set data request (device -> coordinator)
    DataResponse = 0x01,
    /// Spontaneous datapoint report (device -> coordinator)
    DataReport = 0x02,
    /// Query all datapoints
    QueryData = 0x03,
    /// Request MCU firmware version
    McuVersionRequest = 0x10,
    /// MCU firmware version reply
    McuVersionResponse = 0x11,
    /// Time synchronization request from the MCU
    SetTime = 0x24,
}

impl TuyaCommand {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(TuyaCommand::SetData),
            0x01 => Some(TuyaCommand::DataResponse),
            0x02 => Some(TuyaCommand::DataReport),
            0x03 => Some(TuyaCommand::QueryData),
            0x10 => Some(TuyaCommand::McuVersionRequest),
            0x11 => Some(TuyaCommand::McuVersionResponse),
            0x24 => Some(TuyaCommand::SetTime),
            _ => None,
        }
    }

    /// Commands whose payload is a datapoint list
    #[must_use]
    pub fn carries_datapoints(self) -> bool {
        matches!(
            self,
            TuyaCommand::SetData | TuyaCommand::DataResponse | TuyaCommand::DataReport
        )
    }
}
