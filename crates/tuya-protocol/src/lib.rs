//! Tuya MCU datapoint protocol
//!
//! This crate implements the vendor-specific datapoint sub-protocol that
//! Tuya devices tunnel inside a manufacturer ZCL cluster command
//! (cluster `0xEF00`).

pub mod frame;
pub mod types;
pub mod value;

pub use frame::{decode_datapoints, DatapointRecord, TuyaFrame, ZclFrame};
pub use types::{DpType, ProtocolError, TuyaCommand, TUYA_LEGACY_CLUSTER, TUYA_MCU_CLUSTER};
pub use value::TypedValue;
