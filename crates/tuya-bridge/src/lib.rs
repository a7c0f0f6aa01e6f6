//! Tuya datapoint bridge
//!
//! Maps the vendor datapoint protocol spoken by Tuya MCU devices onto
//! standard ZCL cluster attributes: inbound reports fan out into a
//! per-device attribute cache, outbound writes become sequenced
//! single-datapoint frames.

pub mod bridge;
pub mod cluster;
pub mod error;
pub mod mapping;
pub mod models;
pub mod timer;

pub use bridge::{DispatchOutcome, DpBridge, OutboundFrame, DEFAULT_ACK_TIMEOUT};
pub use cluster::{AttributeReport, AttributeValue, ClusterSet, OnOffCommand, ZclStatus};
pub use error::BridgeError;
pub use mapping::{AttributeMapping, AttributeTarget, MappingTable};
pub use models::{by_model, DeviceModel, MODELS};
pub use timer::ResetTimer;
