//! ZCL target-cluster cache and attribute reporting
//!
//! The bridge does not own real ZCL cluster implementations; it holds a
//! per-device cache of the standard attributes it is configured to update.
//! Writing an attribute updates the cache and fires a report toward any
//! subscriber in a single step.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Common ZCL cluster IDs the bridge writes into
pub mod id {
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const ON_OFF: u16 = 0x0006;

    pub const DOOR_LOCK: u16 = 0x0101;
    pub const WINDOW_COVERING: u16 = 0x0102;

    pub const THERMOSTAT: u16 = 0x0201;

    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    pub const HUMIDITY_MEASUREMENT: u16 = 0x0405;
    pub const OCCUPANCY_SENSING: u16 = 0x0406;

    pub const IAS_ZONE: u16 = 0x0500;

    pub const METERING: u16 = 0x0702;
    pub const ELECTRICAL_MEASUREMENT: u16 = 0x0B04;
}

/// Attribute names used by the mapping tables
pub mod attr {
    pub const ON_OFF: &str = "on_off";

    pub const BATTERY_PERCENTAGE_REMAINING: &str = "battery_percentage_remaining";

    pub const LOCAL_TEMPERATURE: &str = "local_temperature";
    pub const OCCUPIED_HEATING_SETPOINT: &str = "occupied_heating_setpoint";
    pub const SYSTEM_MODE: &str = "system_mode";
    pub const FROST_LOCK: &str = "frost_lock";

    pub const MEASURED_TEMPERATURE: &str = "measured_value";

    pub const CURRENT_POSITION_LIFT_PERCENTAGE: &str = "current_position_lift_percentage";
    pub const MOTOR_REVERSAL: &str = "motor_reversal";

    pub const OCCUPANCY: &str = "occupancy";
    pub const ZONE_STATUS: &str = "zone_status";

    pub const RMS_VOLTAGE: &str = "rms_voltage";
    pub const RMS_CURRENT: &str = "rms_current";
    pub const ACTIVE_POWER: &str = "active_power";
    pub const APPARENT_POWER: &str = "apparent_power";
    pub const POWER_FACTOR: &str = "power_factor";

    pub const CURRENT_SUMM_DELIVERED: &str = "current_summ_delivered";
    pub const INSTANTANEOUS_DEMAND: &str = "instantaneous_demand";

    pub const VALVE_LOCK: &str = "valve_lock";
}

/// On/Off cluster commands the bridge services via its mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OnOffCommand {
    Off = 0x00,
    On = 0x01,
    Toggle = 0x02,
}

/// ZCL command status codes surfaced by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ZclStatus {
    Success = 0x00,
    Failure = 0x01,
    UnsupportedClusterCommand = 0x81,
    InvalidValue = 0x87,
    UnsupportedAttribute = 0x86,
    Timeout = 0x94,
}

/// A standard attribute value after conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view, if this value has one
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::Bool(b) => Some(i64::from(*b)),
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(_) => None,
        }
    }
}

/// Notification fired whenever the bridge writes a target attribute
#[derive(Debug, Clone, Serialize)]
pub struct AttributeReport {
    pub cluster_id: u16,
    pub attribute: &'static str,
    pub value: AttributeValue,
}

struct ClusterSetInner {
    cluster_ids: Vec<u16>,
    attributes: DashMap<(u16, &'static str), AttributeValue>,
    report_tx: broadcast::Sender<AttributeReport>,
}

/// Per-device set of target clusters
///
/// Built once at bridge construction from the mapping table's target
/// clusters; the set of clusters never changes afterwards.
#[derive(Clone)]
pub struct ClusterSet {
    inner: Arc<ClusterSetInner>,
}

impl ClusterSet {
    #[must_use]
    pub fn new(cluster_ids: Vec<u16>) -> Self {
        let (report_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ClusterSetInner {
                cluster_ids,
                attributes: DashMap::new(),
                report_tx,
            }),
        }
    }

    /// Check whether a cluster id belongs to this device
    #[must_use]
    pub fn has_cluster(&self, cluster_id: u16) -> bool {
        self.inner.cluster_ids.contains(&cluster_id)
    }

    /// Update the attribute cache and fire a report
    ///
    /// This is the single primitive through which the bridge's effects
    /// become externally visible.
    pub fn write_attribute(&self, cluster_id: u16, attribute: &'static str, value: AttributeValue) {
        tracing::debug!(
            "Attribute update: cluster={:#06X} {}={:?}",
            cluster_id,
            attribute,
            value
        );
        self.inner
            .attributes
            .insert((cluster_id, attribute), value.clone());
        let _ = self.inner.report_tx.send(AttributeReport {
            cluster_id,
            attribute,
            value,
        });
    }

    /// Read the cached value of an attribute
    #[must_use]
    pub fn read_attribute(&self, cluster_id: u16, attribute: &'static str) -> Option<AttributeValue> {
        self.inner
            .attributes
            .get(&(cluster_id, attribute))
            .map(|r| r.value().clone())
    }

    /// Subscribe to attribute reports
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AttributeReport> {
        self.inner.report_tx.subscribe()
    }
}
