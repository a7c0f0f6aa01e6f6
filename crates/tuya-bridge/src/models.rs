//! Per-device-model mapping tables
//!
//! Each misbehaving device family gets one static table enumerating its
//! datapoints: id, authoritative type, fan-out targets, and converters.
//! Tables are data, built into a [`crate::mapping::MappingTable`] once at
//! bridge construction and never mutated.

use crate::cluster::{attr, id, AttributeValue, ClusterSet};
use crate::mapping::{
    AttributeMapping, AttributeTarget, InboundConverter, OutboundConverter, RawSlice,
};
use tuya_protocol::{DpType, TypedValue};

/// Synthetic clear written when a reset timer expires
pub struct AutoClearSpec {
    pub dp_id: u8,
    pub seconds: u64,
    pub target: AttributeTarget,
    pub clear_value: AttributeValue,
}

/// Static descriptor for one device model
pub struct DeviceModel {
    pub model: &'static str,
    pub mappings: &'static [AttributeMapping],
    pub auto_clear: &'static [AutoClearSpec],
}

const fn target(cluster_id: u16, attribute: &'static str) -> AttributeTarget {
    AttributeTarget {
        cluster_id,
        attribute,
    }
}

// ---------------------------------------------------------------------------
// TS0601 thermostat (Moes/Saswell family)
//
// Reports temperature in decidegrees and the heating setpoint in whole
// degrees; the ZCL thermostat cluster wants centidegrees for both. The
// frost lock datapoint is inverted on the wire (1 = unlocked).
// ---------------------------------------------------------------------------

static THERMOSTAT_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        dp_id: 0x01,
        dp_type: DpType::Bool,
        targets: &[target(id::ON_OFF, attr::ON_OFF)],
        inbound: InboundConverter::Identity,
        outbound: Some(OutboundConverter::Identity),
    },
    AttributeMapping {
        dp_id: 0x02,
        dp_type: DpType::Enum,
        targets: &[target(id::THERMOSTAT, attr::SYSTEM_MODE)],
        inbound: InboundConverter::Numeric,
        outbound: Some(OutboundConverter::Identity),
    },
    AttributeMapping {
        dp_id: 0x10,
        dp_type: DpType::Value,
        // Device speaks whole degrees; ZCL wants centidegrees
        targets: &[target(id::THERMOSTAT, attr::OCCUPIED_HEATING_SETPOINT)],
        inbound: InboundConverter::Scale { mul: 100, div: 1 },
        outbound: Some(OutboundConverter::Scale { mul: 1, div: 100 }),
    },
    AttributeMapping {
        dp_id: 0x69,
        dp_type: DpType::Value,
        // Decidegrees on the wire
        targets: &[target(id::THERMOSTAT, attr::LOCAL_TEMPERATURE)],
        inbound: InboundConverter::Scale { mul: 10, div: 1 },
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x6C,
        dp_type: DpType::Bool,
        // Frost lock state is inverted on the wire
        targets: &[target(id::THERMOSTAT, attr::FROST_LOCK)],
        inbound: InboundConverter::BoolInvert,
        outbound: Some(OutboundConverter::BoolInvert),
    },
];

pub static TS0601_THERMOSTAT: DeviceModel = DeviceModel {
    model: "ts0601_thermostat",
    mappings: THERMOSTAT_MAPPINGS,
    auto_clear: &[],
};

// ---------------------------------------------------------------------------
// TS0601 DIN rail energy meter
//
// The combined phase datapoint packs voltage(2, 0.1 V) | current(3, mA) |
// power(3, W) big-endian into one 8-byte RAW payload. Voltage and current
// also arrive as independent VALUE datapoints on some firmware revisions;
// the current report derives apparent power and power factor from the
// most recently cached voltage and active power.
// ---------------------------------------------------------------------------

static PHASE_SLICES: &[RawSlice] = &[
    // rms_voltage: bytes 0..2, decivolts
    RawSlice { offset: 0, len: 2, mul: 1, div: 10 },
    // rms_current: bytes 2..5, 24-bit BE, milliamps
    RawSlice { offset: 2, len: 3, mul: 1, div: 1 },
    // active_power: bytes 5..8, 24-bit BE, watts
    RawSlice { offset: 5, len: 3, mul: 1, div: 1 },
];

/// Current report plus derived apparent power / power factor
///
/// Reads the cached `rms_voltage` (volts) and `active_power` (watts);
/// until a voltage report has been cached only the current is produced.
fn current_and_derived(value: &TypedValue, clusters: &ClusterSet) -> Vec<AttributeValue> {
    let TypedValue::Value(milliamps) = value else {
        return Vec::new();
    };
    let milliamps = i64::from(*milliamps);
    let mut out = vec![AttributeValue::Number(milliamps)];

    let Some(volts) = clusters
        .read_attribute(id::ELECTRICAL_MEASUREMENT, attr::RMS_VOLTAGE)
        .and_then(|v| v.as_number())
    else {
        return out;
    };

    let apparent = volts * milliamps / 1000; // VA
    out.push(AttributeValue::Number(apparent));

    if apparent > 0 {
        if let Some(active) = clusters
            .read_attribute(id::ELECTRICAL_MEASUREMENT, attr::ACTIVE_POWER)
            .and_then(|v| v.as_number())
        {
            out.push(AttributeValue::Number((active * 100 / apparent).clamp(0, 100)));
        }
    }

    out
}

static DIN_METER_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        dp_id: 0x01,
        dp_type: DpType::Value,
        // Total energy in 10 Wh units
        targets: &[target(id::METERING, attr::CURRENT_SUMM_DELIVERED)],
        inbound: InboundConverter::Scale { mul: 1, div: 100 },
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x06,
        dp_type: DpType::Raw,
        targets: &[
            target(id::ELECTRICAL_MEASUREMENT, attr::RMS_VOLTAGE),
            target(id::ELECTRICAL_MEASUREMENT, attr::RMS_CURRENT),
            target(id::ELECTRICAL_MEASUREMENT, attr::ACTIVE_POWER),
        ],
        inbound: InboundConverter::Slices(PHASE_SLICES),
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x12,
        dp_type: DpType::Value,
        targets: &[
            target(id::ELECTRICAL_MEASUREMENT, attr::RMS_CURRENT),
            target(id::ELECTRICAL_MEASUREMENT, attr::APPARENT_POWER),
            target(id::ELECTRICAL_MEASUREMENT, attr::POWER_FACTOR),
        ],
        inbound: InboundConverter::Derived(current_and_derived),
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x13,
        dp_type: DpType::Value,
        // This family reports power in 0.1 W
        targets: &[target(id::ELECTRICAL_MEASUREMENT, attr::ACTIVE_POWER)],
        inbound: InboundConverter::Scale { mul: 1, div: 10 },
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x14,
        dp_type: DpType::Value,
        targets: &[target(id::ELECTRICAL_MEASUREMENT, attr::RMS_VOLTAGE)],
        inbound: InboundConverter::Scale { mul: 1, div: 10 },
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x15,
        dp_type: DpType::Value,
        // Instantaneous demand in mW on this family
        targets: &[target(id::METERING, attr::INSTANTANEOUS_DEMAND)],
        inbound: InboundConverter::Scale { mul: 1, div: 1000 },
        outbound: None,
    },
];

pub static TS0601_DIN_METER: DeviceModel = DeviceModel {
    model: "ts0601_din_meter",
    mappings: DIN_METER_MAPPINGS,
    auto_clear: &[],
};

// ---------------------------------------------------------------------------
// TS0601 curtain motor
//
// Position is inverted relative to ZCL window covering: the device calls
// 0 fully open, ZCL calls 100 fully open.
// ---------------------------------------------------------------------------

static COVER_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        dp_id: 0x02,
        dp_type: DpType::Value,
        targets: &[target(id::WINDOW_COVERING, attr::CURRENT_POSITION_LIFT_PERCENTAGE)],
        inbound: InboundConverter::PercentInvert,
        outbound: Some(OutboundConverter::PercentInvert),
    },
    AttributeMapping {
        dp_id: 0x05,
        dp_type: DpType::Bool,
        targets: &[target(id::WINDOW_COVERING, attr::MOTOR_REVERSAL)],
        inbound: InboundConverter::Identity,
        outbound: Some(OutboundConverter::Identity),
    },
];

pub static TS0601_COVER: DeviceModel = DeviceModel {
    model: "ts0601_cover",
    mappings: COVER_MAPPINGS,
    auto_clear: &[],
};

// ---------------------------------------------------------------------------
// TS0601 motion sensor
//
// Reports motion start only; the cleared state is synthesized after 60 s
// of quiet. One datapoint fans out to occupancy sensing and the IAS zone
// status (bit 0, alarm1).
// ---------------------------------------------------------------------------

fn motion_fanout(value: &TypedValue, _clusters: &ClusterSet) -> Vec<AttributeValue> {
    let TypedValue::Bool(moving) = value else {
        return Vec::new();
    };
    let bit = i64::from(*moving);
    vec![AttributeValue::Number(bit), AttributeValue::Number(bit)]
}

static MOTION_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        dp_id: 0x01,
        dp_type: DpType::Bool,
        targets: &[
            target(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
            target(id::IAS_ZONE, attr::ZONE_STATUS),
        ],
        inbound: InboundConverter::Derived(motion_fanout),
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x04,
        dp_type: DpType::Value,
        // ZCL battery remaining is in half-percent units
        targets: &[target(id::POWER_CONFIG, attr::BATTERY_PERCENTAGE_REMAINING)],
        inbound: InboundConverter::Scale { mul: 2, div: 1 },
        outbound: None,
    },
];

pub static TS0601_MOTION: DeviceModel = DeviceModel {
    model: "ts0601_motion",
    mappings: MOTION_MAPPINGS,
    auto_clear: &[AutoClearSpec {
        dp_id: 0x01,
        seconds: 60,
        target: target(id::OCCUPANCY_SENSING, attr::OCCUPANCY),
        clear_value: AttributeValue::Number(0),
    }],
};

// ---------------------------------------------------------------------------
// TS0601 water valve
//
// The child-lock style valve lock engages on report and is never reported
// as released; it auto-clears after ten minutes.
// ---------------------------------------------------------------------------

static VALVE_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        dp_id: 0x01,
        dp_type: DpType::Bool,
        targets: &[target(id::ON_OFF, attr::ON_OFF)],
        inbound: InboundConverter::Identity,
        outbound: Some(OutboundConverter::Identity),
    },
    AttributeMapping {
        dp_id: 0x05,
        dp_type: DpType::Value,
        // Water consumed, liters
        targets: &[target(id::METERING, attr::CURRENT_SUMM_DELIVERED)],
        inbound: InboundConverter::Numeric,
        outbound: None,
    },
    AttributeMapping {
        dp_id: 0x0D,
        dp_type: DpType::Bool,
        targets: &[target(id::DOOR_LOCK, attr::VALVE_LOCK)],
        inbound: InboundConverter::Identity,
        outbound: None,
    },
];

pub static TS0601_VALVE: DeviceModel = DeviceModel {
    model: "ts0601_valve",
    mappings: VALVE_MAPPINGS,
    auto_clear: &[AutoClearSpec {
        dp_id: 0x0D,
        seconds: 600,
        target: target(id::DOOR_LOCK, attr::VALVE_LOCK),
        clear_value: AttributeValue::Bool(false),
    }],
};

/// All known device models
pub static MODELS: &[&DeviceModel] = &[
    &TS0601_THERMOSTAT,
    &TS0601_DIN_METER,
    &TS0601_COVER,
    &TS0601_MOTION,
    &TS0601_VALVE,
];

/// Look up a device model by its model string
#[must_use]
pub fn by_model(model: &str) -> Option<&'static DeviceModel> {
    MODELS.iter().find(|m| m.model == model).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingTable;

    #[test]
    fn test_registry_lookup() {
        assert!(by_model("ts0601_thermostat").is_some());
        assert!(by_model("ts0601_din_meter").is_some());
        assert!(by_model("unknown_device").is_none());
    }

    #[test]
    fn test_meter_cluster_ids() {
        let table = MappingTable::new(TS0601_DIN_METER.mappings);
        let ids = table.cluster_ids();
        assert!(ids.contains(&id::METERING));
        assert!(ids.contains(&id::ELECTRICAL_MEASUREMENT));
    }

    #[test]
    fn test_auto_clear_dps_are_mapped() {
        for model in MODELS {
            let table = MappingTable::new(model.mappings);
            for spec in model.auto_clear {
                assert!(
                    table.by_dp(spec.dp_id).is_some(),
                    "{}: auto-clear dp {:#04X} has no mapping",
                    model.model,
                    spec.dp_id
                );
            }
        }
    }

    #[test]
    fn test_fanout_targets_match_converter_arity() {
        // Slice converters must produce one value per declared target
        for model in MODELS {
            for mapping in model.mappings {
                if let InboundConverter::Slices(slices) = mapping.inbound {
                    assert_eq!(
                        slices.len(),
                        mapping.targets.len(),
                        "{}: dp {:#04X}",
                        model.model,
                        mapping.dp_id
                    );
                }
            }
        }
    }
}
