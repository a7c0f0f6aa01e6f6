//! Static datapoint-to-attribute mapping tables and converters
//!
//! One [`AttributeMapping`] per datapoint id, declared in a static table
//! per device model. The table is the authority on a datapoint's type:
//! devices are not always internally consistent, so the dp_type embedded
//! in a wire record is ignored in favor of the declared one.

use crate::cluster::{AttributeValue, ClusterSet};
use crate::error::BridgeError;
use std::collections::HashMap;
use tuya_protocol::{DpType, TypedValue};

/// One target of a mapping's fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTarget {
    pub cluster_id: u16,
    pub attribute: &'static str,
}

/// A fixed sub-range of a RAW payload, read as a big-endian integer
/// and scaled
#[derive(Debug, Clone, Copy)]
pub struct RawSlice {
    pub offset: usize,
    pub len: usize,
    pub mul: i64,
    pub div: i64,
}

/// Derived computation with access to previously cached attribute values
pub type DerivedFn = fn(&TypedValue, &ClusterSet) -> Vec<AttributeValue>;

/// Converts a decoded datapoint value into attribute values
#[derive(Clone, Copy)]
pub enum InboundConverter {
    /// Pass the value through with its natural attribute shape
    Identity,
    /// Coerce bool/enum/value to a plain number
    Numeric,
    /// Numeric value scaled by `mul / div`
    Scale { mul: i64, div: i64 },
    /// Boolean inversion (devices with inverted lock/state semantics)
    BoolInvert,
    /// `100 - x` (cover-position semantics)
    PercentInvert,
    /// Fan a RAW payload out into one value per slice, in slice order
    Slices(&'static [RawSlice]),
    /// Computation over this datapoint plus cached attribute state
    Derived(DerivedFn),
}

impl std::fmt::Debug for InboundConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InboundConverter::Identity => write!(f, "Identity"),
            InboundConverter::Numeric => write!(f, "Numeric"),
            InboundConverter::Scale { mul, div } => write!(f, "Scale({mul}/{div})"),
            InboundConverter::BoolInvert => write!(f, "BoolInvert"),
            InboundConverter::PercentInvert => write!(f, "PercentInvert"),
            InboundConverter::Slices(s) => write!(f, "Slices(x{})", s.len()),
            InboundConverter::Derived(_) => write!(f, "Derived"),
        }
    }
}

/// Numeric view of a typed value; RAW/BITMAP fold big-endian
fn numeric(value: &TypedValue) -> Option<i64> {
    match value {
        TypedValue::Bool(b) => Some(i64::from(*b)),
        TypedValue::Value(v) => Some(i64::from(*v)),
        TypedValue::Enum(e) => Some(i64::from(*e)),
        TypedValue::Raw(bytes) | TypedValue::Bitmap(bytes) if bytes.len() <= 8 => {
            Some(bytes.iter().fold(0i64, |acc, &b| (acc << 8) | i64::from(b)))
        }
        _ => None,
    }
}

/// Big-endian integer from a sub-range of a RAW payload
fn slice_value(bytes: &[u8], slice: &RawSlice) -> Result<i64, BridgeError> {
    let end = slice.offset + slice.len;
    if end > bytes.len() || slice.len > 8 {
        return Err(BridgeError::SliceOutOfRange {
            offset: slice.offset,
            len: slice.len,
            available: bytes.len(),
        });
    }
    let raw = bytes[slice.offset..end]
        .iter()
        .fold(0i64, |acc, &b| (acc << 8) | i64::from(b));
    Ok(raw * slice.mul / slice.div)
}

impl InboundConverter {
    /// Produce one attribute value per fan-out target, in declared order
    pub fn apply(
        &self,
        value: &TypedValue,
        clusters: &ClusterSet,
    ) -> Result<Vec<AttributeValue>, BridgeError> {
        match self {
            InboundConverter::Identity => Ok(vec![match value {
                TypedValue::Bool(b) => AttributeValue::Bool(*b),
                TypedValue::Text(s) => AttributeValue::Text(s.clone()),
                other => AttributeValue::Number(numeric(other).ok_or_else(|| {
                    BridgeError::Convert(format!("no identity form for {other:?}"))
                })?),
            }]),
            InboundConverter::Numeric => {
                let n = numeric(value)
                    .ok_or_else(|| BridgeError::Convert(format!("not numeric: {value:?}")))?;
                Ok(vec![AttributeValue::Number(n)])
            }
            InboundConverter::Scale { mul, div } => {
                let n = numeric(value)
                    .ok_or_else(|| BridgeError::Convert(format!("not numeric: {value:?}")))?;
                Ok(vec![AttributeValue::Number(n * mul / div)])
            }
            InboundConverter::BoolInvert => match value {
                TypedValue::Bool(b) => Ok(vec![AttributeValue::Bool(!b)]),
                other => Err(BridgeError::Convert(format!("expected bool, got {other:?}"))),
            },
            InboundConverter::PercentInvert => {
                let n = numeric(value)
                    .ok_or_else(|| BridgeError::Convert(format!("not numeric: {value:?}")))?;
                Ok(vec![AttributeValue::Number(100 - n)])
            }
            InboundConverter::Slices(slices) => {
                let bytes = match value {
                    TypedValue::Raw(b) | TypedValue::Bitmap(b) => b,
                    other => {
                        return Err(BridgeError::Convert(format!(
                            "slice converter on non-raw value {other:?}"
                        )))
                    }
                };
                slices
                    .iter()
                    .map(|s| slice_value(bytes, s).map(AttributeValue::Number))
                    .collect()
            }
            InboundConverter::Derived(f) => Ok(f(value, clusters)),
        }
    }
}

/// Converts a standard attribute value back into a typed datapoint value
#[derive(Debug, Clone, Copy)]
pub enum OutboundConverter {
    Identity,
    /// Numeric value scaled by `mul / div` before packing
    Scale { mul: i64, div: i64 },
    BoolInvert,
    PercentInvert,
}

impl OutboundConverter {
    /// Convert and pack into the mapping's wire type
    pub fn apply(
        &self,
        dp_type: DpType,
        value: &AttributeValue,
    ) -> Result<TypedValue, BridgeError> {
        let converted = match self {
            OutboundConverter::Identity => value.clone(),
            OutboundConverter::Scale { mul, div } => {
                let n = value
                    .as_number()
                    .ok_or_else(|| BridgeError::Convert(format!("not numeric: {value:?}")))?;
                AttributeValue::Number(n * mul / div)
            }
            OutboundConverter::BoolInvert => match value {
                AttributeValue::Bool(b) => AttributeValue::Bool(!b),
                AttributeValue::Number(n) => AttributeValue::Bool(*n == 0),
                AttributeValue::Text(_) => {
                    return Err(BridgeError::Convert("expected bool".to_string()))
                }
            },
            OutboundConverter::PercentInvert => {
                let n = value
                    .as_number()
                    .ok_or_else(|| BridgeError::Convert(format!("not numeric: {value:?}")))?;
                AttributeValue::Number(100 - n)
            }
        };

        pack(dp_type, &converted)
    }
}

/// Pack a converted attribute value into the declared wire type
fn pack(dp_type: DpType, value: &AttributeValue) -> Result<TypedValue, BridgeError> {
    match (dp_type, value) {
        (DpType::Bool, AttributeValue::Bool(b)) => Ok(TypedValue::Bool(*b)),
        (DpType::Bool, AttributeValue::Number(n)) => Ok(TypedValue::Bool(*n != 0)),
        (DpType::Value, AttributeValue::Number(n)) => {
            let v = u32::try_from(*n)
                .map_err(|_| BridgeError::Convert(format!("{n} out of range for VALUE")))?;
            Ok(TypedValue::Value(v))
        }
        (DpType::Enum, AttributeValue::Number(n)) => {
            let e = u8::try_from(*n)
                .map_err(|_| BridgeError::Convert(format!("{n} out of range for ENUM")))?;
            Ok(TypedValue::Enum(e))
        }
        (DpType::String, AttributeValue::Text(s)) => Ok(TypedValue::Text(s.clone())),
        (dp_type, value) => Err(BridgeError::Convert(format!(
            "cannot pack {value:?} as {dp_type:?}"
        ))),
    }
}

/// Static mapping for one datapoint id
pub struct AttributeMapping {
    pub dp_id: u8,
    /// Authoritative wire type for this datapoint
    pub dp_type: DpType,
    /// Fan-out targets; update order is part of the contract
    pub targets: &'static [AttributeTarget],
    pub inbound: InboundConverter,
    /// Absent for read-only datapoints
    pub outbound: Option<OutboundConverter>,
}

/// Lookup structure built once per device from a static mapping table
pub struct MappingTable {
    entries: &'static [AttributeMapping],
    by_dp: HashMap<u8, usize>,
    by_attribute: HashMap<(u16, &'static str), usize>,
}

impl MappingTable {
    #[must_use]
    pub fn new(entries: &'static [AttributeMapping]) -> Self {
        let mut by_dp = HashMap::new();
        let mut by_attribute = HashMap::new();
        for (idx, mapping) in entries.iter().enumerate() {
            by_dp.insert(mapping.dp_id, idx);
            for target in mapping.targets {
                by_attribute.insert((target.cluster_id, target.attribute), idx);
            }
        }
        Self {
            entries,
            by_dp,
            by_attribute,
        }
    }

    /// Resolve a mapping by datapoint id
    #[must_use]
    pub fn by_dp(&self, dp_id: u8) -> Option<&'static AttributeMapping> {
        self.by_dp.get(&dp_id).map(|&idx| &self.entries[idx])
    }

    /// Reverse-resolve a mapping by target attribute
    #[must_use]
    pub fn by_attribute(
        &self,
        cluster_id: u16,
        attribute: &str,
    ) -> Option<&'static AttributeMapping> {
        self.by_attribute
            .get(&(cluster_id, attribute))
            .map(|&idx| &self.entries[idx])
    }

    /// Distinct target cluster ids, for building the cluster set
    #[must_use]
    pub fn cluster_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self
            .entries
            .iter()
            .flat_map(|m| m.targets.iter().map(|t| t.cluster_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
