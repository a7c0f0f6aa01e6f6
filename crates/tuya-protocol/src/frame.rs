//! Tuya MCU frame structure and datapoint record codec

use crate::types::{DpType, ProtocolError, TuyaCommand};
use bytes::{Buf, BufMut};

/// Minimum MCU payload size: seq(2) = 2 (an empty datapoint list is legal)
pub const MIN_PAYLOAD_SIZE: usize = 2;

/// Fixed portion of a datapoint record: `dp_id(1)` + `dp_type(1)` + len(2)
pub const RECORD_HEADER_SIZE: usize = 4;

/// A single datapoint record as it appears on the wire
///
/// Record format:
/// ```text
/// [DP ID: 1 byte]
/// [DP Type: 1 byte] (RAW=0, BOOL=1, VALUE=2, STRING=3, ENUM=4, BITMAP=5)
/// [Length: 2 bytes BE]
/// [Payload: length bytes]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatapointRecord {
    pub dp_id: u8,
    pub dp_type: DpType,
    pub payload: Vec<u8>,
}

impl DatapointRecord {
    #[must_use]
    pub fn new(dp_id: u8, dp_type: DpType, payload: Vec<u8>) -> Self {
        Self {
            dp_id,
            dp_type,
            payload,
        }
    }

    /// Serialize a single record to bytes
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // Panic only on protocol-violating payload size
    pub fn encode(&self) -> Vec<u8> {
        let len = u16::try_from(self.payload.len()).expect("payload exceeds protocol maximum");

        let mut data = Vec::with_capacity(RECORD_HEADER_SIZE + self.payload.len());
        data.put_u8(self.dp_id);
        data.put_u8(self.dp_type as u8);
        data.put_u16(len); // big-endian
        data.put_slice(&self.payload);
        data
    }
}

/// Decode a datapoint list, tolerating a malformed tail
///
/// Parses records until the buffer is exhausted. A record whose declared
/// length overruns the remaining buffer ends the loop; records decoded up
/// to that point are returned so a later well-formed frame is unaffected.
/// A record with an unknown `dp_type` ordinal is skipped using its length
/// field and parsing continues.
#[must_use]
pub fn decode_datapoints(mut buf: &[u8]) -> Vec<DatapointRecord> {
    let mut records = Vec::new();

    while buf.remaining() >= RECORD_HEADER_SIZE {
        let dp_id = buf.get_u8();
        let type_byte = buf.get_u8();
        let declared = buf.get_u16() as usize;

        if declared > buf.remaining() {
            tracing::warn!(
                "Malformed datapoint tail: dp {:#04X} declares {} bytes, {} remain",
                dp_id,
                declared,
                buf.remaining()
            );
            break;
        }

        let Some(dp_type) = DpType::from_u8(type_byte) else {
            tracing::warn!(
                "Skipping dp {:#04X} with unknown type {:#04X}",
                dp_id,
                type_byte
            );
            buf.advance(declared);
            continue;
        };

        let payload = buf[..declared].to_vec();
        buf.advance(declared);

        records.push(DatapointRecord {
            dp_id,
            dp_type,
            payload,
        });
    }

    if buf.has_remaining() && buf.remaining() < RECORD_HEADER_SIZE {
        tracing::warn!("{} trailing bytes after last datapoint record", buf.remaining());
    }

    records
}

/// Payload of one Tuya MCU cluster command
///
/// Payload format (after the ZCL header):
/// ```text
/// [Transaction: 2 bytes BE]
/// [Datapoint records: variable]
/// ```
#[derive(Debug, Clone)]
pub struct TuyaFrame {
    pub command: TuyaCommand,
    pub seq: u16,
    pub datapoints: Vec<DatapointRecord>,
}

impl TuyaFrame {
    /// Decode an MCU command payload
    ///
    /// The ZCL header has already been consumed by the cluster-command
    /// layer; `data` starts at the transaction number.
    pub fn decode(command: TuyaCommand, data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < MIN_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let seq = u16::from_be_bytes([data[0], data[1]]);
        let datapoints = if command.carries_datapoints() {
            decode_datapoints(&data[2..])
        } else {
            Vec::new()
        };

        Ok(Self {
            command,
            seq,
            datapoints,
        })
    }

    /// Build a set-data request carrying exactly one datapoint record
    ///
    /// Outbound traffic never batches records: each attribute write becomes
    /// its own frame with its own sequence number.
    #[must_use]
    pub fn set_data(seq: u16, record: DatapointRecord) -> Self {
        Self {
            command: TuyaCommand::SetData,
            seq,
            datapoints: vec![record],
        }
    }

    /// Serialize the MCU payload (transaction number + records)
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            MIN_PAYLOAD_SIZE
                + self
                    .datapoints
                    .iter()
                    .map(|r| RECORD_HEADER_SIZE + r.payload.len())
                    .sum::<usize>(),
        );
        data.put_u16(self.seq);
        for record in &self.datapoints {
            data.put_slice(&record.encode());
        }
        data
    }
}

/// ZCL frame header for the manufacturer-specific cluster command
#[derive(Debug, Clone)]
pub struct ZclFrame {
    frame_control: u8,
    manufacturer_code: Option<u16>,
    transaction_seq: u8,
    command_id: u8,
    payload: Vec<u8>,
}

impl ZclFrame {
    /// Parse a ZCL frame from raw ASDU bytes
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < 3 {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let frame_control = data[0];
        let mut idx = 1;

        // Manufacturer-specific bit (bit 2)
        let manufacturer_code = if (frame_control & 0x04) != 0 {
            if data.len() < idx + 2 {
                return Err(ProtocolError::FrameTooShort(data.len()));
            }
            let code = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            Some(code)
        } else {
            None
        };

        if data.len() < idx + 2 {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let transaction_seq = data[idx];
        idx += 1;
        let command_id = data[idx];
        idx += 1;

        let payload = data[idx..].to_vec();

        Ok(Self {
            frame_control,
            manufacturer_code,
            transaction_seq,
            command_id,
            payload,
        })
    }

    /// Create a cluster-specific command frame (client to server)
    #[must_use]
    pub fn cluster_command(transaction_seq: u8, command_id: u8, payload: Vec<u8>) -> Self {
        Self {
            frame_control: 0x01, // Cluster-specific, client-to-server
            manufacturer_code: None,
            transaction_seq,
            command_id,
            payload,
        }
    }

    /// Check if this is a cluster-specific command (vs global)
    #[must_use]
    pub fn is_cluster_specific(&self) -> bool {
        (self.frame_control & 0x03) == 0x01
    }

    #[must_use]
    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    #[must_use]
    pub fn transaction_seq(&self) -> u8 {
        self.transaction_seq
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Interpret the frame as an MCU cluster command
    pub fn to_tuya_frame(&self) -> Result<TuyaFrame, ProtocolError> {
        let command = TuyaCommand::from_u8(self.command_id)
            .ok_or(ProtocolError::UnknownCommand(self.command_id))?;
        TuyaFrame::decode(command, &self.payload)
    }

    /// Serialize to bytes
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + self.payload.len());
        data.push(self.frame_control);
        if let Some(mfr) = self.manufacturer_code {
            data.extend_from_slice(&mfr.to_le_bytes());
        }
        data.push(self.transaction_seq);
        data.push(self.command_id);
        data.extend_from_slice(&self.payload);
        data
    }
}
