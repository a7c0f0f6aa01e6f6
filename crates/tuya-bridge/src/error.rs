//! Error types for the datapoint bridge

use thiserror::Error;
use tuya_protocol::ProtocolError;

/// Errors that can occur while mapping datapoints to cluster attributes
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Wire-level decode/encode failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A converter received a value shape it cannot handle
    #[error("Conversion failed: {0}")]
    Convert(String),

    /// A RAW slice converter reads past the end of the payload
    #[error("Slice {offset}+{len} out of range for {available}-byte payload")]
    SliceOutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },
}
