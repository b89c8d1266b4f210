use thiserror::Error;

/// Errors raised while decoding packet headers and their extensions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Invalid sync byte: expected 0x47, got 0x{0:02x}")]
    InvalidSyncByte(u8),

    #[error("Adaptation field length {length} overruns the packet ({available} bytes left)")]
    AdaptationFieldOverrun { length: usize, available: usize },

    #[error("PCR flag set but adaptation field only has {0} bytes")]
    TruncatedPcr(usize),

    #[error("Mega-frame initialization packet truncated: {0} bytes")]
    TruncatedMip(usize),

    #[error("Bit reader: {0}")]
    BitRead(String),
}

impl From<std::io::Error> for PacketError {
    fn from(e: std::io::Error) -> Self {
        PacketError::BitRead(e.to_string())
    }
}
