//! Constants for MPEG-TS packet framing and per-PID state tracking

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Frame sizes accepted on input: plain TS, M2TS (4-byte timecode prefix)
/// and TS with 16 trailing Reed-Solomon bytes.
pub const M2TS_PACKET_SIZE: usize = 192;
pub const RS_PACKET_SIZE: usize = 204;
pub const M2TS_PREFIX_LEN: usize = 4;

/// Reserved PIDs
pub const PAT_PID: u16 = 0x0000;
pub const MIP_PID: u16 = 0x0015;
pub const NULL_PID: u16 = 0x1FFF;

/// A mega-frame initialization packet needs at least this much payload.
pub const MIP_MIN_PAYLOAD: usize = 14;

/// PES packet constants
pub const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// Stuffing after the last section in a packet
pub const SECTION_PADDING: u8 = 0xFF;
/// table_id + section_syntax_indicator/length bytes
pub const SECTION_HEADER_LEN: usize = 3;

/// PCR constants
pub const SYSTEM_CLOCK_FREQUENCY: u64 = 27_000_000; // 27 MHz
pub const PCR_EXTENSION_MODULUS: u64 = 300;

/// Continuity counter is 4 bits wide
pub const CC_MODULUS: u8 = 16;
