//! MPEG-TS packet view.
//!
//! [`TsPacket`] borrows one 188-byte transport packet and decodes header
//! fields lazily. The adaptation field is decoded on request because it is
//! not CRC-protected and is frequently garbage on damaged streams; callers
//! decide what a decoding failure means for them.

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::{PCR_EXTENSION_MODULUS, TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::error::PacketError;

/// Decoded adaptation field (only the parts per-PID tracking needs)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptationField {
    pub length: u8,
    pub discontinuity_indicator: bool,
    pub random_access_indicator: bool,
    pub pcr_flag: bool,
    /// Full 27 MHz PCR value (`base * 300 + extension`)
    pub pcr: Option<u64>,
}

/// One transport packet plus its position in the overall stream
#[derive(Debug, Clone, Copy)]
pub struct TsPacket<'a> {
    data: &'a [u8],
    packet_no: u64,
}

impl<'a> TsPacket<'a> {
    /// Wraps the first 188 bytes of `data`. Only length and sync byte are
    /// validated here.
    pub fn parse(data: &'a [u8], packet_no: u64) -> Result<Self, PacketError> {
        if data.len() < TS_PACKET_SIZE {
            return Err(PacketError::TooShort {
                expected: TS_PACKET_SIZE,
                actual: data.len(),
            });
        }
        if data[0] != TS_SYNC_BYTE {
            return Err(PacketError::InvalidSyncByte(data[0]));
        }
        Ok(Self {
            data: &data[..TS_PACKET_SIZE],
            packet_no,
        })
    }

    pub fn packet_no(&self) -> u64 {
        self.packet_no
    }

    pub fn raw(&self) -> &'a [u8] {
        self.data
    }

    pub fn transport_error_indicator(&self) -> bool {
        self.data[1] & 0x80 != 0
    }

    pub fn payload_unit_start(&self) -> bool {
        self.data[1] & 0x40 != 0
    }

    pub fn pid(&self) -> u16 {
        (((self.data[1] & 0x1F) as u16) << 8) | self.data[2] as u16
    }

    pub fn scrambling_control(&self) -> u8 {
        (self.data[3] & 0xC0) >> 6
    }

    pub fn adaptation_field_control(&self) -> u8 {
        (self.data[3] & 0x30) >> 4
    }

    pub fn continuity_counter(&self) -> u8 {
        self.data[3] & 0x0F
    }

    /// adaptation_field_control 01 or 11
    pub fn has_payload(&self) -> bool {
        matches!(self.adaptation_field_control(), 1 | 3)
    }

    /// adaptation_field_control 10 or 11
    pub fn has_adaptation_field(&self) -> bool {
        matches!(self.adaptation_field_control(), 2 | 3)
    }

    /// Payload bytes after header and adaptation field. Empty when the
    /// packet carries no payload or the adaptation field length is bogus.
    pub fn payload(&self) -> &'a [u8] {
        if !self.has_payload() {
            return &[];
        }
        let mut offset = 4usize;
        if self.has_adaptation_field() {
            offset += 1 + self.data[4] as usize;
        }
        if offset >= TS_PACKET_SIZE {
            return &[];
        }
        &self.data[offset..]
    }

    /// Decodes the adaptation field, `Ok(None)` when there is none.
    pub fn adaptation_field(&self) -> Result<Option<AdaptationField>, PacketError> {
        if !self.has_adaptation_field() {
            return Ok(None);
        }
        let length = self.data[4] as usize;
        let available = TS_PACKET_SIZE - 5;
        if length > available {
            return Err(PacketError::AdaptationFieldOverrun { length, available });
        }
        if length == 0 {
            return Ok(Some(AdaptationField::default()));
        }

        let body = &self.data[5..5 + length];
        let flags = body[0];
        let mut af = AdaptationField {
            length: length as u8,
            discontinuity_indicator: flags & 0x80 != 0,
            random_access_indicator: flags & 0x40 != 0,
            pcr_flag: flags & 0x10 != 0,
            pcr: None,
        };

        if af.pcr_flag {
            // flags byte + 6 bytes of PCR
            if length < 7 {
                return Err(PacketError::TruncatedPcr(length));
            }
            af.pcr = Some(read_pcr(&body[1..7])?);
        }
        Ok(Some(af))
    }
}

/// 33-bit base, 6 reserved bits, 9-bit extension
fn read_pcr(bytes: &[u8]) -> Result<u64, PacketError> {
    let mut br = BitReader::endian(bytes, BigEndian);
    let base = br.read::<33, u64>()?;
    br.skip(6)?;
    let ext = br.read::<9, u16>()?;
    Ok(base * PCR_EXTENSION_MODULUS + ext as u64)
}
