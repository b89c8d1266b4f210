// section/mod.rs
//! PSI/SI section records rebuilt from packet payloads.

mod gather;

pub use gather::SectionGatherer;

use bytes::{Bytes, BytesMut};
use crc::{CRC_32_MPEG_2, Crc};

use crate::constants::SECTION_HEADER_LEN;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// One section being (or having been) reassembled.
///
/// The record learns its total size from the 12-bit `section_length` once
/// the first three bytes are in, and never reads past it.
#[derive(Debug, Clone)]
pub struct SectionRecord {
    pid: u16,
    packet_no: u64,
    data: BytesMut,
    expected_len: Option<usize>,
}

impl SectionRecord {
    pub fn new(pid: u16, packet_no: u64) -> Self {
        Self {
            pid,
            packet_no,
            data: BytesMut::with_capacity(SECTION_HEADER_LEN),
            expected_len: None,
        }
    }

    /// Appends as many bytes of `data` as this section still needs and
    /// returns how many were taken.
    pub fn read_bytes(&mut self, data: &[u8]) -> usize {
        let mut read = 0;
        if self.data.len() < SECTION_HEADER_LEN {
            let n = (SECTION_HEADER_LEN - self.data.len()).min(data.len());
            self.data.extend_from_slice(&data[..n]);
            read += n;
            if self.data.len() == SECTION_HEADER_LEN {
                let section_length = (((self.data[1] & 0x0F) as usize) << 8) | self.data[2] as usize;
                let total = SECTION_HEADER_LEN + section_length;
                self.expected_len = Some(total);
                self.data.reserve(section_length);
            }
        }
        if let Some(total) = self.expected_len {
            let n = (total - self.data.len()).min(data.len() - read);
            self.data.extend_from_slice(&data[read..read + n]);
            read += n;
        }
        read
    }

    pub fn is_complete(&self) -> bool {
        self.expected_len == Some(self.data.len())
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Packet index at which this section started
    pub fn packet_no(&self) -> u64 {
        self.packet_no
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    pub fn table_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    pub fn section_syntax_indicator(&self) -> bool {
        self.data.get(1).is_some_and(|b| b & 0x80 != 0)
    }

    /// Total length including the 3 header bytes, once known
    pub fn expected_len(&self) -> Option<usize> {
        self.expected_len
    }

    /// CRC-32/MPEG-2 check of a complete long-form section. `None` for
    /// incomplete or short-form sections, which carry no CRC.
    pub fn crc_ok(&self) -> Option<bool> {
        if !self.is_complete() || !self.section_syntax_indicator() {
            return None;
        }
        let len = self.data.len();
        if len < SECTION_HEADER_LEN + 4 {
            return Some(false);
        }
        let calc = CRC_MPEG.checksum(&self.data[..len - 4]);
        let stored = u32::from_be_bytes([
            self.data[len - 4],
            self.data[len - 3],
            self.data[len - 2],
            self.data[len - 1],
        ]);
        Some(calc == stored)
    }
}
