// src/mip.rs
//! DVB-T mega-frame initialization packets (PID 0x15, ETSI TS 101 191).
//!
//! MIPs are not sections; per-PID tracking hands their payload over whole
//! and [`NetworkSync`] keeps what single frequency network monitoring needs.

use bitstream_io::{BigEndian, BitRead, BitReader};
use serde::Serialize;

use crate::error::PacketError;

/// Bytes up to and including maximum_delay
const MIP_FIXED_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MegaFrameInitialization {
    pub synchronization_id: u8,
    pub section_length: u8,
    pub pointer: u16,
    pub periodic_flag: bool,
    /// 100 ns units since the last 1 pps pulse
    pub synchronization_time_stamp: u32,
    /// 100 ns units
    pub maximum_delay: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tps_mip: Option<u32>,
}

impl MegaFrameInitialization {
    pub fn parse(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < MIP_FIXED_LEN {
            return Err(PacketError::TruncatedMip(payload.len()));
        }
        let mut br = BitReader::endian(payload, BigEndian);
        let synchronization_id = br.read::<8, u8>()?;
        let section_length = br.read::<8, u8>()?;
        let pointer = br.read::<16, u16>()?;
        let periodic_flag = br.read_bit()?;
        br.skip(15)?; // future_use
        let synchronization_time_stamp = br.read::<24, u32>()?;
        let maximum_delay = br.read::<24, u32>()?;
        let tps_mip = if payload.len() >= MIP_FIXED_LEN + 4 {
            Some(br.read::<32, u32>()?)
        } else {
            None
        };
        Ok(Self {
            synchronization_id,
            section_length,
            pointer,
            periodic_flag,
            synchronization_time_stamp,
            maximum_delay,
            tps_mip,
        })
    }
}

/// Collects MIPs of one transport stream
#[derive(Debug, Default, Clone, Serialize)]
pub struct NetworkSync {
    pub mips: u64,
    pub malformed: u64,
    /// synchronization_id other than 0x00 (the only value defined)
    pub unknown_sync_ids: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<MegaFrameInitialization>,
}

impl NetworkSync {
    pub fn update(&mut self, payload: &[u8]) {
        match MegaFrameInitialization::parse(payload) {
            Ok(mip) => {
                self.mips += 1;
                if mip.synchronization_id != 0x00 {
                    self.unknown_sync_ids += 1;
                }
                self.last = Some(mip);
            }
            Err(e) => {
                tracing::debug!("dropping MIP: {e}");
                self.malformed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        vec![
            0x00, // synchronization_id
            0x12, // section_length
            0x01, 0x02, // pointer
            0x80, 0x00, // periodic_flag + future_use
            0x0F, 0x42, 0x40, // STS = 1_000_000
            0x00, 0x27, 0x10, // maximum_delay = 10_000
            0xDE, 0xAD, 0xBE, 0xEF, // tps_mip
        ]
    }

    #[test]
    fn test_parse_fields() {
        let mip = MegaFrameInitialization::parse(&sample()).unwrap();
        assert_eq!(mip.synchronization_id, 0);
        assert_eq!(mip.section_length, 0x12);
        assert_eq!(mip.pointer, 0x0102);
        assert!(mip.periodic_flag);
        assert_eq!(mip.synchronization_time_stamp, 1_000_000);
        assert_eq!(mip.maximum_delay, 10_000);
        assert_eq!(mip.tps_mip, Some(0xDEADBEEF));
    }

    #[test]
    fn test_short_payload_without_tps() {
        let mip = MegaFrameInitialization::parse(&sample()[..14]).unwrap();
        assert_eq!(mip.tps_mip, None);
        assert_eq!(
            MegaFrameInitialization::parse(&sample()[..8]),
            Err(PacketError::TruncatedMip(8))
        );
    }

    #[test]
    fn test_network_sync_counts() {
        let mut sync = NetworkSync::default();
        sync.update(&sample());
        let mut other = sample();
        other[0] = 0x01;
        sync.update(&other);
        sync.update(&[0u8; 4]);
        assert_eq!(sync.mips, 2);
        assert_eq!(sync.unknown_sync_ids, 1);
        assert_eq!(sync.malformed, 1);
        assert_eq!(sync.last.unwrap().synchronization_id, 1);
    }
}
