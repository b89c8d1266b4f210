// section/gather.rs
//! Collects payloads of one PID into [`SectionRecord`]s.

use crate::constants::{PAT_PID, PES_START_CODE, SECTION_PADDING};
use crate::packet::TsPacket;
use crate::section::SectionRecord;
use crate::types::StreamKind;

#[derive(Debug, Default)]
enum GatherState {
    /// Nothing started yet, or dropped after a discontinuity
    #[default]
    Idle,
    /// A section is waiting for more bytes
    Collecting(SectionRecord),
    /// The last section completed; the next one starts at a fresh byte
    Between,
}

#[derive(Debug, Default)]
pub struct SectionGatherer {
    state: GatherState,
}

impl SectionGatherer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any partially collected section.
    pub fn reset(&mut self) {
        self.state = GatherState::Idle;
    }

    pub fn active(&self) -> Option<&SectionRecord> {
        match &self.state {
            GatherState::Collecting(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GatherState::Idle)
    }

    /// Feeds the payload of one in-order, unscrambled packet. Decides `kind`
    /// on the first unit start if still unknown. Returns sections completed
    /// by this packet, in stream order.
    pub fn feed(&mut self, packet: &TsPacket<'_>, kind: &mut StreamKind) -> Vec<SectionRecord> {
        let mut done = Vec::new();
        // a unit start without payload happens; adaptation_field_control decides
        if !packet.has_payload() {
            return done;
        }
        let data = packet.payload();
        let pid = packet.pid();
        let packet_no = packet.packet_no();

        match std::mem::take(&mut self.state) {
            GatherState::Idle => {
                if !packet.payload_unit_start() || data.len() <= 1 {
                    return done;
                }
                if *kind == StreamKind::Unknown {
                    *kind = detect_kind(pid, data);
                }
                if *kind == StreamKind::Psi {
                    let start = 1 + data[0] as usize;
                    self.start_sections(pid, packet_no, data, start, &mut done);
                }
            }
            GatherState::Collecting(mut record) => {
                // pointer byte first; bytes up to the pointed offset finish
                // the section we already have
                let mut start = usize::from(packet.payload_unit_start());
                start += record.read_bytes(data.get(start..).unwrap_or_default());
                if record.is_complete() {
                    done.push(record);
                    self.state = GatherState::Between;
                } else {
                    self.state = GatherState::Collecting(record);
                }
                self.start_sections(pid, packet_no, data, start, &mut done);
            }
            GatherState::Between => {
                self.state = GatherState::Between;
                let start = usize::from(packet.payload_unit_start());
                self.start_sections(pid, packet_no, data, start, &mut done);
            }
        }
        done
    }

    /// Starts new sections at `start` until stuffing or the end of payload.
    fn start_sections(
        &mut self,
        pid: u16,
        packet_no: u64,
        data: &[u8],
        mut start: usize,
        done: &mut Vec<SectionRecord>,
    ) {
        while start < data.len() && data[start] != SECTION_PADDING {
            let mut record = SectionRecord::new(pid, packet_no);
            start += record.read_bytes(&data[start..]);
            if record.is_complete() {
                done.push(record);
                self.state = GatherState::Between;
            } else {
                self.state = GatherState::Collecting(record);
            }
        }
    }
}

/// Guess from the first unit start whether the PID carries sections or PES.
/// A non-zero pointer, PID 0 or a non-zero table_id means sections; this is
/// a heuristic and may still be private data of unspecified format.
fn detect_kind(pid: u16, data: &[u8]) -> StreamKind {
    if data[0] != 0 || pid == PAT_PID || data[1] != 0 {
        StreamKind::Psi
    } else if data.starts_with(&PES_START_CODE) {
        StreamKind::Pes
    } else {
        StreamKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{raw_packet, section};

    fn feed(
        g: &mut SectionGatherer,
        kind: &mut StreamKind,
        raw: &[u8; 188],
        no: u64,
    ) -> Vec<SectionRecord> {
        let pkt = TsPacket::parse(raw, no).unwrap();
        g.feed(&pkt, kind)
    }

    #[test]
    fn test_single_packet_section() {
        let sec = section(0x42, &[1, 2, 3, 4, 5]);
        let mut payload = vec![0x00];
        payload.extend_from_slice(&sec);
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let done = feed(&mut g, &mut kind, &raw_packet(0x11, 0, true, &payload), 0);
        assert_eq!(kind, StreamKind::Psi);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].bytes(), &sec[..]);
        assert!(g.active().is_none());
        assert!(!g.is_idle());
    }

    #[test]
    fn test_several_sections_in_one_packet() {
        let a = section(0x4E, &[1; 20]);
        let b = section(0x4F, &[2; 30]);
        let mut payload = vec![0x00];
        payload.extend_from_slice(&a);
        payload.extend_from_slice(&b);
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let done = feed(&mut g, &mut kind, &raw_packet(0x12, 0, true, &payload), 0);
        let tids: Vec<_> = done.iter().filter_map(|s| s.table_id()).collect();
        assert_eq!(tids, vec![0x4E, 0x4F]);
    }

    #[test]
    fn test_pointer_skips_leading_bytes() {
        let sec = section(0x42, &[7; 8]);
        let mut payload = vec![3, 0xAA, 0xBB, 0xCC];
        payload.extend_from_slice(&sec);
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let done = feed(&mut g, &mut kind, &raw_packet(0x11, 0, true, &payload), 0);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].bytes(), &sec[..]);
    }

    #[test]
    fn test_section_spanning_packets_matches_single_packet() {
        let sec = section(0x42, &(0..=255u8).cycle().take(400).collect::<Vec<_>>());
        let mut first = vec![0x00];
        first.extend_from_slice(&sec[..183]);
        let second = &sec[183..183 + 184];
        let third = &sec[183 + 184..];

        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        assert!(feed(&mut g, &mut kind, &raw_packet(0x11, 0, true, &first), 10).is_empty());
        assert!(g.active().is_some());
        assert!(feed(&mut g, &mut kind, &raw_packet(0x11, 1, false, second), 11).is_empty());
        let done = feed(&mut g, &mut kind, &raw_packet(0x11, 2, false, third), 12);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].bytes(), &sec[..]);
        assert_eq!(done[0].packet_no(), 10);
    }

    #[test]
    fn test_unit_start_finishes_previous_then_starts_next() {
        let a = section(0x42, &[1; 190]);
        let b = section(0x46, &[2; 4]);
        let mut first = vec![0x00];
        first.extend_from_slice(&a[..183]);
        let tail = &a[183..];
        let mut second = vec![tail.len() as u8];
        second.extend_from_slice(tail);
        second.extend_from_slice(&b);

        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        assert!(feed(&mut g, &mut kind, &raw_packet(0x11, 0, true, &first), 0).is_empty());
        let done = feed(&mut g, &mut kind, &raw_packet(0x11, 1, true, &second), 1);
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].bytes(), &a[..]);
        assert_eq!(done[1].bytes(), &b[..]);
        assert_eq!(done[1].packet_no(), 1);
    }

    #[test]
    fn test_continuation_without_active_section_is_ignored() {
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let done = feed(&mut g, &mut kind, &raw_packet(0x11, 0, false, &[0x42, 0x00, 0x01, 0x00]), 0);
        assert!(done.is_empty());
        assert_eq!(kind, StreamKind::Unknown);
        assert!(g.is_idle());
    }

    #[test]
    fn test_pes_detected_and_not_collected() {
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let pes = [0x00, 0x00, 0x01, 0xE0, 0x00, 0x00];
        assert!(feed(&mut g, &mut kind, &raw_packet(0x100, 0, true, &pes), 0).is_empty());
        assert_eq!(kind, StreamKind::Pes);
        assert!(g.is_idle());
        // later packets that happen to look like sections do not flip the kind
        let sec_like = [0x00, 0x42, 0x00, 0x01, 0x00];
        assert!(feed(&mut g, &mut kind, &raw_packet(0x100, 1, true, &sec_like), 1).is_empty());
        assert_eq!(kind, StreamKind::Pes);
    }

    #[test]
    fn test_pat_pid_is_psi_even_with_zero_bytes() {
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let sec = section(0x00, &[0; 9]);
        let mut payload = vec![0x00];
        payload.extend_from_slice(&sec);
        let done = feed(&mut g, &mut kind, &raw_packet(0x0000, 0, true, &payload), 0);
        assert_eq!(kind, StreamKind::Psi);
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn test_reset_drops_partial_section() {
        let sec = section(0x42, &[1; 300]);
        let mut first = vec![0x00];
        first.extend_from_slice(&sec[..183]);
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        feed(&mut g, &mut kind, &raw_packet(0x11, 0, true, &first), 0);
        assert!(g.active().is_some());
        g.reset();
        assert!(g.is_idle());
        // continuation after reset is not glued onto anything
        assert!(feed(&mut g, &mut kind, &raw_packet(0x11, 1, false, &sec[183..]), 1).is_empty());
        assert!(g.is_idle());
        assert_eq!(kind, StreamKind::Psi);
    }

    #[test]
    fn test_pointer_past_payload_is_harmless() {
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let mut raw = raw_packet(0x11, 0, true, &[0xFE, 0x42]);
        raw[6..].fill(0x00);
        assert!(feed(&mut g, &mut kind, &raw, 0).is_empty());
        assert!(g.is_idle());
    }

    #[test]
    fn test_adaptation_only_packet_ignored() {
        let mut g = SectionGatherer::new();
        let mut kind = StreamKind::Unknown;
        let mut raw = raw_packet(0x11, 0, true, &[0x00, 0x42, 0x00, 0x01]);
        raw[3] = 0x20; // adaptation field only
        raw[4] = 183;
        raw[5] = 0x00;
        assert!(feed(&mut g, &mut kind, &raw, 0).is_empty());
        assert_eq!(kind, StreamKind::Unknown);
    }
}
