//! Routes packets of one transport stream to their [`PidState`]

use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

use crate::constants::*;
use crate::diagnostics::{SharedSink, tracing_sink};
use crate::mip::NetworkSync;
use crate::packet::TsPacket;
use crate::pid::{Ingested, PidState};
use crate::section::SectionRecord;
use crate::stats::{PidStats, SectionTally};

type SectionConsumer = Box<dyn FnMut(&SectionRecord) + Send>;

pub struct PacketProcessor {
    packet_size: usize,
    pids: HashMap<u16, PidState>,
    tallies: HashMap<u16, SectionTally>,
    network_sync: NetworkSync,
    sink: SharedSink,
    on_section: Option<SectionConsumer>,
    /// Frames seen, including unusable ones; also the next packet index
    packets: u64,
    sync_errors: u64,
}

impl PacketProcessor {
    pub fn new(packet_size: usize) -> Self {
        Self::with_sink(packet_size, tracing_sink())
    }

    pub fn with_sink(packet_size: usize, sink: SharedSink) -> Self {
        Self {
            packet_size,
            pids: HashMap::new(),
            tallies: HashMap::new(),
            network_sync: NetworkSync::default(),
            sink,
            on_section: None,
            packets: 0,
            sync_errors: 0,
        }
    }

    /// Every completed section is also handed to `consumer`.
    pub fn set_section_consumer(&mut self, consumer: impl FnMut(&SectionRecord) + Send + 'static) {
        self.on_section = Some(Box::new(consumer));
    }

    /// Cuts the 188-byte TS packet out of a frame of `packet_size` bytes.
    fn ts_slice<'a>(&self, frame: &'a [u8]) -> &'a [u8] {
        match self.packet_size {
            M2TS_PACKET_SIZE => frame.get(M2TS_PREFIX_LEN..).unwrap_or_default(),
            _ => frame,
        }
    }

    /// Process a single frame
    pub fn process_packet(&mut self, frame: &[u8]) {
        let packet_no = self.packets;
        self.packets += 1;

        let packet = match TsPacket::parse(self.ts_slice(frame), packet_no) {
            Ok(p) => p,
            Err(e) => {
                self.sync_errors += 1;
                debug!("packet {packet_no} skipped: {e}");
                return;
            }
        };

        let pid = packet.pid();
        let (packet_size, sink) = (self.packet_size, &self.sink);
        let state = self
            .pids
            .entry(pid)
            .or_insert_with(|| new_pid_state(pid, packet_size, sink.clone()));

        match state.ingest(&packet) {
            Ingested::Tracked { sections, .. } => self.consume_sections(pid, sections),
            Ingested::Mip(payload) => self.network_sync.update(&payload),
            Ingested::Skipped => {}
        }
    }

    /// Re-runs payload gathering for one already known, unscrambled PID.
    /// Frames of other PIDs are ignored.
    pub fn reparse_packet(&mut self, target_pid: u16, frame: &[u8], packet_no: u64) {
        let Ok(packet) = TsPacket::parse(self.ts_slice(frame), packet_no) else {
            return;
        };
        if packet.pid() != target_pid {
            return;
        }
        let Some(state) = self.pids.get_mut(&target_pid) else {
            return;
        };
        if state.is_scrambled() {
            return;
        }
        if let Ingested::Tracked { sections, .. } = state.reparse(&packet) {
            self.consume_sections(target_pid, sections);
        }
    }

    fn consume_sections(&mut self, pid: u16, sections: Vec<SectionRecord>) {
        if sections.is_empty() {
            return;
        }
        let tally = self.tallies.entry(pid).or_default();
        for section in &sections {
            tally.record(section);
            if let Some(consumer) = self.on_section.as_mut() {
                consumer(section);
            }
        }
    }

    /// Bitrate of the whole stream: the PCR estimate of the PID with the
    /// most PCR samples, lowest PID on ties.
    pub fn bitrate(&self) -> Option<u64> {
        self.pids
            .values()
            .filter_map(|s| s.bitrate().map(|b| (s.pcr_count(), Reverse(s.pid()), b)))
            .max_by_key(|(count, pid, _)| (*count, *pid))
            .map(|(_, _, b)| b)
    }

    pub fn pid(&self, pid: u16) -> Option<&PidState> {
        self.pids.get(&pid)
    }

    pub fn pid_mut(&mut self, pid: u16) -> Option<&mut PidState> {
        self.pids.get_mut(&pid)
    }

    /// Snapshots of all PIDs, ordered by PID
    pub fn stats(&self) -> Vec<PidStats> {
        let bitrate = self.bitrate();
        let mut out: Vec<PidStats> = self
            .pids
            .values()
            .map(|s| s.stats(bitrate).with_sections(self.tallies.get(&s.pid())))
            .collect();
        out.sort_unstable_by_key(|s| s.pid);
        out
    }

    pub fn network_sync(&self) -> &NetworkSync {
        &self.network_sync
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn sync_errors(&self) -> u64 {
        self.sync_errors
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }
}

fn new_pid_state(pid: u16, packet_size: usize, sink: SharedSink) -> PidState {
    let mut state = PidState::new(pid, packet_size, sink);
    if let Some(label) = reserved_label(pid) {
        state.set_label(label);
    }
    state
}

/// Names of PIDs fixed by ISO/IEC 13818-1 and ETSI EN 300 468
fn reserved_label(pid: u16) -> Option<&'static str> {
    Some(match pid {
        PAT_PID => "PAT",
        0x0001 => "CAT",
        0x0002 => "TSDT",
        0x0010 => "NIT",
        0x0011 => "SDT/BAT",
        0x0012 => "EIT",
        0x0013 => "RST",
        0x0014 => "TDT/TOT",
        MIP_PID => "MIP",
        NULL_PID => "Null Packets",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_utils::{pcr_packet, raw_packet, section};

    #[test]
    fn test_routes_by_pid_and_labels() {
        let mut p = PacketProcessor::new(188);
        p.process_packet(&raw_packet(0x0000, 0, false, &[]));
        p.process_packet(&raw_packet(0x0100, 0, false, &[]));
        p.process_packet(&raw_packet(0x0100, 1, false, &[]));
        assert_eq!(p.packets(), 3);
        assert_eq!(p.pid(0x0100).unwrap().packets(), 2);
        assert_eq!(p.pid(0).unwrap().label(), Some("PAT"));
        assert_eq!(p.pid(0x0100).unwrap().label(), None);
        let stats = p.stats();
        assert_eq!(stats.iter().map(|s| s.pid).collect::<Vec<_>>(), vec![0, 0x100]);
    }

    #[test]
    fn test_bad_sync_counted_and_numbering_kept() {
        let mut p = PacketProcessor::new(188);
        let mut bad = raw_packet(0x100, 0, false, &[]);
        bad[0] = 0;
        p.process_packet(&bad);
        p.process_packet(&pcr_packet(0x100, 0, 100, false));
        p.process_packet(&pcr_packet(0x100, 1, 1100, false));
        assert_eq!(p.sync_errors(), 1);
        let s = p.pid(0x100).unwrap();
        assert_eq!(s.first_pcr().unwrap().packet_no, 1);
        assert_eq!(s.last_pcr().unwrap().packet_no, 2);
    }

    #[test]
    fn test_m2ts_frames() {
        let mut p = PacketProcessor::new(192);
        let mut frame = vec![0xAB; 4];
        frame.extend_from_slice(&raw_packet(0x200, 0, false, &[]));
        p.process_packet(&frame);
        assert_eq!(p.sync_errors(), 0);
        assert_eq!(p.pid(0x200).unwrap().packet_length(), 192);
    }

    #[test]
    fn test_stream_bitrate_prefers_busiest_pcr_pid() {
        let mut p = PacketProcessor::new(188);
        // PID 0x300: two PCRs; PID 0x200: three PCRs
        p.process_packet(&pcr_packet(0x300, 0, 0, false));
        p.process_packet(&pcr_packet(0x200, 0, 0, false));
        p.process_packet(&pcr_packet(0x300, 1, 1_000, false));
        p.process_packet(&pcr_packet(0x200, 1, 2_700, false));
        p.process_packet(&pcr_packet(0x200, 2, 5_400, false));
        let busiest = p.pid(0x200).unwrap().bitrate();
        assert!(busiest.is_some());
        assert_eq!(p.bitrate(), busiest);
        assert_ne!(p.bitrate(), p.pid(0x300).unwrap().bitrate());
    }

    #[test]
    fn test_sections_are_tallied_and_forwarded() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut p = PacketProcessor::new(188);
        p.set_section_consumer(move |s| sink.lock().unwrap().push(s.table_id()));

        let mut payload = vec![0x00];
        payload.extend_from_slice(&section(0x42, &[1; 10]));
        payload.extend_from_slice(&section(0x46, &[2; 10]));
        p.process_packet(&raw_packet(0x11, 0, true, &payload));

        assert_eq!(*seen.lock().unwrap(), vec![Some(0x42), Some(0x46)]);
        let stats = p.stats();
        let tally = stats[0].sections.as_ref().unwrap();
        assert_eq!(tally.sections, 2);
        assert_eq!(stats[0].label.as_deref(), Some("SDT/BAT"));
    }

    #[test]
    fn test_mip_reaches_network_sync() {
        let mut p = PacketProcessor::new(188);
        p.process_packet(&raw_packet(MIP_PID, 0, false, &[0x00, 0x12, 0, 0, 0, 0]));
        assert_eq!(p.network_sync().mips, 1);
        assert_eq!(p.pid(MIP_PID).unwrap().packets(), 1);
    }

    #[test]
    fn test_reparse_targets_one_pid() {
        let mut p = PacketProcessor::new(188);
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section(0x42, &[1; 10]));
        let raw = raw_packet(0x11, 0, true, &payload);
        p.process_packet(&raw);

        // second sweep over the same packets, continuity state continues
        p.reparse_packet(0x11, &raw_packet(0x11, 1, true, &payload), 1);
        p.reparse_packet(0x11, &raw_packet(0x12, 0, true, &payload), 2);
        let s = p.pid(0x11).unwrap();
        assert_eq!(s.packets(), 1);
        assert_eq!(s.continuity_errors(), 0);
        assert!(p.pid(0x12).is_none());
        assert_eq!(p.stats()[0].sections.as_ref().unwrap().sections, 2);
    }
}
