//! Read-only statistics snapshots for presentation

use std::collections::BTreeMap;

use serde::Serialize;

use crate::pcr::PcrSample;
use crate::pid::PidState;
use crate::section::SectionRecord;
use crate::types::StreamKind;

/// Everything a presentation layer needs to know about one PID
#[derive(Debug, Clone, Serialize)]
pub struct PidStats {
    pub pid: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub packets: u64,
    pub duplicate_packets: u64,
    pub continuity_errors: u64,
    pub scrambled: bool,
    /// Not reported for scrambled PIDs, the guess would be meaningless
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<StreamKind>,
    pub payload_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_pcr: Option<PcrSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pcr: Option<PcrSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_count: Option<u64>,
    /// Transport stream bitrate derived from this PID's PCRs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_bitrate: Option<u64>,
    /// Seconds between PCRs on this PID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcr_repetition_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<SectionTally>,
}

impl PidStats {
    pub fn collect(state: &PidState, stream_bitrate: Option<u64>) -> Self {
        let last_pcr = state.last_pcr();
        Self {
            pid: state.pid(),
            label: state.label().map(str::to_owned),
            packets: state.packets(),
            duplicate_packets: state.duplicate_packets(),
            continuity_errors: state.continuity_errors(),
            scrambled: state.is_scrambled(),
            kind: (!state.is_scrambled()).then_some(state.kind()),
            payload_bytes: state.payload_bytes(),
            first_pcr: state.first_pcr(),
            last_pcr,
            pcr_count: last_pcr.map(|_| state.pcr_count()),
            pcr_bitrate: state.bitrate(),
            pcr_repetition_secs: state
                .pcr()
                .repetition_rate(state.packet_length(), stream_bitrate),
            sections: None,
        }
    }

    pub fn with_sections(mut self, tally: Option<&SectionTally>) -> Self {
        self.sections = tally.cloned();
        self
    }
}

/// Completed sections seen on one PID
#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionTally {
    pub sections: u64,
    pub crc_errors: u64,
    /// table_id -> count
    pub table_ids: BTreeMap<u8, u64>,
}

impl SectionTally {
    pub fn record(&mut self, section: &SectionRecord) {
        self.sections += 1;
        if section.crc_ok() == Some(false) {
            self.crc_errors += 1;
        }
        if let Some(tid) = section.table_id() {
            *self.table_ids.entry(tid).or_default() += 1;
        }
    }
}
