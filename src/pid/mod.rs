//! Per-PID state: continuity, PCR and section gathering for one packet id.
//!
//! A [`PidState`] is created the first time a PID is seen and lives for the
//! whole session. Packets must be handed over in arrival order. Nothing in
//! here fails: broken counters, bad adaptation fields and scrambling end up
//! in counters and flags, plus a report to the [`DiagnosticSink`].
//!
//! [`DiagnosticSink`]: crate::diagnostics::DiagnosticSink

use bytes::Bytes;

use crate::constants::{MIP_MIN_PAYLOAD, MIP_PID, NULL_PID};
use crate::continuity::{Continuity, ContinuityTracker};
use crate::diagnostics::{Diagnostic, Severity, SharedSink};
use crate::packet::TsPacket;
use crate::pcr::{PcrCapture, PcrSample};
use crate::section::{SectionGatherer, SectionRecord};
use crate::stats::PidStats;
use crate::types::StreamKind;

/// Result of handing one packet to a [`PidState`]
#[derive(Debug)]
pub enum Ingested {
    /// Went through continuity tracking; `sections` completed by this packet
    Tracked {
        continuity: Continuity,
        sections: Vec<SectionRecord>,
    },
    /// Mega-frame initialization packet payload, passed on untouched
    Mip(Bytes),
    /// MIP PID packet too short to be a MIP
    Skipped,
}

impl Ingested {
    pub fn sections(&self) -> &[SectionRecord] {
        match self {
            Ingested::Tracked { sections, .. } => sections,
            _ => &[],
        }
    }

    pub fn continuity(&self) -> Option<Continuity> {
        match self {
            Ingested::Tracked { continuity, .. } => Some(*continuity),
            _ => None,
        }
    }
}

pub struct PidState {
    pid: u16,
    packet_length: usize,
    label: Option<String>,
    kind: StreamKind,
    scrambled: bool,
    packets: u64,
    payload_bytes: u64,
    continuity: ContinuityTracker,
    pcr: PcrCapture,
    gatherer: SectionGatherer,
    sink: SharedSink,
}

impl PidState {
    /// `packet_length` is the frame size of the stream (188, 192 or 204),
    /// used for the PCR bitrate.
    pub fn new(pid: u16, packet_length: usize, sink: SharedSink) -> Self {
        Self {
            pid,
            packet_length,
            label: None,
            kind: StreamKind::Unknown,
            scrambled: false,
            packets: 0,
            payload_bytes: 0,
            continuity: ContinuityTracker::new(),
            pcr: PcrCapture::new(),
            gatherer: SectionGatherer::new(),
            sink,
        }
    }

    /// Main entry point, called for every packet of this PID.
    pub fn ingest(&mut self, packet: &TsPacket<'_>) -> Ingested {
        let outcome = if self.pid == MIP_PID {
            // MIP carries no section structure; the whole payload goes on
            let payload = packet.payload();
            if payload.len() >= MIP_MIN_PAYLOAD {
                Ingested::Mip(Bytes::copy_from_slice(payload))
            } else {
                Ingested::Skipped
            }
        } else {
            self.capture_pcr(packet);
            self.track(packet, Severity::Warning)
        };
        self.packets += 1;
        outcome
    }

    /// Re-gathers payload for a PID that is already classified and not
    /// scrambled, e.g. when a single PID is swept again. Continuity handling
    /// is identical to [`ingest`](Self::ingest) but continuity errors are
    /// only reported at debug level, and neither the PCR nor the packet
    /// counter is touched.
    pub fn reparse(&mut self, packet: &TsPacket<'_>) -> Ingested {
        self.track(packet, Severity::Debug)
    }

    fn capture_pcr(&mut self, packet: &TsPacket<'_>) {
        match packet.adaptation_field() {
            Ok(Some(af)) => {
                if let Some(pcr) = af.pcr {
                    self.pcr
                        .observe(packet.packet_no(), pcr, af.discontinuity_indicator, self.packet_length);
                }
            }
            Ok(None) => {}
            // adaptation fields are not CRC protected, so just treat as absent
            Err(error) => self.sink.report(
                Severity::Debug,
                &Diagnostic::MalformedAdaptationField {
                    pid: self.pid,
                    packet_no: packet.packet_no(),
                    error,
                },
            ),
        }
    }

    fn track(&mut self, packet: &TsPacket<'_>, severity: Severity) -> Ingested {
        let null_pid = self.pid == NULL_PID;
        let last = self.continuity.last_counter();
        let last_packet_no = self.continuity.last_packet_no();
        let cc = packet.continuity_counter();

        let continuity = self.continuity.classify(cc, packet.packet_no(), null_pid);
        let mut sections = Vec::new();
        match continuity {
            Continuity::InOrder => {
                if packet.scrambling_control() != 0 {
                    // payload is of no use
                    self.scrambled = true;
                } else if !null_pid {
                    self.payload_bytes += packet.payload().len() as u64;
                    sections = self.gatherer.feed(packet, &mut self.kind);
                }
            }
            Continuity::Duplicate => {}
            Continuity::IllegalDuplicate => self.sink.report(
                Severity::Debug,
                &Diagnostic::IllegalDuplicate {
                    pid: self.pid,
                    counter: cc,
                    last_packet_no,
                    packet_no: packet.packet_no(),
                },
            ),
            Continuity::Discontinuous => {
                self.sink.report(
                    severity,
                    &Diagnostic::ContinuityError {
                        pid: self.pid,
                        last: last.unwrap_or_default(),
                        new: cc,
                        last_packet_no,
                        packet_no: packet.packet_no(),
                    },
                );
                self.gatherer.reset();
            }
        }
        Ingested::Tracked {
            continuity,
            sections,
        }
    }

    /// Snapshot for a statistics consumer. `stream_bitrate` is the bitrate
    /// of the whole transport stream, needed for the PCR repetition rate.
    pub fn stats(&self, stream_bitrate: Option<u64>) -> PidStats {
        PidStats::collect(self, stream_bitrate)
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn packet_length(&self) -> usize {
        self.packet_length
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn is_scrambled(&self) -> bool {
        self.scrambled
    }

    /// Every packet handed to `ingest`, whatever happened to it
    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn duplicate_packets(&self) -> u64 {
        self.continuity.duplicates()
    }

    pub fn continuity_errors(&self) -> u64 {
        self.continuity.errors()
    }

    pub fn last_continuity_counter(&self) -> Option<u8> {
        self.continuity.last_counter()
    }

    pub fn last_packet_no(&self) -> Option<u64> {
        self.continuity.last_packet_no()
    }

    pub fn dup_found(&self) -> bool {
        self.continuity.dup_found()
    }

    /// Payload bytes of in-order, unscrambled packets
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn pcr(&self) -> &PcrCapture {
        &self.pcr
    }

    pub fn first_pcr(&self) -> Option<PcrSample> {
        self.pcr.first()
    }

    pub fn last_pcr(&self) -> Option<PcrSample> {
        self.pcr.last()
    }

    pub fn pcr_count(&self) -> u64 {
        self.pcr.count()
    }

    pub fn bitrate(&self) -> Option<u64> {
        self.pcr.bitrate()
    }

    /// Section still waiting for bytes, if any
    pub fn active_section(&self) -> Option<&SectionRecord> {
        self.gatherer.active()
    }
}

impl std::fmt::Debug for PidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PID:{}, packets:{}", self.pid, self.packets)
    }
}
