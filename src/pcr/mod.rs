//! PCR capture and PCR-based transport stream bitrate estimate

use serde::Serialize;

use crate::constants::SYSTEM_CLOCK_FREQUENCY;

/// A PCR value together with the packet that carried it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PcrSample {
    pub pcr: u64,
    pub packet_no: u64,
}

/// Two-point bitrate estimate between the first PCR since the last reset
/// and the newest accepted one.
#[derive(Debug, Default, Clone)]
pub struct PcrCapture {
    first: Option<PcrSample>,
    last: Option<PcrSample>,
    count: u64,
    bitrate: Option<u64>,
}

impl PcrCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the PCR of one packet. `discontinuity` is the adaptation field's
    /// discontinuity_indicator.
    pub fn observe(&mut self, packet_no: u64, pcr: u64, discontinuity: bool, packet_length: usize) {
        let sample = PcrSample { pcr, packet_no };
        let first = match self.first {
            Some(first) if !discontinuity => first,
            _ => {
                self.restart(sample);
                return;
            }
        };

        // Samples at or below the first one (stale, reordered or past a wrap)
        // are ignored; after a wrap only the part before it is used.
        if pcr <= first.pcr {
            return;
        }
        let delta = (pcr - first.pcr) as u128;
        let packets = packet_no.saturating_sub(first.packet_no) as u128;
        let bits = packets * packet_length as u128 * SYSTEM_CLOCK_FREQUENCY as u128 * 8;
        self.bitrate = Some(u64::try_from(bits / delta).unwrap_or(u64::MAX));
        self.last = Some(sample);
        self.count += 1;
    }

    fn restart(&mut self, sample: PcrSample) {
        self.first = Some(sample);
        self.last = None;
        self.count = 1;
    }

    pub fn first(&self) -> Option<PcrSample> {
        self.first
    }

    pub fn last(&self) -> Option<PcrSample> {
        self.last
    }

    /// Samples since the last restart, including the first
    pub fn count(&self) -> u64 {
        self.count
    }

    /// bits/s, `None` until two increasing samples were seen
    pub fn bitrate(&self) -> Option<u64> {
        self.bitrate
    }

    /// Mean time between PCRs of this PID in seconds, measured against the
    /// bitrate of the whole stream.
    pub fn repetition_rate(&self, packet_length: usize, stream_bitrate: Option<u64>) -> Option<f32> {
        let (first, last) = (self.first?, self.last?);
        let stream_bitrate = stream_bitrate.filter(|b| *b > 0)?;
        if self.count < 2 {
            return None;
        }
        let packets = last.packet_no.saturating_sub(first.packet_no) as f32;
        Some((packets * packet_length as f32 * 8.0) / ((self.count - 1) as f32 * stream_bitrate as f32))
    }
}
