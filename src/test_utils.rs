//! Synthetic packet builders shared by unit tests

use std::sync::{Arc, Mutex};

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};

/// Payload-only packet, remaining bytes stuffed with 0xFF
pub fn raw_packet(pid: u16, cc: u8, pusi: bool, payload: &[u8]) -> [u8; 188] {
    let mut data = [0xFFu8; 188];
    data[0] = 0x47;
    data[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
    data[2] = pid as u8;
    data[3] = 0x10 | (cc & 0x0F);
    let n = payload.len().min(184);
    data[4..4 + n].copy_from_slice(&payload[..n]);
    data
}

/// Adaptation-field-only packet carrying a PCR
pub fn pcr_packet(pid: u16, cc: u8, pcr: u64, discontinuity: bool) -> [u8; 188] {
    let mut data = [0xFFu8; 188];
    data[0] = 0x47;
    data[1] = (pid >> 8) as u8 & 0x1F;
    data[2] = pid as u8;
    data[3] = 0x20 | (cc & 0x0F);
    data[4] = 183;
    data[5] = 0x10 | if discontinuity { 0x80 } else { 0 };
    let base = pcr / 300;
    let ext = pcr % 300;
    data[6] = (base >> 25) as u8;
    data[7] = (base >> 17) as u8;
    data[8] = (base >> 9) as u8;
    data[9] = (base >> 1) as u8;
    data[10] = (((base & 1) as u8) << 7) | 0x7E | ((ext >> 8) as u8 & 0x01);
    data[11] = ext as u8;
    data
}

/// Builds a short-form section: table_id, 12-bit length, body
pub fn section(table_id: u8, body: &[u8]) -> Vec<u8> {
    let len = body.len();
    let mut s = vec![table_id, 0x30 | ((len >> 8) as u8 & 0x0F), len as u8];
    s.extend_from_slice(body);
    s
}

/// Sink that keeps every diagnostic for later inspection
#[derive(Default, Clone)]
pub struct CollectingSink {
    pub events: Arc<Mutex<Vec<(Severity, Diagnostic)>>>,
}

impl CollectingSink {
    pub fn taken(&self) -> Vec<(Severity, Diagnostic)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, severity: Severity, diagnostic: &Diagnostic) {
        self.events.lock().unwrap().push((severity, diagnostic.clone()));
    }
}
