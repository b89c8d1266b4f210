//! Continuity counter and duplicate packet tracking for a single PID

use crate::constants::CC_MODULUS;

/// Outcome of checking one packet's continuity counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    InOrder,
    /// First repeat of the previous counter; payload discarded
    Duplicate,
    /// Counter repeated again right after a duplicate
    IllegalDuplicate,
    Discontinuous,
}

/// `true` when `cc` is the modulo-16 successor of `last`
pub fn follows(last: u8, cc: u8) -> bool {
    (last + 1) % CC_MODULUS == cc
}

#[derive(Debug, Default, Clone)]
pub struct ContinuityTracker {
    last_counter: Option<u8>,
    last_packet_no: Option<u64>,
    dup_found: bool,
    duplicates: u64,
    errors: u64,
}

impl ContinuityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `cc` against the last accepted counter and updates state.
    /// The null PID is never checked.
    pub fn classify(&mut self, cc: u8, packet_no: u64, null_pid: bool) -> Continuity {
        let cc = cc & 0x0F;
        match self.last_counter {
            None => self.accept(cc, packet_no),
            Some(_) if null_pid => self.accept(cc, packet_no),
            Some(last) if follows(last, cc) => self.accept(cc, packet_no),
            Some(last) if last == cc => {
                if self.dup_found {
                    Continuity::IllegalDuplicate
                } else {
                    self.dup_found = true;
                    self.duplicates += 1;
                    Continuity::Duplicate
                }
            }
            Some(_) => {
                self.last_counter = None;
                self.errors += 1;
                Continuity::Discontinuous
            }
        }
    }

    fn accept(&mut self, cc: u8, packet_no: u64) -> Continuity {
        self.last_counter = Some(cc);
        self.last_packet_no = Some(packet_no);
        self.dup_found = false;
        Continuity::InOrder
    }

    pub fn last_counter(&self) -> Option<u8> {
        self.last_counter
    }

    /// Packet index of the last in-order packet
    pub fn last_packet_no(&self) -> Option<u64> {
        self.last_packet_no
    }

    pub fn dup_found(&self) -> bool {
        self.dup_found
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}
