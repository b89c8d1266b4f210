//! Diagnostics emitted while tracking a PID.
//!
//! Per-PID state never fails; anomalies are counted and reported through a
//! [`DiagnosticSink`] handed in at construction. [`TracingSink`] forwards
//! them to `tracing`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PacketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Continuity counter broke the modulo-16 increment
    ContinuityError {
        pid: u16,
        last: u8,
        new: u8,
        last_packet_no: Option<u64>,
        packet_no: u64,
    },
    /// Second duplicate in a row (third copy in total)
    IllegalDuplicate {
        pid: u16,
        counter: u8,
        last_packet_no: Option<u64>,
        packet_no: u64,
    },
    /// Adaptation field could not be decoded; treated as absent
    MalformedAdaptationField {
        pid: u16,
        packet_no: u64,
        error: PacketError,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ContinuityError { pid, last, new, last_packet_no, packet_no } => write!(
                f,
                "continuity error, PID={pid}, last={last}, new={new}, last_no={}, packet_no={packet_no}",
                fmt_packet_no(*last_packet_no)
            ),
            Diagnostic::IllegalDuplicate { pid, counter, last_packet_no, packet_no } => write!(
                f,
                "second dup packet (third total), illegal, PID={pid}, counter={counter}, last_no={}, packet_no={packet_no}",
                fmt_packet_no(*last_packet_no)
            ),
            Diagnostic::MalformedAdaptationField { pid, packet_no, error } => write!(
                f,
                "malformed adaptation field ignored, PID={pid}, packet_no={packet_no}: {error}"
            ),
        }
    }
}

fn fmt_packet_no(no: Option<u64>) -> String {
    no.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// Receiver of per-PID diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, severity: Severity, diagnostic: &Diagnostic);
}

pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards diagnostics to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, diagnostic: &Diagnostic) {
        match severity {
            Severity::Warning => warn!(target: "mpegts_pid_inspector::pid", "{diagnostic}"),
            Severity::Debug => debug!(target: "mpegts_pid_inspector::pid", "{diagnostic}"),
        }
    }
}

/// Default sink used when the caller does not provide one
pub fn tracing_sink() -> SharedSink {
    Arc::new(TracingSink)
}
