// src/lib.rs
//! Per-PID MPEG-TS state: continuity and duplicate tracking, PCR based
//! bitrate, and reassembly of sections from packet payloads.

pub mod inspector {
    pub use crate::types::{InputSource, Options};

    /// Async entry-point; returns at end of file, on Ctrl-C or socket error
    pub async fn run(opts: Options) -> anyhow::Result<()> {
        crate::core::run(opts).await
    }
}

pub mod constants;
pub mod continuity;
pub mod diagnostics;
pub mod error;
pub mod mip;
pub mod packet;
pub mod pcr;
pub mod pid;
pub mod processor;
pub mod report;
pub mod section;
pub mod stats;
pub mod types;

mod core;
mod network;

#[cfg(test)]
mod test_utils;

pub use continuity::{Continuity, ContinuityTracker};
pub use crate::core::FrameAligner;
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use error::PacketError;
pub use packet::{AdaptationField, TsPacket};
pub use pcr::{PcrCapture, PcrSample};
pub use pid::{Ingested, PidState};
pub use processor::PacketProcessor;
pub use section::{SectionGatherer, SectionRecord};
pub use stats::{PidStats, SectionTally};
pub use types::StreamKind;
