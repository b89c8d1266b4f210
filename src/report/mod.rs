//! Report generation for per-PID inspection results

use serde::Serialize;

use crate::mip::NetworkSync;
use crate::processor::PacketProcessor;
use crate::stats::PidStats;

/// Complete snapshot of one transport stream
#[derive(Debug, Clone, Serialize)]
pub struct InspectorReport {
    pub ts_time: String,
    pub packet_size: usize,
    pub packets: u64,
    pub sync_errors: u64,
    /// PCR based bitrate of the whole stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    pub pids: Vec<PidStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_sync: Option<NetworkSync>,
}

/// Report generator for inspection results
pub struct Reporter;

impl Reporter {
    /// Generate a structured InspectorReport for API consumers
    pub fn create_report(processor: &PacketProcessor) -> InspectorReport {
        let sync = processor.network_sync();
        InspectorReport {
            ts_time: chrono::Utc::now().to_rfc3339(),
            packet_size: processor.packet_size(),
            packets: processor.packets(),
            sync_errors: processor.sync_errors(),
            bitrate: processor.bitrate(),
            pids: processor.stats(),
            network_sync: (sync.mips + sync.malformed > 0).then(|| sync.clone()),
        }
    }

    /// Generate pretty-printed JSON string for CLI output
    pub fn generate_json_report(processor: &PacketProcessor) -> String {
        let rep = Self::create_report(processor);
        serde_json::to_string_pretty(&rep)
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}
