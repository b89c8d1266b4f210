use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

use crate::constants::TS_PACKET_SIZE;

/// What a PID turned out to carry, decided on its first unit start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StreamKind {
    #[default]
    #[serde(rename = "-")]
    Unknown,
    /// Sections (PSI/SI tables or private sections)
    #[serde(rename = "PSI")]
    Psi,
    /// PES; only counted, never reassembled
    #[serde(rename = "PES")]
    Pes,
}

/// Where packets are read from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// UDP unicast or multicast (IPv4)
    Udp(SocketAddr),
    /// Capture file, read once to the end
    File(PathBuf),
}

/// Configuration options for the inspector
#[derive(Debug, Clone)]
pub struct Options {
    pub input: InputSource,
    /// Frame size on the wire: 188, 192 (M2TS) or 204 (with RS parity)
    pub packet_size: usize,
    /// Seconds between JSON snapshots
    pub refresh_secs: u64,
}

impl Options {
    pub fn new(input: InputSource) -> Self {
        Self {
            input,
            packet_size: TS_PACKET_SIZE,
            refresh_secs: 2,
        }
    }
}
