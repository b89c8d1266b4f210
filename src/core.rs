use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::network::create_udp_socket;
use crate::processor::PacketProcessor;
use crate::report::Reporter;
use crate::types::{InputSource, Options};

/// Reads the configured input to its end (file) or until Ctrl-C (UDP),
/// printing JSON snapshots along the way and a final one on exit.
pub async fn run(opts: Options) -> anyhow::Result<()> {
    if !matches!(opts.packet_size, TS_PACKET_SIZE | M2TS_PACKET_SIZE | RS_PACKET_SIZE) {
        anyhow::bail!("unsupported packet size {}", opts.packet_size);
    }
    let mut processor = PacketProcessor::new(opts.packet_size);

    match &opts.input {
        InputSource::Udp(addr) => run_udp(*addr, &opts, &mut processor).await?,
        InputSource::File(path) => run_file(path, &opts, &mut processor).await?,
    }

    println!("{}", Reporter::generate_json_report(&processor));
    Ok(())
}

async fn run_udp(addr: SocketAddr, opts: &Options, processor: &mut PacketProcessor) -> anyhow::Result<()> {
    let socket = create_udp_socket(addr)?;
    let sock = UdpSocket::from_std(socket.into())?;
    info!("listening on {addr}");

    let mut buf = [0u8; 2048];
    let mut framer = FrameAligner::new(opts.packet_size);
    let mut ticker = tokio::time::interval(Duration::from_secs(opts.refresh_secs.max(1)));
    ticker.tick().await;

    loop {
        tokio::select! {
            res = sock.recv(&mut buf) => {
                let n = res?;
                if n == 0 {
                    continue;
                }
                framer.push(&buf[..n]);
                while let Some(frame) = framer.next_frame() {
                    processor.process_packet(&frame);
                }
            }
            _ = ticker.tick() => {
                println!("{}", Reporter::generate_json_report(processor));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping");
                break;
            }
        }
    }
    Ok(())
}

async fn run_file(path: &Path, opts: &Options, processor: &mut PacketProcessor) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    info!("reading {}", path.display());

    let mut buf = vec![0u8; opts.packet_size * 1024];
    let mut framer = FrameAligner::new(opts.packet_size);
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        framer.push(&buf[..n]);
        while let Some(frame) = framer.next_frame() {
            processor.process_packet(&frame);
        }
    }
    if framer.skipped() > 0 {
        warn!("{} bytes skipped while searching for sync", framer.skipped());
    }
    Ok(())
}

/// Cuts a byte stream into frames that start (after the M2TS prefix, if
/// any) with a sync byte, skipping garbage in between.
pub struct FrameAligner {
    size: usize,
    sync_at: usize,
    buf: BytesMut,
    skipped: u64,
}

impl FrameAligner {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            sync_at: if size == M2TS_PACKET_SIZE { M2TS_PREFIX_LEN } else { 0 },
            buf: BytesMut::with_capacity(size * 8),
            skipped: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            if self.buf.len() < self.size {
                return None;
            }
            if self.buf[self.sync_at] == TS_SYNC_BYTE {
                return Some(self.buf.split_to(self.size).freeze());
            }
            let skip = self.buf[self.sync_at + 1..]
                .iter()
                .position(|&b| b == TS_SYNC_BYTE)
                .map_or(self.buf.len() - self.sync_at, |p| p + 1);
            debug!("lost sync, skipping {skip} bytes");
            self.buf.advance(skip);
            self.skipped += skip as u64;
        }
    }

    /// Bytes thrown away while resynchronizing
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
