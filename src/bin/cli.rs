use std::path::PathBuf;

use clap::Parser;
use mpegts_pid_inspector::inspector::{InputSource, Options, run};
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[clap(about = "Per-PID continuity, PCR bitrate and section statistics for MPEG-TS")]
struct Opt {
    /// UDP socket to bind + listen (IPv4)
    #[clap(long, default_value = "239.1.1.2:1234", conflicts_with = "file")]
    addr: String,

    /// Read a capture file instead of listening on UDP
    #[clap(long)]
    file: Option<PathBuf>,

    /// Frame size: 188, 192 (M2TS) or 204
    #[clap(long, default_value_t = 188)]
    packet_size: usize,

    /// Refresh interval for the JSON snapshot (UDP only)
    #[clap(long, default_value_t = 2)]
    refresh: u64,

    /// Log continuity diagnostics at debug level too
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    init_tracing(opt.verbose);

    let input = match opt.file {
        Some(path) => InputSource::File(path),
        None => InputSource::Udp(opt.addr.parse()?),
    };
    run(Options {
        input,
        packet_size: opt.packet_size,
        refresh_secs: opt.refresh,
    })
    .await
}
