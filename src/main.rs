//! spi_decode: decode a CC1101 SPI sniffer trace
//!
//! Reads the sniffer's live port (appending everything to a capture file) or
//! replays a capture, and appends the decoded transactions to a command log
//! and the packets to a packet log.
//!
//! Usage:
//!   spi_decode --port 5 -r
//!   spi_decode --file --capture spi.dat --echo
//!
//! Exit status: 0 at end of input, 1 when a source or log cannot be opened,
//! 2 on a usage error, 99 when the trace violates the radio protocol.

use cc1101_sniff::{
    Cc1101Decoder, DecoderConfig, LogFormatter, Result, SnifferError, TraceSource, WorkError,
};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// Exit status for a fatal protocol fault
const EXIT_FATAL: u8 = 99;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Live sniffer port number, read from /dev/ttyACM<N>
    #[arg(short = 'c', long, default_value_t = 5, conflicts_with = "file")]
    port: u8,

    /// Sniffer device path, overriding --port
    #[arg(long, conflicts_with = "file")]
    device: Option<PathBuf>,

    /// Replay the capture file instead of reading the port
    #[arg(short, long)]
    file: bool,

    /// Capture file: appended to from the port, or replayed with --file
    #[arg(long, default_value = "spi.dat")]
    capture: PathBuf,

    /// Record every receive enable (SRX) in the packet log
    #[arg(short, long)]
    receive_enable: bool,

    /// Record every chip reset (SRES) in the packet log
    #[arg(long)]
    resets: bool,

    /// Detailed transaction log, appended to
    #[arg(long, default_value = "spi.cmds.txt")]
    commands_log: PathBuf,

    /// Packet log, appended to
    #[arg(long, default_value = "spi.pkts.txt")]
    packets_log: PathBuf,

    /// Echo the transaction log to the console
    #[arg(long)]
    echo: bool,
}

impl Args {
    fn device(&self) -> PathBuf {
        self.device
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/dev/ttyACM{}", self.port)))
    }
}

type Logs = LogFormatter<BufWriter<File>, BufWriter<File>>;

fn open_log(path: &Path) -> Result<BufWriter<File>> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|e| SnifferError::Source(format!("cannot open log {}: {e}", path.display())))
}

fn decode(source: &mut TraceSource, decoder: &mut Cc1101Decoder, logs: &mut Logs) -> Result<()> {
    loop {
        match source.recv() {
            Ok(chunk) => {
                decoder.feed(&chunk, logs)?;
                // Keep the logs current; a live session ends by interrupt
                logs.flush()?;
            }
            Err(WorkError::Shutdown) => break,
            Err(e) => return Err(SnifferError::Source(e.to_string())),
        }
    }
    decoder.finish(logs)?;
    info!(
        "End of input: {} bytes, {} transactions, {} log lines",
        decoder.offset(),
        decoder.transactions(),
        logs.lines()
    );
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = DecoderConfig::default()
        .with_receive_enable_records(args.receive_enable)
        .with_reset_records(args.resets);

    let commands = open_log(&args.commands_log)?;
    let mut packets = open_log(&args.packets_log)?;
    // Blank line between sessions in the packet log
    writeln!(packets)?;

    let mut logs = LogFormatter::new(commands, packets);
    if args.echo {
        logs = logs.with_echo(std::io::stdout());
    }

    let mut source = if args.file {
        TraceSource::file(&args.capture)?
    } else {
        TraceSource::port(args.device(), &args.capture)?
    };

    info!("Starting");
    let mut decoder = Cc1101Decoder::new(config);
    let outcome = decode(&mut source, &mut decoder, &mut logs);
    if let Err(SnifferError::Decode(failure)) = &outcome {
        logs.write_fatal(failure)?;
    }
    logs.flush()?;
    source.stop();
    outcome
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("SPI decoder, V{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(SnifferError::Decode(failure)) => {
            error!("**** {}, {:02X}", failure.kind, failure.param);
            error!("{}", failure.neighbourhood());
            ExitCode::from(EXIT_FATAL)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
