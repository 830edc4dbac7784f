//! Entry point for `rudp`.
//!
//! Parses CLI arguments and dispatches into **send** (initiator) or
//! **receive** (responder) mode.  All protocol work is delegated to library
//! modules; this file owns only process setup, random benchmark payload
//! generation, writing received runs to disk, and the summary report.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rand::RngCore;

use rudp::connection::{ConnError, Connection};
use rudp::socket::Socket;
use rudp::stats::TransferSummary;

/// Reliable UDP transfer benchmark.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run as the receiver, listening for one incoming connection.
    Receive {
        /// Local address to bind (e.g. 0.0.0.0:12345).
        #[arg(short, long, default_value = "0.0.0.0:12345")]
        bind: SocketAddr,
        /// Directory for received run files.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Run as the sender, connecting to a receiver and transmitting runs of
    /// random data.
    Send {
        /// Receiver address (e.g. 127.0.0.1:12345).
        #[arg(short, long)]
        peer: SocketAddr,
        /// Bytes of random payload per run.
        #[arg(short, long, default_value_t = 2 * 1024 * 1024)]
        size: usize,
        /// Number of runs to transmit before closing.
        #[arg(short, long, default_value_t = 1)]
        runs: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.mode {
        Mode::Receive { bind, output_dir } => run_receiver(bind, output_dir).await,
        Mode::Send { peer, size, runs } => run_sender(peer, size, runs).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initiator: connect, transmit `runs` runs of `size` random bytes, close.
async fn run_sender(peer: SocketAddr, size: usize, runs: u32) -> Result<(), ConnError> {
    let socket = Socket::bind("0.0.0.0:0".parse().expect("static addr")).await?;
    log::info!("sender bound to {}; connecting to {peer}", socket.local_addr);

    let mut conn = Connection::connect(socket, peer).await?;
    let mut summary = TransferSummary::new();
    let mut payload = vec![0u8; size];

    for run in 1..=runs {
        let generated = Instant::now();
        rand::thread_rng().fill_bytes(&mut payload);
        log::info!(
            "run #{run}: generated {:.2} MB of random data in {:.1} ms",
            size as f64 / (1024.0 * 1024.0),
            generated.elapsed().as_secs_f64() * 1000.0
        );

        match conn.send_run(&payload).await {
            Ok(stats) => summary.record(stats),
            Err(e) => {
                log::error!("run #{run} failed: {e}");
                conn.close().await;
                return Err(e);
            }
        }
    }

    conn.close().await;
    println!("{summary}");
    Ok(())
}

/// Write sink that creates its file on the first byte written, so a run
/// that never produces data (FIN before any segment, transport failure)
/// leaves nothing on disk.
struct LazyFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl LazyFile {
    fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn created(&self) -> bool {
        self.file.is_some()
    }
}

impl Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.file {
            Some(f) => f.write(buf),
            None => {
                let mut f = BufWriter::new(File::create(&self.path)?);
                let n = f.write(buf)?;
                self.file = Some(f);
                Ok(n)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

/// Responder: accept one handshake, write each run to a file, report on FIN.
async fn run_receiver(bind: SocketAddr, output_dir: PathBuf) -> Result<(), ConnError> {
    let socket = Socket::bind(bind).await?;
    log::info!("listening for a connection on {}", socket.local_addr);

    let mut conn = Connection::accept(socket).await?;
    log::info!("peer {} connected", conn.peer());

    let mut summary = TransferSummary::new();
    loop {
        let run_number = conn.run_count() + 1;
        let path = output_dir.join(format!("received_run_{run_number}.bin"));
        let mut sink = LazyFile::new(path.clone());

        match conn.receive_run(&mut sink).await {
            Ok(stats) => {
                // A completed empty run still gets its (empty) file.
                if !sink.created() {
                    File::create(&path)?;
                }
                log::info!(
                    "run #{run_number}: {} bytes saved to {}",
                    stats.bytes,
                    path.display()
                );
                summary.record(stats);
            }
            Err(ConnError::PeerClosed) => break,
            Err(e) => {
                // An aborted run cannot be resumed; drop its partial file.
                if sink.created() {
                    drop(sink);
                    let _ = std::fs::remove_file(&path);
                }
                return Err(e);
            }
        }
    }

    conn.close().await;
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_file_leaves_no_file_without_bytes() {
        let path = std::env::temp_dir().join("rudp_lazy_untouched.bin");
        let _ = std::fs::remove_file(&path);

        let mut sink = LazyFile::new(path.clone());
        sink.flush().unwrap();
        assert!(!sink.created());
        drop(sink);
        assert!(!path.exists());
    }

    #[test]
    fn lazy_file_creates_on_first_byte() {
        let path = std::env::temp_dir().join("rudp_lazy_written.bin");
        let _ = std::fs::remove_file(&path);

        let mut sink = LazyFile::new(path.clone());
        sink.write_all(b"abc").unwrap();
        assert!(sink.created());
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        let _ = std::fs::remove_file(&path);
    }
}
