use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use rflink::link::{LinkConfig, LinkError, LinkSession};
use rflink::radio::loopback;
use rflink::utils::consts::PAYLOAD_SIZE;
use rflink::utils::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about = "Point-to-point CPFSK data modem", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a text message across a simulated channel and print what arrives
    Text {
        message: String,
        /// Channel noise amplitude (DAC counts)
        #[arg(long, default_value_t = 4)]
        noise: i16,
    },
    /// Transfer a file across a simulated channel
    File {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Channel noise amplitude (DAC counts)
        #[arg(long, default_value_t = 4)]
        noise: i16,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .expect("install ctrl-c handler");
    }

    let outcome = match cli.command {
        Commands::Text { message, noise } => {
            run_transfer(message.into_bytes(), noise, &interrupted).map(|received| {
                println!("{}", String::from_utf8_lossy(&received));
            })
        }
        Commands::File {
            input,
            output,
            noise,
        } => run_file_transfer(&input, &output, noise, &interrupted),
    };

    if let Err(e) = outcome {
        error!("transfer failed: {e}");
        std::process::exit(1);
    }
}

fn run_file_transfer(
    input: &PathBuf,
    output: &PathBuf,
    noise: i16,
    interrupted: &Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    info!("read {} bytes from {}", data.len(), input.display());
    let received = run_transfer(data, noise, interrupted)?;
    std::fs::write(output, &received)?;
    info!("wrote {} bytes to {}", received.len(), output.display());
    Ok(())
}

/// Run two in-process link sessions joined by the loopback channel and push
/// `data` from one to the other. Real deployments hand `LinkSession` an SDR
/// behind the radio traits instead.
fn run_transfer(
    data: Vec<u8>,
    noise: i16,
    interrupted: &Arc<AtomicBool>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let ((a_tx, a_rx), (b_tx, b_rx)) = loopback::duplex_pair(noise);
    let sender = LinkSession::new(a_tx, a_rx, LinkConfig::default());
    let receiver = LinkSession::new(b_tx, b_rx, LinkConfig::default());

    let total = data.len();
    let collector = thread::spawn(move || -> Result<Vec<u8>, LinkError> {
        let mut out = Vec::with_capacity(total);
        while out.len() < total {
            out.extend(receiver.recv_timeout(Duration::from_secs(10))?);
        }
        receiver.close();
        Ok(out)
    });

    let chunk_count = data.len().div_ceil(PAYLOAD_SIZE) as u64;
    let bar = ProgressBar::new(chunk_count);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} frames {msg}")
            .expect("progress template"),
    );

    for chunk in data.chunks(PAYLOAD_SIZE) {
        if interrupted.load(Ordering::Relaxed) {
            bar.abandon_with_message("interrupted");
            sender.close();
            return Err(Box::new(LinkError::Closed));
        }
        sender.send(chunk)?;
        bar.inc(1);
    }
    bar.finish();
    sender.close();

    let received = collector
        .join()
        .map_err(|_| Box::new(LinkError::Closed) as Box<dyn std::error::Error>)??;
    info!("transferred {} bytes", received.len());
    Ok(received)
}
