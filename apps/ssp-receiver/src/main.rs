use anyhow::{Context, Result};
use clap::Parser;
use ssp_receiver::{
    config::{Config, Overrides},
    gst_utils,
    receiver::Receiver,
    signals, CodecHint, ReceiverError, RunOutcome, StreamMode, StreamStyle,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Preview or record SSP camera streams", long_about = None)]
struct Args {
    /// Camera IP address
    #[arg(long, env = "SSP_CAMERA_IP")]
    ip: Option<String>,

    /// Camera port (default: 9999)
    #[arg(long, env = "SSP_CAMERA_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Stream mode (default: video)
    #[arg(long, value_enum)]
    mode: Option<StreamMode>,

    /// Video codec (default: auto-detect)
    #[arg(long, value_enum)]
    codec: Option<CodecHint>,

    /// Record to file instead of preview
    #[arg(long, value_name = "PATH")]
    record: Option<PathBuf>,

    /// Camera stream to request (default: default)
    #[arg(long, value_enum)]
    stream_style: Option<StreamStyle>,

    /// Receive buffer size of the source in bytes
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Enable HLG mode on the source
    #[arg(long, overrides_with = "no_hlg")]
    hlg: bool,

    /// Disable HLG mode, overriding the configuration file
    #[arg(long, overrides_with = "hlg")]
    no_hlg: bool,

    /// Preview width in pixels (default: 640)
    #[arg(long)]
    width: Option<u32>,

    /// Preview height in pixels (default: 480)
    #[arg(long)]
    height: Option<u32>,

    /// Path to an optional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Check available GStreamer elements and exit
    #[arg(long)]
    check_plugins: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            ip: self.ip.clone(),
            port: self.port,
            mode: self.mode,
            codec: self.codec,
            stream_style: self.stream_style,
            buffer_size: self.buffer_size,
            hlg: match (self.hlg, self.no_hlg) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            width: self.width,
            height: self.height,
        }
    }
}

fn init_logging(debug: bool, log_level: &str) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_overrides(args.overrides());

    init_logging(args.debug, &config.app.log_level);
    info!("Starting SSP receiver v{}", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        info!("Configuration file: {:?}", path);
    }

    gst_utils::initialize()?;

    if args.check_plugins {
        gst_utils::print_plugin_info();
        return Ok(());
    }

    let stream = config.stream_config()?;
    debug!("Stream configuration: {:?}", stream);

    let interrupt = CancellationToken::new();
    let listener = signals::spawn_listener(interrupt.clone());

    let receiver = Receiver::new(stream, interrupt.clone())
        .with_poll_interval(Duration::from_millis(config.app.poll_interval_ms));
    let record = args.record.clone();

    // The run loop blocks, keep it off the runtime threads
    let result = tokio::task::spawn_blocking(move || match record {
        Some(path) => receiver.start_recording(&path),
        None => receiver.start_preview(),
    })
    .await
    .context("Receiver thread panicked")?;

    interrupt.cancel();
    if let Err(e) = listener.await {
        debug!("Signal listener ended abnormally: {}", e);
    }

    match result? {
        RunOutcome::Error { message, debug: debug_details } => {
            // Reported on the console already, the shutdown itself was orderly
            info!(
                "Receiver stopped: {}",
                ReceiverError::RuntimeError { message, debug: debug_details }
            );
        }
        outcome => info!("Receiver stopped: {:?}", outcome),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            println!("Failed to start receiver");
            ExitCode::FAILURE
        }
    }
}
