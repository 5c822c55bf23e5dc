//! swiftdetect - live detection overlay client
//!
//! Subcommands:
//! - `health`: query the detector's health endpoint
//! - `detect`: capture one frame and send it in request mode
//! - `stream`: stream frames one at a time until Ctrl-C
//!
//! Settings come from `SWIFTDETECT_CONFIG` and `SWIFTDETECT_*` variables;
//! flags below override them.

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use swift_detect::transport::DEFAULT_STREAM_POLL;
use swift_detect::{
    CameraSource, ClientConfig, Detector, FrameEncoding, JsonLinesSink, LogSink, OverlaySink,
    SessionState, ViewingSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Live object-detection overlay client")]
struct Args {
    /// Detector base URL, or stub://<name> for the in-process detector.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Frame source: stub://<name>, an http(s) snapshot URL, or an image path.
    #[arg(long, global = true)]
    source: Option<String>,

    /// Report only objects confirmed on consecutive frames (`true`/`false`).
    #[arg(long, global = true, action = ArgAction::Set, value_name = "BOOL")]
    smoothing: Option<bool>,

    /// Print results as JSON lines on stdout instead of logging them.
    #[arg(long, global = true, env = "SWIFTDETECT_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the detector's health endpoint.
    Health,
    /// Capture one frame and send it in request mode.
    Detect,
    /// Stream frames until Ctrl-C or --max-frames responses.
    Stream {
        #[arg(long, env = "SWIFTDETECT_MAX_FRAMES")]
        max_frames: Option<u64>,
    },
}

impl Args {
    /// Flags given on the command line win over file and environment settings.
    fn apply_overrides(&self, cfg: &mut ClientConfig) {
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(source) = &self.source {
            cfg.source.uri = source.clone();
        }
        if let Some(smoothing) = self.smoothing {
            cfg.smoothing = smoothing;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = ClientConfig::load()?;
    args.apply_overrides(&mut cfg);

    let endpoint = cfg.detector_endpoint()?;
    let detector = Detector::connect(&endpoint, DEFAULT_STREAM_POLL);

    let sink: Box<dyn OverlaySink> = if args.json {
        Box::new(JsonLinesSink::new(std::io::stdout()))
    } else {
        Box::new(LogSink)
    };

    match args.command {
        Command::Health => {
            let status = detector
                .health()
                .with_context(|| format!("health check against {} failed", cfg.endpoint))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Detect => {
            let mut source = CameraSource::new(cfg.source.clone())?;
            let mut session =
                ViewingSession::new(cfg.params.clone(), sink).with_smoothing(cfg.smoothing);
            let frame = session.detect_once(
                &mut source,
                &detector,
                &FrameEncoding::jpeg(cfg.request_quality),
            )?;
            log::info!("detect: {}", frame.watermark());
        }
        Command::Stream { max_frames } => {
            let stop = Arc::new(AtomicBool::new(false));
            let handler_stop = stop.clone();
            ctrlc::set_handler(move || {
                handler_stop.store(true, Ordering::SeqCst);
            })
            .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

            let mut source = CameraSource::new(cfg.source.clone())?;
            let mut session =
                ViewingSession::new(cfg.params.clone(), sink).with_smoothing(cfg.smoothing);
            log::info!(
                "streaming {} to {} (Ctrl-C to stop)",
                cfg.source.uri,
                cfg.endpoint
            );
            let summary = session.stream(
                &mut source,
                &detector,
                &FrameEncoding::jpeg(cfg.stream_quality),
                &stop,
                max_frames,
            )?;
            log::info!(
                "stream ended ({:?}): {} frames sent, {} answered, {} dropped",
                summary.state,
                summary.frames_sent,
                summary.responses,
                summary.dropped
            );
            if summary.state == SessionState::Errored {
                return Err(anyhow!("stream session failed"));
            }
        }
    }

    Ok(())
}
