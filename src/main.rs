//! Rubix Capture CLI
//!
//! Drives the capture screen from the terminal. Each line on stdin is one
//! tap: `s` shutter, `f` flash, `l` flip lens, `q` quit.

use clap::{Parser, ValueEnum};
use rubix_capture::{
    capture::{
        AlwaysGranted, CameraPlatform, FileConfig, LensFacing, LogFeedback, MockPlatform,
        MockPlatformConfig, Viewport,
    },
    metrics::MetricsRegistry,
    screen::{CaptureScreen, EventOutcome, UserEvent},
    session::CaptureSessionController,
    storage::FsMediaStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FacingArg {
    Front,
    Back,
}

impl From<FacingArg> for LensFacing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Front => LensFacing::Front,
            FacingArg::Back => LensFacing::Back,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rubix-capture", version, about = "Camera capture screen")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Media store root directory (overrides the config file)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Preview width in pixels
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Preview height in pixels
    #[arg(long, default_value_t = 1920)]
    height: u32,

    /// Lens to open first (overrides the config file)
    #[arg(long, value_enum)]
    facing: Option<FacingArg>,

    /// Simulate a device without a flash unit
    #[arg(long)]
    no_flash: bool,

    /// Native camera index to capture from instead of the mock camera
    #[cfg(feature = "camera")]
    #[arg(long)]
    device: Option<u32>,
}

enum Command {
    Tap(UserEvent),
    Quit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "s" | "shutter" => Some(Command::Tap(UserEvent::Shutter)),
        "f" | "flash" => Some(Command::Tap(UserEvent::ToggleFlash)),
        "l" | "flip" => Some(Command::Tap(UserEvent::FlipCamera)),
        "q" | "quit" => Some(Command::Quit),
        "h" | "help" | "?" => Some(Command::Help),
        _ => None,
    }
}

fn platform(args: &Args) -> Arc<dyn CameraPlatform> {
    #[cfg(feature = "camera")]
    if let Some(device) = args.device {
        info!(device, "Using native camera");
        return Arc::new(rubix_capture::capture::NokhwaPlatform::new(device));
    }

    info!("Using mock camera");
    Arc::new(MockPlatform::with_config(MockPlatformConfig {
        has_flash: !args.no_flash,
        ..Default::default()
    }))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Rubix Capture v{}", rubix_capture::VERSION);

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(root) = &args.root {
        config.storage.root = root.clone();
    }
    if let Some(facing) = args.facing {
        config.session.initial_facing = facing.into();
    }

    let metrics = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    #[cfg(feature = "metrics")]
    let (metrics_stop, metrics_task) = {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = (config.metrics.port != 0).then(|| {
            let server = rubix_capture::metrics::MetricsServer::new(
                rubix_capture::metrics::MetricsServerConfig::with_port(config.metrics.port),
                Arc::clone(&metrics),
            );
            tokio::spawn(server.run(async move {
                let _ = rx.await;
            }))
        });
        (tx, task)
    };

    info!(
        root = %config.storage.root.display(),
        album = %config.storage.relative_path,
        "Saving photos to media store"
    );

    let controller = CaptureSessionController::new(
        platform(&args),
        Arc::new(FsMediaStore::new(config.storage.root.clone())),
        Arc::new(LogFeedback),
        config.session.clone(),
        config.storage.relative_path.clone(),
    )
    .with_metrics(Arc::clone(&metrics));

    let mut screen = CaptureScreen::new(Arc::new(controller), Arc::new(AlwaysGranted));
    if screen
        .open(Viewport::new(args.width, args.height))
        .await
        .is_none()
    {
        warn!("Camera did not start; shutter and flash are inactive");
    }

    println!("Commands: s = shutter, f = flash, l = flip lens, q = quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = stop_rx.recv() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Some(Command::Tap(event)) => match screen.dispatch(event).await {
                EventOutcome::Ignored => println!("(nothing to do)"),
                outcome => info!(?outcome, "Handled {:?}", event),
            },
            Some(Command::Quit) => break,
            Some(Command::Help) | None => {
                println!("Commands: s = shutter, f = flash, l = flip lens, q = quit")
            }
        }
    }

    let results = screen.close().await;
    let saved = results.iter().filter(|r| r.is_ok()).count();
    info!(
        pending_saved = saved,
        pending_failed = results.len() - saved,
        "Screen closed"
    );

    #[cfg(feature = "metrics")]
    {
        let _ = metrics_stop.send(());
        if let Some(task) = metrics_task {
            match task.await {
                Ok(Err(e)) => warn!("Metrics server error: {}", e),
                Err(e) => warn!("Metrics server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }

    match metrics.encode() {
        Ok(output) => tracing::debug!("Final metrics:\n{}", output),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
}
