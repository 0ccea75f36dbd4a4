//! View-Finder Demonstration CLI
//!
//! Drives a full view-finder against a mock camera: frames are pushed at the
//! configured frame rate, decoded barcodes are printed to stdout as JSON
//! lines and logs go to stderr.

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use viewfinder::{
    capture::{CameraType, FileConfig, MockCamera, MockCameraPool, PreviewFrame, PreviewSurface},
    metrics::MetricsSnapshot,
    pipeline::{JsonLinesSink, ViewFinder, WorkerPool},
    streaming::{IngestionClientFactory, MockIngestion},
};

#[derive(Parser)]
#[command(name = "viewfinder")]
#[command(about = "Camera view-finder with barcode scanning, driven by a mock camera")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to feed (overrides the configuration)
    #[arg(short, long)]
    frames: Option<u32>,

    /// Camera to open
    #[arg(long, value_enum)]
    camera: Option<CameraArg>,

    /// Image to use as every preview frame (converted to grayscale)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Keep feeding frames until Ctrl+C
    #[arg(long)]
    continuous: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CameraArg {
    Back,
    Front,
}

impl From<CameraArg> for CameraType {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Back => CameraType::Back,
            CameraArg::Front => CameraType::Front,
        }
    }
}

const SURFACE_WIDTH: u32 = 640;
const SURFACE_HEIGHT: u32 = 480;

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("View-finder v{}", viewfinder::VERSION);

    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(frames) = cli.frames {
        config.output.frame_count = frames;
    }
    if let Some(camera) = cli.camera {
        config.camera.camera_type = camera.into();
    }
    config.output.continuous |= cli.continuous;
    config.validate()?;

    let source = match &cli.image {
        Some(path) => {
            let image = image::open(path)?.to_luma8();
            info!(path = %path.display(), width = image.width(), height = image.height(), "Loaded frame image");
            Some(image)
        }
        None => None,
    };

    let pool = Arc::new(MockCameraPool::with_both());
    let workers = Arc::new(WorkerPool::new(config.scanner.workers)?);
    let ingestion: Option<Arc<dyn IngestionClientFactory>> = config
        .stream
        .enabled
        .then(|| Arc::new(MockIngestion::new()) as Arc<dyn IngestionClientFactory>);

    let viewfinder = Arc::new(ViewFinder::from_config(&config, pool.clone(), workers.clone(), ingestion));
    viewfinder.attach_sink(Arc::new(JsonLinesSink::new(std::io::stdout())));

    #[cfg(feature = "metrics")]
    start_metrics_server(config.output.metrics_port, Arc::clone(&viewfinder))?;

    let outcome = viewfinder.on_surface_available(PreviewSurface::new(1, SURFACE_WIDTH, SURFACE_HEIGHT))?;
    info!(?outcome, camera = %config.camera.camera_type, "Surface available");
    if config.camera.torch {
        if let Err(e) = viewfinder.set_torch(true) {
            warn!(error = %e, "Torch not enabled");
        }
    }

    let stop = Arc::new(AtomicBool::new(false));
    if config.output.continuous {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
        info!("Feeding frames until Ctrl+C");
    }

    let camera = pool
        .device(config.camera.camera_type)
        .ok_or("mock camera missing from pool")?;
    let interval = Duration::from_millis(1000 / u64::from(config.stream.frame_rate.max(1)));

    let mut sequence = 0u64;
    while !stop.load(Ordering::SeqCst)
        && (config.output.continuous || sequence < u64::from(config.output.frame_count))
    {
        let frame = match &source {
            Some(image) => PreviewFrame::gray(image.as_raw().clone(), image.width(), image.height(), sequence),
            None => MockCamera::noise_frame(SURFACE_WIDTH, SURFACE_HEIGHT, sequence),
        };
        camera.emit_frame(frame);
        sequence += 1;
        std::thread::sleep(interval);
    }

    if let Err(e) = viewfinder.on_surface_destroyed() {
        warn!(error = %e, "Camera stop reported an error");
    }
    workers.shutdown();

    let snapshot = MetricsSnapshot::from_view_finder(&viewfinder);
    info!(
        frames = sequence,
        decoded = snapshot.decode_tasks,
        matches = snapshot.matches,
        errors = snapshot.decode_errors,
        "Done"
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn start_metrics_server(port: u16, viewfinder: Arc<ViewFinder>) -> Result<(), Box<dyn Error>> {
    use viewfinder::metrics::{MetricsRegistry, MetricsServer};

    if port == 0 {
        return Ok(());
    }
    let server = MetricsServer::for_view_finder(port, MetricsRegistry::new()?, viewfinder);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("metrics-server".into())
        .spawn(move || {
            if let Err(e) = runtime.block_on(server.run()) {
                warn!(error = %e, "Metrics server stopped");
            }
        })?;
    Ok(())
}
