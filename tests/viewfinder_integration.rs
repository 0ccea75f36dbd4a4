//! End-to-end tests driving a view-finder through mock devices.

use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use viewfinder::capture::{
    CameraType, FileConfig, MockCamera, MockCameraPool, PreviewFrame, PreviewSurface, StartOutcome,
};
use viewfinder::decode::{BarcodeDecoder, DeviceOrientation};
use viewfinder::gesture::{GestureError, GestureOutcome, TouchAction, TouchEvent, TouchPoint};
use viewfinder::pipeline::{
    BarcodeReadEvent, ChannelSink, FramePipeline, InlineExecutor, PipelineState, ViewFinder,
    WorkerPool, BARCODE_READ_EVENT,
};
use viewfinder::streaming::{IngestionClientFactory, MockIngestion};

/// Renders `text` as a grayscale QR frame with a quiet zone.
fn qr_frame(text: &str, scale: usize, sequence: u64) -> PreviewFrame {
    let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
    let modules = code.width();
    let colors = code.to_colors();
    let size = (modules + 8) * scale;

    let mut data = vec![255u8; size * size];
    for (i, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let (mx, my) = (i % modules + 4, i / modules + 4);
        for dy in 0..scale {
            let start = (my * scale + dy) * size + mx * scale;
            data[start..start + scale].fill(0);
        }
    }
    PreviewFrame::gray(data, size as u32, size as u32, sequence)
}

fn scanning_viewfinder(
    pool: &Arc<MockCameraPool>,
) -> (ViewFinder, Receiver<(String, BarcodeReadEvent)>) {
    let pipeline = FramePipeline::new(BarcodeDecoder::from_names(&["qr", "bogus", "ean13"]), Arc::new(InlineExecutor));
    let viewfinder = ViewFinder::new(pool.clone(), CameraType::Back, Arc::new(pipeline));
    let (tx, rx) = crossbeam_channel::unbounded();
    viewfinder.attach_sink(Arc::new(ChannelSink::new(tx)));
    (viewfinder, rx)
}

#[test]
fn hello_qr_is_published_as_event() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();

    let camera = pool.device(CameraType::Back).unwrap();
    assert!(camera.emit_frame(qr_frame("HELLO", 4, 0)));

    let (name, event) = rx.try_recv().unwrap();
    assert_eq!(name, BARCODE_READ_EVENT);
    assert_eq!(event.data, "HELLO");
    assert_eq!(event.kind, "QR_CODE");
    assert!(!event.bounds.is_empty());
    for point in &event.bounds {
        assert!(point.x.parse::<f32>().is_ok());
        assert!(point.y.parse::<f32>().is_ok());
    }
}

#[test]
fn qr_decodes_in_every_orientation() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    let camera = pool.device(CameraType::Back).unwrap();

    for (seq, code) in [0, 1, 2, 3].into_iter().enumerate() {
        viewfinder.set_orientation(DeviceOrientation::from_code(code));
        camera.emit_frame(qr_frame("ORIENT", 3, seq as u64));
        let (_, event) = rx.try_recv().unwrap();
        assert_eq!(event.data, "ORIENT");
    }
}

#[test]
fn noise_frames_publish_nothing() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    let camera = pool.device(CameraType::Back).unwrap();

    for seed in 0..5 {
        camera.emit_frame(MockCamera::noise_frame(320, 240, seed));
    }
    assert!(rx.try_recv().is_err());
    assert_eq!(viewfinder.pipeline().stats().no_match, 5);
}

#[test]
fn scanning_can_be_switched_off() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    viewfinder.set_barcode_scanning(false);

    let camera = pool.device(CameraType::Back).unwrap();
    camera.emit_frame(qr_frame("HELLO", 4, 0));
    assert!(rx.try_recv().is_err());
    assert_eq!(viewfinder.pipeline().stats().decode_tasks, 0);
}

#[test]
fn worker_pool_pipeline_drops_frames_under_load() {
    let pool = Arc::new(MockCameraPool::with_both());
    let workers = Arc::new(WorkerPool::new(2).unwrap());
    let pipeline = FramePipeline::new(BarcodeDecoder::from_names(&["qr"]), workers.clone());
    let viewfinder = ViewFinder::new(pool.clone(), CameraType::Back, Arc::new(pipeline));
    let (tx, rx) = crossbeam_channel::unbounded();
    viewfinder.attach_sink(Arc::new(ChannelSink::new(tx)));
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();

    let camera = pool.device(CameraType::Back).unwrap();
    let frame = qr_frame("BURST", 6, 0);
    let total = 200;
    for _ in 0..total {
        camera.emit_frame(frame.clone());
    }

    // Frames are only ever dropped, never queued
    let deadline = Instant::now() + Duration::from_secs(10);
    while viewfinder.pipeline().gate().is_held() {
        assert!(Instant::now() < deadline, "decode never finished");
        std::thread::sleep(Duration::from_millis(1));
    }
    workers.shutdown();

    let stats = viewfinder.pipeline().stats();
    assert!(stats.decode_tasks >= 1);
    assert!(stats.decode_tasks < total);
    assert_eq!(rx.try_iter().count() as u64, stats.matched);
}

#[test]
fn surface_destroyed_mid_session_stops_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = FileConfig::default();
    config.stream.enabled = true;
    config.stream.credentials_dir = dir.path().to_path_buf();

    let pool = Arc::new(MockCameraPool::with_both());
    let ingestion = Arc::new(MockIngestion::new());
    let factory: Arc<dyn IngestionClientFactory> = ingestion.clone();
    let viewfinder = ViewFinder::from_config(&config, pool.clone(), Arc::new(InlineExecutor), Some(factory));

    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    assert!(ingestion.is_streaming());

    viewfinder.on_surface_destroyed().unwrap();
    assert_eq!(viewfinder.pipeline().state(), PipelineState::Idle);
    assert!(!ingestion.is_streaming());
    assert_eq!(pool.releases(CameraType::Back), 1);

    // Destroying twice is harmless
    viewfinder.on_surface_destroyed().unwrap();
    assert_eq!(pool.releases(CameraType::Back), 1);
}

#[test]
fn events_resume_after_surface_is_recreated() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, rx) = scanning_viewfinder(&pool);
    let camera = pool.device(CameraType::Back).unwrap();

    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    viewfinder.on_surface_destroyed().unwrap();
    viewfinder
        .on_surface_available(PreviewSurface::new(2, 640, 480))
        .unwrap();

    assert!(camera.emit_frame(qr_frame("HELLO", 4, 0)));
    let (name, event) = rx.try_recv().unwrap();
    assert_eq!(name, BARCODE_READ_EVENT);
    assert_eq!(event.data, "HELLO");

    let stats = viewfinder.pipeline().stats();
    assert_eq!(stats.matched, 1);
    assert_eq!(stats.events_discarded, 0);
}

#[test]
fn camera_switch_restarts_on_other_camera() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, _rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();

    assert!(viewfinder.set_camera_type(CameraType::Back).is_none());

    let switch = viewfinder.set_camera_type(CameraType::Front).unwrap();
    let outcome = switch.join().unwrap().unwrap();
    assert_eq!(
        outcome,
        viewfinder::capture::SwitchOutcome::Restarted(StartOutcome::Started)
    );
    assert_eq!(pool.releases(CameraType::Back), 1);
    assert_eq!(pool.acquisitions(CameraType::Front), 1);
    assert!(pool.device(CameraType::Front).unwrap().is_previewing());
}

#[test]
fn touch_gestures_reach_the_camera() {
    let pool = Arc::new(MockCameraPool::with_both());
    let (viewfinder, _rx) = scanning_viewfinder(&pool);
    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    let camera = pool.device(CameraType::Back).unwrap();

    let fingers = |spread: f32| vec![TouchPoint::new(200.0, 200.0), TouchPoint::new(200.0 + spread, 200.0)];
    viewfinder
        .on_touch(&TouchEvent::new(TouchAction::PointerDown, fingers(40.0)))
        .unwrap();
    let zoomed = viewfinder
        .on_touch(&TouchEvent::new(TouchAction::Move, fingers(90.0)))
        .unwrap();
    assert_eq!(zoomed, GestureOutcome::Zoomed(1));

    assert_eq!(
        viewfinder.on_touch(&TouchEvent::tap(100.0, 100.0)).unwrap(),
        GestureOutcome::Focused
    );

    let before = camera.current_parameters();
    let outside = viewfinder.on_touch(&TouchEvent::tap(-5.0, 100.0));
    assert!(matches!(outside, Err(GestureError::OutOfBounds { .. })));
    assert_eq!(camera.current_parameters(), before);
}

#[test]
fn config_file_drives_view_finder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewfinder.toml");
    std::fs::write(
        &path,
        r#"
[camera]
camera_type = "front"
capture_mode = "video"

[scanner]
enabled = true
symbologies = ["qr"]
workers = 1
orientation = 1
"#,
    )
    .unwrap();

    let config = FileConfig::from_file(&path).unwrap();
    config.validate().unwrap();

    let pool = Arc::new(MockCameraPool::with_both());
    let viewfinder = ViewFinder::from_config(&config, pool.clone(), Arc::new(InlineExecutor), None);
    assert!(viewfinder.stream().is_none());
    assert_eq!(viewfinder.pipeline().orientation(), DeviceOrientation::LandscapeLeft);

    viewfinder
        .on_surface_available(PreviewSurface::new(1, 640, 480))
        .unwrap();
    let session = viewfinder.camera().session().unwrap();
    assert_eq!(session.camera_type, CameraType::Front);
    assert_eq!(pool.acquisitions(CameraType::Front), 1);
}
