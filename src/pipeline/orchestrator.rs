//! Frame pipeline: frame arrival → gate → transform → decode → event sink.

use super::events::{BarcodeReadEvent, EventSink, BARCODE_READ_EVENT};
use super::executor::{DecodeExecutor, DecodeJob};
use crate::capture::PreviewFrame;
use crate::decode::{
    orient_frame, BarcodeDecoder, DecodeError, DecodeResult, DeviceOrientation, FrameDecodeGate,
    GatePermit,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Lifecycle state of a [`FramePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// What happened to a frame handed to [`FramePipeline::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// The pipeline is not running.
    NotRunning,
    /// Barcode scanning is switched off.
    ScanningDisabled,
    /// A decode was already in flight (or the executor refused the job).
    Dropped,
    /// A decode job was submitted.
    Submitted,
}

/// Counters maintained by the decode jobs.
#[derive(Debug, Default)]
struct PipelineStats {
    decode_tasks: AtomicU64,
    matched: AtomicU64,
    no_match: AtomicU64,
    errors: AtomicU64,
    events_discarded: AtomicU64,
}

/// Point-in-time copy of the pipeline's decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    pub decode_tasks: u64,
    pub matched: u64,
    pub no_match: u64,
    pub errors: u64,
    pub events_discarded: u64,
}

impl PipelineStats {
    fn snapshot(&self) -> PipelineCounters {
        PipelineCounters {
            decode_tasks: self.decode_tasks.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            no_match: self.no_match.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the pipeline and its decode jobs.
struct DecodeContext {
    decoder: Mutex<BarcodeDecoder>,
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    stats: PipelineStats,
}

impl DecodeContext {
    fn process(&self, frame: PreviewFrame, orientation: DeviceOrientation) {
        self.stats.decode_tasks.fetch_add(1, Ordering::Relaxed);

        let (got, need) = (frame.data().len(), frame.luma_len());
        let result = match orient_frame(frame, orientation) {
            Some(plane) => self.decoder.lock().decode(&plane),
            None => DecodeResult::Error(DecodeError::BufferTooSmall { got, need }),
        };

        match result {
            DecodeResult::Matched(found) => {
                self.stats.matched.fetch_add(1, Ordering::Relaxed);
                let sink = self.sink.read().clone();
                match sink {
                    Some(sink) => sink.emit(BARCODE_READ_EVENT, BarcodeReadEvent::from(&found)),
                    None => {
                        self.stats.events_discarded.fetch_add(1, Ordering::Relaxed);
                        debug!(format = %found.format, "Event sink detached, result discarded");
                    }
                }
            }
            DecodeResult::NoMatch => {
                self.stats.no_match.fetch_add(1, Ordering::Relaxed);
            }
            DecodeResult::Error(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                trace!(error = %e, "Frame decode failed");
            }
        }
    }
}

/// Routes preview frames to the barcode decoder.
///
/// The producer thread calls [`on_frame`](Self::on_frame), which never
/// blocks: it either submits a decode job holding the gate permit or drops
/// the frame. The permit lives inside the job, so the gate is released when
/// the job finishes, fails, panics or is refused by the executor.
pub struct FramePipeline {
    gate: Arc<FrameDecodeGate>,
    context: Arc<DecodeContext>,
    executor: Arc<dyn DecodeExecutor>,
    state: AtomicU8,
    scanning_enabled: AtomicBool,
    orientation: AtomicI32,
}

impl FramePipeline {
    pub fn new(decoder: BarcodeDecoder, executor: Arc<dyn DecodeExecutor>) -> Self {
        Self {
            gate: Arc::new(FrameDecodeGate::new()),
            context: Arc::new(DecodeContext {
                decoder: Mutex::new(decoder),
                sink: RwLock::new(None),
                stats: PipelineStats::default(),
            }),
            executor,
            state: AtomicU8::new(PipelineState::Idle as u8),
            scanning_enabled: AtomicBool::new(true),
            orientation: AtomicI32::new(DeviceOrientation::Portrait.code()),
        }
    }

    /// Handles one frame from the producer thread.
    pub fn on_frame(&self, frame: PreviewFrame) -> FrameDisposition {
        if self.state() != PipelineState::Running {
            return FrameDisposition::NotRunning;
        }
        if !self.scanning_enabled.load(Ordering::Acquire) {
            return FrameDisposition::ScanningDisabled;
        }
        let Some(permit) = GatePermit::try_acquire(&self.gate) else {
            return FrameDisposition::Dropped;
        };

        let context = Arc::clone(&self.context);
        let orientation = self.orientation();
        let job: DecodeJob = Box::new(move || {
            let _permit = permit;
            context.process(frame, orientation);
        });

        match self.executor.submit(job) {
            Ok(()) => FrameDisposition::Submitted,
            Err(_) => FrameDisposition::Dropped,
        }
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: &[PipelineState], to: PipelineState) -> bool {
        let moved = from.iter().any(|state| {
            self.state
                .compare_exchange(*state as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        });
        if moved {
            trace!(state = ?to, "Pipeline state changed");
        }
        moved
    }

    /// `Idle → Starting`. Returns false if the pipeline was not idle.
    pub fn begin_start(&self) -> bool {
        self.transition(&[PipelineState::Idle], PipelineState::Starting)
    }

    /// `Starting → Running`.
    pub fn mark_running(&self) -> bool {
        let moved = self.transition(&[PipelineState::Starting], PipelineState::Running);
        if moved {
            info!("Frame pipeline running");
        }
        moved
    }

    /// `Starting | Running → Stopping`. Frames are refused from here on.
    pub fn begin_stop(&self) -> bool {
        self.transition(
            &[PipelineState::Running, PipelineState::Starting],
            PipelineState::Stopping,
        )
    }

    /// `Stopping → Idle`. An in-flight decode may still be running and keeps
    /// the gate until it completes.
    pub fn mark_idle(&self) -> bool {
        let moved = self.transition(&[PipelineState::Stopping], PipelineState::Idle);
        if moved {
            info!(decode_in_flight = self.gate.is_held(), "Frame pipeline stopped");
        }
        moved
    }

    /// Connects the sink that receives barcode read events.
    pub fn attach_sink(&self, sink: Arc<dyn EventSink>) {
        *self.context.sink.write() = Some(sink);
    }

    /// Disconnects the event sink. Results of in-flight decodes are discarded.
    pub fn detach_sink(&self) -> Option<Arc<dyn EventSink>> {
        self.context.sink.write().take()
    }

    pub fn has_sink(&self) -> bool {
        self.context.sink.read().is_some()
    }

    pub fn set_scanning_enabled(&self, enabled: bool) {
        self.scanning_enabled.store(enabled, Ordering::Release);
    }

    pub fn scanning_enabled(&self) -> bool {
        self.scanning_enabled.load(Ordering::Acquire)
    }

    pub fn set_orientation(&self, orientation: DeviceOrientation) {
        self.orientation.store(orientation.code(), Ordering::Release);
    }

    pub fn orientation(&self) -> DeviceOrientation {
        DeviceOrientation::from_code(self.orientation.load(Ordering::Acquire))
    }

    /// The pipeline's decode gate.
    pub fn gate(&self) -> &Arc<FrameDecodeGate> {
        &self.gate
    }

    pub fn stats(&self) -> PipelineCounters {
        self.context.stats.snapshot()
    }
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("state", &self.state())
            .field("scanning_enabled", &self.scanning_enabled())
            .field("decode_in_flight", &self.gate.is_held())
            .finish()
    }
}
