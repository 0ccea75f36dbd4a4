//! Single-admission gate for decode tasks.
//!
//! The camera produces frames faster than they can be decoded. The gate
//! admits one decode at a time; a frame that finds the gate closed is
//! dropped by the caller, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Admits at most one in-flight decode.
///
/// Owned per pipeline, so separate view-finders decode independently.
#[derive(Debug, Default)]
pub struct FrameDecodeGate {
    in_flight: AtomicBool,
}

impl FrameDecodeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag if it was clear. Returns whether the caller was admitted.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the flag unconditionally.
    #[inline]
    pub fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    /// Whether a decode currently holds the gate.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Admission to a [`FrameDecodeGate`], released when dropped.
///
/// Moving the permit into a decode job ties the release to the job's end,
/// including early returns and panics.
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<FrameDecodeGate>,
}

impl GatePermit {
    /// Tries to acquire `gate`; `None` means a decode is already in flight.
    pub fn try_acquire(gate: &Arc<FrameDecodeGate>) -> Option<Self> {
        gate.try_acquire().then(|| Self {
            gate: Arc::clone(gate),
        })
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_admission() {
        let gate = FrameDecodeGate::new();
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_release_is_unconditional() {
        let gate = FrameDecodeGate::new();
        gate.release();
        assert!(!gate.is_held());
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let gate = Arc::new(FrameDecodeGate::new());
        let permit = GatePermit::try_acquire(&gate).unwrap();
        assert!(GatePermit::try_acquire(&gate).is_none());
        drop(permit);
        assert!(!gate.is_held());
    }

    #[test]
    fn test_permit_releases_on_panic() {
        let gate = Arc::new(FrameDecodeGate::new());
        let permit = GatePermit::try_acquire(&gate).unwrap();
        let result = thread::spawn(move || {
            let _permit = permit;
            panic!("decoder blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(!gate.is_held());
    }

    #[test]
    fn test_racing_acquires_admit_one() {
        let gate = Arc::new(FrameDecodeGate::new());
        let admitted: usize = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.try_acquire() as usize)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .sum();
        assert_eq!(admitted, 1);
    }
}
