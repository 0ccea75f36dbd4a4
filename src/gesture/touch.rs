//! Touch events and pinch-to-zoom math.

/// A finger position in preview-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The action carried by a [`TouchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    /// An additional finger went down.
    PointerDown,
    Move,
    Up,
}

/// A touch event on the preview surface. `points` holds every active finger.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub points: Vec<TouchPoint>,
}

impl TouchEvent {
    pub fn new(action: TouchAction, points: Vec<TouchPoint>) -> Self {
        Self { action, points }
    }

    /// A one-finger tap release at `(x, y)`.
    pub fn tap(x: f32, y: f32) -> Self {
        Self::new(TouchAction::Up, vec![TouchPoint::new(x, y)])
    }

    pub fn is_multi_touch(&self) -> bool {
        self.points.len() > 1
    }
}

/// Distance between the first two fingers, or `None` with fewer than two.
pub fn finger_spacing(points: &[TouchPoint]) -> Option<f32> {
    match points {
        [a, b, ..] => {
            let (dx, dy) = (a.x - b.x, a.y - b.y);
            Some((dx * dx + dy * dy).sqrt())
        }
        _ => None,
    }
}

/// Steps `current` by one toward the direction of the spacing change.
///
/// Spreading fingers zooms in, pinching zooms out, equal spacing leaves the
/// zoom alone. The result stays within `[0, max_zoom]`.
pub fn next_zoom(current: u32, max_zoom: u32, last_spacing: f32, new_spacing: f32) -> u32 {
    let current = current.min(max_zoom);
    if new_spacing > last_spacing {
        current.saturating_add(1).min(max_zoom)
    } else if new_spacing < last_spacing {
        current.saturating_sub(1)
    } else {
        current
    }
}

/// Remembers the last finger spacing between touch events.
#[derive(Debug, Default)]
pub struct PinchTracker {
    last_spacing: f32,
}

impl PinchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the spacing when a second finger lands.
    pub fn begin(&mut self, points: &[TouchPoint]) {
        if let Some(spacing) = finger_spacing(points) {
            self.last_spacing = spacing;
        }
    }

    /// Computes the zoom for a move event and records the new spacing.
    pub fn zoom(&mut self, points: &[TouchPoint], current: u32, max_zoom: u32) -> u32 {
        let Some(spacing) = finger_spacing(points) else {
            return current;
        };
        let zoom = next_zoom(current, max_zoom, self.last_spacing, spacing);
        self.last_spacing = spacing;
        zoom
    }

    pub fn last_spacing(&self) -> f32 {
        self.last_spacing
    }
}
