//! Barcode read events published to the host application.

use crate::decode::BarcodeMatch;
use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::warn;

/// Name of the event emitted for every decoded symbol.
pub const BARCODE_READ_EVENT: &str = "CameraBarCodeRead";

/// A symbol point. Coordinates are carried as strings; consumers parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPoint {
    pub x: String,
    pub y: String,
}

/// Payload of a [`BARCODE_READ_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeReadEvent {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub bounds: Vec<EventPoint>,
}

impl From<&BarcodeMatch> for BarcodeReadEvent {
    fn from(found: &BarcodeMatch) -> Self {
        Self {
            data: found.text.clone(),
            kind: found.format.name().to_string(),
            bounds: found
                .points
                .iter()
                .map(|p| EventPoint {
                    x: format_coordinate(p.x),
                    y: format_coordinate(p.y),
                })
                .collect(),
        }
    }
}

/// Formats a coordinate with at least one fractional digit (`12.0`, `3.5`).
fn format_coordinate(value: f32) -> String {
    format!("{value:?}")
}

/// Receives barcode read events. Called from decode worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, name: &str, event: BarcodeReadEvent);
}

/// Forwards events over a channel.
pub struct ChannelSink {
    sender: Sender<(String, BarcodeReadEvent)>,
}

impl ChannelSink {
    pub fn new(sender: Sender<(String, BarcodeReadEvent)>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, name: &str, event: BarcodeReadEvent) {
        if self.sender.send((name.to_string(), event)).is_err() {
            warn!(event = name, "Event receiver gone, event dropped");
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    event: &'a str,
    at: DateTime<Utc>,
    body: &'a BarcodeReadEvent,
}

/// Writes each event as one JSON line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, name: &str, event: BarcodeReadEvent) {
        let line = JsonLine {
            event: name,
            at: Utc::now(),
            body: &event,
        };
        let mut writer = self.writer.lock();
        let result = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to write event");
        }
    }
}
