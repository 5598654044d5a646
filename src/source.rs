//! Position sources.
//!
//! A live source is fed by the platform location callback through a
//! channel. Simulated playback replays a route's geometry at a fixed
//! cadence, deriving the heading from consecutive points.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::geo::{bearing, Point};
use crate::session::NavMode;

/// One position observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSample")]
pub struct PositionSample {
    pub lat: f64,
    pub lon: f64,
    /// Degrees clockwise from north in [0, 360). Absent on some sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Wire form of a sample, normalized through [`PositionSample::new`].
#[derive(Deserialize)]
struct RawSample {
    lat: f64,
    lon: f64,
    #[serde(default)]
    heading: Option<f64>,
    timestamp_ms: i64,
}

impl From<RawSample> for PositionSample {
    fn from(raw: RawSample) -> Self {
        Self::new(raw.lat, raw.lon, raw.heading, raw.timestamp_ms)
    }
}

impl PositionSample {
    /// Build a sample. Non-finite headings are treated as absent and
    /// finite ones are wrapped into [0, 360).
    pub fn new(lat: f64, lon: f64, heading: Option<f64>, timestamp_ms: i64) -> Self {
        let heading = heading
            .filter(|h| h.is_finite())
            .map(|h| {
                let wrapped = h.rem_euclid(360.0);
                if wrapped >= 360.0 { 0.0 } else { wrapped }
            });
        Self {
            lat,
            lon,
            heading,
            timestamp_ms,
        }
    }

    pub fn point(&self) -> Point {
        Point {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// A producer of position samples.
pub trait PositionSource {
    fn mode(&self) -> NavMode;

    /// Next sample, blocking if needed. `None` ends the stream; an error
    /// ends it abnormally.
    fn next_sample(&mut self) -> Option<Result<PositionSample, NavError>>;

    /// Pause the driver should take between samples.
    fn cadence(&self) -> Duration {
        Duration::ZERO
    }
}

/// Replays route geometry as position samples.
#[derive(Debug, Clone)]
pub struct Playback {
    points: Vec<Point>,
    cursor: usize,
    interval: Duration,
    start_ms: i64,
}

impl Playback {
    pub fn new(points: Vec<Point>, interval: Duration, start_ms: i64) -> Self {
        Self {
            points,
            cursor: 0,
            interval,
            start_ms,
        }
    }

    pub fn remaining(&self) -> usize {
        self.points.len().saturating_sub(self.cursor)
    }
}

impl Iterator for Playback {
    type Item = PositionSample;

    fn next(&mut self) -> Option<PositionSample> {
        let here = *self.points.get(self.cursor)?;
        // The last point looks at itself, which yields a heading of 0
        let ahead = self.points.get(self.cursor + 1).copied().unwrap_or(here);
        let heading = bearing(here.lat, here.lon, ahead.lat, ahead.lon);

        let elapsed_ms = i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX)
            .saturating_mul(self.cursor as i64);
        self.cursor += 1;

        Some(PositionSample::new(
            here.lat,
            here.lon,
            Some(heading),
            self.start_ms.saturating_add(elapsed_ms),
        ))
    }
}

impl PositionSource for Playback {
    fn mode(&self) -> NavMode {
        NavMode::Simulated
    }

    fn next_sample(&mut self) -> Option<Result<PositionSample, NavError>> {
        self.next().map(Ok)
    }

    fn cadence(&self) -> Duration {
        self.interval
    }
}

/// Sending half of a live source, held by the platform location callback.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    tx: Sender<Result<PositionSample, NavError>>,
}

impl LiveFeed {
    /// Returns false once the receiving source has been torn down.
    pub fn push(&self, sample: PositionSample) -> bool {
        self.tx.send(Ok(sample)).is_ok()
    }

    /// Report that the sensor stopped delivering positions.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(Err(NavError::LocationUnavailable(reason.into())))
            .is_ok()
    }
}

/// Receiving half of a live source.
#[derive(Debug)]
pub struct LiveSource {
    rx: Receiver<Result<PositionSample, NavError>>,
}

/// Create a connected live feed and source.
pub fn live_channel() -> (LiveFeed, LiveSource) {
    let (tx, rx) = mpsc::channel();
    (LiveFeed { tx }, LiveSource { rx })
}

impl PositionSource for LiveSource {
    fn mode(&self) -> NavMode {
        NavMode::Live
    }

    fn next_sample(&mut self) -> Option<Result<PositionSample, NavError>> {
        // All feeds dropped ends the stream
        self.rx.recv().ok()
    }
}
