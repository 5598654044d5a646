//! Events pushed from the engine to display and speech collaborators.

use serde::Serialize;

use crate::geo::Point;
use crate::narration::Guidance;
use crate::reroute::RerouteRequest;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavEvent {
    /// A new route is active. The display redraws its route line.
    RouteLoaded {
        geometry: Vec<Point>,
        step_count: usize,
        length_m: f64,
    },
    /// Place or rotate the traveler marker.
    Marker { position: Point, heading: f64 },
    Guidance(Guidance),
    Arrived { text: String },
    /// Off route: announce and ask the route service for a new route.
    OffRoute { text: String, request: RerouteRequest },
    RerouteFailed { text: String },
    GuidanceEnded { text: String },
    SimulationEnded { text: String },
}

impl NavEvent {
    /// Text the speech surface should read, if any.
    pub fn speech_text(&self) -> Option<&str> {
        match self {
            Self::Guidance(guidance) => Some(&guidance.voice_text),
            Self::Arrived { text }
            | Self::OffRoute { text, .. }
            | Self::RerouteFailed { text }
            | Self::GuidanceEnded { text }
            | Self::SimulationEnded { text } => Some(text),
            Self::RouteLoaded { .. } | Self::Marker { .. } => None,
        }
    }
}
