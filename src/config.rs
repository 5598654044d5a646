//! Engine configuration.
//!
//! Passed by the host as JSON. Every field has a default, so `{}` is a
//! valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierKind;
use crate::error::NavError;
use crate::narration::Locale;

/// Public OSRM demo server.
pub const DEFAULT_OSRM_BASE_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Distance to a maneuver point below which the step counts as reached.
    pub arrival_threshold_m: f64,
    /// Distance to the upcoming maneuver point above which the traveler
    /// is off route.
    pub off_route_threshold_m: f64,
    /// Step indices up to and including this one never trigger a reroute.
    pub reroute_exempt_through_step: usize,
    /// Cadence of simulated playback.
    pub playback_interval_ms: u64,
    /// BCP 47 tag for narration and speech.
    pub language: String,
    /// Ask the route service to stay off motorways when rerouting.
    pub avoid_motorways: bool,
    pub classifier: ClassifierKind,
    pub osrm_base_url: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            arrival_threshold_m: 20.0,
            off_route_threshold_m: 30.0,
            reroute_exempt_through_step: 1,
            playback_interval_ms: 600,
            language: "ja-JP".to_string(),
            avoid_motorways: false,
            classifier: ClassifierKind::Text,
            osrm_base_url: DEFAULT_OSRM_BASE_URL.to_string(),
        }
    }
}

impl NavConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if !(self.arrival_threshold_m > 0.0) {
            return Err(NavError::InvalidConfig(format!(
                "arrival_threshold_m must be positive, got {}",
                self.arrival_threshold_m
            )));
        }
        if !(self.off_route_threshold_m > 0.0) {
            return Err(NavError::InvalidConfig(format!(
                "off_route_threshold_m must be positive, got {}",
                self.off_route_threshold_m
            )));
        }
        if self.osrm_base_url.is_empty() {
            return Err(NavError::InvalidConfig("osrm_base_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        Locale::from_tag(&self.language)
    }

    pub fn playback_interval(&self) -> Duration {
        Duration::from_millis(self.playback_interval_ms)
    }
}
