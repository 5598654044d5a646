//! Route and maneuver step types.
//!
//! A [`Route`] is immutable once built. Rerouting replaces the whole
//! value, so readers never see a half-updated step list.

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::geo::{polyline_length, Point};

/// Maneuver type tag as reported by the routing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManeuverType {
    Turn,
    UTurn,
    Merge,
    Fork,
    Ramp,
    Exit,
    MotorwayJunction,
    Roundabout,
    Other,
}

impl ManeuverType {
    /// Map an OSRM `maneuver.type` string. Unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "turn" => Self::Turn,
            "u-turn" | "uturn" => Self::UTurn,
            "merge" => Self::Merge,
            "fork" => Self::Fork,
            "ramp" | "on ramp" => Self::Ramp,
            "exit" | "off ramp" => Self::Exit,
            "motorway_junction" | "motorway-junction" => Self::MotorwayJunction,
            "roundabout" | "rotary" => Self::Roundabout,
            _ => Self::Other,
        }
    }
}

/// Direction qualifier of a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modifier {
    Right,
    Left,
    SlightRight,
    SlightLeft,
    SharpRight,
    SharpLeft,
    Straight,
    UTurn,
    None,
}

impl Modifier {
    /// Map an OSRM `maneuver.modifier` string. Unknown or missing tags
    /// become `None`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::None;
        };
        match tag.trim().to_ascii_lowercase().replace('-', " ").as_str() {
            "right" => Self::Right,
            "left" => Self::Left,
            "slight right" => Self::SlightRight,
            "slight left" => Self::SlightLeft,
            "sharp right" => Self::SharpRight,
            "sharp left" => Self::SharpLeft,
            "straight" => Self::Straight,
            "uturn" | "u turn" => Self::UTurn,
            _ => Self::None,
        }
    }
}

/// One maneuver unit of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Position within the route (0-based). Assigned by [`Route::new`].
    pub index: usize,
    /// Distance from this maneuver to the next one, in meters.
    pub distance_m: f64,
    /// Road name, possibly empty.
    pub name: String,
    /// Raw instruction text from the routing service, possibly empty.
    pub instruction: String,
    pub maneuver_type: ManeuverType,
    pub modifier: Modifier,
    /// Exit ordinal, only meaningful for roundabouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roundabout_exit: Option<u32>,
    /// Where the maneuver takes place.
    pub location: Point,
}

impl RouteStep {
    /// A step with no road name, instruction text or modifier.
    pub fn new(maneuver_type: ManeuverType, location: Point) -> Self {
        Self {
            index: 0,
            distance_m: 0.0,
            name: String::new(),
            instruction: String::new(),
            maneuver_type,
            modifier: Modifier::None,
            roundabout_exit: None,
            location,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = distance_m;
        self
    }

    pub fn with_roundabout_exit(mut self, exit: u32) -> Self {
        self.roundabout_exit = Some(exit);
        self
    }
}

/// Route geometry plus its maneuver steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    geometry: Vec<Point>,
    steps: Vec<RouteStep>,
}

impl Route {
    /// Build a route, enforcing at least one step and one geometry point.
    ///
    /// Step ordinals are reassigned to match their position, negative
    /// distances are clamped to zero and roundabout exits are dropped from
    /// non-roundabout steps.
    pub fn new(geometry: Vec<Point>, mut steps: Vec<RouteStep>) -> Result<Self, NavError> {
        if geometry.is_empty() || steps.is_empty() {
            return Err(NavError::EmptyRoute);
        }

        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
            if !(step.distance_m >= 0.0) {
                step.distance_m = 0.0;
            }
            if step.maneuver_type != ManeuverType::Roundabout {
                step.roundabout_exit = None;
            }
        }

        Ok(Self { geometry, steps })
    }

    pub fn geometry(&self) -> &[Point] {
        &self.geometry
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_step_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// The terminal geometry point.
    pub fn destination(&self) -> Point {
        // Route::new guarantees a non-empty geometry
        self.geometry[self.geometry.len() - 1]
    }

    /// Length of the drawn polyline in meters.
    pub fn length_m(&self) -> f64 {
        polyline_length(&self.geometry)
    }
}
