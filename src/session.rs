//! Route progress state machine.
//!
//! ```text
//! Inactive --start--> Navigating(0) --advance*--> Navigating(n) --advance--> Arrived
//!    ^                     |  ^                                                 |
//!    +-------stop----------+  +-------------------reroute-----------------------+
//! ```
//!
//! The session owns the active route and step index. Nothing outside this
//! module mutates them; every transition returns the events it produced.

use log::{debug, info};
use serde::Serialize;

use crate::error::NavError;
use crate::event::NavEvent;
use crate::geo::{haversine, Point};
use crate::narration::{Announcement, Narrator};
use crate::route::Route;
use crate::source::PositionSample;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NavState {
    Inactive,
    Navigating { step_index: usize },
    Arrived,
}

/// Which kind of position source drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavMode {
    Inactive,
    Live,
    Simulated,
}

#[derive(Debug)]
pub struct NavigationSession {
    state: NavState,
    route: Option<Route>,
    mode: NavMode,
    last_heading: f64,
    /// Bumped on every start, stop and reroute.
    generation: u64,
    /// Destination of the route the session was started with. Survives
    /// reroutes.
    destination: Option<Point>,
    arrival_threshold_m: f64,
    narrator: Narrator,
}

impl NavigationSession {
    pub fn new(narrator: Narrator, arrival_threshold_m: f64) -> Self {
        Self {
            state: NavState::Inactive,
            route: None,
            mode: NavMode::Inactive,
            last_heading: 0.0,
            generation: 0,
            destination: None,
            arrival_threshold_m,
            narrator,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn destination(&self) -> Option<Point> {
        self.destination
    }

    pub fn last_heading(&self) -> f64 {
        self.last_heading
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    pub fn is_navigating(&self) -> bool {
        matches!(self.state, NavState::Navigating { .. })
    }

    /// Current step index while navigating.
    pub fn step_index(&self) -> Option<usize> {
        match self.state {
            NavState::Navigating { step_index } => Some(step_index),
            _ => None,
        }
    }

    /// Maneuver point of the current step while navigating.
    pub fn upcoming_point(&self) -> Option<Point> {
        let index = self.step_index()?;
        self.route.as_ref()?.step(index).map(|s| s.location)
    }

    /// Begin guidance on `route`.
    ///
    /// Valid from `Inactive` and `Arrived`. A session that is already
    /// navigating must be stopped first.
    pub fn start(&mut self, route: Route, mode: NavMode) -> Result<Vec<NavEvent>, NavError> {
        if self.is_navigating() {
            return Err(NavError::AlreadyNavigating);
        }

        self.destination = Some(route.destination());
        self.mode = mode;
        self.generation += 1;
        info!(
            "navigation started: {} steps, {:.0} m, mode {:?}",
            route.step_count(),
            route.length_m(),
            mode
        );

        Ok(vec![self.load(route)])
    }

    /// Replace the route and restart at step 0. Valid in any state except
    /// `Inactive`.
    pub fn reroute(&mut self, route: Route) -> Result<Vec<NavEvent>, NavError> {
        if self.state == NavState::Inactive {
            return Err(NavError::NotNavigating);
        }

        self.generation += 1;
        info!("route replaced: {} steps", route.step_count());

        Ok(vec![self.load(route)])
    }

    fn load(&mut self, route: Route) -> NavEvent {
        let event = NavEvent::RouteLoaded {
            geometry: route.geometry().to_vec(),
            step_count: route.step_count(),
            length_m: route.length_m(),
        };
        self.route = Some(route);
        self.state = NavState::Navigating { step_index: 0 };
        event
    }

    /// End guidance from any state. `acknowledge` adds a spoken
    /// "guidance ended" event.
    pub fn stop(&mut self, acknowledge: bool) -> Vec<NavEvent> {
        if self.state != NavState::Inactive {
            info!("navigation stopped in state {:?}", self.state);
        }

        self.state = NavState::Inactive;
        self.route = None;
        self.mode = NavMode::Inactive;
        self.destination = None;
        self.generation += 1;

        if acknowledge {
            vec![NavEvent::GuidanceEnded {
                text: self.narrator.announce(Announcement::GuidanceEnded),
            }]
        } else {
            Vec::new()
        }
    }

    /// Record the driving mode after a position source was swapped.
    pub fn set_mode(&mut self, mode: NavMode) {
        if self.state != NavState::Inactive {
            self.mode = mode;
        }
    }

    /// Consume one position sample.
    ///
    /// Always emits a marker event, then either guidance for the (possibly
    /// new) current step or the arrival announcement.
    pub fn advance(&mut self, sample: &PositionSample) -> Result<Vec<NavEvent>, NavError> {
        let NavState::Navigating { step_index } = self.state else {
            return Err(NavError::NotNavigating);
        };
        let route = self.route.as_ref().ok_or(NavError::NotNavigating)?;

        if let Some(heading) = sample.heading {
            self.last_heading = heading;
        }

        let position = sample.point();
        let mut events = vec![NavEvent::Marker {
            position,
            heading: self.last_heading,
        }];

        let Some(step) = route.step(step_index) else {
            return Err(NavError::NotNavigating);
        };
        let distance = haversine(&position, &step.location);

        if distance >= self.arrival_threshold_m {
            events.push(NavEvent::Guidance(self.narrator.guidance(step, distance)));
            return Ok(events);
        }

        if step_index >= route.last_step_index() {
            info!("destination reached at step {step_index}");
            self.state = NavState::Arrived;
            self.generation += 1;
            events.push(NavEvent::Arrived {
                text: self.narrator.announce(Announcement::Arrived),
            });
            return Ok(events);
        }

        let next_index = step_index + 1;
        debug!("step {step_index} reached ({distance:.1} m), advancing to {next_index}");
        self.state = NavState::Navigating {
            step_index: next_index,
        };

        if let Some(next) = route.step(next_index) {
            let distance = haversine(&position, &next.location);
            events.push(NavEvent::Guidance(self.narrator.guidance(next, distance)));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TextClassifier;
    use crate::geo::offset;
    use crate::narration::Locale;
    use crate::route::{ManeuverType, Modifier, RouteStep};

    fn pt(lat: f64, lon: f64) -> Point {
        Point { lat, lon }
    }

    fn at(p: Point) -> PositionSample {
        PositionSample::new(p.lat, p.lon, None, 0)
    }

    fn session() -> NavigationSession {
        NavigationSession::new(Narrator::new(Box::new(TextClassifier), Locale::Ja), 20.0)
    }

    /// Two steps: turn right at A, turn left at B, destination C.
    fn two_step_route() -> Route {
        let a = pt(33.5900, 130.4000);
        let b = offset(&a, 90.0, 500.0);
        let c = offset(&b, 0.0, 200.0);
        Route::new(
            vec![a, b, c],
            vec![
                RouteStep::new(ManeuverType::Turn, a)
                    .with_modifier(Modifier::Right)
                    .with_instruction("Turn right onto Main St")
                    .with_distance(500.0),
                RouteStep::new(ManeuverType::Turn, b)
                    .with_modifier(Modifier::Left)
                    .with_instruction("Turn left onto Oak Ave")
                    .with_distance(200.0),
            ],
        )
        .unwrap()
    }

    fn guidance(events: &[NavEvent]) -> Option<&crate::narration::Guidance> {
        events.iter().find_map(|e| match e {
            NavEvent::Guidance(g) => Some(g),
            _ => None,
        })
    }

    #[test]
    fn starts_inactive() {
        let s = session();
        assert_eq!(s.state(), NavState::Inactive);
        assert_eq!(s.mode(), NavMode::Inactive);
        assert!(s.route().is_none());
    }

    #[test]
    fn start_loads_route_at_step_zero() {
        let mut s = session();
        let events = s.start(two_step_route(), NavMode::Live).unwrap();
        assert_eq!(s.state(), NavState::Navigating { step_index: 0 });
        assert_eq!(s.mode(), NavMode::Live);
        assert!(matches!(events[0], NavEvent::RouteLoaded { step_count: 2, .. }));
    }

    #[test]
    fn start_while_navigating_is_rejected() {
        let mut s = session();
        s.start(two_step_route(), NavMode::Live).unwrap();
        assert!(matches!(
            s.start(two_step_route(), NavMode::Live),
            Err(NavError::AlreadyNavigating)
        ));
    }

    #[test]
    fn advance_requires_navigating() {
        let mut s = session();
        assert!(matches!(s.advance(&at(pt(0.0, 0.0))), Err(NavError::NotNavigating)));
    }

    #[test]
    fn far_sample_stays_on_step_with_fresh_distance() {
        let mut s = session();
        let route = two_step_route();
        let a = route.steps()[0].location;
        s.start(route, NavMode::Live).unwrap();

        let events = s.advance(&at(offset(&a, 270.0, 300.0))).unwrap();
        let g = guidance(&events).unwrap();
        assert_eq!(s.step_index(), Some(0));
        assert_eq!(g.distance_text, "300メートル");

        let events = s.advance(&at(offset(&a, 270.0, 120.0))).unwrap();
        let g = guidance(&events).unwrap();
        assert_eq!(s.step_index(), Some(0));
        assert_eq!(g.distance_text, "120メートル");
        assert_eq!(g.display_text, "Main Stを右方向です。");
    }

    #[test]
    fn reaching_a_step_advances_and_narrates_next() {
        let mut s = session();
        let route = two_step_route();
        let a = route.steps()[0].location;
        s.start(route, NavMode::Live).unwrap();

        let events = s.advance(&at(offset(&a, 0.0, 5.0))).unwrap();
        assert_eq!(s.step_index(), Some(1));
        let g = guidance(&events).unwrap();
        assert_eq!(g.step_index, 1);
        assert_eq!(g.display_text, "Oak Aveを左方向です。");
        assert_eq!(g.distance_text, "500メートル");
    }

    #[test]
    fn arrival_after_exactly_step_count_advances() {
        let mut s = session();
        let route = two_step_route();
        let points: Vec<Point> = route.steps().iter().map(|st| st.location).collect();
        let step_count = route.step_count();
        s.start(route, NavMode::Live).unwrap();

        let mut advances = 0;
        for p in &points {
            let events = s.advance(&at(offset(p, 45.0, 10.0))).unwrap();
            advances += 1;
            if s.state() == NavState::Arrived {
                assert!(events.iter().any(|e| matches!(
                    e,
                    NavEvent::Arrived { text } if text == "目的地に到着しました。案内を終了します。"
                )));
                break;
            }
        }
        assert_eq!(s.state(), NavState::Arrived);
        assert_eq!(advances, step_count);
    }

    #[test]
    fn heading_persists_when_sample_lacks_one() {
        let mut s = session();
        s.start(two_step_route(), NavMode::Live).unwrap();
        s.advance(&PositionSample::new(33.0, 130.0, Some(42.0), 0)).unwrap();
        let events = s.advance(&PositionSample::new(33.0, 130.0, None, 1)).unwrap();
        assert!(matches!(events[0], NavEvent::Marker { heading, .. } if heading == 42.0));
    }

    #[test]
    fn stop_resets_from_any_state() {
        let mut s = session();
        assert!(s.stop(false).is_empty());

        s.start(two_step_route(), NavMode::Simulated).unwrap();
        let generation = s.generation();
        let events = s.stop(true);
        assert_eq!(s.state(), NavState::Inactive);
        assert!(s.route().is_none());
        assert!(s.generation() > generation);
        assert!(matches!(&events[..], [NavEvent::GuidanceEnded { text }] if text == "案内を終了します。"));
    }

    #[test]
    fn reroute_resets_step_and_keeps_destination() {
        let mut s = session();
        let route = two_step_route();
        let destination = route.destination();
        let a = route.steps()[0].location;
        s.start(route, NavMode::Live).unwrap();
        s.advance(&at(a)).unwrap();
        assert_eq!(s.step_index(), Some(1));

        let detour_start = pt(33.6, 130.41);
        let detour = Route::new(
            vec![detour_start, pt(33.61, 130.42)],
            vec![RouteStep::new(ManeuverType::Other, detour_start)],
        )
        .unwrap();
        s.reroute(detour).unwrap();
        assert_eq!(s.step_index(), Some(0));
        assert_eq!(s.destination(), Some(destination));
        assert_eq!(s.route().unwrap().step_count(), 1);
    }

    #[test]
    fn reroute_requires_an_active_session() {
        let mut s = session();
        assert!(matches!(s.reroute(two_step_route()), Err(NavError::NotNavigating)));
    }

    #[test]
    fn arrived_is_terminal_until_restart() {
        let mut s = session();
        let route = two_step_route();
        let points: Vec<Point> = route.steps().iter().map(|st| st.location).collect();
        s.start(route, NavMode::Live).unwrap();
        for p in &points {
            s.advance(&at(*p)).unwrap();
        }
        assert_eq!(s.state(), NavState::Arrived);
        assert!(matches!(s.advance(&at(points[0])), Err(NavError::NotNavigating)));

        s.start(two_step_route(), NavMode::Live).unwrap();
        assert_eq!(s.step_index(), Some(0));
    }
}
