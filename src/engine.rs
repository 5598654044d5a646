//! Navigation engine entry points.
//!
//! Couples the [`NavigationSession`] state machine with the
//! [`RerouteCoordinator`], so each position sample runs progress and the
//! off-route test as one step.

use log::debug;

use crate::config::NavConfig;
use crate::error::NavError;
use crate::event::NavEvent;
use crate::narration::{Announcement, Narrator};
use crate::reroute::{RerouteCoordinator, RerouteTicket, RouteOutcome};
use crate::route::Route;
use crate::session::{NavMode, NavState, NavigationSession};
use crate::source::PositionSample;

#[derive(Debug)]
pub struct Engine {
    config: NavConfig,
    session: NavigationSession,
    coordinator: RerouteCoordinator,
}

impl Engine {
    pub fn new(config: NavConfig) -> Self {
        let narrator = Narrator::new(config.classifier.build(), config.locale());
        let session = NavigationSession::new(narrator, config.arrival_threshold_m);
        let coordinator = RerouteCoordinator::new(
            config.off_route_threshold_m,
            config.reroute_exempt_through_step,
            config.avoid_motorways,
        );

        Self {
            config,
            session,
            coordinator,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    pub fn start(&mut self, route: Route, mode: NavMode) -> Result<Vec<NavEvent>, NavError> {
        let events = self.session.start(route, mode)?;
        self.coordinator.cancel();
        Ok(events)
    }

    /// Process one sample: step progress first, then the off-route test
    /// against the resulting step. Arrival abandons any outstanding reroute.
    pub fn advance(&mut self, sample: &PositionSample) -> Result<Vec<NavEvent>, NavError> {
        let mut events = self.session.advance(sample)?;
        if self.session.state() == NavState::Arrived {
            self.coordinator.cancel();
            return Ok(events);
        }
        if let Some(off_route) = self.coordinator.check(&self.session, sample) {
            events.push(off_route);
        }
        Ok(events)
    }

    pub fn stop(&mut self, acknowledge: bool) -> Vec<NavEvent> {
        self.coordinator.cancel();
        self.session.stop(acknowledge)
    }

    /// Replace the route directly, bypassing the coordinator. Any
    /// outstanding request is abandoned.
    pub fn reroute(&mut self, route: Route) -> Result<Vec<NavEvent>, NavError> {
        let events = self.session.reroute(route)?;
        self.coordinator.cancel();
        Ok(events)
    }

    /// Deliver the route service's answer to an earlier off-route event.
    pub fn complete_reroute(
        &mut self,
        ticket: RerouteTicket,
        outcome: RouteOutcome,
    ) -> Result<Vec<NavEvent>, NavError> {
        self.coordinator.complete(&mut self.session, ticket, outcome)
    }

    pub fn set_mode(&mut self, mode: NavMode) {
        self.session.set_mode(mode);
    }

    /// Simulated playback ran out of points. Ends the session with the
    /// simulation announcement rather than the arrival one.
    pub fn finish_simulation(&mut self) -> Vec<NavEvent> {
        debug!("simulation finished in state {:?}", self.session.state());
        self.coordinator.cancel();
        let mut events = self.session.stop(false);
        events.push(NavEvent::SimulationEnded {
            text: self.session.narrator().announce(Announcement::SimulationEnded),
        });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{offset, Point};
    use crate::narration::Guidance;
    use crate::route::{ManeuverType, Modifier, RouteStep};

    fn pt(lat: f64, lon: f64) -> Point {
        Point { lat, lon }
    }

    fn at(p: Point) -> PositionSample {
        PositionSample::new(p.lat, p.lon, None, 0)
    }

    fn guidance(events: &[NavEvent]) -> Vec<&Guidance> {
        events
            .iter()
            .filter_map(|e| match e {
                NavEvent::Guidance(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    fn corridor(n: usize) -> Route {
        let origin = pt(33.59, 130.40);
        let points: Vec<Point> = (0..=n)
            .map(|i| offset(&origin, 90.0, 400.0 * i as f64))
            .collect();
        let steps = points[..n]
            .iter()
            .map(|p| RouteStep::new(ManeuverType::Turn, *p).with_instruction("Continue straight"))
            .collect();
        Route::new(points, steps).unwrap()
    }

    #[test]
    fn two_step_scenario_walks_to_arrival() {
        let a = pt(33.5900, 130.4000);
        let b = offset(&a, 90.0, 500.0);
        let end = offset(&b, 0.0, 200.0);
        let route = Route::new(
            vec![a, b, end],
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
        .unwrap();

        let mut engine = Engine::new(NavConfig::default());
        engine.start(route, NavMode::Live).unwrap();

        // Approach the first maneuver from 500 m out
        let mut texts = Vec::new();
        let mut distances = Vec::new();
        for remaining in [500.0, 250.0, 30.0] {
            let events = engine.advance(&at(offset(&a, 270.0, remaining))).unwrap();
            let g = guidance(&events)[0];
            texts.push(g.display_text.clone());
            distances.push(g.distance_text.clone());
        }
        assert_eq!(texts[0], "Main Stを右方向です。");
        assert_eq!(distances, vec!["500メートル", "250メートル", "30メートル"]);

        // At the turn: advance to the second step
        let events = engine.advance(&at(offset(&a, 270.0, 3.0))).unwrap();
        assert_eq!(engine.session().step_index(), Some(1));
        assert_eq!(guidance(&events)[0].display_text, "Oak Aveを左方向です。");

        // Walk east toward the second maneuver
        let events = engine.advance(&at(offset(&b, 270.0, 200.0))).unwrap();
        let g = guidance(&events)[0];
        assert_eq!(g.distance_text, "200メートル");
        assert_eq!(g.voice_text, "あと200メートルで、Oak Aveを左に曲がります。");

        let events = engine.advance(&at(offset(&b, 270.0, 4.0))).unwrap();
        assert_eq!(engine.session().state(), NavState::Arrived);
        assert!(matches!(events.last(), Some(NavEvent::Arrived { .. })));
        assert!(!events.iter().any(|e| matches!(e, NavEvent::OffRoute { .. })));
    }

    #[test]
    fn no_reroute_on_exempt_steps() {
        let route = corridor(4);
        let mut engine = Engine::new(NavConfig::default());
        engine.start(route, NavMode::Live).unwrap();

        for _ in 0..5 {
            let events = engine.advance(&at(pt(34.5, 131.5))).unwrap();
            assert!(!events.iter().any(|e| matches!(e, NavEvent::OffRoute { .. })));
        }
    }

    #[test]
    fn one_reroute_in_flight_then_stale_answer_dropped() {
        let route = corridor(5);
        let points: Vec<Point> = route.steps().iter().map(|s| s.location).collect();
        let mut engine = Engine::new(NavConfig::default());
        engine.start(route.clone(), NavMode::Live).unwrap();

        // Advancing onto step 2 leaves the traveler 400 m from its maneuver,
        // which counts as off route; the next step stays suppressed
        let mut requests = Vec::new();
        for p in &points[..3] {
            let events = engine.advance(&at(*p)).unwrap();
            requests.extend(events.iter().filter_map(|e| match e {
                NavEvent::OffRoute { request, .. } => Some(*request),
                _ => None,
            }));
        }
        assert_eq!(requests.len(), 1);
        assert_eq!(engine.session().step_index(), Some(3));

        let events = engine.advance(&at(pt(34.5, 131.5))).unwrap();
        assert!(!events.iter().any(|e| matches!(e, NavEvent::OffRoute { .. })));

        engine.stop(false);
        engine.start(route.clone(), NavMode::Live).unwrap();
        let events = engine
            .complete_reroute(requests[0].ticket, RouteOutcome::Found(corridor(1)))
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(engine.session().route().unwrap().step_count(), 5);
    }

    #[test]
    fn reroute_answer_restarts_at_step_zero() {
        let route = corridor(5);
        let points: Vec<Point> = route.steps().iter().map(|s| s.location).collect();
        let mut engine = Engine::new(NavConfig::default());
        engine.start(route, NavMode::Live).unwrap();
        for p in &points[..3] {
            engine.advance(&at(*p)).unwrap();
        }

        let ticket = engine.coordinator.outstanding().unwrap();
        let events = engine.complete_reroute(ticket, RouteOutcome::Found(corridor(2))).unwrap();
        assert!(matches!(events[0], NavEvent::RouteLoaded { step_count: 2, .. }));
        assert_eq!(engine.session().step_index(), Some(0));
    }

    #[test]
    fn late_reroute_answer_leaves_arrival_intact() {
        let route = corridor(4);
        let points: Vec<Point> = route.steps().iter().map(|s| s.location).collect();
        let mut engine = Engine::new(NavConfig::default());
        engine.start(route, NavMode::Live).unwrap();

        let mut requests = Vec::new();
        for p in &points {
            let events = engine.advance(&at(*p)).unwrap();
            requests.extend(events.iter().filter_map(|e| match e {
                NavEvent::OffRoute { request, .. } => Some(*request),
                _ => None,
            }));
        }
        assert_eq!(requests.len(), 1);
        assert_eq!(engine.session().state(), NavState::Arrived);
        assert!(engine.coordinator.outstanding().is_none());

        let ticket = requests[0].ticket;
        let events = engine.complete_reroute(ticket, RouteOutcome::Found(corridor(2))).unwrap();
        assert!(events.is_empty());
        assert_eq!(engine.session().state(), NavState::Arrived);

        let events = engine.complete_reroute(ticket, RouteOutcome::NotFound).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn english_engine_narrates_in_english() {
        let config = NavConfig {
            language: "en-US".to_string(),
            ..NavConfig::default()
        };
        let route = corridor(2);
        let first = route.steps()[0].location;
        let mut engine = Engine::new(config);
        engine.start(route, NavMode::Live).unwrap();

        let events = engine.advance(&at(offset(&first, 270.0, 1500.0))).unwrap();
        let g = guidance(&events)[0];
        assert_eq!(g.voice_text, "In 1.5 km, continue straight.");
        assert_eq!(g.display_text, "Continue straight.");
    }

    #[test]
    fn finish_simulation_ends_with_distinct_announcement() {
        let mut engine = Engine::new(NavConfig::default());
        engine.start(corridor(2), NavMode::Simulated).unwrap();
        let events = engine.finish_simulation();
        assert_eq!(engine.session().state(), NavState::Inactive);
        assert!(matches!(
            &events[..],
            [NavEvent::SimulationEnded { text }] if text == "デモ走行が終了しました。"
        ));
    }
}
