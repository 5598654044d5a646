//! Off-route detection and reroute bookkeeping.
//!
//! The off-route test measures the distance to the upcoming maneuver
//! point, not the cross-track distance to the polyline. At most one
//! reroute request is outstanding at a time.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::event::NavEvent;
use crate::geo::{haversine, Point};
use crate::narration::Announcement;
use crate::route::Route;
use crate::session::NavigationSession;
use crate::source::PositionSample;

/// Identifies one reroute request.
///
/// `generation` is the session generation the request was issued in; a
/// completion whose generation no longer matches is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerouteTicket {
    pub generation: u64,
    pub sequence: u64,
}

/// What the route service is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RerouteRequest {
    pub ticket: RerouteTicket,
    pub origin: Point,
    pub destination: Point,
    pub avoid_motorways: bool,
}

/// Route service answer.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(Route),
    NotFound,
}

#[derive(Debug)]
pub struct RerouteCoordinator {
    off_route_threshold_m: f64,
    exempt_through_step: usize,
    avoid_motorways: bool,
    outstanding: Option<RerouteTicket>,
    next_sequence: u64,
}

impl RerouteCoordinator {
    pub fn new(off_route_threshold_m: f64, exempt_through_step: usize, avoid_motorways: bool) -> Self {
        Self {
            off_route_threshold_m,
            exempt_through_step,
            avoid_motorways,
            outstanding: None,
            next_sequence: 0,
        }
    }

    pub fn outstanding(&self) -> Option<RerouteTicket> {
        self.outstanding
    }

    /// Forget any outstanding request. Its completion will be discarded.
    pub fn cancel(&mut self) {
        if let Some(ticket) = self.outstanding.take() {
            debug!("reroute {ticket:?} cancelled");
        }
    }

    /// Run the off-route test for one sample.
    ///
    /// Returns the off-route event carrying the new request, or `None` when
    /// the step is exempt, a request is already outstanding, or the
    /// traveler is close enough to the upcoming maneuver.
    pub fn check(&mut self, session: &NavigationSession, sample: &PositionSample) -> Option<NavEvent> {
        let step_index = session.step_index()?;
        if step_index <= self.exempt_through_step {
            return None;
        }

        if let Some(ticket) = self.outstanding {
            debug!("off-route check suppressed, reroute {ticket:?} outstanding");
            return None;
        }

        let position = sample.point();
        let distance = haversine(&position, &session.upcoming_point()?);
        if distance <= self.off_route_threshold_m {
            return None;
        }

        let destination = session.destination()?;
        let ticket = RerouteTicket {
            generation: session.generation(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.outstanding = Some(ticket);

        info!("off route at step {step_index} ({distance:.0} m from maneuver), requesting reroute");

        Some(NavEvent::OffRoute {
            text: session.narrator().announce(Announcement::Rerouting),
            request: RerouteRequest {
                ticket,
                origin: position,
                destination,
                avoid_motorways: self.avoid_motorways,
            },
        })
    }

    /// Apply a route service answer.
    ///
    /// Answers that do not match the outstanding request or the current
    /// session generation are dropped without effect, as are answers that
    /// arrive once the session is no longer navigating.
    pub fn complete(
        &mut self,
        session: &mut NavigationSession,
        ticket: RerouteTicket,
        outcome: RouteOutcome,
    ) -> Result<Vec<NavEvent>, NavError> {
        if self.outstanding != Some(ticket) || ticket.generation != session.generation() {
            debug!("discarding stale reroute completion {ticket:?}");
            return Ok(Vec::new());
        }
        if !session.is_navigating() {
            debug!("discarding reroute completion {ticket:?} in state {:?}", session.state());
            self.outstanding = None;
            return Ok(Vec::new());
        }
        self.outstanding = None;

        match outcome {
            RouteOutcome::Found(route) => session.reroute(route),
            RouteOutcome::NotFound => {
                info!("reroute {ticket:?} found no route, keeping previous route");
                Ok(vec![NavEvent::RerouteFailed {
                    text: session.narrator().announce(Announcement::NoRoute),
                }])
            }
        }
    }
}
