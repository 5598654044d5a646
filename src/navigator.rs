//! Single-threaded driver wiring the engine to its collaborators.
//!
//! The navigator pulls samples from exactly one attached position source,
//! forwards off-route requests to the route service, drains route service
//! answers between samples, and pushes every event to the display and
//! speech surfaces. Speech failures are logged and ignored.

use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, warn};

use crate::config::NavConfig;
use crate::engine::Engine;
use crate::error::NavError;
use crate::event::NavEvent;
use crate::geo::Point;
use crate::narration::Guidance;
use crate::reroute::{RerouteRequest, RerouteTicket, RouteOutcome};
use crate::route::Route;
use crate::session::NavMode;
use crate::source::{PositionSample, PositionSource};

/// Map surface owned by the platform.
pub trait DisplaySurface {
    fn draw_route(&mut self, geometry: &[Point]);
    fn place_marker(&mut self, position: Point, heading: f64);
    fn show_guidance(&mut self, _guidance: &Guidance) {}
    fn show_message(&mut self, _text: &str) {}
}

#[derive(Debug, thiserror::Error)]
#[error("speech unavailable: {0}")]
pub struct SpeechError(pub String);

/// Text-to-speech output owned by the platform.
pub trait SpeechSurface {
    fn speak(&mut self, text: &str, language: &str) -> Result<(), SpeechError>;
}

/// Handle for answering one reroute request, possibly from another thread.
#[derive(Debug, Clone)]
pub struct RerouteReply {
    ticket: RerouteTicket,
    tx: Sender<(RerouteTicket, RouteOutcome)>,
}

impl RerouteReply {
    pub fn send(self, outcome: RouteOutcome) {
        // The navigator may already be gone; nothing left to update then
        let _ = self.tx.send((self.ticket, outcome));
    }
}

/// External route computation.
pub trait RouteService {
    /// Start computing a route. The answer goes through `reply`, now or
    /// later.
    fn request(&mut self, request: RerouteRequest, reply: RerouteReply);
}

pub struct Navigator {
    engine: Engine,
    source: Option<Box<dyn PositionSource>>,
    display: Box<dyn DisplaySurface>,
    speech: Box<dyn SpeechSurface>,
    routes: Box<dyn RouteService>,
    reply_tx: Sender<(RerouteTicket, RouteOutcome)>,
    reply_rx: Receiver<(RerouteTicket, RouteOutcome)>,
}

impl Navigator {
    pub fn new(
        config: NavConfig,
        display: Box<dyn DisplaySurface>,
        speech: Box<dyn SpeechSurface>,
        routes: Box<dyn RouteService>,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel();
        Self {
            engine: Engine::new(config),
            source: None,
            display,
            speech,
            routes,
            reply_tx,
            reply_rx,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Start guidance on `route` driven by `source`.
    pub fn start(&mut self, route: Route, source: Box<dyn PositionSource>) -> Result<(), NavError> {
        let events = self.engine.start(route, source.mode())?;
        self.attach(source);
        self.dispatch(events);
        Ok(())
    }

    /// Replace the position source. The previous one is torn down first.
    pub fn attach(&mut self, source: Box<dyn PositionSource>) {
        if self.source.take().is_some() {
            debug!("previous position source detached");
        }
        self.engine.set_mode(source.mode());
        self.source = Some(source);
    }

    pub fn stop(&mut self, acknowledge: bool) {
        self.source = None;
        let events = self.engine.stop(acknowledge);
        self.dispatch(events);
    }

    /// Pump the attached source until it ends.
    ///
    /// A source error detaches the source and is returned; the session is
    /// left as it was so a new source can resume it.
    pub fn run(&mut self) -> Result<(), NavError> {
        loop {
            self.poll_reroutes()?;

            let Some(source) = self.source.as_mut() else {
                return Ok(());
            };
            let mode = source.mode();
            let cadence = source.cadence();

            match source.next_sample() {
                Some(Ok(sample)) => {
                    self.process(&sample)?;
                    if !cadence.is_zero() {
                        std::thread::sleep(cadence);
                    }
                }
                Some(Err(err)) => {
                    warn!("position source failed: {err}");
                    self.source = None;
                    return Err(err);
                }
                None => {
                    self.source = None;
                    if mode == NavMode::Simulated {
                        let events = self.engine.finish_simulation();
                        self.dispatch(events);
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Feed one sample through the engine.
    pub fn process(&mut self, sample: &PositionSample) -> Result<(), NavError> {
        if !self.engine.session().is_navigating() {
            debug!("sample ignored in state {:?}", self.engine.session().state());
            return Ok(());
        }

        let events = self.engine.advance(sample)?;
        for event in &events {
            if let NavEvent::OffRoute { request, .. } = event {
                let reply = RerouteReply {
                    ticket: request.ticket,
                    tx: self.reply_tx.clone(),
                };
                self.routes.request(*request, reply);
            }
        }
        self.dispatch(events);
        Ok(())
    }

    /// Apply every route service answer received so far.
    pub fn poll_reroutes(&mut self) -> Result<(), NavError> {
        while let Ok((ticket, outcome)) = self.reply_rx.try_recv() {
            let events = self.engine.complete_reroute(ticket, outcome)?;
            self.dispatch(events);
        }
        Ok(())
    }

    fn dispatch(&mut self, events: Vec<NavEvent>) {
        let language = self.engine.config().locale().speech_tag();

        for event in &events {
            match event {
                NavEvent::RouteLoaded { geometry, .. } => self.display.draw_route(geometry),
                NavEvent::Marker { position, heading } => {
                    self.display.place_marker(*position, *heading)
                }
                NavEvent::Guidance(guidance) => self.display.show_guidance(guidance),
                NavEvent::Arrived { text }
                | NavEvent::OffRoute { text, .. }
                | NavEvent::RerouteFailed { text }
                | NavEvent::GuidanceEnded { text }
                | NavEvent::SimulationEnded { text } => self.display.show_message(text),
            }

            if let Some(text) = event.speech_text() {
                if let Err(err) = self.speech.speak(text, language) {
                    warn!("speech failed, continuing: {err}");
                }
            }
        }
    }
}
