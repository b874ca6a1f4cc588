//! Async executor for session effects.

use std::sync::Arc;

use async_trait::async_trait;
use saferoute_advisor::{AdvisorError, RiskAdvisor};
use saferoute_geometry::LatLng;
use saferoute_risk_models::Advisory;
use saferoute_routing::{RouteProvider, RoutingError};
use saferoute_routing_models::{RouteGeometry, TravelMode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::TrackingError;
use crate::effects::{Effect, Generation, PipelineKind};
use crate::session::RouteSession;

/// A stream of live positions.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Pushes positions into `sink` until the source ends or fails.
    ///
    /// The driver aborts the task running this future when tracking is
    /// turned off, so implementations need no stop signal of their own.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError`] if positions are unavailable or denied.
    async fn watch(&self, sink: PositionSink) -> Result<(), TrackingError>;
}

#[derive(Debug)]
enum DriverEvent {
    Route {
        pipeline: PipelineKind,
        generation: Generation,
        result: Result<RouteGeometry, RoutingError>,
    },
    Advice {
        pipeline: PipelineKind,
        generation: Generation,
        result: Result<Advisory, AdvisorError>,
    },
    Position(LatLng),
    TrackingFailed {
        epoch: u64,
        error: TrackingError,
    },
}

/// Handle a [`PositionSource`] writes positions into.
#[derive(Debug, Clone)]
pub struct PositionSink {
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl PositionSink {
    /// Delivers one position. Returns `false` once the driver is gone.
    pub fn send(&self, position: LatLng) -> bool {
        self.tx.send(DriverEvent::Position(position)).is_ok()
    }
}

/// Runs a [`RouteSession`] against real providers.
///
/// Network calls run as spawned tasks; their results come back through an
/// internal channel and are applied one at a time by [`step`](Self::step),
/// so the session itself is never shared between tasks.
pub struct SessionDriver {
    session: RouteSession,
    routes: Arc<dyn RouteProvider>,
    advisor: Arc<dyn RiskAdvisor>,
    positions: Arc<dyn PositionSource>,
    tx: mpsc::UnboundedSender<DriverEvent>,
    rx: mpsc::UnboundedReceiver<DriverEvent>,
    in_flight: usize,
    tracking_task: Option<JoinHandle<()>>,
    /// Bumped for every tracking task, so failures of older tasks are
    /// recognized.
    tracking_epoch: u64,
    subscriber: Option<mpsc::UnboundedSender<Effect>>,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        session: RouteSession,
        routes: Arc<dyn RouteProvider>,
        advisor: Arc<dyn RiskAdvisor>,
        positions: Arc<dyn PositionSource>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            routes,
            advisor,
            positions,
            tx,
            rx,
            in_flight: 0,
            tracking_task: None,
            tracking_epoch: 0,
            subscriber: None,
        }
    }

    /// Receives every effect the session emits, commands included.
    ///
    /// Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Effect> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriber = Some(tx);
        rx
    }

    #[must_use]
    pub const fn session(&self) -> &RouteSession {
        &self.session
    }

    /// Number of route and advice requests still outstanding.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Runs one session transition and executes its effects.
    pub fn dispatch<F>(&mut self, transition: F)
    where
        F: FnOnce(&mut RouteSession) -> Vec<Effect>,
    {
        let effects = transition(&mut self.session);
        self.apply(effects);
    }

    /// Waits for the next provider result or position and applies it.
    ///
    /// Returns `false` if the internal channel is closed.
    pub async fn step(&mut self) -> bool {
        let Some(event) = self.rx.recv().await else {
            return false;
        };
        self.handle(event);
        true
    }

    /// Processes events until no route or advice request is outstanding.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            if !self.step().await {
                break;
            }
        }
    }

    fn handle(&mut self, event: DriverEvent) {
        let effects = match event {
            DriverEvent::Route {
                pipeline,
                generation,
                result,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.session.route_ready(pipeline, generation, result)
            }
            DriverEvent::Advice {
                pipeline,
                generation,
                result,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.session.advice_ready(pipeline, generation, result)
            }
            DriverEvent::Position(position) => self.session.position_update(position),
            DriverEvent::TrackingFailed { epoch, error } => {
                if epoch != self.tracking_epoch || self.tracking_task.is_none() {
                    log::debug!("Ignoring failure of a superseded tracking task: {error}");
                    return;
                }
                self.stop_tracking();
                self.session.tracking_failed(&error)
            }
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::RequestRoute {
                    pipeline,
                    generation,
                    start,
                    end,
                    mode,
                } => self.request_route(*pipeline, *generation, *start, *end, *mode),
                Effect::RequestAdvice {
                    pipeline,
                    generation,
                    points,
                } => self.request_advice(*pipeline, *generation, points.clone()),
                Effect::StartTracking => self.start_tracking(),
                Effect::StopTracking => self.stop_tracking(),
                _ => {}
            }

            let closed = self
                .subscriber
                .as_ref()
                .is_some_and(|tx| tx.send(effect).is_err());
            if closed {
                self.subscriber = None;
            }
        }
    }

    fn request_route(
        &mut self,
        pipeline: PipelineKind,
        generation: Generation,
        start: LatLng,
        end: LatLng,
        mode: TravelMode,
    ) {
        let routes = Arc::clone(&self.routes);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = routes.route(start, end, mode).await;
            let _ = tx.send(DriverEvent::Route {
                pipeline,
                generation,
                result,
            });
        });
    }

    fn request_advice(&mut self, pipeline: PipelineKind, generation: Generation, points: Vec<LatLng>) {
        let advisor = Arc::clone(&self.advisor);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = advisor.opinion(&points).await;
            let _ = tx.send(DriverEvent::Advice {
                pipeline,
                generation,
                result,
            });
        });
    }

    fn start_tracking(&mut self) {
        self.stop_tracking();
        let source = Arc::clone(&self.positions);
        let sink = PositionSink { tx: self.tx.clone() };
        let tx = self.tx.clone();
        self.tracking_epoch += 1;
        let epoch = self.tracking_epoch;
        log::debug!("Starting position tracking ({epoch})");
        self.tracking_task = Some(tokio::spawn(async move {
            if let Err(error) = source.watch(sink).await {
                let _ = tx.send(DriverEvent::TrackingFailed { epoch, error });
            }
        }));
    }

    fn stop_tracking(&mut self) {
        if let Some(task) = self.tracking_task.take() {
            log::debug!("Stopping position tracking");
            task.abort();
        }
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}
