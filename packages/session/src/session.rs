//! The route session state machine.

use saferoute_advisor::prepare_points;
use saferoute_geometry::LatLng;
use saferoute_incident::IncidentStore;
use saferoute_incident::loader::LoadOutcome;
use saferoute_incident_models::IncidentEvent;
use saferoute_navigation::InstructionCursor;
use saferoute_risk::advice::advice;
use saferoute_risk::{AlertTrigger, ProximityScorer};
use saferoute_risk_models::{Advisory, CorridorHit, RiskAssessment};
use saferoute_routing::RoutingError;
use saferoute_routing_models::{Instruction, RouteGeometry, RouteSummary, TravelMode};
use serde::Serialize;

use crate::TrackingError;
use crate::config::SessionConfig;
use crate::effects::{Effect, Generation, Notice, Phase, PipelineKind};
use crate::pipeline::RiskPipeline;

/// Read-only view of a session for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub mode: TravelMode,
    pub start: Option<LatLng>,
    pub end: Option<LatLng>,
    pub tracking: bool,
    pub alerting: bool,
    /// Assessment of the authoritative pipeline.
    pub assessment: RiskAssessment,
    /// Advice text for the authoritative tier, if scored.
    pub advice: Option<String>,
    pub instructions: Vec<Instruction>,
    pub instruction_index: usize,
    pub route: Option<RouteSummary>,
    pub corridor: Vec<CorridorHit>,
}

/// Aggregate root: endpoints, phase, both risk pipelines, the instruction
/// cursor, live tracking and the alert trigger.
///
/// All mutation goes through the transition methods, each of which
/// returns the [`Effect`]s the caller must act on.
#[derive(Debug, Clone)]
pub struct RouteSession {
    config: SessionConfig,
    scorer: ProximityScorer,
    incidents: IncidentStore,
    mode: TravelMode,
    start: Option<LatLng>,
    end: Option<LatLng>,
    phase: Phase,
    preview: RiskPipeline,
    active: RiskPipeline,
    cursor: InstructionCursor,
    tracking: bool,
    alert: AlertTrigger,
    generation: Generation,
}

impl Default for RouteSession {
    fn default() -> Self {
        Self::new(SessionConfig::default(), IncidentStore::default())
    }
}

impl RouteSession {
    #[must_use]
    pub fn new(config: SessionConfig, incidents: IncidentStore) -> Self {
        let scorer = ProximityScorer {
            radius_m: config.proximity_radius_m,
            thresholds: config.thresholds,
            max_samples: config.scoring_max_samples,
        };
        let cap = config.advisor_comment_cap;
        Self {
            scorer,
            incidents,
            mode: config.default_mode,
            start: None,
            end: None,
            phase: Phase::Idle,
            preview: RiskPipeline::new(PipelineKind::Preview, cap),
            active: RiskPipeline::new(PipelineKind::Active, cap),
            cursor: InstructionCursor::new(config.progress_policy, config.cursor_max_samples),
            tracking: false,
            alert: AlertTrigger::new(),
            generation: 0,
            config,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn mode(&self) -> TravelMode {
        self.mode
    }

    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.tracking
    }

    #[must_use]
    pub const fn radius_m(&self) -> f64 {
        self.scorer.radius_m
    }

    #[must_use]
    pub const fn incidents(&self) -> &IncidentStore {
        &self.incidents
    }

    #[must_use]
    pub const fn pipeline(&self, kind: PipelineKind) -> &RiskPipeline {
        match kind {
            PipelineKind::Preview => &self.preview,
            PipelineKind::Active => &self.active,
        }
    }

    const fn pipeline_mut(&mut self, kind: PipelineKind) -> &mut RiskPipeline {
        match kind {
            PipelineKind::Preview => &mut self.preview,
            PipelineKind::Active => &mut self.active,
        }
    }

    /// The pipeline selected by the current phase.
    #[must_use]
    pub const fn authoritative(&self) -> &RiskPipeline {
        match self.phase {
            Phase::Idle | Phase::Previewing => &self.preview,
            Phase::Active => &self.active,
        }
    }

    /// Assessment of the authoritative pipeline.
    #[must_use]
    pub const fn assessment(&self) -> &RiskAssessment {
        self.authoritative().assessment()
    }

    /// Current instruction index of the active route.
    #[must_use]
    pub const fn instruction_index(&self) -> usize {
        self.cursor.index()
    }

    fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    fn set_phase(&mut self, phase: Phase, effects: &mut Vec<Effect>) {
        if self.phase != phase {
            log::debug!("Session phase {} -> {phase}", self.phase);
            self.phase = phase;
            effects.push(Effect::PhaseChanged(phase));
        }
    }

    /// Feeds the authoritative tier to the alert trigger.
    fn observe_tier(&mut self, effects: &mut Vec<Effect>) {
        let tier = self.assessment().tier;
        let fired = self.alert.observe(tier);
        if let Some(tier) = tier.filter(|_| fired) {
            effects.push(Effect::Alert {
                tier,
                advice: advice(tier, self.mode).to_string(),
            });
        }
    }

    fn push_assessment(&self, kind: PipelineKind, effects: &mut Vec<Effect>) {
        effects.push(Effect::AssessmentChanged {
            pipeline: kind,
            assessment: self.pipeline(kind).assessment().clone(),
        });
    }

    /// Leaves navigation: stops tracking and voice.
    fn stop_navigation(&mut self, effects: &mut Vec<Effect>) {
        if self.tracking {
            self.tracking = false;
            effects.push(Effect::StopTracking);
        }
        effects.push(Effect::StopVoice);
    }

    /// Discards both pipelines and, if both endpoints are set, requests a
    /// fresh preview route.
    fn endpoints_changed(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.phase == Phase::Active {
            self.stop_navigation(&mut effects);
        }

        let generation = self.next_generation();
        self.active.reset(generation);
        self.cursor.reset();

        if let (Some(start), Some(end)) = (self.start, self.end) {
            self.preview.begin(generation);
            self.set_phase(Phase::Previewing, &mut effects);
            effects.push(Effect::RequestRoute {
                pipeline: PipelineKind::Preview,
                generation,
                start,
                end,
                mode: self.mode,
            });
        } else {
            self.preview.reset(generation);
            self.set_phase(Phase::Idle, &mut effects);
        }

        self.push_assessment(PipelineKind::Preview, &mut effects);
        self.observe_tier(&mut effects);
        effects
    }

    /// Sets or clears the start endpoint.
    pub fn set_start(&mut self, start: Option<LatLng>) -> Vec<Effect> {
        self.start = start.filter(LatLng::is_finite);
        self.endpoints_changed()
    }

    /// Sets or clears the end endpoint.
    pub fn set_end(&mut self, end: Option<LatLng>) -> Vec<Effect> {
        self.end = end.filter(LatLng::is_finite);
        self.endpoints_changed()
    }

    /// Changes the travel mode. Selecting the current mode does nothing.
    pub fn set_mode(&mut self, mode: TravelMode) -> Vec<Effect> {
        if mode == self.mode {
            return Vec::new();
        }
        self.mode = mode;
        self.endpoints_changed()
    }

    /// Starts navigation on the previewed route.
    ///
    /// Only valid while previewing with a computed route. The active
    /// pipeline starts from scratch and requests its own route.
    pub fn confirm_start(&mut self) -> Vec<Effect> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Vec::new();
        };
        if self.phase != Phase::Previewing || self.preview.route().is_none() {
            log::debug!("Ignoring start: no previewed route");
            return Vec::new();
        }

        let mut effects = Vec::new();
        let generation = self.next_generation();
        self.preview.retire(generation);
        self.active.begin(generation);
        self.cursor.reset();
        self.set_phase(Phase::Active, &mut effects);
        effects.push(Effect::RequestRoute {
            pipeline: PipelineKind::Active,
            generation,
            start,
            end,
            mode: self.mode,
        });
        self.push_assessment(PipelineKind::Active, &mut effects);
        self.observe_tier(&mut effects);
        effects
    }

    /// Returns to `Idle`: endpoints and both pipelines are discarded,
    /// tracking and voice are stopped.
    pub fn clear(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.stop_navigation(&mut effects);

        self.start = None;
        self.end = None;
        let generation = self.next_generation();
        self.preview.reset(generation);
        self.active.reset(generation);
        self.cursor.reset();
        self.alert.reset();
        self.set_phase(Phase::Idle, &mut effects);

        self.push_assessment(PipelineKind::Preview, &mut effects);
        self.push_assessment(PipelineKind::Active, &mut effects);
        effects
    }

    /// Applies a routing response.
    ///
    /// Responses for a superseded generation are dropped. A failure leaves
    /// the phase unchanged and shows a single explanatory instruction.
    pub fn route_ready(
        &mut self,
        kind: PipelineKind,
        generation: Generation,
        result: Result<RouteGeometry, RoutingError>,
    ) -> Vec<Effect> {
        if !self.pipeline(kind).accepts_route(generation) {
            log::debug!("Discarding stale {kind} route (generation {generation})");
            return Vec::new();
        }

        let mut effects = Vec::new();
        match result {
            Ok(route) => {
                log::info!(
                    "{kind} route ready: {:.0} m, {} points",
                    route.distance_m,
                    route.coordinates.len()
                );
                let points = prepare_points(&route.coordinates, self.config.advisor_max_points);
                let pipeline = match kind {
                    PipelineKind::Preview => &mut self.preview,
                    PipelineKind::Active => &mut self.active,
                };
                pipeline.accept_route(route, &self.scorer, self.incidents.filtered());

                self.push_assessment(kind, &mut effects);
                if kind == PipelineKind::Active {
                    self.cursor.reset();
                    if let Some(first) = self.active.instructions().first() {
                        effects.push(Effect::InstructionChanged {
                            index: 0,
                            text: first.text.clone(),
                        });
                        if self.config.voice {
                            effects.push(Effect::Speak(format!("Route ready. {}", first.text)));
                        }
                    }
                }
                effects.push(Effect::RequestAdvice {
                    pipeline: kind,
                    generation,
                    points,
                });
            }
            Err(e) => {
                log::warn!("Failed to compute {kind} route: {e}");
                self.pipeline_mut(kind).route_failed();
                effects.push(Effect::Notice(Notice::RouteUnavailable(e.to_string())));
                if kind == PipelineKind::Active {
                    self.cursor.reset();
                    if let Some(first) = self.active.instructions().first() {
                        effects.push(Effect::InstructionChanged {
                            index: 0,
                            text: first.text.clone(),
                        });
                    }
                }
                self.push_assessment(kind, &mut effects);
            }
        }

        if kind == self.authoritative().kind() {
            self.observe_tier(&mut effects);
        }
        effects
    }

    /// Applies a remote advisor response. Stale or failed responses leave
    /// the local assessment untouched.
    pub fn advice_ready<E: std::fmt::Display>(
        &mut self,
        kind: PipelineKind,
        generation: Generation,
        result: Result<Advisory, E>,
    ) -> Vec<Effect> {
        if !self.pipeline(kind).accepts_advice(generation) {
            log::debug!("Discarding stale {kind} advisory (generation {generation})");
            return Vec::new();
        }

        match result {
            Ok(advisory) => {
                log::debug!("Merging advisory for {kind} route: {}", advisory.comment_text());
                self.pipeline_mut(kind).merge_advice(advisory);
                let mut effects = Vec::new();
                self.push_assessment(kind, &mut effects);
                effects
            }
            Err(e) => {
                log::debug!("Risk advisor unavailable: {e}");
                Vec::new()
            }
        }
    }

    /// Moves the instruction cursor for a live position.
    ///
    /// Ignored unless navigating with tracking on and a route present.
    pub fn position_update(&mut self, position: LatLng) -> Vec<Effect> {
        if self.phase != Phase::Active || !self.tracking {
            return Vec::new();
        }
        let Some(route) = self.active.route() else {
            return Vec::new();
        };

        let previous = self.cursor.index();
        let count = self.active.instructions().len();
        let index = self.cursor.advance(position, &route.coordinates, count);
        if index == previous {
            return Vec::new();
        }

        let Some(instruction) = self.active.instructions().get(index) else {
            return Vec::new();
        };
        let mut effects = vec![Effect::InstructionChanged {
            index,
            text: instruction.text.clone(),
        }];
        if self.config.voice {
            effects.push(Effect::Speak(instruction.text.clone()));
        }
        effects
    }

    /// Changes the proximity radius and rescores both pipelines.
    pub fn set_radius(&mut self, radius_m: f64) -> Vec<Effect> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Vec::new();
        }
        self.scorer.radius_m = radius_m;
        self.rescore_all()
    }

    /// Applies a locality substring filter to the incident set and
    /// rescores. An empty string clears it.
    pub fn set_locality_filter(&mut self, locality: &str) -> Vec<Effect> {
        self.incidents.set_locality_filter(locality);
        self.rescore_all()
    }

    /// Installs a freshly loaded incident set and rescores.
    pub fn replace_incidents(&mut self, events: Vec<IncidentEvent>) -> Vec<Effect> {
        self.incidents.replace(events);
        self.rescore_all()
    }

    /// Falls back to an empty incident set after a failed load.
    pub fn dataset_unavailable(&mut self, message: impl Into<String>) -> Vec<Effect> {
        let mut effects = self.replace_incidents(Vec::new());
        effects.push(Effect::Notice(Notice::DatasetUnavailable(message.into())));
        effects
    }

    /// Applies the result of a dataset load.
    pub fn incidents_loaded(&mut self, outcome: LoadOutcome) -> Vec<Effect> {
        match outcome.notice {
            Some(notice) => self.dataset_unavailable(notice),
            None => {
                if outcome.batch.dropped > 0 {
                    log::warn!("Dropped {} incident records without usable coordinates", outcome.batch.dropped);
                }
                self.replace_incidents(outcome.batch.events)
            }
        }
    }

    fn rescore_all(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        for kind in [PipelineKind::Preview, PipelineKind::Active] {
            let pipeline = match kind {
                PipelineKind::Preview => &mut self.preview,
                PipelineKind::Active => &mut self.active,
            };
            if pipeline.rescore(&self.scorer, self.incidents.filtered()) {
                self.push_assessment(kind, &mut effects);
            }
        }
        self.observe_tier(&mut effects);
        effects
    }

    /// Turns live tracking on or off. Only available while navigating.
    pub fn toggle_tracking(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Active {
            log::debug!("Tracking is only available while navigating");
            return Vec::new();
        }
        self.tracking = !self.tracking;
        log::info!("Live tracking {}", if self.tracking { "on" } else { "off" });
        vec![if self.tracking {
            Effect::StartTracking
        } else {
            Effect::StopTracking
        }]
    }

    /// The position source failed: tracking reverts to off with a single
    /// notice.
    pub fn tracking_failed(&mut self, error: &TrackingError) -> Vec<Effect> {
        if !self.tracking {
            return Vec::new();
        }
        log::warn!("Live tracking stopped: {error}");
        self.tracking = false;
        vec![Effect::Notice(Notice::TrackingUnavailable(error.to_string()))]
    }

    /// Read-only view for presentation.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let pipeline = self.authoritative();
        let assessment = pipeline.assessment().clone();
        SessionSnapshot {
            phase: self.phase,
            mode: self.mode,
            start: self.start,
            end: self.end,
            tracking: self.tracking,
            alerting: self.alert.is_alerting(),
            advice: assessment.tier.map(|t| advice(t, self.mode).to_string()),
            assessment,
            instructions: pipeline.instructions().to_vec(),
            instruction_index: if self.phase == Phase::Active {
                self.cursor.index()
            } else {
                0
            },
            route: pipeline.route().map(RouteGeometry::summary),
            corridor: pipeline.corridor().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use saferoute_incident::loader::LoadOutcome;
    use saferoute_risk_models::{CommentKind, RiskTier};
    use saferoute_routing::ROUTE_UNAVAILABLE;
    use saferoute_routing_models::Maneuver;

    use super::*;

    const START: LatLng = LatLng::new(4.6004, -74.09);
    const END: LatLng = LatLng::new(4.6004, -74.07);

    /// 21 points along latitude 4.6004, about 44 m north of the theft.
    fn line() -> Vec<LatLng> {
        (0..=20)
            .map(|i| LatLng::new(4.6004, -74.09 + f64::from(i) * 0.001))
            .collect()
    }

    fn geometry() -> RouteGeometry {
        RouteGeometry::new(
            line(),
            2200.0,
            vec![
                Maneuver::new("depart"),
                Maneuver::new("turn").with_modifier("left"),
                Maneuver::new("arrive"),
            ],
            TravelMode::Driving,
        )
    }

    fn theft() -> IncidentEvent {
        IncidentEvent::new("1", 4.60, -74.08, "theft").with_locality("Chapinero")
    }

    fn session() -> RouteSession {
        RouteSession::new(SessionConfig::default(), IncidentStore::new(vec![theft()]))
    }

    fn requested(effects: &[Effect]) -> Option<(PipelineKind, Generation)> {
        effects.iter().find_map(|e| match e {
            Effect::RequestRoute {
                pipeline,
                generation,
                ..
            } => Some((*pipeline, *generation)),
            _ => None,
        })
    }

    fn count(effects: &[Effect], pred: impl Fn(&Effect) -> bool) -> usize {
        effects.iter().filter(|e| pred(e)).count()
    }

    fn previewing(session: &mut RouteSession) -> Generation {
        session.set_start(Some(START));
        let (kind, generation) = requested(&session.set_end(Some(END))).unwrap();
        assert_eq!(kind, PipelineKind::Preview);
        generation
    }

    fn with_preview(session: &mut RouteSession) -> Vec<Effect> {
        let generation = previewing(session);
        session.route_ready(PipelineKind::Preview, generation, Ok(geometry()))
    }

    fn navigating(session: &mut RouteSession) -> Vec<Effect> {
        with_preview(session);
        let (kind, generation) = requested(&session.confirm_start()).unwrap();
        assert_eq!(kind, PipelineKind::Active);
        session.route_ready(PipelineKind::Active, generation, Ok(geometry()))
    }

    #[test]
    fn one_endpoint_stays_idle() {
        let mut session = session();
        let effects = session.set_start(Some(START));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(requested(&effects).is_none());
    }

    #[test]
    fn both_endpoints_request_a_preview_route() {
        let mut session = session();
        session.set_start(Some(START));
        let effects = session.set_end(Some(END));
        assert_eq!(session.phase(), Phase::Previewing);
        assert!(effects.contains(&Effect::PhaseChanged(Phase::Previewing)));
        assert_eq!(count(&effects, |e| matches!(e, Effect::RequestRoute { .. })), 1);
        assert_eq!(count(&effects, |e| matches!(e, Effect::Speak(_) | Effect::StartTracking)), 0);
    }

    #[test]
    fn nearby_incident_scores_high() {
        let mut session = session();
        let effects = with_preview(&mut session);

        let assessment = session.assessment();
        assert_eq!(assessment.tier, Some(RiskTier::High));
        let nearest = assessment.nearest.as_ref().unwrap();
        assert_eq!(nearest.incident.id, "1");
        assert!(nearest.distance_m < 100);
        assert!(nearest.formatted_distance().ends_with(" m"));

        assert_eq!(count(&effects, |e| matches!(e, Effect::Alert { .. })), 1);

        // Local scoring is published before the advisor is asked.
        let scored = effects
            .iter()
            .position(|e| matches!(e, Effect::AssessmentChanged { .. }))
            .unwrap();
        let advice = effects
            .iter()
            .position(|e| matches!(e, Effect::RequestAdvice { .. }))
            .unwrap();
        assert!(scored < advice);
    }

    #[test]
    fn small_radius_excludes_incident() {
        let mut session = session();
        session.set_radius(10.0);
        with_preview(&mut session);
        assert_eq!(session.assessment().tier, Some(RiskTier::Low));
        assert!(session.assessment().has_no_nearby_events());
    }

    #[test]
    fn advice_request_carries_thinned_route() {
        let mut session = session();
        let effects = with_preview(&mut session);
        let points = effects.iter().find_map(|e| match e {
            Effect::RequestAdvice { points, .. } => Some(points.len()),
            _ => None,
        });
        assert_eq!(points, Some(21));
    }

    #[test]
    fn start_requires_a_previewed_route() {
        let mut session = session();
        previewing(&mut session);
        assert!(session.confirm_start().is_empty());
        assert_eq!(session.phase(), Phase::Previewing);
    }

    #[test]
    fn start_builds_active_pipeline_from_scratch() {
        let mut session = session();
        with_preview(&mut session);
        let effects = session.confirm_start();

        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(count(&effects, |e| matches!(e, Effect::RequestRoute { .. })), 1);
        assert_eq!(requested(&effects).unwrap().0, PipelineKind::Active);
        // Not inherited from the preview.
        assert_eq!(session.assessment(), &RiskAssessment::none());
    }

    #[test]
    fn active_route_announces_first_instruction() {
        let mut session = session();
        let effects = navigating(&mut session);
        assert!(effects.contains(&Effect::Speak("Route ready. Start the route.".to_string())));
        assert!(effects.contains(&Effect::InstructionChanged {
            index: 0,
            text: "Start the route.".to_string(),
        }));
        assert_eq!(session.assessment().tier, Some(RiskTier::High));
    }

    #[test]
    fn preview_route_is_silent() {
        let mut session = session();
        let effects = with_preview(&mut session);
        assert_eq!(count(&effects, |e| matches!(e, Effect::Speak(_))), 0);
    }

    #[test]
    fn endpoint_change_leaves_active() {
        let mut session = session();
        navigating(&mut session);
        session.toggle_tracking();
        assert!(session.is_tracking());

        let effects = session.set_end(Some(LatLng::new(4.62, -74.06)));
        assert_eq!(session.phase(), Phase::Previewing);
        assert!(!session.is_tracking());
        assert!(effects.contains(&Effect::StopTracking));
        assert!(effects.contains(&Effect::StopVoice));
        assert_eq!(requested(&effects).unwrap().0, PipelineKind::Preview);
        assert!(session.pipeline(PipelineKind::Active).route().is_none());
        assert_eq!(session.instruction_index(), 0);
    }

    #[test]
    fn clearing_an_endpoint_goes_idle() {
        let mut session = session();
        with_preview(&mut session);
        let effects = session.set_start(None);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(requested(&effects).is_none());
        assert_eq!(session.assessment(), &RiskAssessment::none());
    }

    #[test]
    fn mode_change_requests_new_route() {
        let mut session = session();
        previewing(&mut session);
        assert!(session.set_mode(TravelMode::Driving).is_empty());

        let effects = session.set_mode(TravelMode::Walking);
        let mode = effects.iter().find_map(|e| match e {
            Effect::RequestRoute { mode, .. } => Some(*mode),
            _ => None,
        });
        assert_eq!(mode, Some(TravelMode::Walking));
    }

    #[test]
    fn stale_route_is_discarded() {
        let mut session = session();
        let old = previewing(&mut session);
        let (_, current) = requested(&session.set_end(Some(LatLng::new(4.62, -74.06)))).unwrap();
        assert_ne!(old, current);

        assert!(session.route_ready(PipelineKind::Preview, old, Ok(geometry())).is_empty());
        assert!(session.pipeline(PipelineKind::Preview).route().is_none());
        assert!(session.pipeline(PipelineKind::Preview).is_pending());
    }

    #[test]
    fn stale_advice_is_discarded() {
        let mut session = session();
        let old = previewing(&mut session);
        session.route_ready(PipelineKind::Preview, old, Ok(geometry()));
        let (_, current) = requested(&session.set_mode(TravelMode::Walking)).unwrap();
        session.route_ready(PipelineKind::Preview, current, Ok(geometry()));
        let before = session.assessment().clone();

        let advisory = Advisory {
            tier_label: "High".to_string(),
            score: 0.9,
            total_points: Some(21),
        };
        let effects = session.advice_ready::<String>(PipelineKind::Preview, old, Ok(advisory));
        assert!(effects.is_empty());
        assert_eq!(session.assessment(), &before);
    }

    #[test]
    fn preview_advice_is_ignored_once_navigating() {
        let mut session = session();
        let generation = previewing(&mut session);
        session.route_ready(PipelineKind::Preview, generation, Ok(geometry()));
        let preview_before = session.pipeline(PipelineKind::Preview).assessment().clone();

        session.confirm_start();
        assert_eq!(session.phase(), Phase::Active);

        let late = Advisory {
            tier_label: "High".to_string(),
            score: 0.9,
            total_points: Some(3),
        };
        let effects = session.advice_ready(PipelineKind::Preview, generation, Ok::<_, String>(late));
        assert!(effects.is_empty());
        assert_eq!(
            session.pipeline(PipelineKind::Preview).assessment(),
            &preview_before
        );
    }

    #[test]
    fn advice_is_merged_in_front() {
        let mut session = session();
        let generation = previewing(&mut session);
        session.route_ready(PipelineKind::Preview, generation, Ok(geometry()));

        let advisory = Advisory {
            tier_label: "Medium".to_string(),
            score: 0.4,
            total_points: Some(4),
        };
        let effects = session.advice_ready::<String>(PipelineKind::Preview, generation, Ok(advisory));
        assert_eq!(effects.len(), 1);

        let comments = &session.assessment().comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].kind, CommentKind::RemoteOpinion);
        assert_eq!(comments[0].text, "Model: Medium risk (score 0.40)");
        assert_eq!(comments[1].kind, CommentKind::NearestIncident);
        // The remote opinion never overrides the local tier.
        assert_eq!(session.assessment().tier, Some(RiskTier::High));
    }

    #[test]
    fn advisor_failure_is_swallowed() {
        let mut session = session();
        let generation = previewing(&mut session);
        session.route_ready(PipelineKind::Preview, generation, Ok(geometry()));
        let before = session.assessment().clone();

        let effects = session.advice_ready(PipelineKind::Preview, generation, Err("timeout"));
        assert!(effects.is_empty());
        assert_eq!(session.assessment(), &before);
    }

    #[test]
    fn routing_failure_keeps_phase() {
        let mut session = session();
        let generation = previewing(&mut session);
        let effects = session.route_ready(PipelineKind::Preview, generation, Err(RoutingError::NoRoute));

        assert_eq!(session.phase(), Phase::Previewing);
        let instructions = session.pipeline(PipelineKind::Preview).instructions();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].text, ROUTE_UNAVAILABLE);
        assert_eq!(
            count(&effects, |e| matches!(e, Effect::Notice(Notice::RouteUnavailable(_)))),
            1
        );
        assert!(requested(&effects).is_none());
    }

    #[test]
    fn clear_from_active_with_tracking() {
        let mut session = session();
        navigating(&mut session);
        session.toggle_tracking();

        let effects = session.clear();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.is_tracking());
        assert!(effects.contains(&Effect::StopTracking));
        assert!(effects.contains(&Effect::StopVoice));
        assert_eq!(
            session.pipeline(PipelineKind::Preview).assessment(),
            &RiskAssessment::none()
        );
        assert_eq!(
            session.pipeline(PipelineKind::Active).assessment(),
            &RiskAssessment::none()
        );
        assert!(session.snapshot().start.is_none());
    }

    #[test]
    fn positions_move_cursor_only_while_tracking() {
        let mut session = session();
        navigating(&mut session);
        let last = *line().last().unwrap();

        assert!(session.position_update(last).is_empty());

        assert_eq!(session.toggle_tracking(), vec![Effect::StartTracking]);
        let effects = session.position_update(last);
        assert!(effects.contains(&Effect::InstructionChanged {
            index: 2,
            text: "You have arrived at your destination.".to_string(),
        }));
        assert!(effects.contains(&Effect::Speak(
            "You have arrived at your destination.".to_string()
        )));

        // Same index again: nothing new to say.
        assert!(session.position_update(last).is_empty());

        session.position_update(LatLng::new(-33.0, 151.0));
        assert!(session.instruction_index() <= 2);
    }

    #[test]
    fn tracking_needs_active_phase() {
        let mut session = session();
        with_preview(&mut session);
        assert!(session.toggle_tracking().is_empty());
        assert!(!session.is_tracking());
    }

    #[test]
    fn tracking_failure_is_reported_once() {
        let mut session = session();
        navigating(&mut session);
        session.toggle_tracking();

        let effects = session.tracking_failed(&TrackingError::Denied);
        assert_eq!(
            effects,
            vec![Effect::Notice(Notice::TrackingUnavailable(
                "Position access denied".to_string()
            ))]
        );
        assert!(!session.is_tracking());
        assert!(session.tracking_failed(&TrackingError::Denied).is_empty());
    }

    #[test]
    fn alert_fires_once_per_high_run() {
        fn alerts(effects: &[Effect]) -> usize {
            count(effects, |e| matches!(e, Effect::Alert { .. }))
        }

        let mut session = session();
        assert_eq!(alerts(&with_preview(&mut session)), 1);
        assert_eq!(alerts(&session.set_radius(250.0)), 0);
        assert_eq!(alerts(&session.set_radius(10.0)), 0);
        assert_eq!(session.assessment().tier, Some(RiskTier::Low));
        assert_eq!(alerts(&session.set_radius(300.0)), 1);
    }

    #[test]
    fn locality_filter_rescores() {
        let mut session = session();
        with_preview(&mut session);

        session.set_locality_filter("usaquen");
        assert_eq!(session.assessment().tier, Some(RiskTier::Low));

        let effects = session.set_locality_filter("chap");
        assert_eq!(session.assessment().tier, Some(RiskTier::High));
        assert_eq!(
            count(&effects, |e| matches!(
                e,
                Effect::AssessmentChanged {
                    pipeline: PipelineKind::Preview,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn failed_dataset_load_falls_back_to_empty() {
        let mut session = session();
        with_preview(&mut session);

        let effects = session.incidents_loaded(LoadOutcome {
            notice: Some("Incident data could not be loaded.".to_string()),
            ..LoadOutcome::default()
        });
        assert!(session.incidents().is_empty());
        assert!(effects.contains(&Effect::Notice(Notice::DatasetUnavailable(
            "Incident data could not be loaded.".to_string()
        ))));
        // A route is present, so the assessment is Low rather than empty.
        assert_eq!(session.assessment().tier, Some(RiskTier::Low));
    }

    #[test]
    fn snapshot_exposes_authoritative_view() {
        let mut session = session();
        with_preview(&mut session);
        let snapshot = session.snapshot();

        assert_eq!(snapshot.phase, Phase::Previewing);
        assert_eq!(snapshot.mode, TravelMode::Driving);
        assert_eq!(snapshot.instructions.len(), 3);
        assert!(snapshot.alerting);
        let route = snapshot.route.unwrap();
        assert_eq!(route.distance_text, "2.20 km");
        assert_eq!(route.time_text, "3.3 min");
        assert!(snapshot.advice.is_some());
        assert!(!snapshot.corridor.is_empty());
    }
}
