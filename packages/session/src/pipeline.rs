//! One route-plus-risk pipeline.
//!
//! The session owns two of these, one per [`PipelineKind`]. Their shape is
//! identical; the session's phase decides which one is authoritative.

use saferoute_incident_models::IncidentEvent;
use saferoute_risk::ProximityScorer;
use saferoute_risk_models::{Advisory, CorridorHit, RiskAssessment};
use saferoute_routing::ROUTE_UNAVAILABLE;
use saferoute_routing::grammar;
use saferoute_routing_models::{Instruction, RouteGeometry};

use crate::effects::{Generation, PipelineKind};

#[derive(Debug, Clone, PartialEq)]
pub struct RiskPipeline {
    kind: PipelineKind,
    comment_cap: usize,
    generation: Generation,
    pending: bool,
    route: Option<RouteGeometry>,
    instructions: Vec<Instruction>,
    assessment: RiskAssessment,
    corridor: Vec<CorridorHit>,
    advisory: Option<Advisory>,
}

impl RiskPipeline {
    /// An empty pipeline keeping at most `comment_cap` comments after a
    /// remote opinion is merged.
    #[must_use]
    pub const fn new(kind: PipelineKind, comment_cap: usize) -> Self {
        Self {
            kind,
            comment_cap,
            generation: 0,
            pending: false,
            route: None,
            instructions: Vec::new(),
            assessment: RiskAssessment::none(),
            corridor: Vec::new(),
            advisory: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Generation of the most recent request (or reset).
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether a route request is outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub const fn route(&self) -> Option<&RouteGeometry> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[must_use]
    pub const fn assessment(&self) -> &RiskAssessment {
        &self.assessment
    }

    #[must_use]
    pub fn corridor(&self) -> &[CorridorHit] {
        &self.corridor
    }

    /// Drops everything and adopts `generation`, so responses tagged with
    /// any earlier generation no longer match.
    pub fn reset(&mut self, generation: Generation) {
        *self = Self::new(self.kind, self.comment_cap);
        self.generation = generation;
    }

    /// Resets and marks a route request for `generation` as outstanding.
    pub fn begin(&mut self, generation: Generation) {
        self.reset(generation);
        self.pending = true;
    }

    /// Keeps the current route and assessment but adopts `generation`, so
    /// responses still in flight for the earlier generation are ignored.
    pub const fn retire(&mut self, generation: Generation) {
        self.generation = generation;
        self.pending = false;
    }

    /// Whether a route response tagged `generation` belongs here.
    #[must_use]
    pub const fn accepts_route(&self, generation: Generation) -> bool {
        self.pending && self.generation == generation
    }

    /// Whether an advisory tagged `generation` belongs here.
    #[must_use]
    pub const fn accepts_advice(&self, generation: Generation) -> bool {
        self.route.is_some() && self.generation == generation
    }

    /// Installs a computed route and scores it.
    pub fn accept_route<'a, I>(&mut self, route: RouteGeometry, scorer: &ProximityScorer, incidents: I)
    where
        I: IntoIterator<Item = &'a IncidentEvent> + Clone,
    {
        self.pending = false;
        self.instructions = grammar::instructions(&route.maneuvers);
        self.route = Some(route);
        self.advisory = None;
        self.rescore(scorer, incidents);
    }

    /// Records a routing failure as a single explanatory instruction.
    pub fn route_failed(&mut self) {
        self.pending = false;
        self.route = None;
        self.instructions = vec![Instruction::notice(ROUTE_UNAVAILABLE)];
        self.assessment = RiskAssessment::none();
        self.corridor.clear();
        self.advisory = None;
    }

    /// Recomputes the local assessment, keeping any remote opinion.
    ///
    /// Returns `true` if the assessment changed. Without a route the
    /// assessment stays in its "no route" state.
    pub fn rescore<'a, I>(&mut self, scorer: &ProximityScorer, incidents: I) -> bool
    where
        I: IntoIterator<Item = &'a IncidentEvent> + Clone,
    {
        let Some(route) = &self.route else {
            return false;
        };

        let mut assessment = scorer.score(&route.coordinates, incidents.clone());
        if let Some(advisory) = &self.advisory {
            assessment.merge_advisory(advisory, self.comment_cap);
        }
        self.corridor = scorer.corridor_hits(&route.coordinates, incidents);

        let changed = assessment != self.assessment;
        self.assessment = assessment;
        changed
    }

    /// Merges a remote opinion into the current assessment.
    pub fn merge_advice(&mut self, advisory: Advisory) {
        self.assessment.merge_advisory(&advisory, self.comment_cap);
        self.advisory = Some(advisory);
    }
}

#[cfg(test)]
mod tests {
    use saferoute_geometry::LatLng;
    use saferoute_risk_models::{CommentKind, RiskTier};
    use saferoute_routing_models::{Maneuver, TravelMode};

    use super::*;

    fn route() -> RouteGeometry {
        RouteGeometry::new(
            vec![LatLng::new(4.6004, -74.081), LatLng::new(4.6004, -74.079)],
            220.0,
            vec![Maneuver::new("depart"), Maneuver::new("arrive")],
            TravelMode::Walking,
        )
    }

    fn incidents() -> Vec<IncidentEvent> {
        vec![IncidentEvent::new("1", 4.60, -74.08, "theft")]
    }

    #[test]
    fn only_the_current_generation_is_accepted() {
        let mut pipeline = RiskPipeline::new(PipelineKind::Preview, 2);
        assert!(!pipeline.accepts_route(0));

        pipeline.begin(3);
        assert!(pipeline.accepts_route(3));
        assert!(!pipeline.accepts_route(2));
        assert!(!pipeline.accepts_advice(3));

        pipeline.accept_route(route(), &ProximityScorer::default(), &incidents());
        assert!(!pipeline.accepts_route(3));
        assert!(pipeline.accepts_advice(3));
    }

    #[test]
    fn retired_pipeline_keeps_route_but_ignores_old_responses() {
        let mut pipeline = RiskPipeline::new(PipelineKind::Preview, 2);
        pipeline.begin(1);
        pipeline.accept_route(route(), &ProximityScorer::default(), &incidents());
        let before = pipeline.assessment().clone();

        pipeline.retire(2);
        assert!(!pipeline.accepts_advice(1));
        assert!(!pipeline.accepts_route(1));
        assert!(pipeline.route().is_some());
        assert_eq!(pipeline.assessment(), &before);
    }

    #[test]
    fn rescore_keeps_remote_opinion() {
        let mut pipeline = RiskPipeline::new(PipelineKind::Active, 2);
        pipeline.begin(1);
        pipeline.accept_route(route(), &ProximityScorer::default(), &incidents());
        pipeline.merge_advice(Advisory {
            tier_label: "Low".to_string(),
            score: 0.2,
            total_points: None,
        });

        let none: [IncidentEvent; 0] = [];
        assert!(pipeline.rescore(&ProximityScorer::default(), &none));
        let assessment = pipeline.assessment();
        assert_eq!(assessment.tier, Some(RiskTier::Low));
        assert_eq!(assessment.comments[0].kind, CommentKind::RemoteOpinion);
        assert_eq!(assessment.comments[1].kind, CommentKind::NoNearbyEvents);
        assert!(pipeline.corridor().is_empty());
    }

    #[test]
    fn reset_returns_to_no_route_state() {
        let mut pipeline = RiskPipeline::new(PipelineKind::Preview, 2);
        pipeline.begin(1);
        pipeline.accept_route(route(), &ProximityScorer::default(), &incidents());
        assert!(pipeline.assessment().is_scored());

        pipeline.reset(2);
        assert_eq!(pipeline.generation(), 2);
        assert!(pipeline.route().is_none());
        assert!(pipeline.instructions().is_empty());
        assert_eq!(pipeline.assessment(), &RiskAssessment::none());
    }

    #[test]
    fn failure_leaves_single_instruction() {
        let mut pipeline = RiskPipeline::new(PipelineKind::Preview, 2);
        pipeline.begin(1);
        pipeline.route_failed();
        assert!(!pipeline.is_pending());
        assert_eq!(pipeline.instructions().len(), 1);
        assert_eq!(pipeline.instructions()[0].text, ROUTE_UNAVAILABLE);
    }
}
