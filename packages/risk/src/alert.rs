//! Edge-triggered high-risk alert.

use saferoute_risk_models::RiskTier;

/// Fires once per contiguous run of [`RiskTier::High`] classifications.
///
/// The "currently alerting" flag lives here, owned by whichever session
/// feeds it, so independent sessions never share alert state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertTrigger {
    alerting: bool,
}

impl AlertTrigger {
    #[must_use]
    pub const fn new() -> Self {
        Self { alerting: false }
    }

    /// Feeds one tier recomputation; returns `true` if an alert fires.
    ///
    /// `None` (no route scored) counts as not high.
    pub fn observe(&mut self, tier: Option<RiskTier>) -> bool {
        let high = tier == Some(RiskTier::High);
        let fire = high && !self.alerting;
        self.alerting = high;
        if fire {
            log::info!("High risk detected on the route");
        }
        fire
    }

    /// Whether the last observed tier was high.
    #[must_use]
    pub const fn is_alerting(&self) -> bool {
        self.alerting
    }

    /// Clears the flag so the next high tier fires again.
    pub const fn reset(&mut self) {
        self.alerting = false;
    }
}
