//! Travel advice shown next to the risk tier.

use saferoute_risk_models::RiskTier;
use saferoute_routing_models::TravelMode;

/// Advice text for a tier and travel mode.
#[must_use]
pub const fn advice(tier: RiskTier, mode: TravelMode) -> &'static str {
    match (tier, mode) {
        (RiskTier::High, TravelMode::Walking) => {
            "Avoid poorly lit or empty streets. Stay on main avenues, share your location, and consider an alternative route."
        }
        (RiskTier::High, TravelMode::Driving) => {
            "Prefer main, well-lit roads. Avoid stopping and keep doors and windows locked. Consider an alternative route."
        }
        (RiskTier::Medium, TravelMode::Walking) => {
            "Stay aware of your surroundings and belongings. Avoid shortcuts and narrow passages."
        }
        (RiskTier::Medium, TravelMode::Driving) => {
            "Drive carefully and avoid narrow streets. Do not stop unnecessarily."
        }
        (RiskTier::Low, TravelMode::Walking) => {
            "Recommended route. Still, stay aware of your surroundings."
        }
        (RiskTier::Low, TravelMode::Driving) => {
            "Recommended route. Drive attentively and follow the signs."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advice_differs_by_mode() {
        for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
            assert_ne!(
                advice(tier, TravelMode::Walking),
                advice(tier, TravelMode::Driving)
            );
        }
    }
}
