//! Maneuver wording.
//!
//! A static table maps `(type, modifier)` to a phrase; the road name and
//! roundabout exit are interpolated.

use saferoute_routing_models::{Instruction, Maneuver};

/// Phrase for a bare direction modifier.
fn direction(modifier: &str) -> Option<&'static str> {
    Some(match modifier {
        "straight" => "Continue straight",
        "slight right" => "Bear slightly right",
        "right" => "Turn right",
        "sharp right" => "Turn sharply right",
        "uturn" => "Make a U-turn",
        "sharp left" => "Turn sharply left",
        "left" => "Turn left",
        "slight left" => "Bear slightly left",
        _ => return None,
    })
}

/// Picks the left, right, or neutral phrase depending on the modifier.
fn sided(modifier: &str, left: &str, right: &str, neutral: &str) -> String {
    if modifier.contains("left") {
        left.to_string()
    } else if modifier.contains("right") {
        right.to_string()
    } else {
        neutral.to_string()
    }
}

/// Human-readable text for one maneuver.
#[must_use]
pub fn humanize(maneuver: &Maneuver) -> String {
    let kind = maneuver.kind.to_lowercase();
    let modifier = maneuver.modifier.as_deref().unwrap_or("").to_lowercase();
    let via = maneuver
        .road
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| format!(" on {r}"))
        .unwrap_or_default();
    let turn = direction(&modifier);

    match kind.as_str() {
        "depart" => format!("Start the route{via}."),
        "continue" => format!("{}{via}.", turn.unwrap_or("Continue")),
        "turn" => format!("{}{via}.", turn.unwrap_or("Turn")),
        "new name" => format!("Continue{via}."),
        "end of road" => format!("{} at the end of the road{via}.", turn.unwrap_or("Turn")),
        "on ramp" => format!(
            "{}{via}.",
            sided(&modifier, "Take the ramp on the left", "Take the ramp on the right", "Take the ramp")
        ),
        "off ramp" => format!(
            "{}{via}.",
            sided(&modifier, "Take the exit ramp on the left", "Take the exit ramp on the right", "Take the exit")
        ),
        "fork" => format!(
            "{}{via}.",
            sided(&modifier, "Keep left", "Keep right", "Stay on the main road")
        ),
        "merge" => format!("Merge{via}."),
        "roundabout" | "rotary" => {
            let exit = maneuver
                .exit
                .map(|n| format!(" and take exit {n}"))
                .unwrap_or_default();
            format!("Enter the roundabout{exit}{via}.")
        }
        "roundabout turn" => format!("{} at the roundabout{via}.", turn.unwrap_or("Turn")),
        "arrive" | "destination reached" => "You have arrived at your destination.".to_string(),
        "waypoint reached" => "Waypoint reached.".to_string(),
        _ => format!("Continue{via}."),
    }
}

/// Builds the ordered instruction list for a route's maneuvers.
#[must_use]
pub fn instructions(maneuvers: &[Maneuver]) -> Vec<Instruction> {
    maneuvers
        .iter()
        .enumerate()
        .map(|(index, m)| Instruction {
            index,
            text: humanize(m),
            anchor: m.location,
            distance_m: m.distance_m,
            duration_s: m.duration_s,
        })
        .collect()
}
