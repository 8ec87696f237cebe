//! Automation suggestions derived from which entities exist together

use crate::client::EntityState;
use crate::intelligence::relationships::room_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A suggested automation with the entities it would use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub entities: Vec<String>,
    /// Room the suggestion applies to, when it is room-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

fn has_class(state: &EntityState, classes: &[&str]) -> bool {
    state
        .device_class()
        .is_some_and(|class| classes.contains(&class))
}

fn is_motion(state: &EntityState) -> bool {
    state.domain() == "binary_sensor" && has_class(state, &["motion", "occupancy", "presence"])
}

fn is_opening(state: &EntityState) -> bool {
    state.domain() == "binary_sensor" && has_class(state, &["window", "door", "opening"])
}

fn is_battery(state: &EntityState) -> bool {
    (state.domain() == "sensor" && has_class(state, &["battery"]))
        || state.attributes.contains_key("battery_level")
}

fn ids<'a>(states: impl IntoIterator<Item = &'a EntityState>) -> Vec<String> {
    let mut ids: Vec<String> = states.into_iter().map(|s| s.entity_id.clone()).collect();
    ids.sort();
    ids
}

/// Group the states matching `pred` by room key
fn by_room<'a>(
    states: &'a [EntityState],
    pred: impl Fn(&EntityState) -> bool,
) -> BTreeMap<String, Vec<&'a EntityState>> {
    let mut rooms: BTreeMap<String, Vec<&EntityState>> = BTreeMap::new();
    for state in states.iter().filter(|s| pred(s)) {
        if let Some(room) = room_key(state) {
            rooms.entry(room).or_default().push(state);
        }
    }
    rooms
}

/// Pair two entity kinds in matching rooms
fn room_pairs<'a>(
    states: &'a [EntityState],
    first: impl Fn(&EntityState) -> bool,
    second: impl Fn(&EntityState) -> bool,
) -> Vec<(String, Vec<&'a EntityState>, Vec<&'a EntityState>)> {
    let mut seconds = by_room(states, second);
    by_room(states, first)
        .into_iter()
        .filter_map(|(room, firsts)| seconds.remove(&room).map(|s| (room, firsts, s)))
        .collect()
}

fn motion_lighting(states: &[EntityState], out: &mut Vec<Suggestion>) {
    for (room, sensors, lights) in room_pairs(states, is_motion, |s| s.domain() == "light") {
        out.push(Suggestion {
            id: format!("motion_lighting_{room}"),
            title: format!("Motion-activated lighting in {room}"),
            description: format!(
                "Turn on {} when motion is detected and off again after a few minutes without motion.",
                lights.iter().map(|l| l.friendly_name()).collect::<Vec<_>>().join(", ")
            ),
            entities: ids(sensors.into_iter().chain(lights)),
            room: Some(room),
        });
    }
}

fn window_climate(states: &[EntityState], out: &mut Vec<Suggestion>) {
    for (room, openings, climates) in room_pairs(states, is_opening, |s| s.domain() == "climate") {
        out.push(Suggestion {
            id: format!("window_climate_pause_{room}"),
            title: format!("Pause heating while {room} windows are open"),
            description: "Switch the thermostat off when a window or door has been open for a few minutes and restore it once closed.".to_string(),
            entities: ids(openings.into_iter().chain(climates)),
            room: Some(room),
        });
    }
}

fn away_mode(states: &[EntityState], out: &mut Vec<Suggestion>) {
    let trackers: Vec<_> = states
        .iter()
        .filter(|s| matches!(s.domain(), "person" | "device_tracker"))
        .collect();
    let lights: Vec<_> = states.iter().filter(|s| s.domain() == "light").collect();
    if trackers.is_empty() || lights.is_empty() {
        return;
    }
    out.push(Suggestion {
        id: "away_mode".to_string(),
        title: "Turn everything off when nobody is home".to_string(),
        description: format!(
            "When all {} tracked people or devices leave home, turn off {} lights.",
            trackers.len(),
            lights.len()
        ),
        entities: ids(trackers.into_iter().chain(lights)),
        room: None,
    });
}

fn sunset_covers(states: &[EntityState], out: &mut Vec<Suggestion>) {
    let Some(sun) = states.iter().find(|s| s.entity_id == "sun.sun") else {
        return;
    };
    let covers: Vec<_> = states.iter().filter(|s| s.domain() == "cover").collect();
    if covers.is_empty() {
        return;
    }
    out.push(Suggestion {
        id: "sunset_covers".to_string(),
        title: "Close covers at sunset".to_string(),
        description: "Close blinds and shades when the sun sets and open them again at sunrise."
            .to_string(),
        entities: ids(std::iter::once(sun).chain(covers)),
        room: None,
    });
}

fn low_battery_alerts(states: &[EntityState], out: &mut Vec<Suggestion>) {
    let batteries: Vec<_> = states.iter().filter(|s| is_battery(s)).collect();
    if batteries.is_empty() {
        return;
    }
    out.push(Suggestion {
        id: "low_battery_alerts".to_string(),
        title: "Notify on low batteries".to_string(),
        description: format!(
            "Send a notification when any of {} battery-powered devices drops below 20%.",
            batteries.len()
        ),
        entities: ids(batteries),
        room: None,
    });
}

fn bedtime_all_off(states: &[EntityState], out: &mut Vec<Suggestion>) {
    let lights: Vec<_> = states.iter().filter(|s| s.domain() == "light").collect();
    if lights.len() < 3 {
        return;
    }
    out.push(Suggestion {
        id: "bedtime_all_off".to_string(),
        title: "Bedtime routine".to_string(),
        description: format!(
            "Turn off all {} lights at a fixed bedtime or from a single button.",
            lights.len()
        ),
        entities: ids(lights),
        room: None,
    });
}

/// Suggest automations for the given snapshot, in rule order then room
pub fn suggest_automations(states: &[EntityState]) -> Vec<Suggestion> {
    let mut out = Vec::new();
    motion_lighting(states, &mut out);
    window_climate(states, &mut out);
    away_mode(states, &mut out);
    sunset_covers(states, &mut out);
    low_battery_alerts(states, &mut out);
    bedtime_all_off(states, &mut out);
    out
}
