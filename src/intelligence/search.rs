//! Semantic entity search
//!
//! Token matching against object ids, friendly names, domains, device classes
//! and states, with a small synonym table so "lamp" finds lights and "tv"
//! finds media players.

use crate::client::EntityState;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weight applied to matches reached through a synonym
const SYNONYM_WEIGHT: f64 = 0.7;

const SYNONYMS: &[(&str, &[&str])] = &[
    ("lamp", &["light"]),
    ("bulb", &["light"]),
    ("lighting", &["light"]),
    ("temp", &["temperature"]),
    ("thermostat", &["climate", "temperature"]),
    ("heating", &["climate"]),
    ("heater", &["climate"]),
    ("tv", &["media_player"]),
    ("television", &["media_player"]),
    ("speaker", &["media_player"]),
    ("music", &["media_player"]),
    ("blind", &["cover"]),
    ("shade", &["cover"]),
    ("curtain", &["cover"]),
    ("shutter", &["cover"]),
    ("plug", &["switch"]),
    ("outlet", &["switch"]),
    ("socket", &["switch"]),
    ("door", &["opening"]),
    ("window", &["opening"]),
    ("presence", &["motion", "occupancy"]),
    ("occupancy", &["motion"]),
    ("motion", &["occupancy"]),
    ("humid", &["humidity"]),
    ("power", &["energy"]),
    ("energy", &["power"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub entity_id: String,
    pub friendly_name: String,
    pub state: String,
    pub score: f64,
}

/// Lowercase alphanumeric tokens with a plural `s` removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.len() > 3 && t.ends_with('s') && !t.ends_with("ss") {
                t[..t.len() - 1].to_string()
            } else {
                t.to_string()
            }
        })
        .collect()
}

fn synonyms(token: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, expansions)| *expansions)
        .unwrap_or(&[])
}

/// Searchable text of one entity, tokenized once
struct Indexed<'a> {
    name_tokens: Vec<String>,
    domain: &'a str,
    device_class: Option<&'a str>,
    state_tokens: Vec<String>,
    haystack: String,
}

impl<'a> Indexed<'a> {
    fn new(state: &'a EntityState) -> Self {
        let mut name_tokens = tokenize(state.object_id());
        name_tokens.extend(tokenize(state.friendly_name()));
        Self {
            name_tokens,
            domain: state.domain(),
            device_class: state.device_class(),
            state_tokens: tokenize(&state.state),
            haystack: format!("{} {}", state.entity_id, state.friendly_name()).to_lowercase(),
        }
    }

    /// Best score for one term
    fn term_score(&self, term: &str) -> f64 {
        let mut score = 0.0;
        if self.name_tokens.iter().any(|t| t == term) {
            score += 3.0;
        }
        if self.domain == term || self.device_class == Some(term) {
            score += 2.0;
        }
        if self.state_tokens.iter().any(|t| t == term) {
            score += 1.0;
        }
        if self.haystack.contains(term) {
            score += 1.0;
        }
        score
    }

    /// Score of a query token, trying synonyms when the token itself misses
    fn token_score(&self, token: &str) -> f64 {
        let direct = self.term_score(token);
        let via_synonym = synonyms(token)
            .iter()
            .map(|syn| self.term_score(syn) * SYNONYM_WEIGHT)
            .fold(0.0, f64::max);
        direct.max(via_synonym)
    }
}

/// Rank entities against a free-text query
///
/// The score is scaled by the fraction of query tokens that matched at all, so
/// "kitchen light" prefers the kitchen light over every other light.
pub fn search_entities(states: &[EntityState], query: &str, limit: usize) -> Vec<SearchHit> {
    let tokens = tokenize(query);
    if tokens.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = states
        .iter()
        .filter_map(|state| {
            let indexed = Indexed::new(state);
            let scores: Vec<f64> = tokens.iter().map(|t| indexed.token_score(t)).collect();
            let matched = scores.iter().filter(|s| **s > 0.0).count();
            if matched == 0 {
                return None;
            }
            let coverage = matched as f64 / tokens.len() as f64;
            let score = scores.iter().sum::<f64>() * coverage;
            Some(SearchHit {
                entity_id: state.entity_id.clone(),
                friendly_name: state.friendly_name().to_string(),
                state: state.state.clone(),
                score: (score * 100.0).round() / 100.0,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    hits.truncate(limit);
    hits
}
