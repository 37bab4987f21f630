//! Threat record domain type

use serde::{Deserialize, Serialize};

/// One observed threat and its derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub id: i64,
    pub threat_category: String,
    pub iocs: Option<Vec<String>>,
    pub threat_actor: Option<String>,
    pub attack_vector: Option<String>,
    pub geographical_location: Option<String>,
    pub sentiment_in_forums: Option<f64>,
    pub severity_score: i64,
    pub predicted_threat_category: Option<String>,
    pub suggested_defense_mechanism: Option<String>,
    pub risk_level_prediction: Option<i64>,
    pub cleaned_threat_description: Option<String>,
    pub keyword_extraction: Option<Vec<String>>,
    pub named_entities_ner: Option<Vec<String>>,
    pub topic_modeling_labels: Option<String>,
    pub word_count: Option<i64>,
}

/// A record that has not been stored yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewThreat {
    pub threat_category: String,
    pub iocs: Option<Vec<String>>,
    pub threat_actor: Option<String>,
    pub attack_vector: Option<String>,
    pub geographical_location: Option<String>,
    pub sentiment_in_forums: Option<f64>,
    pub severity_score: i64,
    pub predicted_threat_category: Option<String>,
    pub suggested_defense_mechanism: Option<String>,
    pub risk_level_prediction: Option<i64>,
    pub cleaned_threat_description: Option<String>,
    pub keyword_extraction: Option<Vec<String>>,
    pub named_entities_ner: Option<Vec<String>>,
    pub topic_modeling_labels: Option<String>,
    pub word_count: Option<i64>,
}

impl NewThreat {
    pub fn new(threat_category: impl Into<String>, severity_score: i64) -> Self {
        Self {
            threat_category: threat_category.into(),
            severity_score,
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl NewThreat {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.cleaned_threat_description = Some(description.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.threat_actor = Some(actor.into());
        self
    }
}

/// Encode a list for storage in a text column as a JSON array.
/// An empty list is stored as NULL.
pub fn encode_list(items: Option<&[String]>) -> Option<String> {
    match items {
        Some(items) if !items.is_empty() => serde_json::to_string(items).ok(),
        _ => None,
    }
}

/// Decode a stored list column.
///
/// Text that is not a JSON array of strings is read as a single-item list
/// rather than split, so no item is ever broken apart.
pub fn decode_list(raw: Option<String>) -> Option<Vec<String>> {
    let raw = raw?;
    if raw.is_empty() {
        return Some(Vec::new());
    }
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(items) => Some(items),
        Err(_) => Some(vec![raw]),
    }
}
