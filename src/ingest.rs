//! Bulk import of threat rows exported from the source dataset
//!
//! The dataset is read as CSV, or as a JSON array of objects when the file
//! ends in `.json`. Rows are keyed by the dataset's column headings. Each row is normalized
//! (list columns split, scores clamped into range) and the whole file is
//! inserted in a single transaction.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::db::Database;
use crate::threat::NewThreat;

const SEVERITY_RANGE: (i64, i64) = (1, 5);
const RISK_RANGE: (i64, i64) = (1, 5);
const SENTIMENT_RANGE: (f64, f64) = (0.5, 1.0);

#[derive(Debug, Default, Deserialize)]
pub struct RawThreatRow {
    #[serde(rename = "Threat Category")]
    pub threat_category: Option<String>,
    #[serde(rename = "IOCs (Indicators of Compromise)")]
    pub iocs: Option<String>,
    #[serde(rename = "Threat Actor")]
    pub threat_actor: Option<String>,
    #[serde(rename = "Attack Vector")]
    pub attack_vector: Option<String>,
    #[serde(rename = "Geographical Location")]
    pub geographical_location: Option<String>,
    #[serde(rename = "Sentiment in Forums")]
    pub sentiment_in_forums: Option<Value>,
    #[serde(rename = "Severity Score")]
    pub severity_score: Option<Value>,
    #[serde(rename = "Predicted Threat Category")]
    pub predicted_threat_category: Option<String>,
    #[serde(rename = "Suggested Defense Mechanism")]
    pub suggested_defense_mechanism: Option<String>,
    #[serde(rename = "Risk Level Prediction")]
    pub risk_level_prediction: Option<Value>,
    #[serde(rename = "Cleaned Threat Description")]
    pub cleaned_threat_description: Option<String>,
    #[serde(rename = "Keyword Extraction")]
    pub keyword_extraction: Option<String>,
    #[serde(rename = "Named Entities (NER)")]
    pub named_entities_ner: Option<String>,
    #[serde(rename = "Topic Modeling Labels")]
    pub topic_modeling_labels: Option<String>,
    #[serde(rename = "Word Count")]
    pub word_count: Option<Value>,
}

/// Read the dataset rows in `path` and store them. Returns the number inserted.
pub async fn import_file(db: &Database, path: &Path) -> Result<usize> {
    let started = Instant::now();
    info!("Importing threats from {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let rows: Vec<RawThreatRow> = if is_json {
        serde_json::from_slice(&bytes).context("JSON import must be an array of row objects")?
    } else {
        read_csv(&bytes)?
    };
    info!("Loaded {} rows", rows.len());

    let threats = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| normalize_row(row).with_context(|| format!("row {}", index)))
        .collect::<Result<Vec<_>>>()?;

    let ids = db.insert_threats(&threats).await?;
    info!(
        "Inserted {} threat records in {:.2}s",
        ids.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(ids.len())
}

/// Parse CSV with a header row. Data rows are numbered from 0 in errors.
fn read_csv(bytes: &[u8]) -> Result<Vec<RawThreatRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let rows = reader
        .deserialize::<RawThreatRow>()
        .enumerate()
        .map(|(index, row)| row.with_context(|| format!("row {}: malformed CSV record", index)))
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn normalize_row(row: RawThreatRow) -> Result<NewThreat> {
    let category = row
        .threat_category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .context("missing Threat Category")?;

    let severity = clamp_int(number(row.severity_score.as_ref()), SEVERITY_RANGE);
    let mut threat = NewThreat::new(category, severity);

    let sentiment = number(row.sentiment_in_forums.as_ref()).unwrap_or(SENTIMENT_RANGE.0);
    threat.sentiment_in_forums = Some(sentiment.clamp(SENTIMENT_RANGE.0, SENTIMENT_RANGE.1));
    threat.risk_level_prediction = Some(clamp_int(
        number(row.risk_level_prediction.as_ref()),
        RISK_RANGE,
    ));

    threat.iocs = Some(parse_iocs(row.iocs.as_deref().unwrap_or_default()));
    threat.threat_actor = text(row.threat_actor);
    threat.attack_vector = text(row.attack_vector);
    threat.geographical_location = text(row.geographical_location);
    threat.predicted_threat_category = text(row.predicted_threat_category);
    threat.suggested_defense_mechanism = text(row.suggested_defense_mechanism);
    threat.cleaned_threat_description = text(row.cleaned_threat_description);
    threat.keyword_extraction = text(row.keyword_extraction).map(|k| split_on(&k, ';'));
    threat.named_entities_ner = text(row.named_entities_ner).map(|n| split_on(&n, ';'));
    threat.topic_modeling_labels = text(row.topic_modeling_labels);
    threat.word_count = number(row.word_count.as_ref()).map(|w| w as i64);

    Ok(threat)
}

/// Split an IOC cell into individual indicators.
///
/// Accepts a JSON array, a comma-separated list, a whitespace-separated list
/// or a single value. Bracketed text that is not valid JSON (such as a
/// single-quoted list) is stripped of brackets and quotes and split on commas.
pub fn parse_iocs(raw: &str) -> Vec<String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Vec::new();
    }

    if cleaned.starts_with('[') && cleaned.ends_with(']') {
        return match serde_json::from_str::<Vec<Value>>(cleaned) {
            Ok(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => {
                let stripped: String = cleaned
                    .chars()
                    .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
                    .collect();
                split_on(&stripped, ',')
            }
        };
    }

    if cleaned.contains(',') {
        split_on(cleaned, ',')
    } else if cleaned.contains(char::is_whitespace) {
        cleaned.split_whitespace().map(str::to_string).collect()
    } else {
        vec![cleaned.to_string()]
    }
}

fn split_on(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number(value: Option<&Value>) -> Option<f64> {
    let parsed: Option<f64> = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn clamp_int(value: Option<f64>, (min, max): (i64, i64)) -> i64 {
    value.map(|v| v as i64).unwrap_or(min).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ioc_formats() {
        assert_eq!(parse_iocs(r#"["1.2.3.4", "evil.example"]"#), vec!["1.2.3.4", "evil.example"]);
        assert_eq!(parse_iocs("['a.example', 'b.example']"), vec!["a.example", "b.example"]);
        assert_eq!(parse_iocs("hash1, hash2 ,"), vec!["hash1", "hash2"]);
        assert_eq!(parse_iocs("10.0.0.1 10.0.0.2"), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(parse_iocs(" single "), vec!["single"]);
        assert!(parse_iocs("   ").is_empty());
    }

    #[test]
    fn clamps_scores_into_range() {
        let row: RawThreatRow = serde_json::from_value(json!({
            "Threat Category": "Malware",
            "Severity Score": 9,
            "Risk Level Prediction": "0",
            "Sentiment in Forums": 0.1
        }))
        .unwrap();
        let threat = normalize_row(row).unwrap();
        assert_eq!(threat.severity_score, 5);
        assert_eq!(threat.risk_level_prediction, Some(1));
        assert_eq!(threat.sentiment_in_forums, Some(0.5));
    }

    #[test]
    fn maps_dataset_columns() {
        let row: RawThreatRow = serde_json::from_value(json!({
            "Threat Category": " Phishing ",
            "IOCs (Indicators of Compromise)": "['login-verify.example']",
            "Threat Actor": "APT29",
            "Severity Score": "3",
            "Sentiment in Forums": 0.72,
            "Cleaned Threat Description": "spoofed sso portal",
            "Keyword Extraction": "sso;portal;credential",
            "Named Entities (NER)": "APT29;Okta",
            "Topic Modeling Labels": "credential theft",
            "Word Count": 3
        }))
        .unwrap();

        let threat = normalize_row(row).unwrap();
        assert_eq!(threat.threat_category, "Phishing");
        assert_eq!(threat.iocs, Some(vec!["login-verify.example".to_string()]));
        assert_eq!(threat.threat_actor.as_deref(), Some("APT29"));
        assert_eq!(threat.severity_score, 3);
        assert_eq!(threat.sentiment_in_forums, Some(0.72));
        assert_eq!(
            threat.keyword_extraction,
            Some(vec!["sso".to_string(), "portal".to_string(), "credential".to_string()])
        );
        assert_eq!(threat.named_entities_ner.map(|n| n.len()), Some(2));
        assert_eq!(threat.word_count, Some(3));
        assert_eq!(threat.attack_vector, None);
    }

    #[test]
    fn rejects_row_without_category() {
        let row = RawThreatRow {
            threat_category: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(normalize_row(row).is_err());
    }

    #[tokio::test]
    async fn imports_dataset_csv() {
        let db = crate::db::memory_database().await;
        let path = std::env::temp_dir().join(format!("threat-import-{}.csv", std::process::id()));
        let csv = concat!(
            "Threat Category,IOCs (Indicators of Compromise),Threat Actor,Severity Score,",
            "Sentiment in Forums,Keyword Extraction,Word Count\n",
            "Ransomware,\"[\"\"evil.example/a,b\"\", \"\"10.0.0.1\"\"]\",LockBit,5,0.9,",
            "\"ransomware, lockbit;encryption\",12\n",
            "Phishing,\"login.example, cdn.example\",,2,,,\n",
        );
        tokio::fs::write(&path, csv).await.unwrap();

        let inserted = import_file(&db, &path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(inserted, 2);

        let first = db.find_threat(1).await.unwrap().unwrap();
        assert_eq!(
            first.iocs,
            Some(vec!["evil.example/a,b".to_string(), "10.0.0.1".to_string()])
        );
        assert_eq!(
            first.keyword_extraction,
            Some(vec!["ransomware, lockbit".to_string(), "encryption".to_string()])
        );
        assert_eq!(first.threat_actor.as_deref(), Some("LockBit"));
        assert_eq!(first.severity_score, 5);
        assert_eq!(first.sentiment_in_forums, Some(0.9));
        assert_eq!(first.word_count, Some(12));

        let second = db.find_threat(2).await.unwrap().unwrap();
        assert_eq!(
            second.iocs,
            Some(vec!["login.example".to_string(), "cdn.example".to_string()])
        );
        assert_eq!(second.threat_actor, None);
        assert_eq!(second.sentiment_in_forums, Some(0.5));
        assert_eq!(second.word_count, None);
    }

    #[tokio::test]
    async fn imports_file_in_one_batch() {
        let db = crate::db::memory_database().await;
        let path = std::env::temp_dir().join(format!("threat-import-{}.json", std::process::id()));
        let rows = json!([
            { "Threat Category": "Ransomware", "Severity Score": 5 },
            { "Threat Category": "Phishing", "Severity Score": 2 },
        ]);
        tokio::fs::write(&path, rows.to_string()).await.unwrap();

        let inserted = import_file(&db, &path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(db.get_total_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn bad_row_aborts_the_import() {
        let db = crate::db::memory_database().await;
        let path = std::env::temp_dir().join(format!("threat-import-bad-{}.json", std::process::id()));
        let rows = json!([
            { "Threat Category": "Ransomware", "Severity Score": 5 },
            { "Severity Score": 2 },
        ]);
        tokio::fs::write(&path, rows.to_string()).await.unwrap();

        let err = import_file(&db, &path).await.unwrap_err();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(format!("{:#}", err).contains("row 1"));
        assert_eq!(db.get_total_count().await.unwrap(), 0);
    }
}
