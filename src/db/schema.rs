//! Database schema definitions

pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS threats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    threat_category TEXT NOT NULL,
    iocs TEXT,                          -- JSON array of strings
    threat_actor TEXT,
    attack_vector TEXT,
    geographical_location TEXT,
    sentiment_in_forums REAL,
    severity_score INTEGER NOT NULL,
    predicted_threat_category TEXT,
    suggested_defense_mechanism TEXT,
    risk_level_prediction INTEGER,
    cleaned_threat_description TEXT,
    keyword_extraction TEXT,            -- JSON array of strings
    named_entities_ner TEXT,            -- JSON array of strings
    topic_modeling_labels TEXT,
    word_count INTEGER
)
"#;

// For severity grouping and range filters
pub const CREATE_INDEX_SEVERITY: &str =
    "CREATE INDEX IF NOT EXISTS idx_threats_severity ON threats(severity_score)";

// For category filter and grouping
pub const CREATE_INDEX_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_threats_category ON threats(threat_category COLLATE NOCASE)";

pub const ALL: &[&str] = &[CREATE_TABLE, CREATE_INDEX_SEVERITY, CREATE_INDEX_CATEGORY];
