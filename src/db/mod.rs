//! Database module

mod schema;

use anyhow::Result;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite, SqliteConnection};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::query::{ThreatFilter, ThreatQuery};
use crate::threat::{decode_list, encode_list, NewThreat, ThreatRecord};

const SELECT_COLUMNS: &str = r#"
    id, threat_category, iocs, threat_actor, attack_vector, geographical_location,
    sentiment_in_forums, severity_score, predicted_threat_category,
    suggested_defense_mechanism, risk_level_prediction, cleaned_threat_description,
    keyword_extraction, named_entities_ner, topic_modeling_labels, word_count
"#;

// ?1 = category (exact, case-insensitive), ?2 = LIKE pattern for search.
// Case folding is ASCII-only in SQLite without ICU.
const FILTER_CLAUSE: &str = r#"
    WHERE (?1 IS NULL OR threat_category = ?1 COLLATE NOCASE)
      AND (?2 IS NULL
           OR threat_category LIKE ?2 ESCAPE '\'
           OR cleaned_threat_description LIKE ?2 ESCAPE '\'
           OR threat_actor LIKE ?2 ESCAPE '\'
           OR attack_vector LIKE ?2 ESCAPE '\')
"#;

/// Row shape of the `threats` table.
#[derive(Debug, FromRow)]
struct ThreatRow {
    id: i64,
    threat_category: String,
    iocs: Option<String>,
    threat_actor: Option<String>,
    attack_vector: Option<String>,
    geographical_location: Option<String>,
    sentiment_in_forums: Option<f64>,
    severity_score: i64,
    predicted_threat_category: Option<String>,
    suggested_defense_mechanism: Option<String>,
    risk_level_prediction: Option<i64>,
    cleaned_threat_description: Option<String>,
    keyword_extraction: Option<String>,
    named_entities_ner: Option<String>,
    topic_modeling_labels: Option<String>,
    word_count: Option<i64>,
}

impl From<ThreatRow> for ThreatRecord {
    fn from(row: ThreatRow) -> Self {
        ThreatRecord {
            id: row.id,
            threat_category: row.threat_category,
            iocs: decode_list(row.iocs),
            threat_actor: row.threat_actor,
            attack_vector: row.attack_vector,
            geographical_location: row.geographical_location,
            sentiment_in_forums: row.sentiment_in_forums,
            severity_score: row.severity_score,
            predicted_threat_category: row.predicted_threat_category,
            suggested_defense_mechanism: row.suggested_defense_mechanism,
            risk_level_prediction: row.risk_level_prediction,
            cleaned_threat_description: row.cleaned_threat_description,
            keyword_extraction: decode_list(row.keyword_extraction),
            named_entities_ner: decode_list(row.named_entities_ner),
            topic_modeling_labels: row.topic_modeling_labels,
            word_count: row.word_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityStat {
    pub severity: i64,
    pub count: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        for statement in schema::ALL {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Database schema applied");
        Ok(())
    }

    /// Insert all records in one transaction. Nothing is stored if any insert fails.
    pub async fn insert_threats(&self, threats: &[NewThreat]) -> sqlx::Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(threats.len());
        for threat in threats {
            ids.push(insert_one(&mut tx, threat).await?);
        }
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn list_threats(&self, query: &ThreatQuery) -> sqlx::Result<Vec<ThreatRecord>> {
        let sql = format!(
            "SELECT {} FROM threats {} ORDER BY id ASC LIMIT ?3 OFFSET ?4",
            SELECT_COLUMNS, FILTER_CLAUSE
        );
        let rows: Vec<ThreatRow> = sqlx::query_as(&sql)
            .bind(query.filter.category.as_deref())
            .bind(search_pattern(&query.filter))
            .bind(query.limit)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ThreatRecord::from).collect())
    }

    pub async fn count_threats(&self, filter: &ThreatFilter) -> sqlx::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM threats {}", FILTER_CLAUSE);
        let row: (i64,) = sqlx::query_as(&sql)
            .bind(filter.category.as_deref())
            .bind(search_pattern(filter))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn find_threat(&self, id: i64) -> sqlx::Result<Option<ThreatRecord>> {
        let sql = format!("SELECT {} FROM threats WHERE id = ?", SELECT_COLUMNS);
        let row: Option<ThreatRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ThreatRecord::from))
    }

    pub async fn get_total_count(&self) -> sqlx::Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM threats")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn get_category_stats(&self) -> sqlx::Result<Vec<CategoryStat>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT threat_category, COUNT(*) as count
            FROM threats
            GROUP BY threat_category
            ORDER BY count DESC, threat_category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryStat { category, count })
            .collect())
    }

    pub async fn get_severity_stats(&self) -> sqlx::Result<Vec<SeverityStat>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT severity_score, COUNT(*) as count
            FROM threats
            GROUP BY severity_score
            ORDER BY severity_score ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(severity, count)| SeverityStat { severity, count })
            .collect())
    }
}

async fn insert_one(conn: &mut SqliteConnection, threat: &NewThreat) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO threats (
            threat_category, iocs, threat_actor, attack_vector, geographical_location,
            sentiment_in_forums, severity_score, predicted_threat_category,
            suggested_defense_mechanism, risk_level_prediction, cleaned_threat_description,
            keyword_extraction, named_entities_ner, topic_modeling_labels, word_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&threat.threat_category)
    .bind(encode_list(threat.iocs.as_deref()))
    .bind(&threat.threat_actor)
    .bind(&threat.attack_vector)
    .bind(&threat.geographical_location)
    .bind(threat.sentiment_in_forums)
    .bind(threat.severity_score)
    .bind(&threat.predicted_threat_category)
    .bind(&threat.suggested_defense_mechanism)
    .bind(threat.risk_level_prediction)
    .bind(&threat.cleaned_threat_description)
    .bind(encode_list(threat.keyword_extraction.as_deref()))
    .bind(encode_list(threat.named_entities_ner.as_deref()))
    .bind(&threat.topic_modeling_labels)
    .bind(threat.word_count)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Substring LIKE pattern for the search filter, with wildcards in the input escaped.
fn search_pattern(filter: &ThreatFilter) -> Option<String> {
    filter.search.as_deref().map(|term| {
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    })
}

#[cfg(test)]
pub(crate) async fn memory_database() -> Database {
    let db = Database::new(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    db.run_migrations().await.unwrap();
    db
}
